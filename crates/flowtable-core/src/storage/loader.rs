//! Data loaders.
//!
//! A loader turns a file into a [`DataMap`] of variables for the backends.
//! "Simple" loaders produce a single `data` entry; [`DirectoryLoader`] binds
//! that entry's value straight under the file's stem instead of nesting it.

use crate::error::{FlowTableError, Result};
use calamine::{Reader, Xlsx, open_workbook};
use flowtable_engine::engine::DataMap;
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub trait Loader {
    /// Whether the result is a single `data` entry.
    fn simple(&self) -> bool;

    fn load(&self, path: &Path) -> Result<DataMap>;
}

fn single(value: Value) -> DataMap {
    let mut map = DataMap::new();
    map.insert("data".to_string(), value);
    map
}

/// CSV file as `{"data": [[field, ...], ...]}`. No header handling; rows may
/// differ in length.
pub struct CsvLoader;

impl Loader for CsvLoader {
    fn simple(&self) -> bool {
        true
    }

    fn load(&self, path: &Path) -> Result<DataMap> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(Value::Array(
                record
                    .iter()
                    .map(|field| Value::String(field.to_string()))
                    .collect(),
            ));
        }
        Ok(single(Value::Array(rows)))
    }
}

/// JSON document as `{"data": <document>}`.
pub struct JsonLoader;

impl Loader for JsonLoader {
    fn simple(&self) -> bool {
        true
    }

    fn load(&self, path: &Path) -> Result<DataMap> {
        let value: Value = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        Ok(single(value))
    }
}

/// Workbook as `{sheet name: [[cell text, ...], ...]}` over each sheet's used range.
pub struct XlsxLoader;

impl Loader for XlsxLoader {
    fn simple(&self) -> bool {
        false
    }

    fn load(&self, path: &Path) -> Result<DataMap> {
        let mut workbook: Xlsx<_> = open_workbook(path)?;
        let mut map = DataMap::new();
        for name in workbook.sheet_names() {
            let range = workbook.worksheet_range(&name)?;
            let rows = range
                .rows()
                .map(|row| {
                    Value::Array(
                        row.iter()
                            .map(|cell| Value::String(cell.to_string()))
                            .collect(),
                    )
                })
                .collect();
            map.insert(name, Value::Array(rows));
        }
        Ok(map)
    }
}

/// SQLite database as `{table: [{column: value, ...}, ...]}` for every table.
#[cfg(feature = "sqlite")]
pub struct SqliteLoader;

#[cfg(feature = "sqlite")]
impl Loader for SqliteLoader {
    fn simple(&self) -> bool {
        false
    }

    fn load(&self, path: &Path) -> Result<DataMap> {
        use rusqlite::types::ValueRef;

        let conn = rusqlite::Connection::open(path)?;
        let tables: Vec<String> = {
            let mut stmt =
                conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
            let names = stmt.query_map([], |row| row.get(0))?;
            names.collect::<rusqlite::Result<_>>()?
        };

        let mut map = DataMap::new();
        for table in tables {
            let sql = format!("SELECT * FROM \"{}\"", table.replace('"', "\"\""));
            let mut stmt = conn.prepare(&sql)?;
            let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
            let mut rows = stmt.query([])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                let mut record = serde_json::Map::new();
                for (i, column) in columns.iter().enumerate() {
                    let value = match row.get_ref(i)? {
                        ValueRef::Null => Value::Null,
                        ValueRef::Integer(n) => Value::from(n),
                        ValueRef::Real(f) => Value::from(f),
                        ValueRef::Text(bytes) => {
                            Value::String(String::from_utf8_lossy(bytes).into_owned())
                        }
                        ValueRef::Blob(bytes) => Value::from(bytes.to_vec()),
                    };
                    record.insert(column.clone(), value);
                }
                records.push(Value::Object(record));
            }
            map.insert(table, Value::Array(records));
        }
        Ok(map)
    }
}

/// Predicate choosing the files a sub-loader handles.
pub type LoaderTest = fn(&Path) -> bool;

/// Case-insensitive extension check.
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

struct SubLoader {
    loader: Box<dyn Loader>,
    test: LoaderTest,
}

/// Loads every regular file in a directory, binding each one under its stem.
pub struct DirectoryLoader {
    sub_loaders: Vec<SubLoader>,
}

impl DirectoryLoader {
    /// A directory loader with no sub-loaders; every file is ignored.
    pub fn new() -> Self {
        DirectoryLoader {
            sub_loaders: Vec::new(),
        }
    }

    /// The loaders for every supported file type.
    pub fn with_default_loaders() -> Self {
        let loader = DirectoryLoader::new();
        #[cfg(feature = "sqlite")]
        let loader = loader.with_loader(SqliteLoader, |p| has_extension(p, &["db", "sqlite"]));
        loader
            .with_loader(XlsxLoader, |p| has_extension(p, &["xlsx"]))
            .with_loader(CsvLoader, |p| has_extension(p, &["csv"]))
            .with_loader(JsonLoader, |p| has_extension(p, &["json"]))
    }

    /// Add a sub-loader. Earlier sub-loaders win when several accept a file.
    pub fn with_loader(mut self, loader: impl Loader + 'static, test: LoaderTest) -> Self {
        self.sub_loaders.push(SubLoader {
            loader: Box::new(loader),
            test,
        });
        self
    }
}

impl Default for DirectoryLoader {
    fn default() -> Self {
        Self::with_default_loaders()
    }
}

impl Loader for DirectoryLoader {
    fn simple(&self) -> bool {
        false
    }

    fn load(&self, path: &Path) -> Result<DataMap> {
        if !std::fs::metadata(path)?.is_dir() {
            return Err(FlowTableError::NotADirectory(path.to_path_buf()));
        }

        let mut files: Vec<_> = std::fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<_>>()?;
        files.sort();

        let mut map = DataMap::new();
        for file in files.iter().filter(|p| p.is_file()) {
            let Some(stem) = file.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some(sub) = self.sub_loaders.iter().find(|sub| (sub.test)(file)) else {
                log::debug!("no loader for {}", file.display());
                continue;
            };
            let loaded = sub.loader.load(file)?;
            log::debug!("loaded {} as {}", file.display(), stem);
            let value = if sub.loader.simple() && loaded.len() == 1 {
                match loaded.into_iter().next() {
                    Some((_, value)) => value,
                    None => continue,
                }
            } else {
                Value::Object(loaded)
            };
            map.insert(stem.to_string(), value);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{CellValue, Workbook};
    use crate::storage::write_xlsx;
    use flowtable_engine::engine::CellRef;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_csv_loader_keeps_ragged_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, "name,score\nann,3\nbob\n").unwrap();
        let loaded = CsvLoader.load(&path).unwrap();
        assert_eq!(
            Value::Object(loaded),
            json!({"data": [["name", "score"], ["ann", "3"], ["bob"]]})
        );
    }

    #[test]
    fn test_has_extension() {
        assert!(has_extension(Path::new("a/b.CSV"), &["csv"]));
        assert!(!has_extension(Path::new("a/b.csv.bak"), &["csv"]));
        assert!(!has_extension(Path::new("noext"), &["csv"]));
    }

    #[test]
    fn test_directory_loader_binds_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sales.csv"), "1,2\n3,4\n").unwrap();
        std::fs::write(dir.path().join("meta.json"), r#"{"title": "Q3"}"#).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::create_dir(dir.path().join("nested.csv")).unwrap();

        let mut book = Workbook::new();
        let sheet = book.add_sheet("People");
        sheet.set_value(CellRef::new(0, 0), CellValue::Text("ann".into()));
        sheet.set_value(CellRef::new(1, 0), CellValue::Int(3));
        write_xlsx(&book, &dir.path().join("book.xlsx")).unwrap();

        let loaded = DirectoryLoader::with_default_loaders()
            .load(dir.path())
            .unwrap();
        assert_eq!(
            Value::Object(loaded),
            json!({
                "book": {"People": [["ann", "3"]]},
                "meta": {"title": "Q3"},
                "sales": [["1", "2"], ["3", "4"]],
            })
        );
    }

    #[test]
    fn test_directory_loader_rejects_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.csv");
        std::fs::write(&path, "1").unwrap();
        let err = DirectoryLoader::default().load(&path).unwrap_err();
        assert!(matches!(err, FlowTableError::NotADirectory(_)));
    }

    #[test]
    fn test_sub_loader_errors_abort() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        let err = DirectoryLoader::default().load(dir.path()).unwrap_err();
        assert!(matches!(err, FlowTableError::Json(_)));
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_sqlite_loader_reads_every_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shop.db");
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE items (name TEXT, price REAL, qty INTEGER);
             INSERT INTO items VALUES ('pen', 1.5, 3), ('ink', NULL, 1);",
        )
        .unwrap();
        drop(conn);

        let loaded = SqliteLoader.load(&path).unwrap();
        assert_eq!(
            Value::Object(loaded),
            json!({"items": [
                {"name": "pen", "price": 1.5, "qty": 3},
                {"name": "ink", "price": null, "qty": 1},
            ]})
        );
    }
}
