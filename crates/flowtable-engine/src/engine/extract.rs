//! Value extraction and shaping.
//!
//! Backends hand back opaque values. Everything the renderer needs from them
//! goes through [`BackendValue`], which answers three questions: how does the
//! value convert to a scalar, does it have a sequence length, and what is the
//! item at an index. [`extract`] walks a value down to the depth a formula
//! direction asks for, broadcasting lower-dimensional values into singleton
//! sequences, and [`shape`] turns the result into a padded [`RenderedGrid`].

use super::formula::{Direction, FormatKind, FormatSpec};
use crate::error::{EngineError, Result};

/// A numeric backend value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

/// Queries the extractor runs against a backend value.
pub trait BackendValue: Sized {
    /// The backend's own string conversion of this value.
    fn to_text(&self) -> Result<String>;

    /// The numeric value, if this is a number. Booleans are not numbers.
    fn to_number(&self) -> Option<Number>;

    /// The length of this value when it is a sequence. Strings are never
    /// sequences.
    fn sequence_len(&self) -> Result<Option<usize>>;

    /// The item at `index`, for values with a sequence length.
    fn sequence_item(&self, index: usize) -> Result<Self>;
}

/// A typed value in a rendered grid.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
}

impl Scalar {
    /// The value used to fill missing cells for a format kind.
    pub fn padding(kind: FormatKind) -> Scalar {
        match kind {
            FormatKind::String => Scalar::Str(String::new()),
            FormatKind::Int => Scalar::Int(0),
            FormatKind::Float | FormatKind::Percent => Scalar::Float(f64::NAN),
        }
    }

    /// Whether this scalar has the dynamic type a format kind writes.
    pub fn matches(&self, kind: FormatKind) -> bool {
        matches!(
            (self, kind),
            (Scalar::Str(_), FormatKind::String)
                | (Scalar::Int(_), FormatKind::Int)
                | (Scalar::Float(_), FormatKind::Float | FormatKind::Percent)
        )
    }
}

/// Result of [`extract`], one variant per extraction level.
#[derive(Clone, Debug, PartialEq)]
pub enum Extracted {
    Scalar(Scalar),
    Vector(Vec<Scalar>),
    Table(Vec<Vec<Scalar>>),
}

/// Extract `value` at `level` (0 = scalar, 1 = vector, 2 = table).
pub fn extract<V: BackendValue>(value: &V, level: u8, kind: FormatKind) -> Result<Extracted> {
    match level {
        0 => extract_scalar(value, kind).map(Extracted::Scalar),
        1 => extract_vector(value, kind).map(Extracted::Vector),
        2 => extract_table(value, kind).map(Extracted::Table),
        other => Err(EngineError::Extraction(format!(
            "unsupported extraction level {}",
            other
        ))),
    }
}

fn extract_scalar<V: BackendValue>(value: &V, kind: FormatKind) -> Result<Scalar> {
    Ok(match kind {
        FormatKind::String => Scalar::Str(value.to_text()?),
        FormatKind::Int => match value.to_number() {
            Some(Number::Int(n)) => Scalar::Int(n),
            Some(Number::Float(f)) => Scalar::Int(f.trunc() as i64),
            None => Scalar::Int(0),
        },
        FormatKind::Float | FormatKind::Percent => match value.to_number() {
            Some(Number::Int(n)) => Scalar::Float(n as f64),
            Some(Number::Float(f)) => Scalar::Float(f),
            None => Scalar::Float(f64::NAN),
        },
    })
}

fn extract_vector<V: BackendValue>(value: &V, kind: FormatKind) -> Result<Vec<Scalar>> {
    match value.sequence_len()? {
        Some(len) => (0..len)
            .map(|i| extract_scalar(&value.sequence_item(i)?, kind))
            .collect(),
        None => Ok(vec![extract_scalar(value, kind)?]),
    }
}

fn extract_table<V: BackendValue>(value: &V, kind: FormatKind) -> Result<Vec<Vec<Scalar>>> {
    match value.sequence_len()? {
        Some(len) => (0..len)
            .map(|i| extract_vector(&value.sequence_item(i)?, kind))
            .collect(),
        None => Ok(vec![extract_vector(value, kind)?]),
    }
}

/// A rectangular, row-major grid of rendered scalars.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedGrid {
    cells: Vec<Vec<Scalar>>,
    cols: usize,
}

impl RenderedGrid {
    /// Build a grid from possibly ragged rows.
    ///
    /// An empty grid becomes a single padding cell; short rows are padded on
    /// the right to the longest row.
    pub fn from_rows(mut rows: Vec<Vec<Scalar>>, kind: FormatKind) -> RenderedGrid {
        if rows.is_empty() {
            rows.push(Vec::new());
        }
        let cols = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
        for row in &mut rows {
            row.resize(cols, Scalar::padding(kind));
        }
        RenderedGrid { cells: rows, cols }
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Scalar> {
        self.cells.get(row).and_then(|r| r.get(col))
    }

    /// Iterate `(row, col, scalar)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &Scalar)> {
        self.cells
            .iter()
            .enumerate()
            .flat_map(|(r, row)| row.iter().enumerate().map(move |(c, v)| (r, c, v)))
    }

    pub fn into_rows(self) -> Vec<Vec<Scalar>> {
        self.cells
    }
}

/// Extract `value` for a formula's direction and format and lay it out as a grid.
pub fn shape<V: BackendValue>(
    value: &V,
    direction: Direction,
    format: &FormatSpec,
) -> Result<RenderedGrid> {
    let kind = format.kind;
    let rows = match extract(value, direction.level(), kind)? {
        Extracted::Scalar(scalar) => vec![vec![scalar]],
        Extracted::Vector(items) => match direction {
            Direction::Vertical => items.into_iter().map(|item| vec![item]).collect(),
            _ => vec![items],
        },
        Extracted::Table(rows) => rows,
    };
    Ok(RenderedGrid::from_rows(rows, kind))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Minimal backend value used to exercise the extractor without a runtime.
    #[derive(Clone, Debug)]
    pub(crate) enum Fake {
        Str(&'static str),
        Int(i64),
        Float(f64),
        Bool(bool),
        List(Vec<Fake>),
        /// Reports a length but fails on item access.
        Broken,
    }

    impl BackendValue for Fake {
        fn to_text(&self) -> Result<String> {
            Ok(match self {
                Fake::Str(s) => s.to_string(),
                Fake::Int(n) => n.to_string(),
                Fake::Float(f) => f.to_string(),
                Fake::Bool(b) => b.to_string(),
                Fake::List(items) => items
                    .iter()
                    .map(|i| i.to_text())
                    .collect::<Result<Vec<_>>>()?
                    .join(","),
                Fake::Broken => "broken".to_string(),
            })
        }

        fn to_number(&self) -> Option<Number> {
            match self {
                Fake::Int(n) => Some(Number::Int(*n)),
                Fake::Float(f) => Some(Number::Float(*f)),
                _ => None,
            }
        }

        fn sequence_len(&self) -> Result<Option<usize>> {
            Ok(match self {
                Fake::List(items) => Some(items.len()),
                Fake::Broken => Some(1),
                _ => None,
            })
        }

        fn sequence_item(&self, index: usize) -> Result<Self> {
            match self {
                Fake::List(items) => items
                    .get(index)
                    .cloned()
                    .ok_or_else(|| EngineError::Extraction(format!("no item {}", index))),
                _ => Err(EngineError::Extraction("not indexable".to_string())),
            }
        }
    }

    fn spec(kind: FormatKind) -> FormatSpec {
        FormatSpec::new(kind, -1)
    }

    #[test]
    fn test_scalar_coercion() {
        let as_int = |v: Fake| extract(&v, 0, FormatKind::Int).unwrap();
        assert_eq!(as_int(Fake::Float(2.9)), Extracted::Scalar(Scalar::Int(2)));
        assert_eq!(as_int(Fake::Float(-2.9)), Extracted::Scalar(Scalar::Int(-2)));
        assert_eq!(as_int(Fake::Str("12")), Extracted::Scalar(Scalar::Int(0)));
        assert_eq!(as_int(Fake::Bool(true)), Extracted::Scalar(Scalar::Int(0)));

        let as_str = extract(&Fake::Int(7), 0, FormatKind::String).unwrap();
        assert_eq!(as_str, Extracted::Scalar(Scalar::Str("7".to_string())));

        let as_float = extract(&Fake::Int(3), 0, FormatKind::Percent).unwrap();
        assert_eq!(as_float, Extracted::Scalar(Scalar::Float(3.0)));

        match extract(&Fake::Str("x"), 0, FormatKind::Float).unwrap() {
            Extracted::Scalar(Scalar::Float(f)) => assert!(f.is_nan()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_scalar_broadcasts_to_every_direction() {
        let value = Fake::Int(5);
        for direction in [
            Direction::Cell,
            Direction::Horizontal,
            Direction::Vertical,
            Direction::Table,
        ] {
            let grid = shape(&value, direction, &spec(FormatKind::Int)).unwrap();
            assert_eq!((grid.rows(), grid.cols()), (1, 1), "{:?}", direction);
            assert_eq!(grid.get(0, 0), Some(&Scalar::Int(5)));
        }
    }

    #[test]
    fn test_vector_directions() {
        let value = Fake::List(vec![Fake::Int(1), Fake::Int(2), Fake::Int(3)]);

        let h = shape(&value, Direction::Horizontal, &spec(FormatKind::Int)).unwrap();
        assert_eq!((h.rows(), h.cols()), (1, 3));

        let v = shape(&value, Direction::Vertical, &spec(FormatKind::Int)).unwrap();
        assert_eq!((v.rows(), v.cols()), (3, 1));
        assert_eq!(v.get(2, 0), Some(&Scalar::Int(3)));

        // A flat list under Table becomes a column of singleton rows.
        let t = shape(&value, Direction::Table, &spec(FormatKind::Int)).unwrap();
        assert_eq!((t.rows(), t.cols()), (3, 1));

        // Cell direction stringifies the whole value.
        let c = shape(&value, Direction::Cell, &spec(FormatKind::String)).unwrap();
        assert_eq!(c.get(0, 0), Some(&Scalar::Str("1,2,3".to_string())));
    }

    #[test]
    fn test_strings_are_not_sequences() {
        let grid = shape(&Fake::Str("abc"), Direction::Horizontal, &spec(FormatKind::String)).unwrap();
        assert_eq!((grid.rows(), grid.cols()), (1, 1));
        assert_eq!(grid.get(0, 0), Some(&Scalar::Str("abc".to_string())));
    }

    #[test]
    fn test_empty_results_become_one_padding_cell() {
        let empty = Fake::List(vec![]);
        let nested_empty = Fake::List(vec![Fake::List(vec![])]);
        for direction in [Direction::Horizontal, Direction::Vertical, Direction::Table] {
            for value in [&empty, &nested_empty] {
                let s = shape(value, direction, &spec(FormatKind::String)).unwrap();
                assert_eq!(s.clone().into_rows(), vec![vec![Scalar::Str(String::new())]]);

                let i = shape(value, direction, &spec(FormatKind::Int)).unwrap();
                assert_eq!(i.into_rows(), vec![vec![Scalar::Int(0)]]);

                let f = shape(value, direction, &spec(FormatKind::Float)).unwrap();
                assert_eq!((f.rows(), f.cols()), (1, 1));
                assert!(matches!(f.get(0, 0), Some(Scalar::Float(x)) if x.is_nan()));
            }
        }
    }

    #[test]
    fn test_ragged_table_is_padded() {
        let value = Fake::List(vec![
            Fake::List(vec![Fake::Str("a")]),
            Fake::List(vec![Fake::Str("b"), Fake::Str("c"), Fake::Str("d")]),
            Fake::Str("e"),
        ]);
        let grid = shape(&value, Direction::Table, &spec(FormatKind::String)).unwrap();
        let s = |v: &str| Scalar::Str(v.to_string());
        assert_eq!(
            grid.into_rows(),
            vec![
                vec![s("a"), s(""), s("")],
                vec![s("b"), s("c"), s("d")],
                vec![s("e"), s(""), s("")],
            ]
        );
    }

    #[test]
    fn test_item_failures_propagate() {
        let err = shape(&Fake::Broken, Direction::Vertical, &spec(FormatKind::Int)).unwrap_err();
        assert!(matches!(err, EngineError::Extraction(_)));
        assert!(extract(&Fake::Int(1), 3, FormatKind::Int).is_err());
    }

    #[test]
    fn test_scalar_matches_kind() {
        assert!(Scalar::Float(1.0).matches(FormatKind::Percent));
        assert!(!Scalar::Int(1).matches(FormatKind::Float));
        assert!(!Scalar::Str("1".into()).matches(FormatKind::Int));
    }
}
