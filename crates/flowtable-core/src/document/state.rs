use super::style::{Style, StyleId};
use crate::error::{FlowTableError, Result};
use dashmap::DashMap;
use flowtable_engine::engine::{Area, CellRef};
use std::fmt;
use std::sync::Arc;

/// The value held by a workbook cell.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Native spreadsheet formula, stored without the leading `=`.
    Formula(String),
}

impl CellValue {
    /// The text of a text cell. Every other kind, formulas included, is `None`.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Int(n) => write!(f, "{}", n),
            CellValue::Float(n) if n.is_finite() => write!(f, "{}", n),
            CellValue::Float(_) => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Formula(text) => write!(f, "={}", text),
        }
    }
}

/// A cell: a value plus a reference into the workbook style table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub style: StyleId,
}

/// Sparse cell storage (DashMap is internally Arc-based, clones are cheap)
pub type Grid = Arc<DashMap<CellRef, Cell>>;

/// A named worksheet.
#[derive(Clone, Debug)]
pub struct Sheet {
    pub name: String,
    pub grid: Grid,
    pub merges: Vec<Area>,
}

impl Sheet {
    pub fn new(name: &str) -> Self {
        Sheet {
            name: name.to_string(),
            grid: Arc::new(DashMap::new()),
            merges: Vec::new(),
        }
    }

    /// Smallest area covering every stored cell and merge region.
    /// `None` for an empty sheet.
    pub fn dimension(&self) -> Option<Area> {
        let mut bounds: Option<Area> = None;
        let mut include = |left: usize, top: usize, right: usize, bottom: usize| {
            bounds = Some(match bounds {
                None => Area::new(left, top, right, bottom),
                Some(b) => Area::new(
                    b.left.min(left),
                    b.top.min(top),
                    b.right.max(right),
                    b.bottom.max(bottom),
                ),
            });
        };
        for entry in self.grid.iter() {
            let at = entry.key();
            include(at.col, at.row, at.col, at.row);
        }
        for merge in &self.merges {
            include(merge.left, merge.top, merge.right, merge.bottom);
        }
        bounds
    }

    pub fn value(&self, at: &CellRef) -> CellValue {
        self.grid
            .get(at)
            .map(|cell| cell.value.clone())
            .unwrap_or_default()
    }

    /// Set a cell's value, keeping whatever style it already has.
    pub fn set_value(&self, at: CellRef, value: CellValue) {
        self.grid.entry(at).or_default().value = value;
    }

    pub fn style_id(&self, at: &CellRef) -> StyleId {
        self.grid.get(at).map(|cell| cell.style).unwrap_or_default()
    }

    /// Merge `area`. Merged regions are recorded as given; callers keep them
    /// disjoint.
    pub fn merge(&mut self, area: Area) {
        self.merges.push(area);
    }
}

/// An in-memory workbook: ordered sheets plus a shared style table.
#[derive(Clone, Debug)]
pub struct Workbook {
    pub(crate) sheets: Vec<Sheet>,
    pub(crate) styles: Vec<Style>,
}

impl Workbook {
    /// An empty workbook holding only the default style.
    pub fn new() -> Self {
        Workbook {
            sheets: Vec::new(),
            styles: vec![Style::default()],
        }
    }

    /// Append a sheet, or return the existing one with that name.
    pub fn add_sheet(&mut self, name: &str) -> &mut Sheet {
        let index = match self.sheets.iter().position(|s| s.name == name) {
            Some(index) => index,
            None => {
                self.sheets.push(Sheet::new(name));
                self.sheets.len() - 1
            }
        };
        &mut self.sheets[index]
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> Result<&Sheet> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| FlowTableError::UnknownSheet(name.to_string()))
    }

    pub fn sheet_mut(&mut self, name: &str) -> Result<&mut Sheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| FlowTableError::UnknownSheet(name.to_string()))
    }

    pub fn styles(&self) -> &[Style] {
        &self.styles
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}
