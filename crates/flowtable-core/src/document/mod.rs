//! Workbook model and the document contract used by the renderer.

mod ops;
mod state;
mod style;

pub use ops::shift_formula_references;
pub use state::{Cell, CellValue, Grid, Sheet, Workbook};
pub use style::{
    Alignment, Border, BorderLine, Font, HorizontalAlign, NumFormat, Protection, Style, StyleId,
    VerticalAlign,
};

use crate::error::Result;
use flowtable_engine::engine::{Area, CellRef};

/// Everything the renderer needs from a spreadsheet document.
///
/// Sheets are addressed by name, cells by zero-based [`CellRef`].
pub trait SheetDocument {
    fn sheet_names(&self) -> Vec<String>;

    /// Extent of the sheet's content, `None` when it is empty.
    fn dimension(&self, sheet: &str) -> Result<Option<Area>>;

    fn cell_value(&self, sheet: &str, at: CellRef) -> Result<CellValue>;

    fn set_cell_value(&mut self, sheet: &str, at: CellRef, value: CellValue) -> Result<()>;

    /// Insert `count` blank rows before row `at`, shifting cells and merges down.
    fn insert_rows(&mut self, sheet: &str, at: usize, count: usize) -> Result<()>;

    /// Insert `count` blank columns before column `at`, shifting cells and merges right.
    fn insert_cols(&mut self, sheet: &str, at: usize, count: usize) -> Result<()>;

    fn merge_areas(&self, sheet: &str) -> Result<Vec<Area>>;

    fn cell_style(&self, sheet: &str, at: CellRef) -> Result<StyleId>;

    fn style(&self, id: StyleId) -> Result<Style>;

    fn add_style(&mut self, style: Style) -> StyleId;

    /// Apply style `id` to every cell in `area`, creating blank cells as needed.
    fn set_style(&mut self, sheet: &str, area: Area, id: StyleId) -> Result<()>;
}
