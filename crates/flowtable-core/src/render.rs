//! Template rendering.
//!
//! [`render`] walks every sheet of a document row by row, evaluates each
//! `{{ ... }}` text cell through a [`Registry`] and writes the resulting grid
//! in place. Results taller or wider than one cell push the content below and
//! to the right out of the way with row/column insertions, so the traversal
//! bounds and the merge regions are re-read as the sheet grows.

use crate::document::{CellValue, SheetDocument};
use crate::error::Result;
use flowtable_engine::engine::{
    Area, CellRef, DEFAULT_PRECISION, Dimension, FormatSpec, Formula, Registry, RenderedGrid,
    Scalar, parse_formula,
};

/// Counters for one [`render`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub sheets: usize,
    pub formulas: usize,
    pub rows_inserted: usize,
    pub cols_inserted: usize,
}

/// Merge regions of one sheet, re-read from the document whenever the
/// generation moves past the one they were read at.
struct MergeCache {
    generation: u64,
    loaded_at: Option<u64>,
    areas: Vec<Area>,
}

impl MergeCache {
    fn new() -> Self {
        MergeCache {
            generation: 0,
            loaded_at: None,
            areas: Vec::new(),
        }
    }

    fn invalidate(&mut self) {
        self.generation += 1;
    }

    fn contains<D: SheetDocument>(&mut self, doc: &D, sheet: &str, at: &CellRef) -> Result<bool> {
        if self.loaded_at != Some(self.generation) {
            self.areas = doc.merge_areas(sheet)?;
            self.loaded_at = Some(self.generation);
        }
        Ok(self.areas.iter().any(|area| area.contains(at)))
    }
}

/// Traversal state for a single sheet.
struct SheetPass<'a> {
    sheet: &'a str,
    area: Area,
    merges: MergeCache,
    /// Rectangles already filled with results during this pass.
    written: Vec<Area>,
}

impl<'a> SheetPass<'a> {
    fn skip<D: SheetDocument>(&mut self, doc: &D, at: &CellRef) -> Result<bool> {
        if self.written.iter().any(|area| area.contains(at)) {
            return Ok(true);
        }
        self.merges.contains(doc, self.sheet, at)
    }

    fn insert<D: SheetDocument>(
        &mut self,
        doc: &mut D,
        dim: Dimension,
        at: usize,
        count: usize,
    ) -> Result<()> {
        match dim {
            Dimension::Row => doc.insert_rows(self.sheet, at, count)?,
            Dimension::Column => doc.insert_cols(self.sheet, at, count)?,
        }
        for area in &mut self.written {
            area.shift_for_insert(dim, at, count);
        }
        self.merges.invalidate();
        Ok(())
    }

    /// Write `grid` with its top-left corner at `at`, making room first.
    fn apply<D: SheetDocument>(
        &mut self,
        doc: &mut D,
        at: CellRef,
        formula: &Formula,
        grid: &RenderedGrid,
        stats: &mut RenderStats,
    ) -> Result<()> {
        let rows = grid.rows();
        let cols = grid.cols();

        if rows > 1 {
            self.insert(doc, Dimension::Row, at.row + 1, rows - 1)?;
            stats.rows_inserted += rows - 1;
        }
        if cols > 1 {
            self.insert(doc, Dimension::Column, at.col + 1, cols - 1)?;
            stats.cols_inserted += cols - 1;
        }

        for (r, c, scalar) in grid.iter() {
            if let Some(value) = cell_value_for(scalar, &formula.format) {
                doc.set_cell_value(self.sheet, at.offset(c, r), value)?;
            }
        }

        let source = doc.style(doc.cell_style(self.sheet, at)?)?;
        let style = doc.add_style(source.with_display_format(&formula.format.display_format()));
        let target = Area::sized(at, cols, rows);
        doc.set_style(self.sheet, target, style)?;

        self.area.right += cols - 1;
        self.area.bottom += rows - 1;
        self.written.push(target);
        self.merges.invalidate();
        Ok(())
    }
}

/// Round `value` to `decimals` places the way its decimal text would read.
fn round_decimals(value: f64, decimals: usize) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{:.*}", decimals, value)
        .parse()
        .unwrap_or(value)
}

/// The document value a scalar is written as, or `None` when the scalar's
/// type does not match the format kind.
fn cell_value_for(scalar: &Scalar, format: &FormatSpec) -> Option<CellValue> {
    if !scalar.matches(format.kind) {
        return None;
    }
    Some(match scalar {
        Scalar::Str(s) => CellValue::Text(s.clone()),
        Scalar::Int(n) => CellValue::Int(*n),
        Scalar::Float(f) => {
            let decimals = format.stored_decimals().unwrap_or(DEFAULT_PRECISION);
            CellValue::Float(round_decimals(*f, decimals))
        }
    })
}

fn render_sheet<D: SheetDocument>(
    doc: &mut D,
    registry: &mut Registry,
    sheet: &str,
    stats: &mut RenderStats,
) -> Result<()> {
    let Some(area) = doc.dimension(sheet)? else {
        log::debug!("sheet {} is empty", sheet);
        return Ok(());
    };
    let mut pass = SheetPass {
        sheet,
        area,
        merges: MergeCache::new(),
        written: Vec::new(),
    };

    // Bounds are re-read every iteration: rendering a formula can grow them.
    let mut row = pass.area.top;
    while row <= pass.area.bottom {
        let mut col = pass.area.left;
        while col <= pass.area.right {
            let at = CellRef::new(col, row);
            col += 1;

            if pass.skip(doc, &at)? {
                continue;
            }
            let value = doc.cell_value(sheet, at)?;
            let Some(text) = value.as_text() else {
                continue;
            };
            let Some(formula) = parse_formula(text) else {
                continue;
            };

            log::debug!("{}!{}: {}", sheet, at, text);
            let grid = registry.calc_value(&formula)?;
            pass.apply(doc, at, &formula, &grid, stats)?;
            stats.formulas += 1;
        }
        row += 1;
    }
    Ok(())
}

/// Render every sheet of `doc` in order, in place.
///
/// The first evaluation error aborts the render; cells written before it are
/// kept.
pub fn render<D: SheetDocument>(doc: &mut D, registry: &mut Registry) -> Result<RenderStats> {
    let mut stats = RenderStats::default();
    for sheet in doc.sheet_names() {
        let before = stats.formulas;
        render_sheet(doc, registry, &sheet, &mut stats)?;
        stats.sheets += 1;
        log::info!(
            "rendered sheet {} ({} formulas)",
            sheet,
            stats.formulas - before
        );
    }
    Ok(stats)
}
