use super::SheetDocument;
use super::state::{Cell, CellValue, Sheet, Workbook};
use super::style::{Style, StyleId};
use crate::error::{FlowTableError, Result};
use flowtable_engine::engine::{Area, CellRef, Dimension};
use regex::{Captures, Regex};
use std::sync::OnceLock;

fn ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?<col_abs>\$?)(?<col>[A-Za-z]{1,3})(?<row_abs>\$?)(?<row>[0-9]+)")
            .expect("valid cell reference regex")
    })
}

/// Shift the cell references in a native formula for `count` rows/columns
/// inserted before index `at`.
///
/// Only unqualified references outside string literals move; `Sheet2!A1`,
/// function names such as `LOG10(` and text in quotes are left alone.
pub fn shift_formula_references(formula: &str, dim: Dimension, at: usize, count: usize) -> String {
    let mut out = String::with_capacity(formula.len());
    for (i, segment) in formula.split('"').enumerate() {
        if i > 0 {
            out.push('"');
        }
        if i % 2 == 0 {
            out.push_str(&shift_segment(segment, dim, at, count));
        } else {
            out.push_str(segment);
        }
    }
    out
}

fn shift_segment(segment: &str, dim: Dimension, at: usize, count: usize) -> String {
    let bytes = segment.as_bytes();
    ref_re()
        .replace_all(segment, |caps: &Captures| {
            let original = caps[0].to_string();
            let (start, end) = caps
                .get(0)
                .map(|m| (m.start(), m.end()))
                .unwrap_or_default();
            let glued_before = start > 0 && {
                let b = bytes[start - 1];
                b.is_ascii_alphanumeric() || matches!(b, b'!' | b'.' | b'_' | b'$')
            };
            let glued_after = end < bytes.len()
                && (bytes[end].is_ascii_alphanumeric() || matches!(bytes[end], b'_' | b'('));
            if glued_before || glued_after {
                return original;
            }

            let a1 = format!("{}{}", &caps["col"], &caps["row"]);
            let Some(cell_ref) = CellRef::from_str(&a1) else {
                return original;
            };
            let coord = dim.get_coord(&cell_ref);
            if coord < at {
                return original;
            }
            let moved = dim.new_cell_ref(&cell_ref, coord + count);
            format!(
                "{}{}{}{}",
                &caps["col_abs"],
                CellRef::col_to_letters(moved.col),
                &caps["row_abs"],
                moved.row + 1
            )
        })
        .into_owned()
}

impl Sheet {
    /// Generic insert operation for rows or columns
    pub(crate) fn insert_dimension(&mut self, dim: Dimension, at: usize, count: usize) {
        if count == 0 {
            return;
        }

        // Collect all cells at coord >= at
        let cells_to_move: Vec<(CellRef, Cell)> = self
            .grid
            .iter()
            .filter(|entry| dim.get_coord(entry.key()) >= at)
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        for (cell_ref, _) in &cells_to_move {
            self.grid.remove(cell_ref);
        }

        // Update native formulas that stay in place
        for mut entry in self.grid.iter_mut() {
            if let CellValue::Formula(text) = &entry.value {
                let shifted = shift_formula_references(text, dim, at, count);
                entry.value = CellValue::Formula(shifted);
            }
        }

        // Reinsert moved cells with coord + count, also shifting their formulas
        for (cell_ref, mut cell) in cells_to_move {
            if let CellValue::Formula(text) = &cell.value {
                cell.value = CellValue::Formula(shift_formula_references(text, dim, at, count));
            }
            let coord = dim.get_coord(&cell_ref);
            self.grid.insert(dim.new_cell_ref(&cell_ref, coord + count), cell);
        }

        for merge in &mut self.merges {
            merge.shift_for_insert(dim, at, count);
        }
    }
}

impl SheetDocument for Workbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn dimension(&self, sheet: &str) -> Result<Option<Area>> {
        Ok(self.sheet(sheet)?.dimension())
    }

    fn cell_value(&self, sheet: &str, at: CellRef) -> Result<CellValue> {
        Ok(self.sheet(sheet)?.value(&at))
    }

    fn set_cell_value(&mut self, sheet: &str, at: CellRef, value: CellValue) -> Result<()> {
        self.sheet_mut(sheet)?.set_value(at, value);
        Ok(())
    }

    fn insert_rows(&mut self, sheet: &str, at: usize, count: usize) -> Result<()> {
        self.sheet_mut(sheet)?
            .insert_dimension(Dimension::Row, at, count);
        Ok(())
    }

    fn insert_cols(&mut self, sheet: &str, at: usize, count: usize) -> Result<()> {
        self.sheet_mut(sheet)?
            .insert_dimension(Dimension::Column, at, count);
        Ok(())
    }

    fn merge_areas(&self, sheet: &str) -> Result<Vec<Area>> {
        Ok(self.sheet(sheet)?.merges.clone())
    }

    fn cell_style(&self, sheet: &str, at: CellRef) -> Result<StyleId> {
        Ok(self.sheet(sheet)?.style_id(&at))
    }

    fn style(&self, id: StyleId) -> Result<Style> {
        self.styles
            .get(id.0)
            .cloned()
            .ok_or(FlowTableError::UnknownStyle(id.0))
    }

    fn add_style(&mut self, style: Style) -> StyleId {
        // Identical records share one id.
        if let Some(index) = self.styles.iter().position(|s| *s == style) {
            return StyleId(index);
        }
        self.styles.push(style);
        StyleId(self.styles.len() - 1)
    }

    fn set_style(&mut self, sheet: &str, area: Area, id: StyleId) -> Result<()> {
        if id.0 >= self.styles.len() {
            return Err(FlowTableError::UnknownStyle(id.0));
        }
        let sheet = self.sheet_mut(sheet)?;
        for row in area.top..=area.bottom {
            for col in area.left..=area.right {
                sheet.grid.entry(CellRef::new(col, row)).or_default().style = id;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn at(a1: &str) -> CellRef {
        CellRef::from_str(a1).unwrap()
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn sample() -> Workbook {
        let mut book = Workbook::new();
        let sheet = book.add_sheet("Sheet1");
        sheet.set_value(at("A1"), text("top"));
        sheet.set_value(at("A2"), text("middle"));
        sheet.set_value(at("B3"), CellValue::Int(3));
        sheet.merge(Area::from_range("C1:C3").unwrap());
        sheet.merge(Area::from_range("A5:B5").unwrap());
        book
    }

    #[test]
    fn test_insert_rows_shifts_cells_and_merges() {
        let mut book = sample();
        book.insert_rows("Sheet1", 1, 2).unwrap();

        assert_eq!(book.cell_value("Sheet1", at("A1")).unwrap(), text("top"));
        assert_eq!(book.cell_value("Sheet1", at("A2")).unwrap(), CellValue::Empty);
        assert_eq!(book.cell_value("Sheet1", at("A4")).unwrap(), text("middle"));
        assert_eq!(book.cell_value("Sheet1", at("B5")).unwrap(), CellValue::Int(3));

        assert_eq!(
            book.merge_areas("Sheet1").unwrap(),
            vec![
                // Straddles the insertion point: grows.
                Area::from_range("C1:C5").unwrap(),
                // Below it: moves.
                Area::from_range("A7:B7").unwrap(),
            ]
        );
    }

    #[test]
    fn test_insert_cols_shifts_cells_and_merges() {
        let mut book = sample();
        book.insert_cols("Sheet1", 1, 1).unwrap();

        assert_eq!(book.cell_value("Sheet1", at("A1")).unwrap(), text("top"));
        assert_eq!(book.cell_value("Sheet1", at("C3")).unwrap(), CellValue::Int(3));
        assert_eq!(
            book.merge_areas("Sheet1").unwrap(),
            vec![
                Area::from_range("D1:D3").unwrap(),
                Area::from_range("A5:C5").unwrap(),
            ]
        );
    }

    #[test]
    fn test_insert_rows_keeps_styles_with_cells() {
        let mut book = sample();
        let bold = book.add_style(Style {
            font: crate::document::Font {
                bold: true,
                ..Default::default()
            },
            ..Style::default()
        });
        book.set_style("Sheet1", Area::cell(at("A2")), bold).unwrap();
        book.insert_rows("Sheet1", 0, 1).unwrap();
        assert_eq!(book.cell_style("Sheet1", at("A3")).unwrap(), bold);
        assert_eq!(book.cell_style("Sheet1", at("A2")).unwrap(), StyleId(0));
    }

    #[test]
    fn test_native_formulas_follow_insertions() {
        let mut book = Workbook::new();
        let sheet = book.add_sheet("S");
        sheet.set_value(at("A1"), CellValue::Formula("SUM(A2:A4)".to_string()));
        sheet.set_value(at("A5"), CellValue::Formula("A1*$B$2".to_string()));
        book.insert_rows("S", 2, 3).unwrap();

        assert_eq!(
            book.cell_value("S", at("A1")).unwrap(),
            CellValue::Formula("SUM(A2:A7)".to_string())
        );
        assert_eq!(
            book.cell_value("S", at("A8")).unwrap(),
            CellValue::Formula("A1*$B$2".to_string())
        );
    }

    #[test]
    fn test_shift_formula_references_leaves_text_alone() {
        assert_eq!(
            shift_formula_references(r#"IF(B2>0,"B2",LOG10(B2))"#, Dimension::Column, 1, 2),
            r#"IF(D2>0,"B2",LOG10(D2))"#
        );
        assert_eq!(
            shift_formula_references("Other!C3+C3", Dimension::Row, 0, 1),
            "Other!C3+C4"
        );
    }

    #[test]
    fn test_add_style_deduplicates() {
        let mut book = Workbook::new();
        assert_eq!(book.add_style(Style::default()), StyleId(0));
        let custom = Style::default().with_display_format("0.00");
        let first = book.add_style(custom.clone());
        let second = book.add_style(custom);
        assert_eq!(first, second);
        assert_eq!(book.styles().len(), 2);
    }

    #[test]
    fn test_set_style_covers_blank_cells() {
        let mut book = sample();
        let id = book.add_style(Style::default().with_display_format("0%"));
        book.set_style("Sheet1", Area::from_range("D1:E2").unwrap(), id)
            .unwrap();
        assert_eq!(book.cell_style("Sheet1", at("E2")).unwrap(), id);
        assert_eq!(book.cell_value("Sheet1", at("E2")).unwrap(), CellValue::Empty);
        assert!(matches!(
            book.set_style("Sheet1", Area::cell(at("A1")), StyleId(99)),
            Err(FlowTableError::UnknownStyle(99))
        ));
    }

    #[test]
    fn test_unknown_sheet() {
        let book = sample();
        assert!(matches!(
            book.cell_value("Nope", at("A1")),
            Err(FlowTableError::UnknownSheet(ref name)) if name == "Nope"
        ));
    }
}
