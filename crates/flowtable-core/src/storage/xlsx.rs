//! XLSX import (calamine) and export (rust_xlsxwriter).

use super::styles::read_package_styles;
use crate::document::{
    BorderLine, CellValue, HorizontalAlign, NumFormat, SheetDocument, Style, StyleId,
    VerticalAlign, Workbook,
};
use crate::error::{FlowTableError, Result};
use calamine::{Data, Reader, Xlsx, open_workbook};
use flowtable_engine::engine::{Area, CellRef};
use rust_xlsxwriter::{
    Color, Format, FormatAlign, FormatBorder, FormatPattern, Workbook as XlsxWorkbook,
};
use std::path::Path;

/// Load a workbook: every sheet's values, native formulas, merged regions and
/// cell styles.
pub fn read_xlsx(path: &Path) -> Result<Workbook> {
    let mut source: Xlsx<_> = open_workbook(path)?;
    source.load_merged_regions()?;
    let package = read_package_styles(path)?;

    let mut book = Workbook::new();
    let style_ids: Vec<StyleId> = package
        .xfs
        .into_iter()
        .map(|style| book.add_style(style))
        .collect();

    for name in source.sheet_names() {
        let range = source.worksheet_range(&name)?;
        let formulas = source.worksheet_formula(&name)?;
        let sheet = book.add_sheet(&name);

        let (top, left) = range.start().unwrap_or((0, 0));
        for (r, c, data) in range.used_cells() {
            let value = match data {
                Data::Empty => continue,
                Data::String(s) => CellValue::Text(s.clone()),
                Data::Float(f) => CellValue::Float(*f),
                Data::Int(i) => CellValue::Int(*i),
                Data::Bool(b) => CellValue::Bool(*b),
                Data::DateTime(dt) => CellValue::Float(dt.as_f64()),
                Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
                Data::Error(e) => CellValue::Text(e.to_string()),
            };
            let at = CellRef::new(left as usize + c, top as usize + r);
            sheet.set_value(at, value);
        }

        let (top, left) = formulas.start().unwrap_or((0, 0));
        for (r, c, text) in formulas.used_cells() {
            if text.is_empty() {
                continue;
            }
            let at = CellRef::new(left as usize + c, top as usize + r);
            let text = text.strip_prefix('=').unwrap_or(text);
            sheet.set_value(at, CellValue::Formula(text.to_string()));
        }

        for (at, xf) in package.cells.get(&name).into_iter().flatten() {
            if let Some(id) = style_ids.get(*xf).filter(|id| id.0 != 0) {
                sheet.grid.entry(*at).or_default().style = *id;
            }
        }

        for (_, _, dims) in source.merged_regions_by_sheet(&name) {
            sheet.merge(Area::new(
                dims.start.1 as usize,
                dims.start.0 as usize,
                dims.end.1 as usize,
                dims.end.0 as usize,
            ));
        }
        log::debug!(
            "read sheet {} ({} cells, {} merges)",
            name,
            sheet.grid.len(),
            sheet.merges.len()
        );
    }
    Ok(book)
}

fn border_line(line: BorderLine) -> FormatBorder {
    match line {
        BorderLine::None => FormatBorder::None,
        BorderLine::Thin => FormatBorder::Thin,
        BorderLine::Medium => FormatBorder::Medium,
        BorderLine::Thick => FormatBorder::Thick,
        BorderLine::Dashed => FormatBorder::Dashed,
        BorderLine::Dotted => FormatBorder::Dotted,
        BorderLine::Double => FormatBorder::Double,
    }
}

fn convert_style_to_format(style: &Style) -> Format {
    let mut format = Format::new();

    if style.font.bold {
        format = format.set_bold();
    }
    if style.font.italic {
        format = format.set_italic();
    }
    if let Some(name) = &style.font.name {
        format = format.set_font_name(name);
    }
    if let Some(size) = style.font.size {
        format = format.set_font_size(size);
    }
    if let Some(color) = style.font.color {
        format = format.set_font_color(Color::RGB(color));
    }
    if let Some(fill) = style.fill {
        format = format
            .set_pattern(FormatPattern::Solid)
            .set_background_color(Color::RGB(fill));
    }

    let border = &style.border;
    format = format
        .set_border_left(border_line(border.left))
        .set_border_right(border_line(border.right))
        .set_border_top(border_line(border.top))
        .set_border_bottom(border_line(border.bottom));

    format = match style.alignment.horizontal {
        HorizontalAlign::General => format,
        HorizontalAlign::Left => format.set_align(FormatAlign::Left),
        HorizontalAlign::Center => format.set_align(FormatAlign::Center),
        HorizontalAlign::Right => format.set_align(FormatAlign::Right),
        HorizontalAlign::Fill => format.set_align(FormatAlign::Fill),
        HorizontalAlign::Justify => format.set_align(FormatAlign::Justify),
    };
    format = match style.alignment.vertical {
        VerticalAlign::Bottom => format,
        VerticalAlign::Center => format.set_align(FormatAlign::VerticalCenter),
        VerticalAlign::Top => format.set_align(FormatAlign::Top),
    };
    if style.alignment.wrap {
        format = format.set_text_wrap();
    }

    if !style.protection.locked {
        format = format.set_unlocked();
    }
    if style.protection.hidden {
        format = format.set_hidden();
    }

    match &style.num_format {
        NumFormat::Custom(text) => format = format.set_num_format(text),
        NumFormat::Builtin(index) => {
            if let Ok(index) = u8::try_from(*index) {
                format = format.set_num_format_index(index);
            }
        }
        NumFormat::General => {
            if let Some(places) = style.decimal_places.filter(|p| *p > 0) {
                format = format.set_num_format(format!("0.{}", "0".repeat(places as usize)));
            }
        }
    }

    format
}

/// Row and column of `at` in the writer's coordinate types.
fn xlsx_coords(at: CellRef) -> Result<(u32, u16)> {
    match (u32::try_from(at.row), u16::try_from(at.col)) {
        (Ok(row), Ok(col)) => Ok((row, col)),
        _ => Err(FlowTableError::InvalidRange(at.to_string())),
    }
}

/// Save `book` as an XLSX file.
///
/// Merged regions are written before cell values so a merge's top-left value
/// survives. Non-finite floats are written as blank, styled cells.
pub fn write_xlsx(book: &Workbook, path: &Path) -> Result<()> {
    let mut xlsx = XlsxWorkbook::new();
    let formats: Vec<Format> = book.styles().iter().map(convert_style_to_format).collect();

    for sheet in book.sheets() {
        let worksheet = xlsx.add_worksheet();
        worksheet.set_name(&sheet.name)?;

        for merge in &sheet.merges {
            if merge.width() == 1 && merge.height() == 1 {
                continue;
            }
            let style = sheet.style_id(&merge.top_left());
            let format = formats.get(style.0).cloned().unwrap_or_default();
            let (top, left) = xlsx_coords(merge.top_left())?;
            let (bottom, right) = xlsx_coords(merge.bottom_right())?;
            worksheet.merge_range(top, left, bottom, right, "", &format)?;
        }

        let mut cells: Vec<_> = sheet
            .grid
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        cells.sort_by_key(|(at, _)| *at);

        for (at, cell) in cells {
            let (row, col) = xlsx_coords(at)?;
            let format = formats.get(cell.style.0).cloned().unwrap_or_default();
            match &cell.value {
                CellValue::Empty => {
                    if cell.style.0 != 0 {
                        worksheet.write_blank(row, col, &format)?;
                    }
                }
                CellValue::Text(s) => {
                    worksheet.write_string_with_format(row, col, s, &format)?;
                }
                CellValue::Int(n) => {
                    worksheet.write_number_with_format(row, col, *n as f64, &format)?;
                }
                CellValue::Float(f) if f.is_finite() => {
                    worksheet.write_number_with_format(row, col, *f, &format)?;
                }
                CellValue::Float(_) => {
                    worksheet.write_blank(row, col, &format)?;
                }
                CellValue::Bool(b) => {
                    worksheet.write_boolean_with_format(row, col, *b, &format)?;
                }
                CellValue::Formula(text) => {
                    worksheet.write_formula_with_format(row, col, text.as_str(), &format)?;
                }
            }
        }
    }

    xlsx.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Font, SheetDocument};
    use pretty_assertions::assert_eq;

    fn at(a1: &str) -> CellRef {
        CellRef::from_str(a1).unwrap()
    }

    #[test]
    fn test_write_then_read_keeps_values_and_merges() {
        let mut book = Workbook::new();
        let sheet = book.add_sheet("Report");
        sheet.set_value(at("A1"), CellValue::Text("title".into()));
        sheet.set_value(at("B2"), CellValue::Float(1.25));
        sheet.set_value(at("C2"), CellValue::Bool(true));
        sheet.set_value(at("D3"), CellValue::Formula("B2*2".into()));
        sheet.set_value(at("E3"), CellValue::Float(f64::NAN));
        sheet.merge(Area::from_range("A1:C1").unwrap());
        let bold = book.add_style(Style {
            font: Font {
                bold: true,
                ..Font::default()
            },
            ..Style::default()
        });
        book.set_style("Report", Area::from_range("B2:C2").unwrap(), bold)
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        write_xlsx(&book, &path).unwrap();

        let loaded = read_xlsx(&path).unwrap();
        assert_eq!(loaded.sheet_names(), vec!["Report".to_string()]);
        let value = |a1: &str| loaded.cell_value("Report", at(a1)).unwrap();
        assert_eq!(value("A1"), CellValue::Text("title".into()));
        assert_eq!(value("B2"), CellValue::Float(1.25));
        assert_eq!(value("C2"), CellValue::Bool(true));
        assert_eq!(value("D3"), CellValue::Formula("B2*2".into()));
        assert!(matches!(value("E3"), CellValue::Empty));
        assert_eq!(
            loaded.merge_areas("Report").unwrap(),
            vec![Area::from_range("A1:C1").unwrap()]
        );

        let style = |a1: &str| {
            loaded
                .style(loaded.cell_style("Report", at(a1)).unwrap())
                .unwrap()
        };
        assert!(style("B2").font.bold);
        assert!(style("C2").font.bold);
        assert_eq!(loaded.cell_style("Report", at("A1")).unwrap(), StyleId(0));
    }

    #[test]
    fn test_template_styles_survive_render() {
        use rust_xlsxwriter::FormatBorder;

        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.xlsx");
        let mut source = XlsxWorkbook::new();
        let sheet = source.add_worksheet();
        let highlight = Format::new()
            .set_bold()
            .set_background_color(Color::RGB(0xFFFF00));
        let note = Format::new().set_italic().set_border(FormatBorder::Thin);
        sheet
            .write_string_with_format(0, 0, "{{H(.2f)|[rhai][1.5, 2.25]}}", &highlight)
            .unwrap();
        sheet.write_string_with_format(1, 1, "note", &note).unwrap();
        source.save(&template).unwrap();

        let mut book = read_xlsx(&template).unwrap();
        let mut registry = flowtable_engine::engine::Registry::with_default_backends().unwrap();
        crate::render(&mut book, &mut registry).unwrap();
        let output = dir.path().join("output.xlsx");
        write_xlsx(&book, &output).unwrap();

        let rendered = read_xlsx(&output).unwrap();
        let style = |a1: &str| {
            rendered
                .style(rendered.cell_style("Sheet1", at(a1)).unwrap())
                .unwrap()
        };
        for a1 in ["A1", "B1"] {
            let style = style(a1);
            assert!(style.font.bold, "{a1}");
            assert_eq!(style.fill, Some(0xFFFF00), "{a1}");
            assert_eq!(style.num_format, NumFormat::Custom("0.00".into()), "{a1}");
        }
        assert_eq!(
            rendered.cell_value("Sheet1", at("B1")).unwrap(),
            CellValue::Float(2.25)
        );

        let moved = style("C2");
        assert!(moved.font.italic);
        assert_eq!(moved.border.left, BorderLine::Thin);
        assert_eq!(moved.num_format, NumFormat::General);
        assert_eq!(
            rendered.cell_value("Sheet1", at("C2")).unwrap(),
            CellValue::Text("note".into())
        );
    }

    #[test]
    fn test_write_rejects_columns_beyond_writer_range() {
        let mut book = Workbook::new();
        book.add_sheet("Wide")
            .set_value(CellRef::new(70_000, 0), CellValue::Int(1));
        let dir = tempfile::tempdir().unwrap();
        let err = write_xlsx(&book, &dir.path().join("wide.xlsx")).unwrap_err();
        assert!(matches!(err, FlowTableError::InvalidRange(_)));
    }

    #[test]
    fn test_read_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_xlsx(&dir.path().join("missing.xlsx")).is_err());
    }
}
