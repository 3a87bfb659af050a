//! Markdown export functionality

use crate::document::{CellValue, NumFormat, Sheet, Workbook};
use flowtable_engine::engine::CellRef;
use std::io::Write;
use std::path::Path;

/// Write every sheet of the workbook to a markdown file
pub fn write_markdown(path: &Path, book: &Workbook) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    for (i, sheet) in book.sheets().iter().enumerate() {
        if i > 0 {
            writeln!(file)?;
        }
        write_sheet(&mut file, sheet, book)?;
    }
    Ok(())
}

fn write_sheet<W: Write>(w: &mut W, sheet: &Sheet, book: &Workbook) -> std::io::Result<()> {
    writeln!(w, "# {}", sheet.name)?;
    writeln!(w)?;

    let Some(area) = sheet.dimension() else {
        writeln!(w, "*Empty sheet*")?;
        return Ok(());
    };

    // Write markdown table header with column letters
    write!(w, "|   |")?;
    for col in area.left..=area.right {
        write!(w, " {} |", CellRef::col_to_letters(col))?;
    }
    writeln!(w)?;

    // Write separator row
    write!(w, "|---|")?;
    for _ in area.left..=area.right {
        write!(w, "---|")?;
    }
    writeln!(w)?;

    for row in area.top..=area.bottom {
        write!(w, "| {} |", row + 1)?; // 1-based row numbers
        for col in area.left..=area.right {
            let display = cell_display(sheet, book, &CellRef::new(col, row));
            write!(w, " {} |", escape_markdown(&display))?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// Display text for a cell, honouring `0.00` / `0.0%` style number formats.
fn cell_display(sheet: &Sheet, book: &Workbook, at: &CellRef) -> String {
    let value = sheet.value(at);
    let CellValue::Float(n) = value else {
        return value.to_string();
    };
    if !n.is_finite() {
        return String::new();
    }
    let format = book
        .styles()
        .get(sheet.style_id(at).0)
        .map(|style| &style.num_format);
    match format {
        Some(NumFormat::Custom(text)) => {
            let decimals = text
                .split_once('.')
                .map(|(_, tail)| tail.chars().take_while(|c| *c == '0').count())
                .unwrap_or(0);
            if text.ends_with('%') {
                format!("{:.*}%", decimals, n * 100.0)
            } else {
                format!("{:.*}", decimals, n)
            }
        }
        _ => value.to_string(),
    }
}

/// Escape special markdown characters in cell content
fn escape_markdown(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ").replace('\r', "")
}
