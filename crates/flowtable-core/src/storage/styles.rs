//! Template cell styles, read straight from the package parts.
//!
//! calamine only exposes cell values, so the `cellXfs` table in
//! `xl/styles.xml` and the `s` attribute of every worksheet cell are parsed
//! here and turned into [`Style`] records.

use crate::document::{
    Alignment, Border, BorderLine, Font, HorizontalAlign, NumFormat, Protection, Style,
    VerticalAlign,
};
use crate::error::{FlowTableError, Result};
use flowtable_engine::engine::CellRef;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use zip::ZipArchive;
use zip::result::ZipError;

/// Styles found in a workbook package.
#[derive(Debug, Default)]
pub(crate) struct PackageStyles {
    /// One style per `cellXfs` entry, in index order.
    pub xfs: Vec<Style>,
    /// Styled cells of each sheet as `(cell, xf index)`.
    pub cells: HashMap<String, Vec<(CellRef, usize)>>,
}

pub(crate) fn read_package_styles(path: &Path) -> Result<PackageStyles> {
    let mut archive = ZipArchive::new(File::open(path)?)?;

    let xfs = match read_part(&mut archive, "xl/styles.xml")? {
        Some(xml) => parse_styles(&xml)?,
        None => Vec::new(),
    };

    let mut cells = HashMap::new();
    let (Some(workbook), Some(rels)) = (
        read_part(&mut archive, "xl/workbook.xml")?,
        read_part(&mut archive, "xl/_rels/workbook.xml.rels")?,
    ) else {
        return Ok(PackageStyles { xfs, cells });
    };
    let targets = parse_relationships(&rels)?;
    for (name, rel_id) in parse_sheet_list(&workbook)? {
        let Some(target) = targets.get(&rel_id) else {
            continue;
        };
        let part = match target.strip_prefix('/') {
            Some(absolute) => absolute.to_string(),
            None => format!("xl/{}", target),
        };
        if let Some(xml) = read_part(&mut archive, &part)? {
            cells.insert(name, parse_sheet_cells(&xml)?);
        }
    }
    Ok(PackageStyles { xfs, cells })
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut xml = String::new();
    file.read_to_string(&mut xml)?;
    Ok(Some(xml))
}

/// Attributes of an element keyed by local name, values unescaped.
fn attributes(e: &BytesStart<'_>) -> Result<HashMap<Vec<u8>, String>> {
    let mut map = HashMap::new();
    for attr in e.attributes() {
        let attr = attr?;
        map.insert(
            attr.key.local_name().as_ref().to_vec(),
            attr.unescape_value()?.into_owned(),
        );
    }
    Ok(map)
}

fn parse_xml_bool(val: &str) -> bool {
    let trimmed = val.trim();
    trimmed == "1" || trimmed.eq_ignore_ascii_case("true")
}

/// `FFRRGGBB` (or `RRGGBB`) to 0xRRGGBB.
fn parse_rgb(val: &str) -> Option<u32> {
    let hex = val.get(val.len().checked_sub(6)?..)?;
    u32::from_str_radix(hex, 16).ok()
}

fn border_line(style: &str) -> BorderLine {
    match style {
        "" | "none" => BorderLine::None,
        "medium" => BorderLine::Medium,
        "thick" => BorderLine::Thick,
        "double" => BorderLine::Double,
        "dotted" => BorderLine::Dotted,
        s if s.to_ascii_lowercase().contains("dash") => BorderLine::Dashed,
        _ => BorderLine::Thin,
    }
}

/// Format codes of the built-in number formats that have a plain numeric form.
fn builtin_format_code(id: u16) -> Option<&'static str> {
    Some(match id {
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        49 => "@",
        _ => return None,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
    None,
    NumFmts,
    Fonts,
    Fills,
    Borders,
    CellXfs,
    Other,
}

#[derive(Default)]
struct Xf {
    num_fmt: u16,
    font: usize,
    fill: usize,
    border: usize,
    alignment: Alignment,
    protection: Protection,
}

struct StylesParser {
    section: Section,
    num_fmts: HashMap<u16, String>,
    fonts: Vec<Font>,
    fills: Vec<Option<u32>>,
    borders: Vec<Border>,
    xfs: Vec<Xf>,
    font: Option<Font>,
    fill: Option<Option<u32>>,
    solid: bool,
    border: Option<Border>,
    xf: Option<Xf>,
}

impl StylesParser {
    fn new() -> Self {
        StylesParser {
            section: Section::None,
            num_fmts: HashMap::new(),
            fonts: Vec::new(),
            fills: Vec::new(),
            borders: Vec::new(),
            xfs: Vec::new(),
            font: None,
            fill: None,
            solid: false,
            border: None,
            xf: None,
        }
    }

    fn open(&mut self, e: &BytesStart<'_>) -> Result<()> {
        let name = e.local_name();
        let section = match name.as_ref() {
            b"numFmts" => Some(Section::NumFmts),
            b"fonts" => Some(Section::Fonts),
            b"fills" => Some(Section::Fills),
            b"borders" => Some(Section::Borders),
            b"cellXfs" => Some(Section::CellXfs),
            b"cellStyleXfs" | b"cellStyles" | b"dxfs" | b"tableStyles" | b"colors" => {
                Some(Section::Other)
            }
            _ => None,
        };
        if let Some(section) = section {
            self.section = section;
            return Ok(());
        }

        let attrs = attributes(e)?;
        let attr = |key: &[u8]| attrs.get(key).map(String::as_str);
        let index = |key: &[u8]| -> usize { attr(key).and_then(|v| v.parse().ok()).unwrap_or(0) };

        match (self.section, name.as_ref()) {
            (Section::NumFmts, b"numFmt") => {
                if let (Some(id), Some(code)) =
                    (attr(b"numFmtId").and_then(|v| v.parse().ok()), attr(b"formatCode"))
                {
                    self.num_fmts.insert(id, code.to_string());
                }
            }

            (Section::Fonts, b"font") => self.font = Some(Font::default()),
            (Section::Fonts, tag) => {
                if let Some(font) = self.font.as_mut() {
                    let on = attr(b"val").is_none_or(parse_xml_bool);
                    match tag {
                        b"b" => font.bold = on,
                        b"i" => font.italic = on,
                        b"sz" => font.size = attr(b"val").and_then(|v| v.parse().ok()),
                        b"name" => font.name = attr(b"val").map(str::to_string),
                        b"color" => font.color = attr(b"rgb").and_then(parse_rgb),
                        _ => {}
                    }
                }
            }

            (Section::Fills, b"fill") => self.fill = Some(None),
            (Section::Fills, b"patternFill") => {
                self.solid = attr(b"patternType") == Some("solid");
            }
            (Section::Fills, b"fgColor") => {
                if let Some(fill) = self.fill.as_mut().filter(|_| self.solid) {
                    *fill = attr(b"rgb").and_then(parse_rgb);
                }
            }

            (Section::Borders, b"border") => self.border = Some(Border::default()),
            (Section::Borders, tag) => {
                if let Some(border) = self.border.as_mut() {
                    let line = border_line(attr(b"style").unwrap_or_default());
                    match tag {
                        b"left" | b"start" => border.left = line,
                        b"right" | b"end" => border.right = line,
                        b"top" => border.top = line,
                        b"bottom" => border.bottom = line,
                        _ => {}
                    }
                }
            }

            (Section::CellXfs, b"xf") => {
                self.xf = Some(Xf {
                    num_fmt: u16::try_from(index(b"numFmtId")).unwrap_or(0),
                    font: index(b"fontId"),
                    fill: index(b"fillId"),
                    border: index(b"borderId"),
                    ..Xf::default()
                });
            }
            (Section::CellXfs, b"alignment") => {
                if let Some(xf) = self.xf.as_mut() {
                    xf.alignment.horizontal = match attr(b"horizontal") {
                        Some("left") => HorizontalAlign::Left,
                        Some("center") | Some("centerContinuous") => HorizontalAlign::Center,
                        Some("right") => HorizontalAlign::Right,
                        Some("fill") => HorizontalAlign::Fill,
                        Some("justify") | Some("distributed") => HorizontalAlign::Justify,
                        _ => HorizontalAlign::General,
                    };
                    xf.alignment.vertical = match attr(b"vertical") {
                        Some("top") => VerticalAlign::Top,
                        Some("center") => VerticalAlign::Center,
                        _ => VerticalAlign::Bottom,
                    };
                    xf.alignment.wrap = attr(b"wrapText").is_some_and(parse_xml_bool);
                }
            }
            (Section::CellXfs, b"protection") => {
                if let Some(xf) = self.xf.as_mut() {
                    xf.protection = Protection {
                        locked: attr(b"locked").is_none_or(parse_xml_bool),
                        hidden: attr(b"hidden").is_some_and(parse_xml_bool),
                    };
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        match (self.section, name) {
            (_, b"numFmts" | b"fonts" | b"fills" | b"borders" | b"cellXfs")
            | (_, b"cellStyleXfs" | b"cellStyles" | b"dxfs" | b"tableStyles" | b"colors") => {
                self.section = Section::None;
            }
            (Section::Fonts, b"font") => self.fonts.extend(self.font.take()),
            (Section::Fills, b"fill") => {
                self.fills.extend(self.fill.take());
                self.solid = false;
            }
            (Section::Borders, b"border") => self.borders.extend(self.border.take()),
            (Section::CellXfs, b"xf") => self.xfs.extend(self.xf.take()),
            _ => {}
        }
    }

    fn num_format(&self, id: u16) -> NumFormat {
        if let Some(code) = self.num_fmts.get(&id) {
            return NumFormat::from_format_str(code);
        }
        match (id, builtin_format_code(id)) {
            (0, _) => NumFormat::General,
            (_, Some(code)) => NumFormat::Custom(code.to_string()),
            (id, None) => NumFormat::Builtin(id),
        }
    }

    /// Resolve every `xf` into a style. Font name and size equal to the
    /// workbook's default font are left unset.
    fn finish(self) -> Vec<Style> {
        let default_font = self.fonts.first().cloned().unwrap_or_default();
        self.xfs
            .iter()
            .map(|xf| {
                let mut font = self.fonts.get(xf.font).cloned().unwrap_or_default();
                if font.name == default_font.name {
                    font.name = None;
                }
                if font.size == default_font.size {
                    font.size = None;
                }
                Style {
                    font,
                    fill: self.fills.get(xf.fill).copied().flatten(),
                    border: self.borders.get(xf.border).copied().unwrap_or_default(),
                    alignment: xf.alignment,
                    protection: xf.protection,
                    decimal_places: None,
                    num_format: self.num_format(xf.num_fmt),
                }
            })
            .collect()
    }
}

fn parse_styles(xml: &str) -> Result<Vec<Style>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut parser = StylesParser::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => parser.open(&e)?,
            Event::Empty(e) => {
                parser.open(&e)?;
                parser.close(e.local_name().as_ref());
            }
            Event::End(e) => parser.close(e.local_name().as_ref()),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(parser.finish())
}

/// Collect `(attribute, attribute)` pairs from every element called `tag`.
fn collect_pairs(xml: &str, tag: &[u8], first: &[u8], second: &[u8]) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut pairs = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == tag => {
                let mut attrs = attributes(&e)?;
                if let (Some(a), Some(b)) = (attrs.remove(first), attrs.remove(second)) {
                    pairs.push((a, b));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(pairs)
}

/// `(sheet name, relationship id)` in workbook order.
fn parse_sheet_list(xml: &str) -> Result<Vec<(String, String)>> {
    collect_pairs(xml, b"sheet", b"name", b"id")
}

fn parse_relationships(xml: &str) -> Result<HashMap<String, String>> {
    Ok(collect_pairs(xml, b"Relationship", b"Id", b"Target")?
        .into_iter()
        .collect())
}

fn parse_sheet_cells(xml: &str) -> Result<Vec<(CellRef, usize)>> {
    collect_pairs(xml, b"c", b"r", b"s")?
        .into_iter()
        .map(|(r, s)| -> Result<(CellRef, usize)> {
            let at = CellRef::from_str(&r).ok_or_else(|| FlowTableError::InvalidRange(r.clone()))?;
            let xf = s.parse().map_err(|_| FlowTableError::InvalidRange(format!("{}: s={}", r, s)))?;
            Ok((at, xf))
        })
        .collect()
}
