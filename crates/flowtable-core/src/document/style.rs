//! Cell style records.
//!
//! Styles are stored once per workbook and referenced from cells by
//! [`StyleId`]. Id 0 is always the default style.

/// Index into a workbook's style table.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct StyleId(pub usize);

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Font {
    pub bold: bool,
    pub italic: bool,
    pub name: Option<String>,
    pub size: Option<f64>,
    /// 0xRRGGBB
    pub color: Option<u32>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BorderLine {
    #[default]
    None,
    Thin,
    Medium,
    Thick,
    Dashed,
    Dotted,
    Double,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Border {
    pub left: BorderLine,
    pub right: BorderLine,
    pub top: BorderLine,
    pub bottom: BorderLine,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HorizontalAlign {
    #[default]
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VerticalAlign {
    #[default]
    Bottom,
    Center,
    Top,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Alignment {
    pub horizontal: HorizontalAlign,
    pub vertical: VerticalAlign,
    pub wrap: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Protection {
    pub locked: bool,
    pub hidden: bool,
}

impl Default for Protection {
    fn default() -> Self {
        // Spreadsheet cells are locked unless a style says otherwise.
        Protection {
            locked: true,
            hidden: false,
        }
    }
}

/// How a cell's number is displayed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum NumFormat {
    #[default]
    General,
    /// One of the spreadsheet's built-in format indices.
    Builtin(u16),
    Custom(String),
}

impl NumFormat {
    /// `General` for the literal "General", otherwise a custom format string.
    pub fn from_format_str(format: &str) -> NumFormat {
        if format.eq_ignore_ascii_case("general") {
            NumFormat::General
        } else {
            NumFormat::Custom(format.to_string())
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Style {
    pub font: Font,
    /// Solid background colour, 0xRRGGBB.
    pub fill: Option<u32>,
    pub border: Border,
    pub alignment: Alignment,
    pub protection: Protection,
    pub decimal_places: Option<u8>,
    pub num_format: NumFormat,
}

impl Style {
    /// A copy of this style showing numbers with `format`.
    ///
    /// Font, fill, border, alignment, protection and decimal places carry
    /// over; only the number format changes.
    pub fn with_display_format(&self, format: &str) -> Style {
        Style {
            num_format: NumFormat::from_format_str(format),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_display_format_keeps_appearance() {
        let source = Style {
            font: Font {
                bold: true,
                color: Some(0xFF0000),
                ..Font::default()
            },
            fill: Some(0x00FF00),
            border: Border {
                bottom: BorderLine::Double,
                ..Border::default()
            },
            decimal_places: Some(3),
            num_format: NumFormat::Builtin(14),
            ..Style::default()
        };

        let styled = source.with_display_format("0.00%");
        assert_eq!(styled.num_format, NumFormat::Custom("0.00%".to_string()));
        assert_eq!(styled.font, source.font);
        assert_eq!(styled.fill, source.fill);
        assert_eq!(styled.border, source.border);
        assert_eq!(styled.decimal_places, Some(3));

        assert_eq!(source.with_display_format("General").num_format, NumFormat::General);
    }

    #[test]
    fn test_default_protection_is_locked() {
        assert!(Style::default().protection.locked);
        assert!(!Style::default().protection.hidden);
    }
}
