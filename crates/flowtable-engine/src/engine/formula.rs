//! Template formula parsing.
//!
//! A template cell is rendered only when its whole text has the shape
//!
//! ```text
//! {{ [DIRECTION [(FORMATSPEC)] |] EXPRESSION }}
//! ```
//!
//! - `DIRECTION` is one of `C` (cell), `H` (horizontal), `V` (vertical) or
//!   `T` (table) and defaults to `C`.
//! - `FORMATSPEC` is `s`, `d`/`<N>d`, `f`/`.<N>f` or `p`/`.<N>p`.
//! - `EXPRESSION` is raw backend code, starting with a `[lang]` tag.
//!
//! Anything else is ordinary text and is left alone.

use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Decimal places used when a format spec leaves the precision out.
pub const DEFAULT_PRECISION: usize = 2;

/// Largest precision a format spec may ask for.
pub const MAX_PRECISION: i32 = 30;

/// Expected shape of a formula result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// A single value written into the formula cell.
    Cell,
    /// A vector laid out to the right of the formula cell.
    Horizontal,
    /// A vector laid out below the formula cell.
    Vertical,
    /// A nested sequence, one inner sequence per row.
    Table,
}

impl Direction {
    fn from_tag(tag: &str) -> Option<Direction> {
        match tag {
            "C" => Some(Direction::Cell),
            "H" => Some(Direction::Horizontal),
            "V" => Some(Direction::Vertical),
            "T" => Some(Direction::Table),
            _ => None,
        }
    }

    /// Extraction depth: 0 for cells, 1 for vectors, 2 for tables.
    pub fn level(&self) -> u8 {
        match self {
            Direction::Cell => 0,
            Direction::Horizontal | Direction::Vertical => 1,
            Direction::Table => 2,
        }
    }
}

/// Target scalar type of every rendered cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatKind {
    String,
    Int,
    Float,
    Percent,
}

/// A parsed format spec: scalar kind plus precision (`-1` when unspecified).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatSpec {
    pub kind: FormatKind,
    pub precision: i32,
}

/// The format spec inside `(...)` did not match the format grammar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid format spec `{0}`")]
pub struct FormatParseError(pub String);

impl FormatSpec {
    pub fn new(kind: FormatKind, precision: i32) -> Self {
        FormatSpec { kind, precision }
    }

    /// Precision with `-1` resolved to [`DEFAULT_PRECISION`].
    pub fn resolved_precision(&self) -> usize {
        usize::try_from(self.precision).unwrap_or(DEFAULT_PRECISION)
    }

    /// Decimal places a numeric value is rounded to before it is stored.
    ///
    /// Percent values are stored as fractions, so a non-zero precision keeps
    /// two more places than are displayed. `.0p` stores whole fractions.
    pub fn stored_decimals(&self) -> Option<usize> {
        match self.kind {
            FormatKind::Float => Some(self.resolved_precision()),
            FormatKind::Percent => match self.resolved_precision() {
                0 => Some(0),
                precision => Some(precision + 2),
            },
            FormatKind::String | FormatKind::Int => None,
        }
    }

    /// Custom number format string for cells rendered with this spec.
    pub fn display_format(&self) -> String {
        let decimals = |precision: usize| {
            if precision == 0 {
                "0".to_string()
            } else {
                format!("0.{}", "0".repeat(precision))
            }
        };
        match self.kind {
            FormatKind::Percent => format!("{}%", decimals(self.resolved_precision())),
            FormatKind::Float => decimals(self.resolved_precision()),
            FormatKind::String | FormatKind::Int => "General".to_string(),
        }
    }
}

impl Default for FormatSpec {
    fn default() -> Self {
        FormatSpec::new(FormatKind::String, -1)
    }
}

fn format_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(?<string>s)|(?<int>\d*)d|(?:\.(?<prec>\d+))?(?<real>[fp]))$")
            .expect("valid format spec regex")
    })
}

impl FromStr for FormatSpec {
    type Err = FormatParseError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let invalid = || FormatParseError(spec.to_string());
        let caps = format_re().captures(spec).ok_or_else(invalid)?;

        let precision = |digits: Option<regex::Match<'_>>| -> Result<i32, FormatParseError> {
            match digits.map(|m| m.as_str()).filter(|d| !d.is_empty()) {
                Some(d) => d
                    .parse::<i32>()
                    .ok()
                    .filter(|p| *p <= MAX_PRECISION)
                    .ok_or_else(invalid),
                None => Ok(-1),
            }
        };

        if caps.name("string").is_some() {
            return Ok(FormatSpec::new(FormatKind::String, -1));
        }
        if let Some(real) = caps.name("real") {
            let kind = if real.as_str() == "p" {
                FormatKind::Percent
            } else {
                FormatKind::Float
            };
            return Ok(FormatSpec::new(kind, precision(caps.name("prec"))?));
        }
        Ok(FormatSpec::new(FormatKind::Int, precision(caps.name("int"))?))
    }
}

impl fmt::Display for FormatSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = |prefix: &str| {
            if self.precision < 0 {
                String::new()
            } else {
                format!("{}{}", prefix, self.precision)
            }
        };
        match self.kind {
            FormatKind::String => write!(f, "s"),
            FormatKind::Int => write!(f, "{}d", digits("")),
            FormatKind::Float => write!(f, "{}f", digits(".")),
            FormatKind::Percent => write!(f, "{}p", digits(".")),
        }
    }
}

/// A template formula found in a cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Formula {
    pub direction: Direction,
    pub format: FormatSpec,
    /// Backend code including its `[lang]` tag.
    pub code: String,
}

fn formula_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)^\{\{(?:(?<direct>[CHVT])(?:\((?<format>[^)]*)\))?\|)?(?<exp>.+)\}\}$")
            .expect("valid formula regex")
    })
}

impl Formula {
    /// Parse cell text into a formula.
    ///
    /// Returns `None` for ordinary text, including text whose outer shape
    /// matches but whose format spec is malformed.
    pub fn parse(text: &str) -> Option<Formula> {
        let caps = formula_re().captures(text)?;

        let direction = caps
            .name("direct")
            .and_then(|m| Direction::from_tag(m.as_str()))
            .unwrap_or(Direction::Cell);

        let format = match caps.name("format") {
            Some(raw) => match raw.as_str().parse::<FormatSpec>() {
                Ok(format) => format,
                Err(err) => {
                    log::debug!("skipping {:?}: {}", text, err);
                    return None;
                }
            },
            None => FormatSpec::default(),
        };

        Some(Formula {
            direction,
            format,
            code: caps["exp"].to_string(),
        })
    }
}

/// Parse cell text into a formula. See [`Formula::parse`].
pub fn parse_formula(text: &str) -> Option<Formula> {
    Formula::parse(text)
}
