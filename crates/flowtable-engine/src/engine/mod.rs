//! Template formula engine API.
//!
//! This module provides everything between a template cell's text and a grid
//! of typed values:
//!
//! - [`Formula`], [`Direction`], [`FormatSpec`] - Parsing `{{ ... }}` cell formulas
//! - [`CellRef`], [`Area`] - Cell reference parsing (A1 notation ↔ row/col indices)
//! - [`Registry`], [`Backend`] - Language tags, aliases and backend dispatch
//! - [`BackendValue`], [`extract`], [`shape`] - Turning backend values into grids

mod cell_ref;
mod extract;
mod formula;
mod registry;

pub use cell_ref::{Area, CellRef, Dimension};
pub use extract::{BackendValue, Extracted, Number, RenderedGrid, Scalar, extract, shape};
pub use formula::{
    DEFAULT_PRECISION, Direction, FormatKind, FormatParseError, FormatSpec, Formula, MAX_PRECISION,
    parse_formula,
};
pub use registry::{Backend, DEFAULT_ALIASES, DataMap, Registry, split_lang_tag};
