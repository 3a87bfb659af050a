//! flowtable-core - Workbook model, template renderer and storage.

pub mod config;
pub mod document;
pub mod error;
pub mod render;
pub mod storage;

pub use config::RenderConfig;
pub use document::{SheetDocument, Workbook};
pub use error::{FlowTableError, Result};
pub use render::{RenderStats, render};

pub use flowtable_engine::engine::{Area, CellRef, Registry};
