//! flowtable_engine - Template formulas, value extraction and scripting backends.

pub mod backends;
pub mod engine;
pub mod error;

pub use error::{EngineError, Result};
