//! Workbook storage and data loading.

pub mod loader;
mod md;
mod styles;
mod xlsx;

pub use loader::{CsvLoader, DirectoryLoader, JsonLoader, Loader, XlsxLoader};
#[cfg(feature = "sqlite")]
pub use loader::SqliteLoader;
pub use md::write_markdown;
pub use xlsx::{read_xlsx, write_xlsx};
