//! Concrete evaluation backends.
//!
//! Rhai is always available. The other languages are behind cargo features:
//! `js` (QuickJS, on by default), `python` (embedded CPython) and `cel`.

#[cfg(feature = "cel")]
mod cel;
#[cfg(feature = "js")]
mod js;
#[cfg(feature = "python")]
mod py;
mod rhai;

#[cfg(feature = "cel")]
pub use self::cel::CelBackend;
#[cfg(feature = "js")]
pub use self::js::JsBackend;
#[cfg(feature = "python")]
pub use self::py::PyBackend;
pub use self::rhai::RhaiBackend;

use crate::engine::Backend;
use crate::error::Result;

/// One instance of every backend compiled into this build.
pub fn default_backends() -> Result<Vec<Box<dyn Backend>>> {
    #[allow(unused_mut)]
    let mut backends: Vec<Box<dyn Backend>> = vec![Box::new(RhaiBackend::new())];
    #[cfg(feature = "js")]
    backends.push(Box::new(JsBackend::new()?));
    #[cfg(feature = "python")]
    backends.push(Box::new(PyBackend::new()));
    #[cfg(feature = "cel")]
    backends.push(Box::new(CelBackend::new()));
    Ok(backends)
}
