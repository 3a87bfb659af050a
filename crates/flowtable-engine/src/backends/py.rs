//! Python backend on an embedded CPython interpreter (via pyo3).
//!
//! Ingested variables live in a dedicated globals dictionary that every
//! expression is evaluated against.

use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict, PyFloat, PyInt, PyString};
use std::ffi::CString;

use crate::engine::{
    Backend, BackendValue, DataMap, Direction, FormatSpec, Number, RenderedGrid, shape,
};
use crate::error::{EngineError, Result};

const NAME: &str = "py";

pub struct PyBackend {
    globals: Py<PyDict>,
}

impl PyBackend {
    pub fn new() -> Self {
        Python::attach(|py| PyBackend {
            globals: PyDict::new(py).unbind(),
        })
    }
}

impl Default for PyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for PyBackend {
    fn name(&self) -> &str {
        NAME
    }

    fn init_data(&mut self, data: &DataMap) -> Result<()> {
        Python::attach(|py| {
            let json = py
                .import("json")
                .map_err(|e| EngineError::init_data(NAME, e))?;
            let globals = self.globals.bind(py);
            for (key, value) in data {
                let text =
                    serde_json::to_string(value).map_err(|e| EngineError::init_data(NAME, e))?;
                let object = json
                    .call_method1("loads", (text,))
                    .map_err(|e| EngineError::init_data(NAME, e))?;
                globals
                    .set_item(key.as_str(), object)
                    .map_err(|e| EngineError::init_data(NAME, e))?;
            }
            Ok(())
        })
    }

    fn calc_value(
        &mut self,
        code: &str,
        direction: Direction,
        format: &FormatSpec,
    ) -> Result<RenderedGrid> {
        let source = CString::new(code).map_err(|e| EngineError::evaluation(NAME, e))?;
        Python::attach(|py| {
            let globals = self.globals.bind(py);
            let value = py
                .eval(&source, Some(globals), None)
                .map_err(|e| EngineError::evaluation(NAME, e))?;
            shape(&value, direction, format)
        })
    }
}

impl<'py> BackendValue for Bound<'py, PyAny> {
    fn to_text(&self) -> Result<String> {
        self.str()
            .map(|text| text.to_string_lossy().into_owned())
            .map_err(|e| EngineError::Extraction(e.to_string()))
    }

    fn to_number(&self) -> Option<Number> {
        if self.is_instance_of::<PyBool>() {
            None
        } else if self.is_instance_of::<PyInt>() {
            match self.extract::<i64>() {
                Ok(n) => Some(Number::Int(n)),
                Err(_) => self.extract::<f64>().ok().map(Number::Float),
            }
        } else if self.is_instance_of::<PyFloat>() {
            self.extract::<f64>().ok().map(Number::Float)
        } else {
            None
        }
    }

    fn sequence_len(&self) -> Result<Option<usize>> {
        if self.is_instance_of::<PyString>() {
            return Ok(None);
        }
        Ok(self.len().ok())
    }

    fn sequence_item(&self, index: usize) -> Result<Self> {
        self.get_item(index)
            .map_err(|e| EngineError::Extraction(e.to_string()))
    }
}
