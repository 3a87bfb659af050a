//! Rhai backend.
//!
//! Ingested variables are pushed into a persistent [`Scope`] as constants, so
//! expressions can read but never reassign them. Each formula is evaluated as
//! a single expression against that scope.

use rhai::{Array, Dynamic, Engine, INT, Scope};
use std::ops::{Range, RangeInclusive};

use crate::engine::{
    Backend, BackendValue, DataMap, Direction, FormatSpec, Number, RenderedGrid, shape,
};
use crate::error::{EngineError, Result};

const NAME: &str = "rhai";

pub struct RhaiBackend {
    engine: Engine,
    scope: Scope<'static>,
}

impl RhaiBackend {
    pub fn new() -> Self {
        RhaiBackend {
            engine: Engine::new(),
            scope: Scope::new(),
        }
    }
}

impl Default for RhaiBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for RhaiBackend {
    fn name(&self) -> &str {
        NAME
    }

    fn init_data(&mut self, data: &DataMap) -> Result<()> {
        for (key, value) in data {
            let value =
                rhai::serde::to_dynamic(value).map_err(|e| EngineError::init_data(NAME, e))?;
            self.scope.push_constant_dynamic(key.as_str(), value);
        }
        Ok(())
    }

    fn calc_value(
        &mut self,
        code: &str,
        direction: Direction,
        format: &FormatSpec,
    ) -> Result<RenderedGrid> {
        let value = self
            .engine
            .eval_expression_with_scope::<Dynamic>(&mut self.scope, code)
            .map_err(|e| EngineError::evaluation(NAME, e))?;
        shape(&value, direction, format)
    }
}

impl BackendValue for Dynamic {
    fn to_text(&self) -> Result<String> {
        Ok(self.to_string())
    }

    fn to_number(&self) -> Option<Number> {
        if let Ok(n) = self.as_int() {
            Some(Number::Int(n))
        } else if let Ok(f) = self.as_float() {
            Some(Number::Float(f))
        } else {
            None
        }
    }

    fn sequence_len(&self) -> Result<Option<usize>> {
        if let Some(arr) = self.read_lock::<Array>() {
            return Ok(Some(arr.len()));
        }
        if let Some(range) = self.read_lock::<Range<INT>>() {
            return Ok(Some(range.clone().count()));
        }
        if let Some(range) = self.read_lock::<RangeInclusive<INT>>() {
            return Ok(Some(range.clone().count()));
        }
        Ok(None)
    }

    fn sequence_item(&self, index: usize) -> Result<Self> {
        let item = if let Some(arr) = self.read_lock::<Array>() {
            arr.get(index).cloned()
        } else if let Some(range) = self.read_lock::<Range<INT>>() {
            range.clone().nth(index).map(Dynamic::from_int)
        } else if let Some(range) = self.read_lock::<RangeInclusive<INT>>() {
            range.clone().nth(index).map(Dynamic::from_int)
        } else {
            None
        };
        item.ok_or_else(|| EngineError::Extraction(format!("rhai value has no item {}", index)))
    }
}
