//! JavaScript backend on top of QuickJS (via rquickjs).
//!
//! Each ingested variable becomes a global `const` initialised from its JSON
//! text, so it can be read but not reassigned.

use rquickjs::convert::Coerced;
use rquickjs::{Context, Ctx, Runtime, Value};

use crate::engine::{
    Backend, BackendValue, DataMap, Direction, FormatSpec, Number, RenderedGrid, shape,
};
use crate::error::{EngineError, Result};

const NAME: &str = "js";

pub struct JsBackend {
    _runtime: Runtime,
    context: Context,
}

impl JsBackend {
    pub fn new() -> Result<Self> {
        let runtime = Runtime::new().map_err(|e| EngineError::evaluation(NAME, e))?;
        let context = Context::full(&runtime).map_err(|e| EngineError::evaluation(NAME, e))?;
        Ok(JsBackend {
            _runtime: runtime,
            context,
        })
    }
}

/// Best description of a failed call: the thrown exception's message when
/// there is one, otherwise the rquickjs error itself.
fn describe_error(ctx: &Ctx<'_>, err: rquickjs::Error) -> String {
    if err.is_exception() {
        let thrown = ctx.catch();
        if let Some(message) = thrown.as_exception().and_then(|e| e.message()) {
            return message;
        }
        if let Ok(Coerced(text)) = thrown.get::<Coerced<String>>() {
            return text;
        }
    }
    err.to_string()
}

impl Backend for JsBackend {
    fn name(&self) -> &str {
        NAME
    }

    fn init_data(&mut self, data: &DataMap) -> Result<()> {
        self.context.with(|ctx| {
            for (key, value) in data {
                let json =
                    serde_json::to_string(value).map_err(|e| EngineError::init_data(NAME, e))?;
                let source = format!("const {} = {};", key, json);
                ctx.eval::<(), _>(source)
                    .map_err(|e| EngineError::init_data(NAME, describe_error(&ctx, e)))?;
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
        self.context.with(|ctx| {
            let value = ctx
                .eval::<Value, _>(code)
                .map_err(|e| EngineError::evaluation(NAME, describe_error(&ctx, e)))?;
            shape(&value, direction, format)
        })
    }
}

impl<'js> BackendValue for Value<'js> {
    fn to_text(&self) -> Result<String> {
        self.get::<Coerced<String>>()
            .map(|text| text.0)
            .map_err(|e| EngineError::Extraction(e.to_string()))
    }

    fn to_number(&self) -> Option<Number> {
        if let Some(n) = self.as_int() {
            Some(Number::Int(i64::from(n)))
        } else {
            self.as_float().map(Number::Float)
        }
    }

    fn sequence_len(&self) -> Result<Option<usize>> {
        Ok(self.as_array().map(|arr| arr.len()))
    }

    fn sequence_item(&self, index: usize) -> Result<Self> {
        let arr = self
            .as_array()
            .ok_or_else(|| EngineError::Extraction("js value is not an array".to_string()))?;
        arr.get::<Value>(index)
            .map_err(|e| EngineError::Extraction(e.to_string()))
    }
}
