//! Common Expression Language backend (via cel-interpreter).

use cel_interpreter::{Context, Program, Value};

use crate::engine::{
    Backend, BackendValue, DataMap, Direction, FormatSpec, Number, RenderedGrid, shape,
};
use crate::error::{EngineError, Result};

const NAME: &str = "cel";

pub struct CelBackend {
    context: Context<'static>,
}

impl CelBackend {
    pub fn new() -> Self {
        CelBackend {
            context: Context::default(),
        }
    }
}

impl Default for CelBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for CelBackend {
    fn name(&self) -> &str {
        NAME
    }

    fn init_data(&mut self, data: &DataMap) -> Result<()> {
        for (key, value) in data {
            self.context
                .add_variable(key.clone(), value)
                .map_err(|e| EngineError::init_data(NAME, e))?;
        }
        Ok(())
    }

    fn calc_value(
        &mut self,
        code: &str,
        direction: Direction,
        format: &FormatSpec,
    ) -> Result<RenderedGrid> {
        let program = Program::compile(code).map_err(|e| EngineError::evaluation(NAME, e))?;
        let value = program
            .execute(&self.context)
            .map_err(|e| EngineError::evaluation(NAME, e))?;
        shape(&value, direction, format)
    }
}

impl BackendValue for Value {
    fn to_text(&self) -> Result<String> {
        Ok(match self {
            Value::String(s) => s.to_string(),
            Value::Int(n) => n.to_string(),
            Value::UInt(n) => n.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => "null".to_string(),
            other => format!("{:?}", other),
        })
    }

    fn to_number(&self) -> Option<Number> {
        match self {
            Value::Int(n) => Some(Number::Int(*n)),
            Value::UInt(n) => Some(match i64::try_from(*n) {
                Ok(n) => Number::Int(n),
                Err(_) => Number::Float(*n as f64),
            }),
            Value::Float(f) => Some(Number::Float(*f)),
            _ => None,
        }
    }

    fn sequence_len(&self) -> Result<Option<usize>> {
        Ok(match self {
            Value::List(items) => Some(items.len()),
            _ => None,
        })
    }

    fn sequence_item(&self, index: usize) -> Result<Self> {
        match self {
            Value::List(items) => items.get(index).cloned(),
            _ => None,
        }
        .ok_or_else(|| EngineError::Extraction(format!("cel value has no item {}", index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{FormatKind, Scalar};
    use serde_json::json;

    #[test]
    fn test_list_expressions() {
        let mut backend = CelBackend::new();
        let data = json!({"scores": [3, 1, 2]});
        backend.init_data(data.as_object().unwrap()).unwrap();

        let grid = backend
            .calc_value("size(scores)", Direction::Cell, &FormatSpec::new(FormatKind::Int, -1))
            .unwrap();
        assert_eq!(grid.get(0, 0), Some(&Scalar::Int(3)));

        let grid = backend
            .calc_value(
                "[30, 10, 20]",
                Direction::Vertical,
                &FormatSpec::new(FormatKind::Int, -1),
            )
            .unwrap();
        assert_eq!(
            grid.into_rows(),
            vec![vec![Scalar::Int(30)], vec![Scalar::Int(10)], vec![Scalar::Int(20)]]
        );
    }

    #[test]
    fn test_compile_errors() {
        let mut backend = CelBackend::new();
        let err = backend
            .calc_value("1 +", Direction::Cell, &FormatSpec::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::Evaluation { ref lang, .. } if lang == "cel"));
    }
}
