//! Error types for the Flowtable engine.

use thiserror::Error;

/// Errors raised while evaluating and shaping a template formula.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The expression does not start with a `[tag]` language marker.
    #[error("wrong code format: expected `[lang]expression`")]
    WrongCodeFormat,

    /// The language tag resolves to no registered backend.
    #[error("unknown language: {0}")]
    UnknownLang(String),

    /// A backend rejected or failed to run the expression.
    #[error("{lang} evaluation error: {message}")]
    Evaluation { lang: String, message: String },

    /// A backend failed to bind the ingested data.
    #[error("{lang} failed to bind data: {message}")]
    InitData { lang: String, message: String },

    /// The evaluated value could not be brought into the requested shape.
    #[error("cannot extract value: {0}")]
    Extraction(String),
}

impl EngineError {
    pub fn evaluation(lang: &str, message: impl ToString) -> Self {
        EngineError::Evaluation {
            lang: lang.to_string(),
            message: message.to_string(),
        }
    }

    pub fn init_data(lang: &str, message: impl ToString) -> Self {
        EngineError::InitData {
            lang: lang.to_string(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
