use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Join error: {0}")]
    Join(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Polars error: {0}")]
    Polars(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<polars::error::PolarsError> for EngineError {
    fn from(e: polars::error::PolarsError) -> Self {
        EngineError::Polars(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
