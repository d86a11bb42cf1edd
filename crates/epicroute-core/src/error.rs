//! Error types for epicroute-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid analysis mode: {0}")]
    InvalidAnalysisMode(String),

    #[error("Invalid epic type: {0}")]
    InvalidEpicType(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
