//! Error types for the P1125 core crate

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid {kind} '{value}'")]
    InvalidValue { kind: &'static str, value: String },

    #[error("Could not find {0} directory")]
    NoDirectory(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
