//! Shared error types for the availability harness

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Failed to read {path}: {message}")]
    ReadError { path: String, message: String },

    #[error("Deserialization failed: {message}")]
    DeserializationError { message: String },

    #[error("Unsupported config format: {path}")]
    UnsupportedFormat { path: String },

    #[error("Invalid configuration: {field} = {value}")]
    InvalidConfig { field: String, value: String },

    #[error("Missing configuration key: {field}")]
    MissingField { field: String },

    #[error("Duplicate actor key: {key}")]
    DuplicateKey { key: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
