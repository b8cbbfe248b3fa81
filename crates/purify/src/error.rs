use std::path::PathBuf;
use thiserror::Error;

use crate::gateway::GatewayError;
use crate::job::{ControllerError, FailureKind, JobFailure};

#[derive(Error, Debug)]
pub enum PurifyError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Transport error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Controller error: {0}")]
    Controller(#[from] ControllerError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Failed to read document '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Document path '{0}' has no file name")]
    MissingFileName(PathBuf),
}

/// Rejections raised before a document is handed to the controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("File '{filename}' is empty")]
    Empty { filename: String },

    #[error("Please select a PDF file ('{filename}' is not supported)")]
    UnsupportedType { filename: String },

    #[error("File size exceeds {limit_mb}MB limit ({size} bytes)")]
    TooLarge { size: u64, limit_mb: u64 },
}

impl From<&ValidationError> for JobFailure {
    fn from(err: &ValidationError) -> Self {
        JobFailure::new(FailureKind::Validation, err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PurifyError>;
