// src/error.rs

//! Unified error handling for the ingestion pipeline.

use std::fmt;

use thiserror::Error;

/// Result type alias for ingestion operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Reference archive could not be read
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Registry listing could not be walked to the end
    #[error("Pagination error at {url}: {message}")]
    Pagination { url: String, message: String },

    /// Reference dataset could not be acquired
    #[error("Dataset error for {dataset}: {message}")]
    Dataset { dataset: String, message: String },

    /// Output stream failure
    #[error("Writer error: {0}")]
    Writer(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a status error for a URL.
    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self::Status {
            url: url.into(),
            status,
        }
    }

    /// Create a pagination error with the offending page URL.
    pub fn pagination(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Pagination {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a dataset error.
    pub fn dataset(dataset: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Dataset {
            dataset: dataset.into(),
            message: message.to_string(),
        }
    }

    /// Create a writer error.
    pub fn writer(message: impl Into<String>) -> Self {
        Self::Writer(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// HTTP status carried by this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
