//! Error types for the spark-dwh-etl library.
//!
//! This module provides custom error types using `thiserror` for better error handling
//! and more specific error messages throughout the pipeline.

use thiserror::Error;

/// Errors that can occur while running the ETL pipeline.
#[derive(Error, Debug)]
pub enum EtlError {
    /// Errors raised by the MySQL driver
    #[error("Database error: {0}")]
    Database(#[from] mysql_async::Error),

    /// Database server unreachable after exhausting the retry budget
    #[error("Cannot connect to database at {host}:{port} after {attempts} attempts")]
    Connectivity {
        /// Database host the connector gave up on
        host: String,
        /// Database port the connector gave up on
        port: u16,
        /// Number of connection attempts made
        attempts: u32,
    },

    /// Transport-level HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status returned by an API endpoint
    #[error("API endpoint {endpoint} responded with status {status}")]
    Api {
        /// Endpoint that produced the response
        endpoint: String,
        /// HTTP status code of the response
        status: u16,
    },

    /// Privileged operation attempted by a non-privileged identity
    #[error("Operation requires a privileged database identity: {0}")]
    Privilege(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Result with EtlError
pub type Result<T> = std::result::Result<T, EtlError>;

impl From<anyhow::Error> for EtlError {
    fn from(err: anyhow::Error) -> Self {
        EtlError::Other(err.to_string())
    }
}

impl From<config::ConfigError> for EtlError {
    fn from(err: config::ConfigError) -> Self {
        EtlError::InvalidConfig(err.to_string())
    }
}
