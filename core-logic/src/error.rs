//! # Core Error Types
//!
//! Centralized error definitions for the core-logic crate.
//!
//! Only configuration errors are meant to reach the application layer;
//! network errors are consumed by the retry loop and sink errors are logged
//! where they happen.

use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid RPC URL format: '{url}'")]
    InvalidRpcUrl { url: String },

    #[error("Missing required configuration field: '{field}'")]
    MissingField { field: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("I/O error reading {path}: {msg}")]
    IoError { path: String, msg: String },
}

/// Network and response-shape errors.
///
/// Every variant is transient from the caller's point of view.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid proxy {proxy}: {reason}")]
    InvalidProxy { proxy: String, reason: String },

    #[error("Request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("HTTP error {status_code} from {endpoint}")]
    HttpError { status_code: u16, endpoint: String },

    #[error("Failed to parse JSON response: {reason}, response: {body}")]
    MalformedJson { reason: String, body: String },

    #[error("Wrong response: {body}")]
    UnexpectedShape { body: String },
}

/// Output sink errors
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to append to {path}: {source}")]
    Append {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
