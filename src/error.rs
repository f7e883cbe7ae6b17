// src/error.rs

//! Unified error handling for the notice monitor.

use std::fmt;

use thiserror::Error;

/// Result type alias for monitor operations.
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

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// The fetch layer answered, but without page content
    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    /// Durable state could not be written
    #[error("Failed to persist '{key}': {message}")]
    Persistence { key: String, message: String },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a fetch error for the given URL.
    pub fn fetch(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a persistence error for the given key.
    pub fn persistence(key: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Persistence {
            key: key.into(),
            message: message.to_string(),
        }
    }
}
