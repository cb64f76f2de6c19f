//! LLM backend errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while talking to a language-model backend
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum BackendError {
    /// API request failed with the given message
    #[error("API error: {message}")]
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    /// Request timed out after the specified duration (in seconds)
    #[error("Request timed out after {seconds} seconds")]
    TimeoutError { seconds: u64 },

    /// The backend answered with something unusable (empty text, wrong shape)
    #[error("Invalid response from LLM: {message}")]
    InvalidResponse { message: String },

    /// Missing API keys, unknown provider and similar
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Error: {message}")]
    Other { message: String },
}
