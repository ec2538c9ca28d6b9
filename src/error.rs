//! Error types and handling for the `DineScout` service

use thiserror::Error;

/// Machine-readable classification of provider failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The provider rejected our credentials (HTTP 401/403 or `REQUEST_DENIED`)
    ApiUnauthorized,
    /// The provider throttled us (HTTP 429 or `OVER_QUERY_LIMIT`)
    ApiRateLimit,
    /// The requested resource does not exist
    ApiNotFound,
    /// The response body could not be understood
    ApiInvalidResponse,
    /// Transport failure or an unexpected status
    ApiNetworkError,
    /// A required API key is not configured
    MissingApiKey,
}

/// Main error type for the `DineScout` service
#[derive(Error, Debug)]
pub enum DineScoutError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// External provider errors
    #[error("API error ({code:?}): {message}")]
    Api { message: String, code: ErrorCode },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },
}

impl DineScoutError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new API error with the given classification
    pub fn api<S: Into<String>>(message: S, code: ErrorCode) -> Self {
        Self::Api {
            message: message.into(),
            code,
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Provider classification, if this is an API error
    #[must_use]
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            DineScoutError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}
