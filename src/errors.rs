/*!
 * Error types for the tovik engine.
 *
 * Service errors are produced by translation service clients and are always
 * contained by the batch client; engine errors describe bootstrap failures
 * such as a missing observed element.
 */

use thiserror::Error;

/// Errors that can occur when talking to the remote translation service
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// The request could not be sent or the connection dropped
    #[error("Request to translation service failed: {0}")]
    RequestFailed(String),

    /// The response body was not the expected JSON shape
    #[error("Failed to parse translation service response: {0}")]
    ParseError(String),

    /// The site reached its translation usage limit (HTTP 429)
    #[error("Translation usage limit reached for language '{language}'")]
    RateLimited {
        /// Target language of the rejected request
        language: String,
    },

    /// Any other non-success response
    #[error("Translation service responded with error: {status_code} - {message}")]
    Api {
        /// HTTP status code
        status_code: u16,
        /// Response body, if any
        message: String,
    },
}

impl ServiceError {
    /// Whether this error is the usage-limit condition
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// HTTP status carried by this error, if it came from a response
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::RateLimited { .. } => Some(429),
            Self::Api { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors raised while bootstrapping the engine or attaching components
#[derive(Error, Debug)]
pub enum EngineError {
    /// A selector did not match any element in the document
    #[error("Observed element not found for selector: {0}")]
    RootNotFound(String),

    /// A selector could not be parsed
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// The node handed to a component does not exist
    #[error("Node {0} does not exist in the document")]
    UnknownNode(usize),

    /// The configuration is unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// The persistent store failed during startup
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<anyhow::Error> for EngineError {
    fn from(error: anyhow::Error) -> Self {
        Self::Storage(error.to_string())
    }
}
