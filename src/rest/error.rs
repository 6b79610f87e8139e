//! Error types for the REST-backed provider client.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised by [`super::RestCloudApi`].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum RestApiError {
    /// Raised when no usable client can be built from the configured
    /// credential mode.
    #[error("credential error: {message}")]
    Credentials {
        /// What prevented authentication from being established.
        message: String,
    },
    /// Raised when the high-level configuration is incomplete.
    #[error("configuration error: {message}")]
    Config {
        /// Validation failure from the configuration layer.
        message: String,
    },
    /// Raised when the HTTP transport fails before a response arrives.
    #[error("transport error: {message}")]
    Http {
        /// Message reported by the HTTP client.
        message: String,
    },
    /// Raised when the provider answers with a non-success status.
    #[error("provider rejected the call with status {status}: {message}")]
    Api {
        /// HTTP status code of the response.
        status: u16,
        /// Response body, when one was readable.
        message: String,
    },
    /// Raised when a response body cannot be decoded into the expected
    /// document.
    #[error("failed to decode provider response: {message}")]
    Decode {
        /// Decoder error message.
        message: String,
    },
}

impl From<ConfigError> for RestApiError {
    fn from(value: ConfigError) -> Self {
        match value {
            ConfigError::MissingCredentials => Self::Credentials {
                message: value.to_string(),
            },
            other => Self::Config {
                message: other.to_string(),
            },
        }
    }
}

impl From<reqwest::Error> for RestApiError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Decode {
                message: value.to_string(),
            }
        } else {
            Self::Http {
                message: value.to_string(),
            }
        }
    }
}
