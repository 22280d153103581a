//! Error types for Machina operations

use thiserror::Error;

/// Configuration errors.
///
/// Raised synchronously at client construction so that misconfiguration
/// surfaces at startup rather than on first use. Never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Remote tabular-API errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Remote API request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Network error: {message}")]
    Network { message: String },
}

/// Response-parsing errors.
///
/// Never retried: retrying will not fix malformed output. The snippet of
/// the raw body is carried for diagnosis.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid JSON in {context}: {snippet}")]
    InvalidJson { context: String, snippet: String },
}

/// Record-translation errors raised by the schema mapper.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Record {record_id} has no fields and cannot be mapped")]
    MissingFields { record_id: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Master error type for all Machina errors.
///
/// "Not found" is deliberately absent: `get_record` models it as a `None`
/// return, because absence is an expected outcome for this layer's callers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MachinaError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl MachinaError {
    /// The HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote(RemoteError::RequestFailed { status, .. }) => Some(*status),
            _ => None,
        }
    }

    /// Whether the retry policy may re-attempt the failed operation.
    ///
    /// Client errors (4xx other than 429) mean the request itself was
    /// wrong and are never retried. Server errors, 429, and statusless
    /// network failures are transient and safe to retry because all
    /// wrapped operations are idempotent.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Remote(RemoteError::RequestFailed { status, .. }) => {
                *status == 429 || !(400..500).contains(status)
            }
            Self::Remote(RemoteError::Network { .. }) => true,
            Self::Config(_) | Self::Parse(_) | Self::Validation(_) => false,
        }
    }
}

/// Result type alias for Machina operations.
pub type MachinaResult<T> = Result<T, MachinaError>;

// =============================================================================
// TESTS
// =============================================================================
