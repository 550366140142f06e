//! Error types
//!
//! A single error enum covers the whole exchange path. Variants fall into
//! four groups: configuration errors (fatal, never retried), transport errors
//! (carry the observed HTTP status), response-shape and codec errors, and
//! the terminal failures of the bounded loops (poll timeout, round ceiling,
//! cancellation).

use thiserror::Error;

/// Result alias used across the airsync crates
pub type AirSyncResult<T> = Result<T, AirSyncError>;

/// Errors raised while building, sending or decoding protocol exchanges
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AirSyncError {
    /// Client configuration is unusable (unknown query mode, bad version, ...)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A binary content type was negotiated but no WBXML codec is installed
    #[error("No WBXML codec available for content type {0}")]
    CodecUnavailable(String),

    /// The WBXML codec or a charset transform failed
    #[error("Codec error: {0}")]
    Codec(String),

    /// Connection failure or non-success HTTP status
    #[error("Transport error (status {status:?}): {message}")]
    Transport {
        /// HTTP status, when the server answered at all
        status: Option<u16>,
        /// Failure description, including any error body text
        message: String,
    },

    /// A request parameter cannot be encoded
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name as it appears on the wire
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// The server response could not be interpreted
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A polling helper gave up before its predicate held
    #[error("Condition not met after {attempts} attempts")]
    PollTimeout {
        /// Number of attempts performed
        attempts: u32,
    },

    /// The sync merge loop hit its round ceiling while the server still
    /// reported more data
    #[error("Sync still reported more data after {rounds} rounds")]
    RoundLimitExceeded {
        /// Number of rounds performed
        rounds: u32,
    },

    /// The caller cancelled a long-running loop
    #[error("Operation cancelled")]
    Cancelled,
}

impl AirSyncError {
    /// Creates a transport error for a response that carried a status code
    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Creates a transport error for a failure below HTTP (DNS, TLS, reset)
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
        }
    }

    /// Configuration errors must be fixed by the caller; repeating the call
    /// cannot succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AirSyncError::Configuration(_) | AirSyncError::CodecUnavailable(_)
        )
    }

    /// HTTP status observed by a transport failure
    pub fn status(&self) -> Option<u16> {
        match self {
            AirSyncError::Transport { status, .. } => *status,
            _ => None,
        }
    }
}
