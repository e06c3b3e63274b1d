//! Error types for the protocol engine.
//!
//! All errors implement the `std::error::Error` trait and carry structured
//! context. A few conditions that look like errors are deliberately *not*
//! modelled here:
//!
//! - "not enough buffered bytes yet" is a decoder state
//!   ([`StreamDecoder::feed`](crate::wire::StreamDecoder::feed) returns
//!   `Ok(None)`),
//! - unknown command tags are events
//!   ([`InboundMessage::Unknown`](crate::wire::InboundMessage::Unknown)),
//! - authentication rejection and transport loss are session notices
//!   ([`SessionNotice`](crate::types::SessionNotice)).
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use periscope::ViewerError;
//!
//! let error = ViewerError::transport_failed("socket reset by peer");
//! if error.is_retryable() {
//!     println!("reconnect and retry");
//! }
//! ```

use std::time::Duration;
use thiserror::Error;

/// Result type alias for protocol operations.
pub type Result<T, E = ViewerError> = std::result::Result<T, E>;

/// Main error type for the protocol engine.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ViewerError {
    #[error("Protocol violation in {context}: {details}")]
    Protocol { context: String, details: String },

    #[error("Declared payload length {declared} exceeds maximum {max}")]
    PayloadTooLarge { declared: usize, max: usize },

    #[error("Transport failure: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Transport is not open")]
    NotOpen,

    #[error("Connection has been closed")]
    Closed,

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },
}

impl ViewerError {
    /// Returns whether this error is potentially recoverable through retry.
    ///
    /// Protocol violations are never retryable: the byte stream is
    /// desynchronized and only a fresh connection can recover.
    pub fn is_retryable(&self) -> bool {
        match self {
            ViewerError::Transport { .. } => true,
            ViewerError::Timeout { .. } => true,
            ViewerError::NotOpen => true,
            ViewerError::Protocol { .. } => false,
            ViewerError::PayloadTooLarge { .. } => false,
            ViewerError::Closed => false,
        }
    }

    /// Helper constructor for protocol violations.
    pub fn protocol(context: impl Into<String>, details: impl Into<String>) -> Self {
        ViewerError::Protocol { context: context.into(), details: details.into() }
    }

    /// Helper constructor for transport failures.
    pub fn transport_failed(reason: impl Into<String>) -> Self {
        ViewerError::Transport { reason: reason.into(), source: None }
    }

    /// Helper constructor for transport failures with an underlying cause.
    pub fn transport_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        ViewerError::Transport { reason: reason.into(), source: Some(source) }
    }
}

impl From<std::io::Error> for ViewerError {
    fn from(err: std::io::Error) -> Self {
        ViewerError::Transport { reason: err.kind().to_string(), source: Some(Box::new(err)) }
    }
}
