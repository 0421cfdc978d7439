//! Error types for cmdlink.
//!
//! This module provides a unified error type for all cmdlink operations,
//! with specific error variants for different failure modes.

use std::io;

use thiserror::Error;

/// A specialized `Result` type for cmdlink operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for cmdlink.
#[derive(Error, Debug)]
pub enum Error {
    /// Receive buffer could not be allocated (E001)
    #[error("unable to allocate {0} bytes for the receive buffer")]
    AllocationFailed(usize),

    /// Announced size exceeds the configured ceiling (E002)
    #[error("transfer of {size} bytes exceeds the limit of {limit} bytes")]
    TransferTooLarge {
        /// Announced size
        size: usize,
        /// Configured ceiling
        limit: usize,
    },

    /// Frame could not be handed to the link (E003)
    #[error("failed to send frame: {0}")]
    LinkSend(String),

    /// Peer answered with something that is not a known reply (E004)
    #[error("unexpected reply from peer: {0:?}")]
    UnexpectedReply(String),

    /// Sender gave up after repeated `ERR` replies (E005)
    #[error("transfer failed after {0} retries")]
    RetriesExhausted(u32),

    /// Frame is too short to carry what it claims
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// No frame arrived within the idle timeout
    #[error("transfer idle for more than {0} seconds")]
    IdleTimeout(u64),

    /// Configuration file error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Invalid configuration value
    #[error("invalid configuration value for '{key}': {reason}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Reason for invalidity
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Returns the error code associated with this error, if any.
    ///
    /// Error codes follow the pattern EXXX where XXX is a 3-digit number.
    #[must_use]
    pub const fn code(&self) -> Option<&'static str> {
        match self {
            Self::AllocationFailed(_) => Some("E001"),
            Self::TransferTooLarge { .. } => Some("E002"),
            Self::LinkSend(_) => Some("E003"),
            Self::UnexpectedReply(_) => Some("E004"),
            Self::RetriesExhausted(_) => Some("E005"),
            _ => None,
        }
    }

    /// Returns whether this error is recoverable (can be retried).
    ///
    /// A new size announcement recovers from an allocation failure, so it
    /// counts as recoverable from the peer's point of view.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::AllocationFailed(_)
                | Self::TransferTooLarge { .. }
                | Self::LinkSend(_)
                | Self::IdleTimeout(_)
        )
    }
}
