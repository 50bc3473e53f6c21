//! Error Types
//!
//! Every failure in a session attempt ends up as a [`SessionError`]. Errors are
//! terminal to the current attempt only; the visitor can always press the orb
//! again.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shown when the microphone is refused
pub const PERMISSION_DENIED_TEXT: &str =
    "Microphone access denied. Please allow microphone access to chat with Magic Man.";

/// Shown when the channel cannot be opened
pub const CONNECTION_FAILED_TEXT: &str = "Failed to start conversation. Please try again.";

/// Shown when the channel reports an error without a description
pub const RUNTIME_ERROR_TEXT: &str = "An error occurred during the conversation";

/// Shown when closing the channel fails
pub const CLOSE_FAILED_TEXT: &str = "Could not close the conversation cleanly.";

/// Category of a session error, for styling and tests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Microphone access refused
    PermissionDenied,
    /// Channel could not open
    ConnectionFailed,
    /// Mid-session error reported by the channel
    RuntimeChannelError,
    /// Channel close failed (local state was still reset)
    CloseFailed,
    /// Start requested while a session is already active
    AlreadyActive,
}

/// Errors surfaced by the Session Controller
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Microphone access was refused
    #[error("microphone permission denied: {reason}")]
    PermissionDenied {
        /// Why capture was refused
        reason: String,
    },

    /// The channel could not be opened
    #[error("connection failed: {reason}")]
    ConnectionFailed {
        /// Underlying failure
        reason: String,
    },

    /// The channel reported an error mid-session
    #[error("channel error: {0}")]
    RuntimeChannelError(String),

    /// The channel failed to close
    #[error("close failed: {0}")]
    CloseFailed(String),

    /// A session is already running
    #[error("a session is already active")]
    AlreadyActive,
}

impl SessionError {
    /// The error's category
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::ConnectionFailed { .. } => ErrorKind::ConnectionFailed,
            Self::RuntimeChannelError(_) => ErrorKind::RuntimeChannelError,
            Self::CloseFailed(_) => ErrorKind::CloseFailed,
            Self::AlreadyActive => ErrorKind::AlreadyActive,
        }
    }

    /// Guidance text for the error banner
    pub fn user_message(&self) -> String {
        match self {
            Self::PermissionDenied { .. } => PERMISSION_DENIED_TEXT.to_string(),
            Self::ConnectionFailed { .. } => CONNECTION_FAILED_TEXT.to_string(),
            Self::RuntimeChannelError(message) if message.trim().is_empty() => {
                RUNTIME_ERROR_TEXT.to_string()
            }
            Self::RuntimeChannelError(message) => message.clone(),
            Self::CloseFailed(_) => CLOSE_FAILED_TEXT.to_string(),
            Self::AlreadyActive => "A conversation is already in progress.".to_string(),
        }
    }
}

/// Errors from voice channel implementations
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Could not reach or handshake with the agent service
    #[error("failed to connect: {0}")]
    Connect(String),

    /// The channel is not open
    #[error("channel is not open")]
    NotOpen,

    /// The channel does not accept typed text
    #[error("channel does not accept text input")]
    TextUnsupported,

    /// Transport failure while sending or closing
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed data from the agent service
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Errors from microphone capture requests
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CaptureError {
    /// The platform refused access
    #[error("capture denied: {0}")]
    Denied(String),

    /// No usable capture device
    #[error("capture unavailable: {0}")]
    Unavailable(String),
}

impl From<CaptureError> for SessionError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::Denied(reason) => SessionError::PermissionDenied { reason },
            CaptureError::Unavailable(reason) => SessionError::ConnectionFailed { reason },
        }
    }
}

impl From<ChannelError> for SessionError {
    fn from(err: ChannelError) -> Self {
        SessionError::ConnectionFailed {
            reason: err.to_string(),
        }
    }
}
