//! Remote service error types

use thiserror::Error;

/// Remote call error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Timeout, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::ServerError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::InvalidRequest, message)
    }

    pub fn session_unknown(session_id: &str) -> Self {
        Self::new(
            RemoteErrorKind::SessionUnknown,
            format!("Remote service does not know session {session_id}"),
        )
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Decode, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Unknown, message)
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// Connection failures - retryable
    Network,
    /// No answer within the bounded wait - retryable
    Timeout,
    /// Server error (5xx) - retryable
    ServerError,
    /// Bad request (4xx) - not retryable
    InvalidRequest,
    /// The service answered without a reply for this session
    SessionUnknown,
    /// Response body did not match the expected shape
    Decode,
    Unknown,
}

impl RemoteErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::Timeout | Self::ServerError)
    }
}
