//! Error types for the review notifier

use std::fmt;

/// Errors that can occur in the review notifier
#[derive(Debug, thiserror::Error)]
pub enum ReviewNotifierError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network failure: {0}")]
    Transport(String),

    #[error("Server failure: {0}")]
    ServerFailure(String),

    #[error("Unexpected review status: {0}")]
    InvalidStatus(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Messaging credentials revoked: {0}")]
    CredentialRevoked(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification used for logging and loop policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Transport,
    ServerFailure,
    InvalidStatus,
    Delivery,
    CredentialRevoked,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Config => "config",
            ErrorKind::Transport => "transport",
            ErrorKind::ServerFailure => "server_failure",
            ErrorKind::InvalidStatus => "invalid_status",
            ErrorKind::Delivery => "delivery",
            ErrorKind::CredentialRevoked => "credential_revoked",
            ErrorKind::Io => "io",
        };
        f.write_str(name)
    }
}

impl ReviewNotifierError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReviewNotifierError::Config(_) => ErrorKind::Config,
            ReviewNotifierError::Transport(_) => ErrorKind::Transport,
            // A body we cannot decode is the server's fault, not ours
            ReviewNotifierError::ServerFailure(_) | ReviewNotifierError::Json(_) => {
                ErrorKind::ServerFailure
            }
            ReviewNotifierError::InvalidStatus(_) => ErrorKind::InvalidStatus,
            ReviewNotifierError::Delivery(_) => ErrorKind::Delivery,
            ReviewNotifierError::CredentialRevoked(_) => ErrorKind::CredentialRevoked,
            ReviewNotifierError::Io(_) => ErrorKind::Io,
        }
    }

    /// True when the messaging channel itself failed, so reporting the
    /// failure through that channel is pointless.
    pub fn is_channel_failure(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Delivery | ErrorKind::CredentialRevoked
        )
    }

    /// The only error that may end the poll loop, and only when configured to
    pub fn is_fatal_for_loop(&self) -> bool {
        matches!(self, ReviewNotifierError::CredentialRevoked(_))
    }
}

/// Result type alias for review notifier operations
pub type Result<T> = std::result::Result<T, ReviewNotifierError>;
