//! Error types for the client framework.
//!
//! Only connection-kind errors end a run. Parse failures are contained in the
//! read loop and handler failures at their task boundary; neither ever shows
//! up here as the result of [`Client::run`](crate::Client::run).

use std::io;

use asif_proto::{MessageParseError, ProtocolError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors returned by the client and by [`ClientHandle`](crate::ClientHandle)
/// operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("TLS handshake with {host} failed: {source}")]
    Tls {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("connection error: {0}")]
    Io(#[from] io::Error),

    #[error("write failed: {0}")]
    Write(#[source] ProtocolError),

    #[error("protocol error: {0}")]
    Protocol(#[source] ProtocolError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("not connected")]
    Disconnected,

    #[error("event has no reply target")]
    NoReplyTarget,

    #[error("invalid command: {0}")]
    InvalidCommand(#[from] MessageParseError),
}

impl ClientError {
    /// Whether this error is a transport failure that ends a run.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::Tls { .. } | Self::Io(_) | Self::Write(_) | Self::Protocol(_)
        )
    }

    /// Get a static error code string for log fields.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Tls { .. } => "tls",
            Self::Io(_) => "io",
            Self::Write(_) => "write",
            Self::Protocol(_) => "protocol",
            Self::Config(_) => "config",
            Self::Disconnected => "disconnected",
            Self::NoReplyTarget => "no_reply_target",
            Self::InvalidCommand(_) => "invalid_command",
        }
    }
}

impl From<ProtocolError> for ClientError {
    /// Read-side errors: I/O stays I/O, anything else is a framing problem.
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Io(e) => Self::Io(e),
            other => Self::Protocol(other),
        }
    }
}
