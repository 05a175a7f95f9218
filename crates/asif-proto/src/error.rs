//! Error types for the IRC protocol library.
//!
//! [`ProtocolError`] covers framing and transport-level failures, while
//! [`MessageParseError`] describes why a single line could not be turned into
//! a [`Message`](crate::Message). A parse error only ever concerns one line;
//! callers are expected to drop that line and keep reading.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Top-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested text encoding label is not known.
    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),

    /// Failed to parse an IRC message.
    #[error("invalid message: {string}")]
    InvalidMessage {
        /// The invalid message string.
        string: String,
        /// The underlying parse error.
        #[source]
        cause: MessageParseError,
    },
}

impl ProtocolError {
    /// Whether this error only concerns a single line.
    ///
    /// Line-level errors are skipped by the read loop; everything else ends
    /// the connection.
    pub fn is_line_error(&self) -> bool {
        matches!(self, ProtocolError::InvalidMessage { .. })
    }
}

/// Errors encountered when parsing or building IRC messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Message was empty.
    #[error("empty message")]
    EmptyMessage,

    /// Command was missing or not a valid command token.
    #[error("invalid command")]
    InvalidCommand,

    /// An argument was invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid message prefix.
    #[error("invalid prefix: {0}")]
    InvalidPrefix(String),

    /// Parsing error with position information.
    #[error("parsing failed at position {position}: {context}")]
    ParseContext {
        /// Byte position where parsing failed.
        position: usize,
        /// Description of what was being parsed.
        context: String,
    },
}
