//! # asif-proto
//!
//! IRC protocol plumbing for the asif bot framework: a line parser that turns
//! raw protocol lines into [`Message`] values, and a command builder that
//! turns outgoing intents into protocol-correct lines.
//!
//! ## Features
//!
//! - RFC 1459/2812 line parsing (prefix, command, middle params, trailing)
//! - Outgoing command construction with consistent trailing-parameter rules
//! - Channel and nickname validation helpers
//! - IRC text formatting helpers (bold, colors, highlight suppression)
//! - Optional Tokio line codec with configurable text encoding
//!
//! ## Quick Start
//!
//! ```rust
//! use asif_proto::{command, parse_line, Message};
//!
//! let msg = parse_line(":nick!user@host PRIVMSG #chan :hello world\r\n")
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(msg.command, "PRIVMSG");
//! assert_eq!(msg.text(), Some("hello world"));
//! assert_eq!(msg.origin(), Some("#chan"));
//!
//! let reply = command::privmsg(msg.origin().unwrap(), "pong");
//! assert_eq!(reply.to_string(), "PRIVMSG #chan :pong");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod chan;
pub mod command;
pub mod error;
pub mod format;
#[cfg(feature = "tokio")]
pub mod line;
pub mod message;
pub mod nick;
pub mod prefix;

pub use self::chan::{ChannelExt, DEFAULT_CHANTYPES};
pub use self::command::Command;
pub use self::error::{MessageParseError, ProtocolError};
pub use self::format::FormattedStringExt;
#[cfg(feature = "tokio")]
pub use self::line::{LineCodec, MAX_IRC_LINE_LEN};
pub use self::message::{parse_bytes, parse_line, Message};
pub use self::nick::{NickExt, DEFAULT_NICK_MAX_LEN};
pub use self::prefix::Prefix;
