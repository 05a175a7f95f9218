//! Outgoing IRC commands.
//!
//! [`Command`] values render to protocol lines without the CRLF terminator;
//! framing is left to the transport.

mod builders;
mod serialize;
mod types;
pub(crate) mod util;

pub use self::builders::{join, notice, part, pong, privmsg, quit, registration};
pub use self::types::Command;
pub use self::util::needs_colon_prefix;
