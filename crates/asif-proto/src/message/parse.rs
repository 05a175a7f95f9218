//! Message parsing entry points.

use std::str::FromStr;

use crate::error::{MessageParseError, ProtocolError};
use crate::prefix::Prefix;

use super::nom_parser::ParsedMessage;
use super::types::Message;

impl FromStr for Message {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Message, Self::Err> {
        let invalid = |cause| ProtocolError::InvalidMessage {
            string: s.to_owned(),
            cause,
        };

        if s.trim_end_matches(['\r', '\n']).trim().is_empty() {
            return Err(invalid(MessageParseError::EmptyMessage));
        }

        let parsed = ParsedMessage::parse(s).map_err(invalid)?;

        Ok(Message {
            // Servers relay prefixes verbatim, so the lenient form is used.
            prefix: parsed.prefix.map(Prefix::new_from_str),
            command: parsed.command.to_owned(),
            params: parsed.params.iter().map(|p| (*p).to_owned()).collect(),
            trailing: parsed.trailing.map(str::to_owned),
        })
    }
}

/// Parse one raw protocol line.
///
/// Line terminators are stripped first. A line that is blank afterwards
/// yields `Ok(None)`; a line without a command token is an
/// [`ProtocolError::InvalidMessage`], which callers should log and skip.
///
/// ```
/// use asif_proto::parse_line;
///
/// assert!(parse_line("\r\n").unwrap().is_none());
/// assert!(parse_line(":only.a.prefix\r\n").is_err());
///
/// let ping = parse_line("PING :abc123\r\n").unwrap().unwrap();
/// assert_eq!(ping.trailing.as_deref(), Some("abc123"));
/// ```
pub fn parse_line(line: &str) -> Result<Option<Message>, ProtocolError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(None);
    }
    line.parse().map(Some)
}

/// Parse one raw protocol line from bytes, replacing invalid UTF-8.
pub fn parse_bytes(line: &[u8]) -> Result<Option<Message>, ProtocolError> {
    parse_line(&String::from_utf8_lossy(line))
}
