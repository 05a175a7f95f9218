use std::fmt::{self, Write};

use crate::error::MessageParseError;

/// Check if a string needs colon-prefixing as a trailing IRC argument.
pub fn needs_colon_prefix(s: &str) -> bool {
    s.is_empty() || s.contains(' ') || s.starts_with(':')
}

/// Reject parameters that would end the line early or smuggle in a second one.
pub(crate) fn validate_param(param: &str) -> Result<(), MessageParseError> {
    if param.bytes().any(|b| b == b'\r' || b == b'\n' || b == 0) {
        return Err(MessageParseError::InvalidArgument(format!(
            "parameter contains a line break or NUL: {:?}",
            param
        )));
    }
    Ok(())
}

/// A middle parameter must be a single non-empty word not starting with `:`.
pub(crate) fn validate_middle(param: &str) -> Result<(), MessageParseError> {
    validate_param(param)?;
    if needs_colon_prefix(param) {
        return Err(MessageParseError::InvalidArgument(format!(
            "middle parameter must be a single word: {:?}",
            param
        )));
    }
    Ok(())
}

/// Write a command with arguments.
/// The last argument is treated as trailing and gets a `:` prefix if needed.
pub(crate) fn write_cmd<W: Write + ?Sized>(sink: &mut W, cmd: &str, args: &[&str]) -> fmt::Result {
    sink.write_str(cmd)?;

    let Some((trailing, middle)) = args.split_last() else {
        return Ok(());
    };

    for param in middle {
        sink.write_char(' ')?;
        sink.write_str(param)?;
    }

    sink.write_char(' ')?;
    if needs_colon_prefix(trailing) {
        sink.write_char(':')?;
    }
    sink.write_str(trailing)
}

/// Write a command with a freeform (always colon-prefixed) trailing argument.
pub(crate) fn write_cmd_freeform<W: Write + ?Sized>(
    sink: &mut W,
    cmd: &str,
    args: &[&str],
) -> fmt::Result {
    sink.write_str(cmd)?;

    let Some((trailing, middle)) = args.split_last() else {
        return Ok(());
    };

    for param in middle {
        sink.write_char(' ')?;
        sink.write_str(param)?;
    }

    sink.write_str(" :")?;
    sink.write_str(trailing)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(cmd: &str, args: &[&str]) -> String {
        let mut out = String::new();
        write_cmd(&mut out, cmd, args).unwrap();
        out
    }

    fn freeform(cmd: &str, args: &[&str]) -> String {
        let mut out = String::new();
        write_cmd_freeform(&mut out, cmd, args).unwrap();
        out
    }

    #[test]
    fn test_needs_colon_prefix() {
        assert!(needs_colon_prefix(""));
        assert!(needs_colon_prefix("hello world"));
        assert!(needs_colon_prefix(":already has colon"));
        assert!(!needs_colon_prefix("simple"));
        assert!(!needs_colon_prefix("#channel"));
        assert!(!needs_colon_prefix("nick!user@host"));
    }

    #[test]
    fn test_write_cmd() {
        assert_eq!(cmd("MOTD", &[]), "MOTD");
        assert_eq!(cmd("NICK", &["testnick"]), "NICK testnick");
        assert_eq!(cmd("WHOIS", &["server", "nick"]), "WHOIS server nick");
        assert_eq!(cmd("QUIT", &["Goodbye world"]), "QUIT :Goodbye world");
        assert_eq!(cmd("AWAY", &[""]), "AWAY :");
    }

    #[test]
    fn test_write_cmd_freeform() {
        assert_eq!(freeform("MOTD", &[]), "MOTD");
        assert_eq!(freeform("QUIT", &["Goodbye"]), "QUIT :Goodbye");
        assert_eq!(
            freeform("PRIVMSG", &["#channel", ":ACTION waves"]),
            "PRIVMSG #channel ::ACTION waves"
        );
    }

    #[test]
    fn test_validate_param_rejects_injection() {
        assert!(validate_param("Hello\r\nQUIT").is_err());
        assert!(validate_param("nul\0byte").is_err());
        assert!(validate_param("fine text").is_ok());
    }

    #[test]
    fn test_validate_middle() {
        assert!(validate_middle("#chan").is_ok());
        assert!(validate_middle("two words").is_err());
        assert!(validate_middle("").is_err());
        assert!(validate_middle(":x").is_err());
    }
}
