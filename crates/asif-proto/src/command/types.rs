use smallvec::SmallVec;

use crate::error::MessageParseError;

use super::util::{needs_colon_prefix, validate_middle, validate_param};

/// An outgoing IRC command.
///
/// Only the commands the client emits itself have dedicated variants; anything
/// else goes through [`Command::Raw`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `PASS <password>`
    Pass(String),
    /// `NICK <nickname>`
    Nick(String),
    /// `USER <user> 0 * :<realname>`
    User {
        /// Username (ident).
        user: String,
        /// Free-form real name.
        realname: String,
    },
    /// `JOIN <channel> [<key>]`
    Join(String, Option<String>),
    /// `PART <channel> [:<message>]`
    Part(String, Option<String>),
    /// `PRIVMSG <target> :<text>`
    Privmsg(String, String),
    /// `NOTICE <target> :<text>`
    Notice(String, String),
    /// `PONG <token>`
    Pong(String),
    /// `QUIT [:<message>]`
    Quit(Option<String>),
    /// Any other verb with its arguments; the last argument is sent in
    /// trailing form when it needs to be.
    Raw(String, Vec<String>),
}

/// How the last argument of a command is rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Trailing {
    /// Colon-prefixed only when the argument requires it.
    IfNeeded,
    /// Always colon-prefixed.
    Always,
}

impl Command {
    /// The protocol verb this command renders with.
    pub fn verb(&self) -> &str {
        match self {
            Command::Pass(_) => "PASS",
            Command::Nick(_) => "NICK",
            Command::User { .. } => "USER",
            Command::Join(..) => "JOIN",
            Command::Part(..) => "PART",
            Command::Privmsg(..) => "PRIVMSG",
            Command::Notice(..) => "NOTICE",
            Command::Pong(_) => "PONG",
            Command::Quit(_) => "QUIT",
            Command::Raw(verb, _) => verb.as_str(),
        }
    }

    /// Arguments in wire order and the rule for rendering the last one.
    pub(crate) fn parts(&self) -> (SmallVec<[&str; 4]>, Trailing) {
        use Trailing::*;

        let mut args: SmallVec<[&str; 4]> = SmallVec::new();
        let trailing = match self {
            Command::Pass(p) | Command::Nick(p) | Command::Pong(p) => {
                args.push(p);
                IfNeeded
            }
            Command::User { user, realname } => {
                args.extend([user.as_str(), "0", "*", realname.as_str()]);
                Always
            }
            Command::Join(chan, key) => {
                args.push(chan);
                args.extend(key.as_deref());
                IfNeeded
            }
            Command::Part(chan, msg) => {
                args.push(chan);
                match msg {
                    Some(msg) => {
                        args.push(msg);
                        Always
                    }
                    None => IfNeeded,
                }
            }
            Command::Privmsg(target, text) | Command::Notice(target, text) => {
                args.extend([target.as_str(), text.as_str()]);
                Always
            }
            Command::Quit(msg) => {
                args.extend(msg.as_deref());
                Always
            }
            Command::Raw(_, raw_args) => {
                args.extend(raw_args.iter().map(String::as_str));
                IfNeeded
            }
        };

        (args, trailing)
    }

    /// Check that the command renders to exactly one well-formed line.
    ///
    /// Every argument is rejected if it contains CR, LF or NUL. Arguments
    /// before the last must be single words, and a [`Command::Raw`] verb must
    /// be alphanumeric.
    ///
    /// ```
    /// use asif_proto::command;
    ///
    /// assert!(command::privmsg("#chan", "hello world").validate().is_ok());
    /// assert!(command::privmsg("#chan", "hi\r\nQUIT").validate().is_err());
    /// assert!(command::privmsg("#a #b", "hi").validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), MessageParseError> {
        let verb = self.verb();
        if verb.is_empty() || !verb.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(MessageParseError::InvalidCommand);
        }

        let (args, trailing) = self.parts();
        if let Some((last, middle)) = args.split_last() {
            for param in middle {
                validate_middle(param)?;
            }
            match trailing {
                Trailing::Always => validate_param(last)?,
                Trailing::IfNeeded if needs_colon_prefix(last) => validate_param(last)?,
                Trailing::IfNeeded => validate_middle(last)?,
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbs() {
        assert_eq!(Command::Pong("x".into()).verb(), "PONG");
        assert_eq!(Command::Raw("WHOIS".into(), vec![]).verb(), "WHOIS");
    }

    #[test]
    fn test_validate_rejects_bad_raw_verb() {
        assert_eq!(
            Command::Raw("".into(), vec![]).validate(),
            Err(MessageParseError::InvalidCommand)
        );
        assert_eq!(
            Command::Raw("PRIVMSG #a :x\r\nQUIT".into(), vec![]).validate(),
            Err(MessageParseError::InvalidCommand)
        );
    }

    #[test]
    fn test_validate_rejects_injection_anywhere() {
        let cases = [
            Command::Nick("bot\r\nQUIT".into()),
            Command::Join("#a\n".into(), None),
            Command::Notice("alice".into(), "a\0b".into()),
            Command::Quit(Some("bye\r\nJOIN #x".into())),
            Command::Raw("MODE".into(), vec!["#c".into(), "+k\nx".into()]),
        ];
        for cmd in cases {
            assert!(
                matches!(cmd.validate(), Err(MessageParseError::InvalidArgument(_))),
                "{:?} should be rejected",
                cmd
            );
        }
    }

    #[test]
    fn test_validate_allows_trailing_spaces() {
        assert!(Command::Quit(Some("see you all".into())).validate().is_ok());
        assert!(Command::Raw("AWAY".into(), vec!["gone fishing".into()])
            .validate()
            .is_ok());
        assert!(Command::Pong("".into()).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_spaced_middle() {
        let cmd = Command::Join("#a #b".into(), Some("key".into()));
        assert!(cmd.validate().is_err());
    }
}
