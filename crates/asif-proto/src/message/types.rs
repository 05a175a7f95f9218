use crate::chan::{ChannelExt, DEFAULT_CHANTYPES};
use crate::prefix::Prefix;

/// An owned, parsed IRC message.
///
/// One value is produced per incoming protocol line. The middle parameters
/// and the `:`-introduced trailing parameter are kept apart so that callers
/// can tell `PONG token` from `PONG :token` if they care to.
///
/// # Example
///
/// ```
/// use asif_proto::Message;
///
/// let msg: Message = ":nick!user@host PRIVMSG #channel :Hello!".parse().unwrap();
/// assert_eq!(msg.source_nickname(), Some("nick"));
/// assert_eq!(msg.params, vec!["#channel"]);
/// assert_eq!(msg.trailing.as_deref(), Some("Hello!"));
/// ```
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Message {
    /// Message prefix/source (e.g., `nick!user@host`).
    pub prefix: Option<Prefix>,
    /// The command verb or three-digit numeric, case preserved.
    pub command: String,
    /// Middle parameters.
    pub params: Vec<String>,
    /// Trailing parameter, if the line carried one.
    pub trailing: Option<String>,
}

impl Message {
    /// Get the nickname from the message prefix, if present.
    pub fn source_nickname(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nick)
    }

    /// Check the command verb, ignoring ASCII case.
    pub fn is_command(&self, verb: &str) -> bool {
        self.command.eq_ignore_ascii_case(verb)
    }

    /// Whether this is a NOTICE.
    pub fn is_notice(&self) -> bool {
        self.is_command("NOTICE")
    }

    /// Message text: the trailing parameter of a PRIVMSG or NOTICE.
    pub fn text(&self) -> Option<&str> {
        if self.is_command("PRIVMSG") || self.is_notice() {
            self.trailing.as_deref()
        } else {
            None
        }
    }

    /// Whether the command is a three-digit numeric reply.
    pub fn is_numeric(&self) -> bool {
        self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit())
    }

    /// The numeric reply code, if this is a numeric reply.
    pub fn numeric_code(&self) -> Option<u16> {
        if self.is_numeric() {
            self.command.parse().ok()
        } else {
            None
        }
    }

    /// The `i`th argument, counting middle parameters first and the trailing
    /// parameter last.
    pub fn arg(&self, i: usize) -> Option<&str> {
        self.args().nth(i)
    }

    /// All arguments in wire order, trailing parameter included.
    pub fn args(&self) -> impl Iterator<Item = &str> + '_ {
        self.params
            .iter()
            .map(String::as_str)
            .chain(self.trailing.as_deref())
    }

    /// Where a reply to this message should go, assuming the default
    /// channel prefixes.
    ///
    /// See [`Message::origin_with`].
    pub fn origin(&self) -> Option<&str> {
        self.origin_with(DEFAULT_CHANTYPES)
    }

    /// Where a reply to this message should go.
    ///
    /// When the first argument is a channel name under `chantypes`, that is
    /// the channel; otherwise it is the sender's nickname. Returns `None` for
    /// messages with neither, such as a bare `PING`.
    ///
    /// ```
    /// use asif_proto::Message;
    ///
    /// let public: Message = ":alice!a@h PRIVMSG #chan :hi".parse().unwrap();
    /// assert_eq!(public.origin(), Some("#chan"));
    ///
    /// let private: Message = ":alice!a@h PRIVMSG bot :hi".parse().unwrap();
    /// assert_eq!(private.origin(), Some("alice"));
    /// ```
    pub fn origin_with(&self, chantypes: &str) -> Option<&str> {
        match self.arg(0) {
            Some(target) if target.is_channel_name_in(chantypes) => Some(target),
            _ => self.source_nickname(),
        }
    }
}
