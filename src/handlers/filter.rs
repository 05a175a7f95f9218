//! Message filters for `on_message` handlers.

use std::fmt;
use std::sync::Arc;

use asif_proto::{ChannelExt, Message};
use regex::Regex;

use super::context::Captures;

type Predicate = Arc<dyn Fn(&Message) -> bool + Send + Sync>;

/// A channel or sender condition: an exact name (ASCII case-insensitive) or
/// a regex searched in the name.
#[derive(Debug, Clone)]
enum NameMatch {
    Exact(String),
    Pattern(Regex),
}

impl NameMatch {
    /// `None` when the name does not match, otherwise the named captures.
    fn matches(&self, name: &str, captures: &mut Captures) -> Option<()> {
        match self {
            NameMatch::Exact(expected) => name.eq_ignore_ascii_case(expected).then_some(()),
            NameMatch::Pattern(pattern) => collect(pattern, name, captures),
        }
    }
}

impl fmt::Display for NameMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameMatch::Exact(name) => f.write_str(name),
            NameMatch::Pattern(pattern) => write!(f, "/{}/", pattern.as_str()),
        }
    }
}

fn collect(pattern: &Regex, haystack: &str, captures: &mut Captures) -> Option<()> {
    let caps = pattern.captures(haystack)?;
    for name in pattern.capture_names().flatten() {
        if let Some(value) = caps.name(name) {
            captures.insert(name.to_string(), value.as_str().to_string());
        }
    }
    Some(())
}

/// Conditions a PRIVMSG or NOTICE must meet to trigger a handler.
///
/// Every condition that is set must hold. A filter with nothing set matches
/// every PRIVMSG and NOTICE. Named groups of every regex in the filter end up
/// in the handler's captures; on a name clash the sender's groups win over
/// the text's, and the channel's over both.
///
/// ```
/// use asif::MessageFilter;
/// use regex::Regex;
///
/// let filter = MessageFilter::new()
///     .pattern(Regex::new(r"^!roll (?P<sides>\d+)").unwrap())
///     .channel_pattern(Regex::new(r"^#(?P<game>\w+)-dice$").unwrap())
///     .matcher(|msg| msg.source_nickname() != Some("ChanServ"))
///     .notice(false);
/// ```
#[derive(Clone, Default)]
pub struct MessageFilter {
    pattern: Option<Regex>,
    text: Option<String>,
    channel: Option<NameMatch>,
    sender: Option<NameMatch>,
    notice: Option<bool>,
    matcher: Option<Predicate>,
}

impl MessageFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The text must contain a match of `pattern`. Named groups are handed
    /// to the handler as captures.
    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// The text must equal `text` exactly.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// The message must be addressed to `channel`.
    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(NameMatch::Exact(channel.into()));
        self
    }

    /// The message must be addressed to a channel whose name contains a
    /// match of `pattern`.
    pub fn channel_pattern(mut self, pattern: Regex) -> Self {
        self.channel = Some(NameMatch::Pattern(pattern));
        self
    }

    /// The message must come from `nick`.
    pub fn sender(mut self, nick: impl Into<String>) -> Self {
        self.sender = Some(NameMatch::Exact(nick.into()));
        self
    }

    /// The sender's nickname must contain a match of `pattern`.
    pub fn sender_pattern(mut self, pattern: Regex) -> Self {
        self.sender = Some(NameMatch::Pattern(pattern));
        self
    }

    /// Only notices (`true`) or only privmsgs (`false`).
    pub fn notice(mut self, notice: bool) -> Self {
        self.notice = Some(notice);
        self
    }

    /// Custom test; the message is accepted only if `matcher` returns true.
    pub fn matcher<F>(mut self, matcher: F) -> Self
    where
        F: Fn(&Message) -> bool + Send + Sync + 'static,
    {
        self.matcher = Some(Arc::new(matcher));
        self
    }

    /// Test a message, returning the named captures on a match.
    ///
    /// `chantypes` decides whether the message target is a channel.
    pub fn matches(&self, msg: &Message, chantypes: &str) -> Option<Captures> {
        let text = msg.text()?;
        let mut captures = Captures::new();

        if let Some(notice) = self.notice
            && msg.is_notice() != notice
        {
            return None;
        }

        if let Some(matcher) = &self.matcher
            && !matcher(msg)
        {
            return None;
        }

        if let Some(expected) = &self.text
            && text != expected
        {
            return None;
        }

        if let Some(pattern) = &self.pattern {
            collect(pattern, text, &mut captures)?;
        }

        if let Some(sender) = &self.sender {
            sender.matches(msg.source_nickname()?, &mut captures)?;
        }

        if let Some(channel) = &self.channel {
            let target = msg.arg(0)?;
            if !target.is_channel_name_in(chantypes) {
                return None;
            }
            channel.matches(target, &mut captures)?;
        }

        Some(captures)
    }
}

impl fmt::Debug for MessageFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageFilter")
            .field("pattern", &self.pattern)
            .field("text", &self.text)
            .field("channel", &self.channel)
            .field("sender", &self.sender)
            .field("notice", &self.notice)
            .field("matcher", &self.matcher.is_some())
            .finish()
    }
}

impl fmt::Display for MessageFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(pattern) = &self.pattern {
            parts.push(pattern.as_str().to_string());
        }
        if let Some(text) = &self.text {
            parts.push(format!("text={text:?}"));
        }
        if let Some(channel) = &self.channel {
            parts.push(format!("channel={channel}"));
        }
        if let Some(sender) = &self.sender {
            parts.push(format!("sender={sender}"));
        }
        if let Some(notice) = self.notice {
            parts.push(format!("notice={notice}"));
        }
        if self.matcher.is_some() {
            parts.push("matcher".to_string());
        }

        if parts.is_empty() {
            f.write_str("*")
        } else {
            f.write_str(&parts.join(" "))
        }
    }
}
