//! Handler context.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use asif_proto::Message;
use tokio::task::JoinHandle;

use crate::error::ClientError;
use super::HandlerResult;
use crate::network::ClientHandle;

/// Named groups captured by a message pattern.
pub type Captures = HashMap<String, String>;

/// The event a handler was invoked for.
#[derive(Debug, Clone)]
pub enum Event {
    /// Registration was acknowledged by the server.
    Connected,
    /// A parsed message from the server.
    Message(Arc<Message>),
    /// We joined a channel and its NAMES listing has ended.
    Joined { channel: String },
    /// The connection ended. `reason` is set when it ended with an error.
    Disconnected { reason: Option<String> },
}

/// Everything a handler gets: the triggering event, pattern captures and a
/// handle to the connection.
///
/// Contexts are cheap to clone and may be moved into spawned tasks.
#[derive(Debug, Clone)]
pub struct Context {
    event: Event,
    captures: Arc<Captures>,
    handle: ClientHandle,
}

impl Context {
    pub(crate) fn new(event: Event, captures: Captures, handle: ClientHandle) -> Self {
        Self {
            event,
            captures: Arc::new(captures),
            handle,
        }
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    /// The triggering message, for message and command handlers.
    pub fn message(&self) -> Option<&Message> {
        match &self.event {
            Event::Message(msg) => Some(msg),
            _ => None,
        }
    }

    /// Text of the triggering PRIVMSG or NOTICE.
    pub fn text(&self) -> Option<&str> {
        self.message().and_then(Message::text)
    }

    /// The joined channel, for join handlers.
    pub fn channel(&self) -> Option<&str> {
        match &self.event {
            Event::Joined { channel } => Some(channel.as_str()),
            _ => None,
        }
    }

    /// Nickname of the message sender.
    pub fn sender(&self) -> Option<&str> {
        self.message().and_then(Message::source_nickname)
    }

    /// Value of a named group from the handler's pattern.
    pub fn capture(&self, name: &str) -> Option<&str> {
        self.captures.get(name).map(String::as_str)
    }

    pub fn captures(&self) -> &Captures {
        &self.captures
    }

    pub fn handle(&self) -> &ClientHandle {
        &self.handle
    }

    /// Where a reply to the triggering message should go: the channel for
    /// channel messages and joins, the sender for private ones.
    pub fn reply_target(&self) -> Option<String> {
        if let Some(channel) = self.channel() {
            return Some(channel.to_string());
        }
        let chantypes = self.handle.chantypes();
        self.message()
            .and_then(|msg| msg.origin_with(&chantypes))
            .map(str::to_string)
    }

    /// Reply to the triggering message.
    ///
    /// Notices are answered with a NOTICE, everything else with a PRIVMSG.
    pub async fn reply(&self, text: &str) -> Result<(), ClientError> {
        let target = self.reply_target().ok_or(ClientError::NoReplyTarget)?;
        if self.message().is_some_and(Message::is_notice) {
            self.handle.notice(&target, text).await
        } else {
            self.handle.privmsg(&target, text).await
        }
    }

    /// Shorthand for [`ClientHandle::spawn`].
    pub fn spawn<F>(&self, name: impl Into<String>, future: F) -> JoinHandle<()>
    where
        F: Future<Output = HandlerResult> + Send + 'static,
    {
        self.handle.spawn(name, future)
    }

    /// Reply with a NOTICE regardless of the triggering message kind.
    pub async fn reply_notice(&self, text: &str) -> Result<(), ClientError> {
        let target = self.reply_target().ok_or(ClientError::NoReplyTarget)?;
        self.handle.notice(&target, text).await
    }
}
