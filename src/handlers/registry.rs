//! Handler registry and dispatch.
//!
//! The `Registry` holds registrations in the order they were made. Dispatch
//! walks them in that order and starts one tracked task per match, so
//! handlers never run on the read loop and one slow or failing handler
//! cannot hold up another.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use asif_proto::Message;
use tokio::task::JoinHandle;
use tracing::{Instrument, Level, debug, span};

use super::context::{Captures, Context, Event};
use super::filter::MessageFilter;
use super::Handler;
use crate::network::ClientHandle;
use crate::scheduler::TaskKind;

/// When a handler runs.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// Once per connection, after the server acknowledges registration.
    Connected,
    /// Once per connection, after it ends.
    Disconnected,
    /// PRIVMSG and NOTICE passing the filter, after registration.
    Message(MessageFilter),
    /// Every message with this command or numeric, except PING.
    Command(String),
    /// After we join a channel and its NAMES listing ends. `None` matches
    /// every channel.
    Join(Option<String>),
}

impl Trigger {
    fn kind(&self) -> TaskKind {
        match self {
            Trigger::Connected => TaskKind::OnConnected,
            Trigger::Disconnected => TaskKind::OnDisconnected,
            Trigger::Message(_) | Trigger::Command(_) => TaskKind::OnMessage,
            Trigger::Join(_) => TaskKind::OnJoin,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Connected => f.write_str("on_connected"),
            Trigger::Disconnected => f.write_str("on_disconnected"),
            Trigger::Message(filter) => write!(f, "on_message({filter})"),
            Trigger::Command(verb) => write!(f, "on_command({})", verb.to_ascii_uppercase()),
            Trigger::Join(Some(channel)) => write!(f, "on_join({channel})"),
            Trigger::Join(None) => f.write_str("on_join"),
        }
    }
}

struct Registration {
    label: String,
    trigger: Trigger,
    handler: Arc<dyn Handler>,
    invocations: AtomicU64,
}

/// Registry of event handlers.
#[derive(Default)]
pub struct Registry {
    entries: Vec<Registration>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Handlers for the same event run in registration
    /// order.
    pub fn register<H: Handler>(&mut self, trigger: Trigger, handler: H) {
        let label = format!("{}#{}", trigger, self.entries.len());
        debug!(handler = %label, "Registered handler");
        self.entries.push(Registration {
            label,
            trigger,
            handler: Arc::new(handler),
            invocations: AtomicU64::new(0),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Invocation counts per handler label, most used first.
    pub fn stats(&self) -> Vec<(String, u64)> {
        let mut stats: Vec<_> = self
            .entries
            .iter()
            .map(|reg| (reg.label.clone(), reg.invocations.load(Ordering::Relaxed)))
            .collect();
        stats.sort_by(|a, b| b.1.cmp(&a.1));
        stats
    }

    /// Start every handler matching a parsed message. Returns how many were
    /// started.
    pub(crate) fn dispatch_message(&self, msg: &Arc<Message>, handle: &ClientHandle) -> usize {
        let registered = handle.is_registered();
        let chantypes = handle.chantypes();
        let mut started = 0;

        for reg in &self.entries {
            let captures = match &reg.trigger {
                Trigger::Command(verb) if msg.is_command(verb) => Captures::new(),
                Trigger::Message(filter) if registered => match filter.matches(msg, &chantypes) {
                    Some(captures) => captures,
                    None => continue,
                },
                _ => continue,
            };

            let ctx = Context::new(Event::Message(Arc::clone(msg)), captures, handle.clone());
            self.start(reg, ctx, &msg.command);
            started += 1;
        }

        started
    }

    /// Start the join handlers for `channel`. Returns how many were started.
    pub(crate) fn dispatch_joined(&self, channel: &str, handle: &ClientHandle) -> usize {
        let event = Event::Joined {
            channel: channel.to_string(),
        };
        let mut started = 0;

        for reg in &self.entries {
            let Trigger::Join(wanted) = &reg.trigger else {
                continue;
            };
            if wanted.as_ref().is_some_and(|wanted| !wanted.eq_ignore_ascii_case(channel)) {
                continue;
            }

            let ctx = Context::new(event.clone(), Captures::new(), handle.clone());
            self.start(reg, ctx, "JOINED");
            started += 1;
        }

        started
    }

    pub(crate) fn dispatch_connected(&self, handle: &ClientHandle) -> usize {
        self.dispatch_lifecycle(&Event::Connected, handle).len()
    }

    /// Start the disconnect handlers and hand back their tasks so the caller
    /// can wait for them.
    pub(crate) fn dispatch_disconnected(
        &self,
        reason: Option<String>,
        handle: &ClientHandle,
    ) -> Vec<JoinHandle<()>> {
        self.dispatch_lifecycle(&Event::Disconnected { reason }, handle)
    }

    fn dispatch_lifecycle(&self, event: &Event, handle: &ClientHandle) -> Vec<JoinHandle<()>> {
        let (wanted, name) = match event {
            Event::Connected => (TaskKind::OnConnected, "CONNECTED"),
            Event::Disconnected { .. } => (TaskKind::OnDisconnected, "DISCONNECTED"),
            Event::Message(_) | Event::Joined { .. } => return Vec::new(),
        };

        self.entries
            .iter()
            .filter(|reg| reg.trigger.kind() == wanted)
            .map(|reg| {
                let ctx = Context::new(event.clone(), Captures::new(), handle.clone());
                self.start(reg, ctx, name)
            })
            .collect()
    }

    fn start(&self, reg: &Registration, ctx: Context, event: &str) -> JoinHandle<()> {
        reg.invocations.fetch_add(1, Ordering::Relaxed);

        let handler = Arc::clone(&reg.handler);
        let tracker = Arc::clone(ctx.handle().tracker());
        let irc_span = span!(
            Level::DEBUG,
            "irc.handler",
            handler = %reg.label,
            event = %event,
        );

        tracker.spawn(
            reg.label.clone(),
            reg.trigger.kind(),
            async move { handler.handle(ctx).await }.instrument(irc_span),
        )
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|reg| &reg.label))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::handle::SessionState;
    use crate::scheduler::{HandlerFailure, TaskTracker};
    use regex::Regex;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn handle(registered: bool) -> (ClientHandle, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(16);
        let state = Arc::new(SessionState::new("asif"));
        state.registered.store(registered, Ordering::Release);
        (
            ClientHandle::new(tx, state, Arc::new(TaskTracker::new())),
            rx,
        )
    }

    fn msg(line: &str) -> Arc<Message> {
        Arc::new(line.parse().unwrap())
    }

    fn ping_pong() -> Trigger {
        Trigger::Message(MessageFilter::new().pattern(Regex::new("^!ping").unwrap()))
    }

    #[tokio::test]
    async fn test_matching_handler_replies() {
        let (handle, mut rx) = handle(true);
        let mut registry = Registry::new();
        registry.register(ping_pong(), |ctx: Context| async move {
            ctx.reply("pong").await?;
            Ok(())
        });

        let started = registry.dispatch_message(&msg(":alice!a@h PRIVMSG #c :!ping"), &handle);
        assert_eq!(started, 1);
        assert_eq!(rx.recv().await.unwrap(), "PRIVMSG #c :pong");

        let started = registry.dispatch_message(&msg(":alice!a@h PRIVMSG #c :ping"), &handle);
        assert_eq!(started, 0);
    }

    #[tokio::test]
    async fn test_text_handlers_wait_for_registration() {
        let (handle, _rx) = handle(false);
        let mut registry = Registry::new();
        registry.register(ping_pong(), |_ctx: Context| async { Ok(()) });

        assert_eq!(
            registry.dispatch_message(&msg(":alice!a@h PRIVMSG #c :!ping"), &handle),
            0
        );
    }

    #[tokio::test]
    async fn test_command_trigger_ignores_case() {
        let (handle, _rx) = handle(false);
        let mut registry = Registry::new();
        registry.register(Trigger::Command("join".into()), |_ctx: Context| async { Ok(()) });
        registry.register(Trigger::Command("001".into()), |_ctx: Context| async { Ok(()) });

        assert_eq!(registry.dispatch_message(&msg(":bob!b@h JOIN #c"), &handle), 1);
        assert_eq!(registry.dispatch_message(&msg(":srv 001 asif :Welcome"), &handle), 1);
        assert_eq!(registry.dispatch_message(&msg(":bob!b@h PART #c"), &handle), 0);
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_stop_others() {
        let (handle, mut rx) = handle(true);
        let (fail_tx, mut fail_rx) = mpsc::unbounded_channel();
        handle
            .tracker()
            .set_failure_hook(Arc::new(move |failure: &HandlerFailure| {
                let _ = fail_tx.send(failure.name.clone());
            }));

        let mut registry = Registry::new();
        registry.register(ping_pong(), |_ctx: Context| async {
            anyhow::bail!("first handler broke")
        });
        registry.register(ping_pong(), |ctx: Context| async move {
            ctx.reply("still here").await?;
            Ok(())
        });

        assert_eq!(
            registry.dispatch_message(&msg(":alice!a@h PRIVMSG #c :!ping"), &handle),
            2
        );
        assert_eq!(rx.recv().await.unwrap(), "PRIVMSG #c :still here");
        assert_eq!(fail_rx.recv().await.unwrap(), "on_message(^!ping)#0");
    }

    #[tokio::test]
    async fn test_slow_handler_does_not_block_dispatch() {
        let (handle, mut rx) = handle(true);
        let mut registry = Registry::new();
        registry.register(ping_pong(), |_ctx: Context| async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        });
        registry.register(ping_pong(), |ctx: Context| async move {
            ctx.reply("fast").await?;
            Ok(())
        });

        registry.dispatch_message(&msg(":alice!a@h PRIVMSG #c :!ping"), &handle);
        let reply = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap();
        assert_eq!(reply.as_deref(), Some("PRIVMSG #c :fast"));
        assert!(!handle.tasks().is_empty());
    }

    #[tokio::test]
    async fn test_lifecycle_dispatch() {
        let (handle, _rx) = handle(true);
        let seen = Arc::new(AtomicBool::new(false));
        let mut registry = Registry::new();

        let flag = Arc::clone(&seen);
        registry.register(Trigger::Disconnected, move |ctx: Context| {
            let flag = Arc::clone(&flag);
            async move {
                if let Event::Disconnected { reason } = ctx.event() {
                    assert_eq!(reason.as_deref(), Some("gone"));
                    flag.store(true, Ordering::SeqCst);
                }
                Ok(())
            }
        });
        registry.register(Trigger::Connected, |_ctx: Context| async { Ok(()) });

        assert_eq!(registry.dispatch_connected(&handle), 1);
        for task in registry.dispatch_disconnected(Some("gone".into()), &handle) {
            task.await.unwrap();
        }
        assert!(seen.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_join_handlers_filter_by_channel() {
        let (handle, mut rx) = handle(true);
        let mut registry = Registry::new();
        registry.register(Trigger::Join(Some("#Rust".into())), |ctx: Context| async move {
            ctx.reply("hi rust").await?;
            Ok(())
        });
        registry.register(Trigger::Join(None), |ctx: Context| async move {
            let channel = ctx.channel().unwrap_or_default().to_string();
            ctx.handle().notice("owner", &format!("joined {channel}")).await?;
            Ok(())
        });

        assert_eq!(registry.dispatch_joined("#go", &handle), 1);
        assert_eq!(rx.recv().await.unwrap(), "NOTICE owner :joined #go");

        assert_eq!(registry.dispatch_joined("#rust", &handle), 2);
        let mut lines = vec![rx.recv().await.unwrap(), rx.recv().await.unwrap()];
        lines.sort();
        assert_eq!(lines, vec!["NOTICE owner :joined #rust", "PRIVMSG #rust :hi rust"]);

        assert_eq!(registry.dispatch_connected(&handle), 0);
        assert_eq!(
            registry.stats(),
            vec![
                ("on_join#1".to_string(), 2),
                ("on_join(#Rust)#0".to_string(), 1),
            ]
        );
    }

    #[tokio::test]
    async fn test_stats_count_invocations() {
        let (handle, _rx) = handle(true);
        let mut registry = Registry::new();
        registry.register(Trigger::Command("PRIVMSG".into()), |_ctx: Context| async { Ok(()) });
        registry.register(Trigger::Connected, |_ctx: Context| async { Ok(()) });

        registry.dispatch_message(&msg(":a!a@h PRIVMSG #c :one"), &handle);
        registry.dispatch_message(&msg(":a!a@h PRIVMSG #c :two"), &handle);

        assert_eq!(
            registry.stats(),
            vec![
                ("on_command(PRIVMSG)#0".to_string(), 2),
                ("on_connected#1".to_string(), 0),
            ]
        );
    }
}
