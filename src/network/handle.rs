//! The handle through which handlers talk back to the connection.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use asif_proto::{Command, DEFAULT_CHANTYPES, Message, command};
use dashmap::{DashMap, DashSet};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::ClientError;
use crate::handlers::{HandlerResult, MessageFilter};
use crate::scheduler::{TaskInfo, TaskKind, TaskTracker};

/// Nickname prefixes assumed until the server sends `PREFIX`.
pub(crate) const DEFAULT_NICK_PREFIXES: &str = "@+";

/// Members of one channel, keyed by lowercased nickname.
type Roster = BTreeMap<String, String>;

fn key(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// What a one-shot waiter is waiting for.
enum WaitFor {
    Message(MessageFilter),
    Command(String),
}

struct Waiter {
    wait_for: WaitFor,
    tx: oneshot::Sender<Arc<Message>>,
}

/// Connection state, owned by the read loop and observed through handles.
pub(crate) struct SessionState {
    pub nick: RwLock<String>,
    pub chantypes: RwLock<String>,
    pub nick_prefixes: RwLock<String>,
    pub channels: DashSet<String>,
    /// Channels we joined whose NAMES listing has not ended yet.
    pub pending_joins: DashSet<String>,
    rosters: DashMap<String, Roster>,
    waiters: Mutex<Vec<Waiter>>,
    pub registered: AtomicBool,
    pub quitting: AtomicBool,
}

impl SessionState {
    pub fn new(nick: &str) -> Self {
        Self {
            nick: RwLock::new(nick.to_string()),
            chantypes: RwLock::new(DEFAULT_CHANTYPES.to_string()),
            nick_prefixes: RwLock::new(DEFAULT_NICK_PREFIXES.to_string()),
            channels: DashSet::new(),
            pending_joins: DashSet::new(),
            rosters: DashMap::new(),
            waiters: Mutex::new(Vec::new()),
            registered: AtomicBool::new(false),
            quitting: AtomicBool::new(false),
        }
    }

    pub fn is_me(&self, nick: &str) -> bool {
        self.nick.read().eq_ignore_ascii_case(nick)
    }

    /// Record our own JOIN. The roster starts empty and fills from NAMES.
    pub fn add_channel(&self, channel: &str) {
        self.channels.insert(channel.to_string());
        self.pending_joins.insert(key(channel));
        self.rosters.insert(key(channel), Roster::new());
    }

    pub fn remove_channel(&self, channel: &str) {
        self.channels.retain(|joined| !joined.eq_ignore_ascii_case(channel));
        self.pending_joins.remove(&key(channel));
        self.rosters.remove(&key(channel));
    }

    /// Add a nickname to a channel we are in. Any mode prefixes (`@`, `+`,
    /// ...) are stripped.
    pub fn add_member(&self, channel: &str, nick: &str) {
        let nick = {
            let prefixes = self.nick_prefixes.read();
            nick.trim_start_matches(|c| prefixes.contains(c)).to_string()
        };
        if nick.is_empty() {
            return;
        }
        if let Some(mut roster) = self.rosters.get_mut(&key(channel)) {
            roster.insert(key(&nick), nick);
        }
    }

    pub fn remove_member(&self, channel: &str, nick: &str) {
        if let Some(mut roster) = self.rosters.get_mut(&key(channel)) {
            roster.remove(&key(nick));
        }
    }

    /// A user left the network: drop them from every roster.
    pub fn forget_member(&self, nick: &str) {
        for mut roster in self.rosters.iter_mut() {
            roster.remove(&key(nick));
        }
    }

    pub fn rename_member(&self, old: &str, new: &str) {
        for mut roster in self.rosters.iter_mut() {
            if roster.remove(&key(old)).is_some() {
                roster.insert(key(new), new.to_string());
            }
        }
    }

    /// Members of a channel we are in, sorted case-insensitively.
    pub fn members(&self, channel: &str) -> Option<Vec<String>> {
        self.rosters
            .get(&key(channel))
            .map(|roster| roster.values().cloned().collect())
    }

    /// Hand a message to every waiter it satisfies. Waiters whose receiver
    /// is gone are dropped on the way.
    pub fn wake(&self, msg: &Arc<Message>) {
        let mut waiters = self.waiters.lock();
        if waiters.is_empty() {
            return;
        }
        let registered = self.registered.load(Ordering::Acquire);
        let chantypes = self.chantypes.read().clone();

        for waiter in std::mem::take(&mut *waiters) {
            if waiter.tx.is_closed() {
                continue;
            }
            let hit = match &waiter.wait_for {
                WaitFor::Command(verb) => msg.is_command(verb),
                WaitFor::Message(filter) => registered && filter.matches(msg, &chantypes).is_some(),
            };
            if hit {
                let _ = waiter.tx.send(Arc::clone(msg));
            } else {
                waiters.push(waiter);
            }
        }
    }

    fn add_waiter(&self, wait_for: WaitFor) -> oneshot::Receiver<Arc<Message>> {
        let (tx, rx) = oneshot::channel();
        self.waiters.lock().push(Waiter { wait_for, tx });
        rx
    }

    /// Forget everything tied to the connection that just ended. Pending
    /// waiters see the session as disconnected.
    pub fn reset(&self) {
        self.registered.store(false, Ordering::Release);
        self.channels.clear();
        self.pending_joins.clear();
        self.rosters.clear();
        self.waiters.lock().clear();
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("nick", &*self.nick.read())
            .field("chantypes", &*self.chantypes.read())
            .field("channels", &self.channels)
            .field("registered", &self.registered)
            .field("quitting", &self.quitting)
            .finish_non_exhaustive()
    }
}

/// Cloneable handle to a live connection.
///
/// Every send goes through one queue drained by a single writer, so lines
/// from concurrent handlers never interleave. Once the connection has ended,
/// sends fail with [`ClientError::Disconnected`].
#[derive(Clone, Debug)]
pub struct ClientHandle {
    outgoing: mpsc::Sender<String>,
    state: Arc<SessionState>,
    tasks: Arc<TaskTracker>,
}

impl ClientHandle {
    pub(crate) fn new(
        outgoing: mpsc::Sender<String>,
        state: Arc<SessionState>,
        tasks: Arc<TaskTracker>,
    ) -> Self {
        Self {
            outgoing,
            state,
            tasks,
        }
    }

    pub(crate) fn state(&self) -> &SessionState {
        &self.state
    }

    pub(crate) fn tracker(&self) -> &Arc<TaskTracker> {
        &self.tasks
    }

    /// Queue a command for sending.
    ///
    /// Commands whose arguments would break the line (CR, LF, NUL, or spaces
    /// in a middle argument) are rejected before anything is queued.
    pub async fn send(&self, cmd: Command) -> Result<(), ClientError> {
        cmd.validate()?;
        self.send_line(cmd.to_string()).await
    }

    /// Queue a raw protocol line. Anything after the first line break is
    /// dropped.
    pub async fn send_raw(&self, line: impl Into<String>) -> Result<(), ClientError> {
        self.send_line(line.into()).await
    }

    async fn send_line(&self, line: String) -> Result<(), ClientError> {
        self.outgoing
            .send(line)
            .await
            .map_err(|_| ClientError::Disconnected)
    }

    pub async fn privmsg(&self, target: &str, text: &str) -> Result<(), ClientError> {
        self.send(command::privmsg(target, text)).await
    }

    pub async fn notice(&self, target: &str, text: &str) -> Result<(), ClientError> {
        self.send(command::notice(target, text)).await
    }

    pub async fn join(&self, channel: &str) -> Result<(), ClientError> {
        self.send(command::join(channel)).await
    }

    pub async fn part(&self, channel: &str, message: Option<&str>) -> Result<(), ClientError> {
        self.send(command::part(channel, message)).await
    }

    /// Ask the server to close the connection. The run ends normally once it
    /// does.
    pub async fn quit(&self, message: Option<&str>) -> Result<(), ClientError> {
        let cmd = command::quit(message);
        cmd.validate()?;
        // Set before queueing: the server may close as soon as it reads QUIT.
        self.state.quitting.store(true, Ordering::Release);
        let sent = self.send_line(cmd.to_string()).await;
        if sent.is_err() {
            self.state.quitting.store(false, Ordering::Release);
        }
        sent
    }

    /// Wait for the next PRIVMSG or NOTICE passing `filter`.
    ///
    /// The waiter is in place as soon as this is called, so create it before
    /// sending whatever provokes the reply. Resolves to
    /// [`ClientError::Disconnected`] if the connection ends first. Wrap it in
    /// `tokio::time::timeout` to give up earlier.
    pub fn await_message(
        &self,
        filter: MessageFilter,
    ) -> impl Future<Output = Result<Arc<Message>, ClientError>> + Send + 'static {
        self.waiter(WaitFor::Message(filter))
    }

    /// Wait for the next message with the given command or numeric. See
    /// [`await_message`](Self::await_message).
    pub fn await_command(
        &self,
        command: &str,
    ) -> impl Future<Output = Result<Arc<Message>, ClientError>> + Send + 'static {
        self.waiter(WaitFor::Command(command.to_string()))
    }

    fn waiter(
        &self,
        wait_for: WaitFor,
    ) -> impl Future<Output = Result<Arc<Message>, ClientError>> + Send + 'static {
        let rx = if self.is_connected() {
            Some(self.state.add_waiter(wait_for))
        } else {
            None
        };
        async move {
            match rx {
                Some(rx) => rx.await.map_err(|_| ClientError::Disconnected),
                None => Err(ClientError::Disconnected),
            }
        }
    }

    /// Current nickname, as last acknowledged by the server.
    pub fn nick(&self) -> String {
        self.state.nick.read().clone()
    }

    /// Channels currently joined, sorted.
    pub fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.state.channels.iter().map(|c| c.key().clone()).collect();
        channels.sort();
        channels
    }

    /// Nicknames in a joined channel, sorted, without mode prefixes. `None`
    /// when we are not in the channel.
    ///
    /// The list fills from the NAMES reply that follows our JOIN and then
    /// follows joins, parts, kicks, quits and nick changes.
    pub fn users(&self, channel: &str) -> Option<Vec<String>> {
        self.state.members(channel)
    }

    /// Channel prefix characters in effect (from `CHANTYPES`, default `#&`).
    pub fn chantypes(&self) -> String {
        self.state.chantypes.read().clone()
    }

    /// Whether the server has acknowledged registration.
    pub fn is_registered(&self) -> bool {
        self.state.registered.load(Ordering::Acquire)
    }

    /// Whether the connection is still accepting sends.
    pub fn is_connected(&self) -> bool {
        !self.outgoing.is_closed()
    }

    /// Run a future as a tracked background task.
    ///
    /// The task runs independently of the read loop and of the handler that
    /// spawned it. Errors and panics are reported like handler failures.
    pub fn spawn<F>(&self, name: impl Into<String>, future: F) -> JoinHandle<()>
    where
        F: Future<Output = HandlerResult> + Send + 'static,
    {
        self.tasks.spawn(name, TaskKind::Background, future)
    }

    /// Live handler and background tasks.
    pub fn tasks(&self) -> Vec<TaskInfo> {
        self.tasks.snapshot()
    }
}
