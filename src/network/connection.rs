//! The session loop.
//!
//! One `Session` drives one connection: it registers, then reads lines in
//! arrival order, answers PING itself, keeps the session state current and
//! hands everything else to the registry. All writes go through a single
//! writer task fed by a bounded queue.

use std::io;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use asif_proto::{Command, LineCodec, Message, command, parse_line};
use futures_util::future::join_all;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, WriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info, warn};

use super::handle::{ClientHandle, SessionState};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::handlers::Registry;
use crate::scheduler::TaskTracker;

/// Outgoing lines buffered before senders start waiting.
const OUTGOING_QUEUE: usize = 64;

const RPL_WELCOME: u16 = 1;
const RPL_ISUPPORT: u16 = 5;
const RPL_ENDOFMOTD: u16 = 376;
const RPL_NAMREPLY: u16 = 353;
const RPL_ENDOFNAMES: u16 = 366;
const ERR_NOMOTD: u16 = 422;
const ERR_NICKNAMEINUSE: u16 = 433;

/// Milestones a server message can complete.
#[derive(Debug, PartialEq, Eq)]
enum Tracked {
    Nothing,
    Registered,
    Joined(String),
}

pub(crate) struct Session<'a> {
    config: &'a ClientConfig,
    registry: &'a Registry,
    tasks: Arc<TaskTracker>,
}

impl<'a> Session<'a> {
    pub fn new(config: &'a ClientConfig, registry: &'a Registry, tasks: Arc<TaskTracker>) -> Self {
        Self {
            config,
            registry,
            tasks,
        }
    }

    /// Run the session to completion over an established stream.
    pub async fn run<S>(self, stream: S) -> Result<(), ClientError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let mut reader = FramedRead::new(read_half, LineCodec::new(&self.config.encoding)?);
        let sink = FramedWrite::new(write_half, LineCodec::new(&self.config.encoding)?);

        let (tx, rx) = mpsc::channel(OUTGOING_QUEUE);
        let state = Arc::new(SessionState::new(&self.config.nick));
        let handle = ClientHandle::new(tx, state, Arc::clone(&self.tasks));
        let mut writer = Some(tokio::spawn(write_loop(sink, rx)));

        let outcome = match self.register(&handle).await {
            Ok(()) => self.read_loop(&mut reader, &handle, &mut writer).await,
            Err(e) => Err(e),
        };

        // Stop the writer first so disconnect handlers see a closed queue.
        let outcome = settle_writer(outcome, writer.take()).await;

        handle.state().reset();

        match &outcome {
            Ok(()) => info!("Connection closed"),
            Err(e) => error!(error = %e, code = e.error_code(), "Connection lost"),
        }

        let reason = outcome.as_ref().err().map(ToString::to_string);
        join_all(self.registry.dispatch_disconnected(reason, &handle)).await;

        outcome
    }

    async fn register(&self, handle: &ClientHandle) -> Result<(), ClientError> {
        if let Some(password) = &self.config.password {
            handle.send(Command::Pass(password.clone())).await?;
        }
        for cmd in command::registration(&self.config.nick, &self.config.user, &self.config.realname) {
            handle.send(cmd).await?;
        }
        Ok(())
    }

    async fn read_loop<R>(
        &self,
        reader: &mut FramedRead<R, LineCodec>,
        handle: &ClientHandle,
        writer: &mut Option<JoinHandle<Result<(), ClientError>>>,
    ) -> Result<(), ClientError>
    where
        R: AsyncRead + Unpin,
    {
        let Some(writer_task) = writer.as_mut() else {
            return Err(ClientError::Disconnected);
        };

        loop {
            tokio::select! {
                line = reader.next() => match line {
                    Some(Ok(line)) => {
                        if let Err(e) = self.process_line(line, handle).await {
                            break Err(e);
                        }
                    }
                    Some(Err(e)) => break Err(e.into()),
                    None => break self.closed(handle),
                },
                written = &mut *writer_task => {
                    *writer = None;
                    return Err(writer_outcome(written));
                }
            }
        }
    }

    fn closed(&self, handle: &ClientHandle) -> Result<(), ClientError> {
        if handle.state().quitting.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(ClientError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "server closed the connection",
            )))
        }
    }

    async fn process_line(&self, line: String, handle: &ClientHandle) -> Result<(), ClientError> {
        debug!(raw = %line, "Received line");

        let msg = match parse_line(&line) {
            Ok(Some(msg)) => msg,
            Ok(None) => return Ok(()),
            Err(e) => {
                warn!(raw = %line, error = %e, "Skipping malformed line");
                return Ok(());
            }
        };

        if msg.is_command("PING") {
            let token = msg.arg(0).unwrap_or_default();
            return handle.send(command::pong(token)).await;
        }

        let tracked = self.track(&msg, handle).await?;

        let msg = Arc::new(msg);
        handle.state().wake(&msg);
        let started = self.registry.dispatch_message(&msg, handle);
        if started > 0 {
            debug!(command = %msg.command, handlers = started, "Dispatched message");
        }

        match tracked {
            Tracked::Registered => {
                info!(nick = %handle.nick(), "Registered");
                self.registry.dispatch_connected(handle);
                for channel in &self.config.channels {
                    handle.join(channel).await?;
                }
            }
            Tracked::Joined(channel) => {
                let users = handle.users(&channel).map_or(0, |users| users.len());
                info!(channel = %channel, users, "Joined channel");
                self.registry.dispatch_joined(&channel, handle);
            }
            Tracked::Nothing => {}
        }

        Ok(())
    }

    /// Update session state from a server message and report what it
    /// completed.
    async fn track(&self, msg: &Message, handle: &ClientHandle) -> Result<Tracked, ClientError> {
        let state = handle.state();

        match msg.numeric_code() {
            Some(RPL_WELCOME) => {
                if let Some(nick) = msg.arg(0) {
                    *state.nick.write() = nick.to_string();
                }
                return Ok(Tracked::Nothing);
            }
            Some(RPL_ISUPPORT) => {
                for token in msg.params.iter().skip(1) {
                    if let Some(chantypes) = token.strip_prefix("CHANTYPES=") {
                        debug!(chantypes = %chantypes, "Server channel types");
                        *state.chantypes.write() = chantypes.to_string();
                    } else if let Some(prefix) = token.strip_prefix("PREFIX=") {
                        let prefixes = nick_prefixes(prefix);
                        debug!(prefixes = %prefixes, "Server nickname prefixes");
                        *state.nick_prefixes.write() = prefixes;
                    }
                }
                return Ok(Tracked::Nothing);
            }
            Some(RPL_NAMREPLY) => {
                // <me> <symbol> <channel> :<nicks>
                if let (Some(channel), Some(nicks)) = (msg.arg(2), msg.arg(3)) {
                    for nick in nicks.split_whitespace() {
                        state.add_member(channel, nick);
                    }
                }
                return Ok(Tracked::Nothing);
            }
            Some(RPL_ENDOFNAMES) => {
                // Only the listing that follows our own JOIN completes it.
                if let Some(channel) = msg.arg(1)
                    && state.pending_joins.remove(&channel.to_ascii_lowercase()).is_some()
                {
                    return Ok(Tracked::Joined(channel.to_string()));
                }
                return Ok(Tracked::Nothing);
            }
            Some(RPL_ENDOFMOTD | ERR_NOMOTD) => {
                if state.registered.swap(true, Ordering::AcqRel) {
                    return Ok(Tracked::Nothing);
                }
                return Ok(Tracked::Registered);
            }
            Some(ERR_NICKNAMEINUSE) if !handle.is_registered() => {
                let nick = {
                    let mut nick = state.nick.write();
                    nick.push('_');
                    nick.clone()
                };
                warn!(nick = %nick, "Nickname in use, retrying");
                handle.send(Command::Nick(nick)).await?;
                return Ok(Tracked::Nothing);
            }
            _ => {}
        }

        let Some(source) = msg.source_nickname() else {
            return Ok(Tracked::Nothing);
        };
        let from_me = state.is_me(source);

        if msg.is_command("NICK") {
            if let Some(nick) = msg.arg(0) {
                if from_me {
                    info!(old = %handle.nick(), new = %nick, "Nickname changed");
                    *state.nick.write() = nick.to_string();
                }
                state.rename_member(source, nick);
            }
        } else if msg.is_command("JOIN") {
            if let Some(channel) = msg.arg(0) {
                if from_me {
                    debug!(channel = %channel, "Joining channel");
                    state.add_channel(channel);
                } else {
                    state.add_member(channel, source);
                }
            }
        } else if msg.is_command("PART") {
            if let Some(channel) = msg.arg(0) {
                if from_me {
                    debug!(channel = %channel, "Left channel");
                    state.remove_channel(channel);
                } else {
                    state.remove_member(channel, source);
                }
            }
        } else if msg.is_command("KICK")
            && let (Some(channel), Some(target)) = (msg.arg(0), msg.arg(1))
        {
            if state.is_me(target) {
                warn!(channel = %channel, by = %source, "Kicked from channel");
                state.remove_channel(channel);
            } else {
                state.remove_member(channel, target);
            }
        } else if msg.is_command("QUIT") && !from_me {
            state.forget_member(source);
        }

        Ok(Tracked::Nothing)
    }
}

async fn write_loop<W>(
    mut sink: FramedWrite<WriteHalf<W>, LineCodec>,
    mut rx: mpsc::Receiver<String>,
) -> Result<(), ClientError>
where
    W: AsyncWrite,
{
    while let Some(line) = rx.recv().await {
        debug!(raw = %line, "Sending line");
        sink.send(line).await.map_err(ClientError::Write)?;
    }
    Ok(())
}

/// Prefix characters from an ISUPPORT `PREFIX` value such as `(ov)@+`.
fn nick_prefixes(value: &str) -> String {
    match value.split_once(')') {
        Some((_, prefixes)) => prefixes.to_string(),
        None => value.to_string(),
    }
}

/// Stop the writer, if it is still running, and pick the error to report.
///
/// A send that found the queue closed means the writer died; its own error is
/// the one worth reporting.
async fn settle_writer(
    outcome: Result<(), ClientError>,
    writer: Option<JoinHandle<Result<(), ClientError>>>,
) -> Result<(), ClientError> {
    let Some(task) = writer else {
        return outcome;
    };

    match outcome {
        Err(ClientError::Disconnected) => Err(writer_outcome(task.await)),
        other => {
            task.abort();
            let _ = task.await;
            other
        }
    }
}

fn writer_outcome(
    joined: Result<Result<(), ClientError>, tokio::task::JoinError>,
) -> ClientError {
    match joined {
        Ok(Err(e)) => e,
        Ok(Ok(())) => ClientError::Disconnected,
        Err(e) => ClientError::Io(io::Error::other(e)),
    }
}
