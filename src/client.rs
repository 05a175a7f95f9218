//! The client: configuration, handler registrations and the run entry point.

use std::sync::Arc;

use regex::Regex;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::instrument;

use crate::config::{ClientConfig, ConfigError};
use crate::error::ClientError;
use crate::handlers::{Handler, MessageFilter, Registry, Trigger};
use crate::network::{self, Session};
use crate::scheduler::{HandlerFailure, TaskInfo, TaskTracker};

/// An IRC client bound to one server.
///
/// Handlers are registered up front; registration needs `&mut self` while
/// [`run`](Client::run) borrows the client shared, so the registry cannot
/// change while a connection is live.
///
/// ```no_run
/// use asif::{Client, ClientConfig, Context};
/// use regex::Regex;
///
/// # async fn demo() -> Result<(), asif::ClientError> {
/// let mut client = Client::new(ClientConfig::new("irc.libera.chat", 6667, "asif"))?;
/// client.on_message(Regex::new("^!ping").unwrap(), |ctx: Context| async move {
///     ctx.reply("pong").await?;
///     Ok(())
/// });
/// client.run().await
/// # }
/// ```
#[derive(Debug)]
pub struct Client {
    config: ClientConfig,
    registry: Registry,
    tasks: Arc<TaskTracker>,
}

impl Client {
    /// Create a client, rejecting an invalid configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate().map_err(ConfigError::Invalid)?;

        Ok(Self {
            config,
            registry: Registry::new(),
            tasks: Arc::new(TaskTracker::new()),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Register a handler for a trigger.
    pub fn register<H: Handler>(&mut self, trigger: Trigger, handler: H) -> &mut Self {
        self.registry.register(trigger, handler);
        self
    }

    /// Run `handler` once the server acknowledges registration.
    pub fn on_connected<H: Handler>(&mut self, handler: H) -> &mut Self {
        self.register(Trigger::Connected, handler)
    }

    /// Run `handler` after the connection ends, before `run` returns.
    pub fn on_disconnected<H: Handler>(&mut self, handler: H) -> &mut Self {
        self.register(Trigger::Disconnected, handler)
    }

    /// Run `handler` for every PRIVMSG or NOTICE whose text contains a match
    /// of `pattern`.
    pub fn on_message<H: Handler>(&mut self, pattern: Regex, handler: H) -> &mut Self {
        self.register(Trigger::Message(MessageFilter::new().pattern(pattern)), handler)
    }

    /// Run `handler` for every PRIVMSG or NOTICE passing `filter`.
    pub fn on_message_filtered<H: Handler>(&mut self, filter: MessageFilter, handler: H) -> &mut Self {
        self.register(Trigger::Message(filter), handler)
    }

    /// Run `handler` after joining a channel, once the server has listed its
    /// users. `None` means every channel.
    pub fn on_join<H: Handler>(&mut self, channel: Option<&str>, handler: H) -> &mut Self {
        self.register(Trigger::Join(channel.map(str::to_string)), handler)
    }

    /// Run `handler` for every message with the given command or numeric.
    pub fn on_command<H: Handler>(&mut self, command: &str, handler: H) -> &mut Self {
        self.register(Trigger::Command(command.to_string()), handler)
    }

    /// Observe handler and background task failures.
    pub fn on_handler_failure<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&HandlerFailure) + Send + Sync + 'static,
    {
        self.tasks.set_failure_hook(Arc::new(hook));
        self
    }

    /// Live handler and background tasks.
    pub fn tasks(&self) -> Vec<TaskInfo> {
        self.tasks.snapshot()
    }

    /// Invocation counts per handler.
    pub fn handler_stats(&self) -> Vec<(String, u64)> {
        self.registry.stats()
    }

    /// Connect, register and process messages until the connection ends.
    ///
    /// Returns `Ok(())` when the server closes the connection after a QUIT
    /// sent through a handle. Every other ending is an error. There is no
    /// reconnection; call `run` again to reconnect.
    #[instrument(skip(self), fields(host = %self.config.host, port = self.config.port, nick = %self.config.nick))]
    pub async fn run(&self) -> Result<(), ClientError> {
        let stream = network::connect(&self.config).await?;

        if self.config.tls {
            let stream = network::upgrade_to_tls(stream, &self.config.host).await?;
            self.run_on(stream).await
        } else {
            self.run_on(stream).await
        }
    }

    /// Run over an already established stream.
    pub async fn run_on<S>(&self, stream: S) -> Result<(), ClientError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        Session::new(&self.config, &self.registry, Arc::clone(&self.tasks))
            .run(stream)
            .await
    }
}
