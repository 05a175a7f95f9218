//! asif - an async IRC bot framework.
//!
//! A [`Client`] owns one server connection. Handlers are registered against
//! lifecycle events, message patterns or commands before the client runs;
//! while it runs, every incoming line is parsed and each matching handler is
//! started as its own task, so handlers never hold up reading.
//!
//! Handlers talk back through a [`ClientHandle`], which funnels every send
//! through a single writer, and may spawn tracked background tasks of their
//! own.
//!
//! Protocol types live in [`proto`] (the `asif-proto` crate).

pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod network;
pub mod scheduler;

pub use asif_proto as proto;
pub use asif_proto::{Command, Message, Prefix, command, format};

pub use client::Client;
pub use config::{ClientConfig, ConfigError, ValidationError};
pub use error::ClientError;
pub use handlers::{
    Captures, Context, Event, Handler, HandlerResult, MessageFilter, Registry, Trigger,
};
pub use network::ClientHandle;
pub use scheduler::{HandlerFailure, TaskId, TaskInfo, TaskKind, TaskTracker};
