//! Connection plumbing: transport setup, the session loop and the handle
//! handlers use to talk back.

mod connection;
pub(crate) mod handle;
mod transport;

pub use handle::ClientHandle;

pub(crate) use connection::Session;
pub(crate) use transport::{connect, upgrade_to_tls};
