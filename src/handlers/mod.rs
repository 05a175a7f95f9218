//! Handler registration and dispatch.
//!
//! A handler is any async function of a [`Context`]. Handlers are attached to
//! a [`Trigger`] in the [`Registry`] and each matching event runs every
//! matching handler as its own task.

mod context;
mod filter;
mod registry;

use std::future::Future;

use async_trait::async_trait;

pub use context::{Captures, Context, Event};
pub use filter::MessageFilter;
pub use registry::{Registry, Trigger};

/// Result of a handler invocation. Errors are logged and reported through
/// the failure hook; they never reach the read loop.
pub type HandlerResult = anyhow::Result<()>;

/// An event handler.
///
/// Closures of the form `|ctx: Context| async move { ... }` implement this
/// trait directly. Implement it by hand for handlers that carry state.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn handle(&self, ctx: Context) -> HandlerResult;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, ctx: Context) -> HandlerResult {
        (self)(ctx).await
    }
}
