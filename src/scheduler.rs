//! Task scheduling for handler invocations and background work.
//!
//! Every handler invocation and every task spawned through
//! [`ClientHandle::spawn`](crate::ClientHandle::spawn) runs as its own tokio
//! task, so the read loop never waits on user code. Tasks are recorded in a
//! [`TaskTracker`] while they run and remove themselves when they finish.
//!
//! A task that returns an error or panics is contained at the task boundary:
//! the failure is logged and passed to the failure hook, if one is set, and
//! nothing else is affected.
//!
//! When a connection ends, tracked tasks are left running. Their sends fail
//! with [`ClientError::Disconnected`](crate::ClientError::Disconnected).

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures_util::FutureExt;
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::handlers::HandlerResult;

/// Identifier of a tracked task, unique per tracker.
pub type TaskId = u64;

/// What a tracked task was started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// An `on_connected` handler invocation.
    OnConnected,
    /// An `on_message`/`on_command` handler invocation.
    OnMessage,
    /// An `on_join` handler invocation.
    OnJoin,
    /// An `on_disconnected` handler invocation.
    OnDisconnected,
    /// Work spawned by a handler through the client handle.
    Background,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskKind::OnConnected => "on_connected",
            TaskKind::OnMessage => "on_message",
            TaskKind::OnJoin => "on_join",
            TaskKind::OnDisconnected => "on_disconnected",
            TaskKind::Background => "background",
        })
    }
}

/// Diagnostic record of a running task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    pub id: TaskId,
    pub name: String,
    pub kind: TaskKind,
    pub started_at: DateTime<Utc>,
}

/// A handler or background task that returned an error or panicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFailure {
    pub task_id: TaskId,
    /// Handler label or background task name.
    pub name: String,
    pub kind: TaskKind,
    /// Error chain or panic message.
    pub error: String,
    pub panicked: bool,
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.panicked { "panicked" } else { "failed" };
        write!(f, "{} task '{}' {}: {}", self.kind, self.name, verb, self.error)
    }
}

/// Observability hook invoked for every [`HandlerFailure`].
pub type FailureHook = Arc<dyn Fn(&HandlerFailure) + Send + Sync>;

/// Tracks live handler and background tasks.
#[derive(Default)]
pub struct TaskTracker {
    next_id: AtomicU64,
    tasks: DashMap<TaskId, TaskInfo>,
    failure_hook: RwLock<Option<FailureHook>>,
}

/// Removes the task entry however the task ends, including on abort.
struct Registration {
    tracker: Arc<TaskTracker>,
    id: TaskId,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.tracker.tasks.remove(&self.id);
    }
}

impl TaskTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_failure_hook(&self, hook: FailureHook) {
        *self.failure_hook.write() = Some(hook);
    }

    /// Spawn a tracked task on the current tokio runtime.
    pub fn spawn<F>(self: &Arc<Self>, name: impl Into<String>, kind: TaskKind, future: F) -> JoinHandle<()>
    where
        F: Future<Output = HandlerResult> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let name = name.into();
        self.tasks.insert(
            id,
            TaskInfo {
                id,
                name: name.clone(),
                kind,
                started_at: Utc::now(),
            },
        );

        let registration = Registration {
            tracker: Arc::clone(self),
            id,
        };

        tokio::spawn(async move {
            let outcome = AssertUnwindSafe(future).catch_unwind().await;

            let failure = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some((format!("{:#}", e), false)),
                Err(panic) => Some((panic_message(panic.as_ref()), true)),
            };

            if let Some((error, panicked)) = failure {
                registration.tracker.report(HandlerFailure {
                    task_id: id,
                    name,
                    kind,
                    error,
                    panicked,
                });
            } else {
                debug!(task_id = id, task = %name, %kind, "Task finished");
            }

            drop(registration);
        })
    }

    fn report(&self, failure: HandlerFailure) {
        warn!(
            task_id = failure.task_id,
            task = %failure.name,
            kind = %failure.kind,
            panicked = failure.panicked,
            error = %failure.error,
            "Handler task failed"
        );

        let hook = self.failure_hook.read().clone();
        if let Some(hook) = hook {
            hook(&failure);
        }
    }

    /// Snapshot of the live tasks, oldest first.
    pub fn snapshot(&self) -> Vec<TaskInfo> {
        let mut tasks: Vec<TaskInfo> = self.tasks.iter().map(|entry| entry.value().clone()).collect();
        tasks.sort_by_key(|task| task.id);
        tasks
    }

    /// Number of live tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl fmt::Debug for TaskTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskTracker")
            .field("live", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::{mpsc, oneshot};

    #[tokio::test]
    async fn test_task_tracked_until_finished() {
        let tracker = Arc::new(TaskTracker::new());
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let handle = tracker.spawn("ticker", TaskKind::Background, async move {
            let _ = release_rx.await;
            Ok(())
        });

        let live = tracker.snapshot();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].name, "ticker");
        assert_eq!(live[0].kind, TaskKind::Background);

        release_tx.send(()).unwrap();
        handle.await.unwrap();
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn test_error_reported_to_hook() {
        let tracker = Arc::new(TaskTracker::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        tracker.set_failure_hook(Arc::new(move |failure: &HandlerFailure| {
            let _ = tx.send(failure.clone());
        }));

        tracker
            .spawn("on_message(^!boom)", TaskKind::OnMessage, async {
                Err(anyhow::anyhow!("boom"))
            })
            .await
            .unwrap();

        let failure = rx.recv().await.unwrap();
        assert_eq!(failure.name, "on_message(^!boom)");
        assert_eq!(failure.kind, TaskKind::OnMessage);
        assert_eq!(failure.error, "boom");
        assert!(!failure.panicked);
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn test_panic_contained() {
        let tracker = Arc::new(TaskTracker::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        tracker.set_failure_hook(Arc::new(move |failure: &HandlerFailure| {
            let _ = tx.send(failure.clone());
        }));

        let handle = tracker.spawn("panicky", TaskKind::OnConnected, async {
            if true {
                panic!("handler exploded");
            }
            Ok(())
        });

        // The panic is caught inside the task, so the join handle is clean.
        handle.await.unwrap();

        let failure = rx.recv().await.unwrap();
        assert!(failure.panicked);
        assert_eq!(failure.error, "handler exploded");
        assert_eq!(
            failure.to_string(),
            "on_connected task 'panicky' panicked: handler exploded"
        );
    }

    #[tokio::test]
    async fn test_aborted_task_untracked() {
        let tracker = Arc::new(TaskTracker::new());
        let handle = tracker.spawn("forever", TaskKind::Background, async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        });
        assert_eq!(tracker.len(), 1);

        handle.abort();
        let _ = handle.await;
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_ordered_by_start() {
        let tracker = Arc::new(TaskTracker::new());
        let handles: Vec<_> = ["a", "b", "c"]
            .into_iter()
            .map(|name| {
                tracker.spawn(name, TaskKind::Background, async {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(())
                })
            })
            .collect();

        let names: Vec<_> = tracker.snapshot().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        for handle in handles {
            handle.abort();
        }
    }
}
