//! Fire-and-forget work that must not affect the caller's outcome.

use crate::logging::log_error;
use std::fmt::Display;
use std::future::Future;
use tokio::task::JoinHandle;
use tracing::debug;

/// Run `task` on the runtime, logging its failure instead of returning it
///
/// The handle is returned for tests; production callers drop it.
pub fn spawn_best_effort<F, E>(task_name: &'static str, task: F) -> JoinHandle<()>
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    tokio::spawn(async move {
        match task.await {
            Ok(()) => debug!(task = task_name, "Background task completed"),
            Err(e) => log_error("background", task_name, &e.to_string(), None),
        }
    })
}
