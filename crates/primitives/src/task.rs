use std::fmt;

use futures::{StreamExt, stream::FuturesUnordered};
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// A set of long-running tasks that share a cancellation token.
///
/// The tasks are expected to run until the token is cancelled. When any of them exits
/// early, the token is cancelled so that the others wind down, and the first failure is
/// reported once every task has returned.
#[derive(Debug)]
pub struct CriticalTasks<E> {
    tasks: Vec<(&'static str, JoinHandle<Result<(), E>>)>,
    cancel: CancellationToken,
}

/// Why a critical task stopped.
#[derive(Debug, Error)]
pub enum TaskFailure<E: fmt::Display> {
    /// The task returned an error.
    #[error("task {name} failed: {error}")]
    Failed {
        /// The task name.
        name: &'static str,
        /// The error it returned.
        error: E,
    },
    /// The task panicked or was aborted.
    #[error("task {name} panicked: {message}")]
    Panicked {
        /// The task name.
        name: &'static str,
        /// The panic message, if any.
        message: String,
    },
}

impl<E> CriticalTasks<E>
where
    E: fmt::Display + Send + 'static,
{
    /// Creates an empty task set bound to `cancel`.
    pub const fn new(cancel: CancellationToken) -> Self {
        Self { tasks: Vec::new(), cancel }
    }

    /// Spawns `task` under `name`.
    pub fn spawn<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
    {
        self.tasks.push((name, tokio::spawn(task)));
    }

    /// Waits for every task to return, cancelling the rest as soon as one exits.
    pub async fn join(self) -> Result<(), TaskFailure<E>> {
        let Self { tasks, cancel } = self;

        let mut pending: FuturesUnordered<_> =
            tasks.into_iter().map(|(name, handle)| async move { (name, handle.await) }).collect();

        let mut failure = None;
        while let Some((name, res)) = pending.next().await {
            let exit = match res {
                Ok(Ok(())) => {
                    info!(task = name, "Task exited");
                    None
                }
                Ok(Err(error)) => {
                    error!(task = name, %error, "Task failed");
                    Some(TaskFailure::Failed { name, error })
                }
                Err(err) => {
                    let message = panic_message(err);
                    error!(task = name, %message, "Task panicked");
                    Some(TaskFailure::Panicked { name, message })
                }
            };

            if failure.is_none() {
                failure = exit;
            }
            cancel.cancel();
        }

        failure.map_or(Ok(()), Err)
    }
}

/// Extracts a readable message from a failed join.
pub fn panic_message(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }

    let panic_value = err.into_panic();
    if let Some(s) = panic_value.downcast_ref::<&str>() {
        return (*s).to_owned();
    } else if let Some(s) = panic_value.downcast_ref::<String>() {
        return s.clone();
    }
    "Task panicked with unknown type".to_owned()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    async fn panic_with_value<T: Send + 'static>(value: T) -> JoinError {
        let handle = tokio::spawn(async move { std::panic::panic_any(value) });
        handle.await.expect_err("task should panic")
    }

    #[tokio::test]
    async fn message_from_str_panic() {
        assert_eq!(panic_message(panic_with_value("boom").await), "boom");
    }

    #[tokio::test]
    async fn message_from_string_panic() {
        assert_eq!(panic_message(panic_with_value("boom".to_owned()).await), "boom");
    }

    #[tokio::test]
    async fn message_from_unknown_panic() {
        assert_eq!(
            panic_message(panic_with_value(42u32).await),
            "Task panicked with unknown type"
        );
    }

    #[tokio::test]
    async fn cancellation_drains_all_tasks() {
        let cancel = CancellationToken::new();
        let mut tasks = CriticalTasks::<String>::new(cancel.clone());
        for name in ["a", "b"] {
            let token = cancel.clone();
            tasks.spawn(name, async move {
                token.cancelled().await;
                Ok(())
            });
        }

        cancel.cancel();
        assert!(tasks.join().await.is_ok());
    }

    #[tokio::test]
    async fn failure_cancels_siblings() {
        let cancel = CancellationToken::new();
        let mut tasks = CriticalTasks::new(cancel.clone());

        let token = cancel.clone();
        tasks.spawn("long", async move {
            token.cancelled().await;
            Ok(())
        });
        tasks.spawn("short", async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Err("fatal".to_owned())
        });

        let failure = tasks.join().await.unwrap_err();
        assert!(matches!(failure, TaskFailure::Failed { name: "short", .. }));
        assert!(cancel.is_cancelled());
    }

    async fn crash() -> Result<(), String> {
        panic!("role crashed")
    }

    #[tokio::test]
    async fn panic_is_reported() {
        let mut tasks = CriticalTasks::new(CancellationToken::new());
        tasks.spawn("bad", crash());

        let failure = tasks.join().await.unwrap_err();
        assert!(
            matches!(failure, TaskFailure::Panicked { name: "bad", ref message } if message == "role crashed")
        );
    }
}
