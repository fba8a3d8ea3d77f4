use std::io;

use tracing::{error, info};

/// Listens for process termination signals (SIGINT, and SIGTERM on unix).
#[derive(Debug, Default, Clone, Copy)]
pub struct ShutdownSignal;

impl ShutdownSignal {
    /// Creates a new shutdown signal listener.
    pub const fn new() -> Self {
        Self
    }

    /// Resolves with the name of the first termination signal received.
    #[cfg(unix)]
    pub async fn recv(self) -> io::Result<&'static str> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.map(|_| "SIGINT"),
            _ = terminate.recv() => Ok("SIGTERM"),
        }
    }

    /// Resolves with the name of the first termination signal received.
    #[cfg(not(unix))]
    pub async fn recv(self) -> io::Result<&'static str> {
        tokio::signal::ctrl_c().await.map(|_| "SIGINT")
    }
}

/// Drives `fut` to completion, calling `on_shutdown` if a termination signal arrives first.
///
/// After a signal `fut` is still awaited so that it can drain; `on_shutdown` is expected to
/// make it return promptly (for example by cancelling a token it observes).
pub async fn run_until_shutdown<F, E>(
    fut: F,
    signal: ShutdownSignal,
    on_shutdown: impl FnOnce(),
) -> Result<(), E>
where
    F: Future<Output = Result<(), E>>,
{
    tokio::pin!(fut);

    tokio::select! {
        res = &mut fut => return res,
        sig = signal.recv() => match sig {
            Ok(name) => info!("🛑 Received {name}, shutting down"),
            Err(e) => error!(?e, "Failed to listen for termination signals, shutting down"),
        },
    }

    on_shutdown();
    fut.await
}
