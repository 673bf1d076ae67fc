use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, warn};

/// Cooperative cancellation flag shared between the signal listener and a
/// polling loop.
#[derive(Clone, Debug, Default)]
pub struct Shutdown(Arc<AtomicBool>);

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Spawns a task that triggers `shutdown` on the first interrupt or
/// termination signal, announcing the signal on `out`.
pub fn listen_for_signals<W>(shutdown: Shutdown, mut out: W) -> JoinHandle<()>
where
    W: Write + Send + 'static,
{
    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(name) => announce(&mut out, name),
            Err(e) => error!(error = %e, "Failed to listen for signals, shutting down"),
        }
        shutdown.trigger();
    })
}

fn announce<W: Write>(out: &mut W, name: &str) {
    if let Err(e) = writeln!(out, "Caught signal {}, terminating...", name) {
        warn!(error = %e, "Failed to write signal notice");
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.map(|_| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
