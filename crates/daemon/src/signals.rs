//! OS signal handling: SIGINT / SIGTERM request a graceful shutdown

use cadence_core::application::ShutdownSender;
use std::io;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Forward termination signals to the shutdown sender until the process exits
///
/// The first signal requests shutdown; later ones are logged and ignored so an
/// in-flight cycle still finishes.
pub fn spawn_signal_listener(sender: ShutdownSender) -> io::Result<JoinHandle<()>> {
    let mut signals = TerminationSignals::register()?;

    Ok(tokio::spawn(async move {
        loop {
            let name = signals.recv().await;
            if sender.shutdown() {
                info!(signal = name, "Shutdown signal received, finishing current work");
            } else {
                warn!(signal = name, "Shutdown already in progress, waiting for the current cycle");
            }
        }
    }))
}

#[cfg(unix)]
struct TerminationSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl TerminationSignals {
    fn register() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }
}

#[cfg(not(unix))]
struct TerminationSignals;

#[cfg(not(unix))]
impl TerminationSignals {
    fn register() -> io::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        "CTRL_C"
    }
}
