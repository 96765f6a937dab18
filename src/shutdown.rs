//! Termination-signal handling.

use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tracing::info;

/// Wait for SIGINT, SIGTERM or SIGQUIT, then flip the shutdown flag.
///
/// Every task observes the watch channel and winds down on its own; the
/// control listener removes its socket file on the way out. There is no
/// draining of in-flight work.
pub async fn watch_signals(shutdown_tx: watch::Sender<bool>) -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv() => info!("caught SIGINT, shutting down"),
        _ = sigterm.recv() => info!("caught SIGTERM, shutting down"),
        _ = sigquit.recv() => info!("caught SIGQUIT, shutting down"),
    }

    let _ = shutdown_tx.send(true);
    Ok(())
}
