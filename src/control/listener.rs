//! Unix-socket control listener.
//!
//! Binds the control endpoint, replacing any stale socket file left behind
//! by a previous run. Each accepted connection carries exactly one payload:
//! a single read of up to [`MAX_PAYLOAD_SIZE`] bytes, no framing, and the
//! connection is not reused afterwards.

use std::io;
use std::os::unix::net::UnixListener as StdUnixListener;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::net::UnixListener;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::Payload;

/// Maximum control payload size accepted in the single read.
pub const MAX_PAYLOAD_SIZE: usize = 1024;

/// Errors from the control listener.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Failed to bind the control socket.
    #[error("failed to bind control socket {path}: {source}")]
    Bind {
        /// The socket path we tried to bind.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Failed to accept a connection.
    #[error("failed to accept control connection: {0}")]
    Accept(#[source] io::Error),
}

/// Accepts local connections and forwards their payloads onto the bus.
pub struct ControlListener {
    listener: UnixListener,
    socket_path: PathBuf,
    bus_tx: mpsc::Sender<Payload>,
}

impl ControlListener {
    /// Bind the control endpoint, removing any existing socket file first.
    ///
    /// Uses std's listener for the bind so this can run before the tokio
    /// reactor does, then converts.
    pub fn bind<P: AsRef<Path>>(
        socket_path: P,
        bus_tx: mpsc::Sender<Payload>,
    ) -> Result<Self, ControlError> {
        let socket_path = socket_path.as_ref().to_path_buf();

        if socket_path.exists() {
            std::fs::remove_file(&socket_path).map_err(|e| bind_error(&socket_path, e))?;
        }

        let std_listener =
            StdUnixListener::bind(&socket_path).map_err(|e| bind_error(&socket_path, e))?;
        std_listener
            .set_nonblocking(true)
            .map_err(|e| bind_error(&socket_path, e))?;
        let listener =
            UnixListener::from_std(std_listener).map_err(|e| bind_error(&socket_path, e))?;
        info!("control listener bound to {:?}", socket_path);

        Ok(Self {
            listener,
            socket_path,
            bus_tx,
        })
    }

    /// Path of the bound socket.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Accept loop: one connection, one read, one bus payload.
    ///
    /// An accept failure is returned to the caller (process-fatal policy);
    /// a failed read affects only the connection it happened on.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) -> Result<(), ControlError> {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (mut stream, _addr) = accepted.map_err(ControlError::Accept)?;
                    let mut buf = vec![0u8; MAX_PAYLOAD_SIZE];
                    match stream.read(&mut buf).await {
                        Ok(0) => debug!("empty control connection"),
                        Ok(n) => {
                            buf.truncate(n);
                            if self.bus_tx.send(buf).await.is_err() {
                                debug!("control bus closed, listener stopping");
                                return Ok(());
                            }
                        }
                        Err(e) => warn!("dropping control connection, read failed: {e}"),
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        debug!("control listener received shutdown signal");
                        return Ok(());
                    }
                }
            }
        }
    }
}

fn bind_error(path: &Path, source: io::Error) -> ControlError {
    ControlError::Bind {
        path: path.to_path_buf(),
        source,
    }
}

impl Drop for ControlListener {
    fn drop(&mut self) {
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!("failed to remove control socket file: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::io::AsyncWriteExt;
    use tokio::net::UnixStream;

    #[tokio::test]
    async fn bind_replaces_stale_socket_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("control.sock");
        std::fs::write(&path, b"stale").unwrap();

        let (bus_tx, _bus_rx) = super::super::event_bus();
        let listener = ControlListener::bind(&path, bus_tx).unwrap();
        assert_eq!(listener.socket_path(), path);
    }

    #[tokio::test]
    async fn drop_removes_socket_file_and_allows_rebind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("control.sock");

        let (bus_tx, _bus_rx) = super::super::event_bus();
        let listener = ControlListener::bind(&path, bus_tx).unwrap();
        assert!(path.exists());
        drop(listener);
        assert!(!path.exists());

        // A second bind at the same path succeeds.
        let (bus_tx, _bus_rx) = super::super::event_bus();
        let _listener = ControlListener::bind(&path, bus_tx).unwrap();
    }

    #[tokio::test]
    async fn payloads_reach_the_bus_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("control.sock");

        let (bus_tx, mut bus_rx) = super::super::event_bus();
        let listener = ControlListener::bind(&path, bus_tx).unwrap();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(listener.run(shutdown_rx));

        for i in 0..3u8 {
            let mut stream = UnixStream::connect(&path).await.unwrap();
            stream.write_all(format!("payload-{i}").as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            // Connections are accepted sequentially; wait for each payload
            // so the ordering assertion is about the bus, not the racing
            // clients.
            let payload = bus_rx.recv().await.unwrap();
            assert_eq!(payload, format!("payload-{i}").into_bytes());
        }

        task.abort();
    }

    #[tokio::test]
    async fn listener_stops_on_shutdown_signal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("control.sock");

        let (bus_tx, _bus_rx) = super::super::event_bus();
        let listener = ControlListener::bind(&path, bus_tx).unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(listener.run(shutdown_rx));

        shutdown_tx.send(true).unwrap();
        let result = tokio::time::timeout(std::time::Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
        assert!(!path.exists());
    }
}
