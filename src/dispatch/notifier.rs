//! External notifier invocation.

use std::io;
use std::path::PathBuf;

use tokio::process::Command;
use tracing::debug;

/// Starts the configured notifier command for forwarded 1:1 messages.
///
/// The command gets three positional arguments: the full sender address, the
/// message kind and the message text. Fire and forget: the child is not
/// waited on and its output is not captured.
#[derive(Debug, Clone)]
pub struct Notifier {
    script: PathBuf,
}

impl Notifier {
    /// Create a notifier running `script`.
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
        }
    }

    /// Start the notifier process.
    pub fn notify(&self, remote: &str, kind: &str, text: &str) -> io::Result<()> {
        let child = Command::new(&self.script)
            .arg(remote)
            .arg(kind)
            .arg(text)
            .spawn()?;
        debug!(
            script = %self.script.display(),
            pid = child.id(),
            "notifier started"
        );
        Ok(())
    }
}
