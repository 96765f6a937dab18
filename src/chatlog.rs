//! Per-chat append-only message logs.
//!
//! One file per chat name under the configured directory, one line per
//! message:
//!
//! ```text
//! [2026-03-01T14:02:11+01:00] <alice> hello
//! ```
//!
//! Write failures are the caller's problem to report; they never take the
//! bridge down. Whichever component discovers a loggable message writes it
//! itself, there is no shared buffer.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::Local;

/// Timestamp layout used in log lines (ISO-8601 with UTC offset).
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// Appends chat traffic to one log file per chat name.
#[derive(Debug, Clone)]
pub struct ChatLogger {
    directory: PathBuf,
}

impl ChatLogger {
    /// Create a logger writing into `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Append one record to `<directory>/<chat_name>.log`, creating the file
    /// on first use.
    pub fn append(&self, chat_name: &str, speaker: &str, text: &str) -> std::io::Result<()> {
        let path = self.directory.join(format!("{chat_name}.log"));
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        let line = format!(
            "[{}] <{}> {}\n",
            Local::now().format(TIMESTAMP_FORMAT),
            speaker,
            text
        );
        file.write_all(line.as_bytes())
    }
}
