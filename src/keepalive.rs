//! Periodic chatroom presence keepalive.
//!
//! Chatroom memberships go stale on servers that prune silent occupants, so
//! every tick sends one presence ping per configured room, addressed at the
//! bridge's own occupant (`room@host/nick`). No backoff, no jitter; a failed
//! ping is reported and the next tick tries again.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::config::ChatroomConfig;
use crate::session::ChatSession;

/// Default keepalive period.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(5);

/// Sends a presence keepalive to every configured chatroom on a fixed
/// period.
pub struct KeepaliveTask<S> {
    session: Arc<S>,
    own_jid: String,
    chatrooms: Vec<ChatroomConfig>,
    interval: Duration,
}

impl<S: ChatSession> KeepaliveTask<S> {
    /// Create the task. `chatrooms` is read-only for the task's lifetime.
    pub fn new(
        session: Arc<S>,
        own_jid: String,
        chatrooms: Vec<ChatroomConfig>,
        interval: Duration,
    ) -> Self {
        Self {
            session,
            own_jid,
            chatrooms,
            interval,
        }
    }

    /// One round of pings: exactly one per configured chatroom.
    pub async fn tick(&self) {
        for room in &self.chatrooms {
            let target = format!("{}/{}", room.jid, room.nick);
            if let Err(e) = self.session.ping_presence(&self.own_jid, &target).await {
                warn!(%target, "presence keepalive failed: {e}");
            }
        }
    }

    /// Run until the shutdown flag flips.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = interval.tick() => self.tick().await,
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        debug!("keepalive task received shutdown signal");
                        break;
                    }
                }
            }
        }
    }
}
