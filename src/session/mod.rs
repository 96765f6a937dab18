//! Chat session seam.
//!
//! The bridge never talks to the wire itself; everything protocol-level goes
//! through the [`ChatSession`] trait. The daemon binary wires in the
//! XMPP-backed implementation (behind the `xmpp` cargo feature), tests drive
//! the core against the in-memory `mock::MockSession`.
//!
//! Implementations must tolerate concurrent calls: the inbound receive loop,
//! the control-bus consumer and the keepalive timer all hold the same handle.
//! The provided backend serializes everything through a command channel to a
//! driver task that owns the underlying client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(test)]
pub mod mock;
#[cfg(feature = "xmpp")]
pub mod xmpp;

/// Errors surfaced by a chat session backend.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session was closed by the peer or the stream ended.
    #[error("session closed")]
    Closed,

    /// Transport-level I/O failure.
    #[error("session I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend-specific failure (authentication, stanza encoding, ...).
    #[error("session backend error: {0}")]
    Backend(String),
}

/// A protocol-level event received from the chat server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A chat message, either from a chatroom or 1:1.
    Message {
        /// Sender address: `room@host/nick` for chatroom traffic,
        /// `user@host/resource` for 1:1 traffic.
        remote: String,
        /// Message kind; `"groupchat"` marks chatroom traffic.
        kind: String,
        /// Message body.
        text: String,
    },
    /// A presence subscription request.
    PresenceRequest {
        /// Address requesting the subscription.
        from: String,
        /// Subscription kind; only `"subscribe"` is acted upon.
        kind: String,
    },
}

/// An outbound chat message.
///
/// This is also the wire shape of the `actionSettings` object of a
/// `SendMessage` control action; serde round-trips `remote`, `type` and
/// `text` unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Destination address, possibly carrying a `/resource` suffix.
    pub remote: String,
    /// Message kind: `"chat"`, `"groupchat"` or any other protocol value.
    #[serde(rename = "type")]
    pub kind: String,
    /// Message body.
    pub text: String,
}

impl ChatMessage {
    /// Bare-address portion of the destination: everything up to the first
    /// `/`.
    pub fn bare_remote(&self) -> &str {
        self.remote.split('/').next().unwrap_or(&self.remote)
    }
}

/// Capability set the bridge requires from a chat-protocol session.
///
/// All methods take `&self`; implementations provide their own interior
/// synchronization so the handle can be shared across tasks.
#[async_trait]
pub trait ChatSession: Send + Sync + 'static {
    /// Join a multi-user chatroom under the given nickname.
    async fn join_room(&self, room_jid: &str, nick: &str) -> Result<(), SessionError>;

    /// Send a message.
    async fn send(&self, message: ChatMessage) -> Result<(), SessionError>;

    /// Block until the next protocol event arrives.
    async fn receive_next(&self) -> Result<InboundEvent, SessionError>;

    /// Send a presence keepalive from `own_jid` to `target`.
    async fn ping_presence(&self, own_jid: &str, target: &str) -> Result<(), SessionError>;

    /// Approve a pending presence subscription request from `from`.
    async fn approve_subscription(&self, from: &str) -> Result<(), SessionError>;

    /// Request a presence subscription from `from`.
    async fn request_subscription(&self, from: &str) -> Result<(), SessionError>;
}
