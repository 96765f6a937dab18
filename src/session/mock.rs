//! Scripted in-memory session for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{ChatMessage, ChatSession, InboundEvent, SessionError};

/// Handle tests use to feed inbound events into a [`MockSession`].
///
/// Dropping the handle ends the script: the next `receive_next` call reports
/// [`SessionError::Closed`], which is how tests exercise the fatal
/// receive-loop path.
pub type EventScript = mpsc::UnboundedSender<Result<InboundEvent, SessionError>>;

/// In-memory `ChatSession` that records every call and replays a scripted
/// event stream.
#[derive(Debug)]
pub struct MockSession {
    inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<InboundEvent, SessionError>>>,
    fail_pings: AtomicBool,
    /// Recorded `send` calls, in order.
    pub sent: Mutex<Vec<ChatMessage>>,
    /// Recorded `ping_presence` calls as `(own_jid, target)`.
    pub pings: Mutex<Vec<(String, String)>>,
    /// Recorded `join_room` calls as `(room_jid, nick)`.
    pub joined: Mutex<Vec<(String, String)>>,
    /// Recorded `approve_subscription` calls.
    pub approved: Mutex<Vec<String>>,
    /// Recorded `request_subscription` calls.
    pub requested: Mutex<Vec<String>>,
}

impl MockSession {
    /// Create a session plus the script handle feeding its inbound events.
    pub fn new() -> (std::sync::Arc<Self>, EventScript) {
        let (script, inbound) = mpsc::unbounded_channel();
        let session = std::sync::Arc::new(Self {
            inbound: tokio::sync::Mutex::new(inbound),
            fail_pings: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            pings: Mutex::new(Vec::new()),
            joined: Mutex::new(Vec::new()),
            approved: Mutex::new(Vec::new()),
            requested: Mutex::new(Vec::new()),
        });
        (session, script)
    }

    /// Make subsequent `ping_presence` calls fail.
    pub fn fail_pings(&self, fail: bool) {
        self.fail_pings.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChatSession for MockSession {
    async fn join_room(&self, room_jid: &str, nick: &str) -> Result<(), SessionError> {
        self.joined
            .lock()
            .unwrap()
            .push((room_jid.to_string(), nick.to_string()));
        Ok(())
    }

    async fn send(&self, message: ChatMessage) -> Result<(), SessionError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn receive_next(&self) -> Result<InboundEvent, SessionError> {
        let mut inbound = self.inbound.lock().await;
        match inbound.recv().await {
            Some(event) => event,
            None => Err(SessionError::Closed),
        }
    }

    async fn ping_presence(&self, own_jid: &str, target: &str) -> Result<(), SessionError> {
        if self.fail_pings.load(Ordering::SeqCst) {
            return Err(SessionError::Backend("ping rejected".to_string()));
        }
        self.pings
            .lock()
            .unwrap()
            .push((own_jid.to_string(), target.to_string()));
        Ok(())
    }

    async fn approve_subscription(&self, from: &str) -> Result<(), SessionError> {
        self.approved.lock().unwrap().push(from.to_string());
        Ok(())
    }

    async fn request_subscription(&self, from: &str) -> Result<(), SessionError> {
        self.requested.lock().unwrap().push(from.to_string());
        Ok(())
    }
}
