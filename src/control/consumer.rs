//! Bus consumer: decodes control payloads and executes them.
//!
//! One action at a time, in bus order. Decode and dispatch failures are
//! scoped to the single payload they happened on; nothing is retried and the
//! loop keeps serving subsequent payloads.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use super::Payload;
use super::action::{self, Action};
use crate::chatlog::ChatLogger;
use crate::session::ChatSession;

/// Consumes the control bus and executes decoded actions against the
/// session.
pub struct ControlConsumer<S> {
    bus_rx: mpsc::Receiver<Payload>,
    session: Arc<S>,
    own_jid: String,
    chat_log: Option<ChatLogger>,
}

impl<S: ChatSession> ControlConsumer<S> {
    /// Create a consumer reading from `bus_rx`. `own_jid` is the speaker
    /// label used when logging sent messages.
    pub fn new(bus_rx: mpsc::Receiver<Payload>, session: Arc<S>, own_jid: String) -> Self {
        Self {
            bus_rx,
            session,
            own_jid,
            chat_log: None,
        }
    }

    /// Log sent control messages through `chat_log`.
    #[must_use]
    pub fn with_chat_log(mut self, chat_log: ChatLogger) -> Self {
        self.chat_log = Some(chat_log);
        self
    }

    /// Run until the shutdown flag flips or the bus closes.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                payload = self.bus_rx.recv() => {
                    match payload {
                        Some(payload) => self.handle_payload(&payload).await,
                        None => {
                            debug!("control bus closed, consumer stopping");
                            break;
                        }
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        debug!("control consumer received shutdown signal");
                        break;
                    }
                }
            }
        }
    }

    async fn handle_payload(&self, payload: &[u8]) {
        let decoded = match action::decode(payload) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("dropping control payload: {e}");
                return;
            }
        };

        match decoded {
            Action::SendMessage(message) => {
                let chat_name = message.bare_remote().to_string();
                let text = message.text.clone();
                match self.session.send(message).await {
                    Ok(()) => {
                        if let Some(chat_log) = &self.chat_log {
                            if let Err(e) = chat_log.append(&chat_name, &self.own_jid, &text) {
                                warn!("could not write chat log entry: {e}");
                            }
                        }
                    }
                    Err(e) => warn!("control-channel send failed: {e}"),
                }
            }
            Action::Unknown(action_type) => {
                debug!(%action_type, "dropping unrecognized control action");
            }
        }
    }
}
