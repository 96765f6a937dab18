//! Inbound event dispatch.
//!
//! The dispatcher runs the blocking receive loop against the chat session,
//! classifies each event (chatroom message, 1:1 message, subscription
//! request) and applies the forwarding policy. Chatroom traffic only ever
//! goes to the chat logs; 1:1 traffic additionally fans out to the external
//! notifier when the policy allows it.
//!
//! A receive failure is fatal: the loop returns the error and the bridge
//! takes the whole process down, leaving recovery to the supervisor that
//! restarted it last time.

pub mod notifier;
pub mod policy;

pub use notifier::Notifier;
pub use policy::ForwardPolicy;

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::chatlog::ChatLogger;
use crate::session::{ChatSession, InboundEvent, SessionError};

/// Message kind marking chatroom traffic.
const GROUPCHAT: &str = "groupchat";

/// Subscription kind the dispatcher acts on.
const SUBSCRIBE: &str = "subscribe";

/// Fatal dispatcher failures.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The protocol receive loop failed.
    #[error("protocol receive failed: {0}")]
    Receive(#[source] SessionError),

    /// The notifier process could not be started.
    #[error("notifier invocation failed: {0}")]
    Notifier(#[source] std::io::Error),
}

/// Consumes protocol receive-events and routes them.
pub struct InboundDispatcher<S> {
    session: Arc<S>,
    policy: ForwardPolicy,
    notifier: Option<Notifier>,
    chat_log: Option<ChatLogger>,
    auto_accept_subscriptions: bool,
}

impl<S: ChatSession> InboundDispatcher<S> {
    /// Create a dispatcher with the given forwarding policy and no
    /// notifier, chat log or subscription handling.
    pub fn new(session: Arc<S>, policy: ForwardPolicy) -> Self {
        Self {
            session,
            policy,
            notifier: None,
            chat_log: None,
            auto_accept_subscriptions: false,
        }
    }

    /// Forward permitted 1:1 messages to `notifier`.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Log inbound traffic through `chat_log`.
    #[must_use]
    pub fn with_chat_log(mut self, chat_log: ChatLogger) -> Self {
        self.chat_log = Some(chat_log);
        self
    }

    /// Approve subscription requests and ask for the reciprocal
    /// subscription.
    #[must_use]
    pub fn with_auto_accept(mut self, auto_accept: bool) -> Self {
        self.auto_accept_subscriptions = auto_accept;
        self
    }

    /// Receive loop. Returns `Ok(())` after the shutdown flag flips, or the
    /// first fatal error.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) -> Result<(), DispatchError> {
        loop {
            tokio::select! {
                event = self.session.receive_next() => {
                    let event = event.map_err(DispatchError::Receive)?;
                    self.handle_event(event).await?;
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        debug!("inbound dispatcher received shutdown signal");
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn handle_event(&self, event: InboundEvent) -> Result<(), DispatchError> {
        match event {
            InboundEvent::Message { remote, kind, text } => {
                if kind == GROUPCHAT {
                    self.handle_room_message(&remote, &text);
                    Ok(())
                } else {
                    self.handle_direct_message(&remote, &kind, &text)
                }
            }
            InboundEvent::PresenceRequest { from, kind } => {
                if kind == SUBSCRIBE && self.auto_accept_subscriptions {
                    if let Err(e) = self.session.approve_subscription(&from).await {
                        warn!(%from, "could not approve subscription: {e}");
                    }
                    if let Err(e) = self.session.request_subscription(&from).await {
                        warn!(%from, "could not request reciprocal subscription: {e}");
                    }
                }
                Ok(())
            }
        }
    }

    /// Chatroom traffic is logged under the room, never forwarded.
    fn handle_room_message(&self, remote: &str, text: &str) {
        let (room, nick) = split_room_remote(remote);
        if let Some(chat_log) = &self.chat_log {
            if let Err(e) = chat_log.append(room, nick, text) {
                warn!("could not write chat log entry: {e}");
            }
        }
    }

    fn handle_direct_message(
        &self,
        remote: &str,
        kind: &str,
        text: &str,
    ) -> Result<(), DispatchError> {
        let sender = bare_address(remote);
        if let Some(chat_log) = &self.chat_log {
            if let Err(e) = chat_log.append(sender, sender, text) {
                warn!("could not write chat log entry: {e}");
            }
        }

        if self.policy.should_forward(sender, text) {
            match &self.notifier {
                Some(notifier) => notifier
                    .notify(remote, kind, text)
                    .map_err(DispatchError::Notifier)?,
                None => debug!(%sender, "no notifier configured, dropping 1:1 message"),
            }
        }
        Ok(())
    }
}

/// Split a chatroom address into room and sender nick.
///
/// Exactly one separator yields `(room, nick)`; anything else keeps the
/// bare address as the nick label.
fn split_room_remote(remote: &str) -> (&str, &str) {
    let mut parts = remote.split('/');
    let room = parts.next().unwrap_or(remote);
    match (parts.next(), parts.next()) {
        (Some(nick), None) => (room, nick),
        _ => (room, room),
    }
}

/// Portion of an address before the first `/`.
fn bare_address(remote: &str) -> &str {
    remote.split('/').next().unwrap_or(remote)
}
