//! XMPP-backed [`ChatSession`] built on tokio-xmpp.
//!
//! The tokio-xmpp client is a single-owner object, so the backend spawns a
//! driver task that owns it. Trait calls cross a command channel to the
//! driver and inbound stanzas are surfaced through an event channel; that is
//! what makes the shared handle safe to use from several tasks at once.
//!
//! The server endpoint is resolved from the JID domain (SRV lookup); TLS is
//! negotiated by the underlying client.

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_xmpp::{AsyncClient, Element, Event, Jid};
use tracing::{debug, warn};

use super::{ChatMessage, ChatSession, InboundEvent, SessionError};
use crate::config::ConnectionConfig;

const NS_CLIENT: &str = "jabber:client";
const NS_MUC: &str = "http://jabber.org/protocol/muc";
const NS_PING: &str = "urn:xmpp:ping";

/// Options for establishing the XMPP session.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Account JID to authenticate as.
    pub jid: String,
    /// Account password.
    pub password: String,
    /// Status text announced in the initial presence.
    pub status: String,
}

impl From<&ConnectionConfig> for ConnectOptions {
    fn from(connection: &ConnectionConfig) -> Self {
        Self {
            jid: connection.jid.clone(),
            password: connection.password.clone(),
            status: connection.status.clone(),
        }
    }
}

enum Command {
    SendStanza {
        stanza: Element,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
}

/// `ChatSession` implementation speaking XMPP.
pub struct XmppSession {
    commands: mpsc::Sender<Command>,
    inbound: Mutex<mpsc::UnboundedReceiver<Result<InboundEvent, SessionError>>>,
    ping_seq: AtomicU64,
}

impl XmppSession {
    /// Connect and authenticate.
    ///
    /// Resolves once the session is online; a failed connection or
    /// authentication resolves to an error instead.
    pub async fn connect(options: ConnectOptions) -> Result<Self, SessionError> {
        let jid = Jid::from_str(&options.jid)
            .map_err(|e| SessionError::Backend(format!("invalid jid {:?}: {e}", options.jid)))?;

        let mut client = AsyncClient::new(jid, options.password.clone());
        client.set_reconnect(false);

        let (command_tx, mut command_rx) = mpsc::channel::<Command>(16);
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (online_tx, online_rx) = oneshot::channel();

        let status = options.status.clone();
        tokio::spawn(async move {
            let mut online_tx = Some(online_tx);
            loop {
                tokio::select! {
                    event = client.next() => match event {
                        Some(Event::Online { .. }) => {
                            debug!("chat session online");
                            if let Err(e) = client.send_stanza(initial_presence(&status)).await {
                                warn!("could not send initial presence: {e}");
                            }
                            if let Some(tx) = online_tx.take() {
                                let _ = tx.send(Ok(()));
                            }
                        }
                        Some(Event::Stanza(stanza)) => {
                            if let Some(event) = translate_stanza(&stanza) {
                                if inbound_tx.send(Ok(event)).is_err() {
                                    break;
                                }
                            }
                        }
                        Some(Event::Disconnected(e)) => {
                            match online_tx.take() {
                                Some(tx) => {
                                    let _ = tx.send(Err(SessionError::Backend(e.to_string())));
                                }
                                None => {
                                    let _ = inbound_tx.send(Err(SessionError::Closed));
                                }
                            }
                            break;
                        }
                        None => {
                            match online_tx.take() {
                                Some(tx) => {
                                    let _ = tx.send(Err(SessionError::Closed));
                                }
                                None => {
                                    let _ = inbound_tx.send(Err(SessionError::Closed));
                                }
                            }
                            break;
                        }
                    },
                    command = command_rx.recv() => match command {
                        Some(Command::SendStanza { stanza, reply }) => {
                            let result = client
                                .send_stanza(stanza)
                                .await
                                .map_err(|e| SessionError::Backend(e.to_string()));
                            let _ = reply.send(result);
                        }
                        None => break,
                    },
                }
            }
            debug!("xmpp driver task finished");
        });

        online_rx.await.map_err(|_| SessionError::Closed)??;

        Ok(Self {
            commands: command_tx,
            inbound: Mutex::new(inbound_rx),
            ping_seq: AtomicU64::new(0),
        })
    }

    async fn request(&self, stanza: Element) -> Result<(), SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::SendStanza { stanza, reply })
            .await
            .map_err(|_| SessionError::Closed)?;
        response.await.map_err(|_| SessionError::Closed)?
    }
}

#[async_trait]
impl ChatSession for XmppSession {
    async fn join_room(&self, room_jid: &str, nick: &str) -> Result<(), SessionError> {
        self.request(join_presence(room_jid, nick)).await
    }

    async fn send(&self, message: ChatMessage) -> Result<(), SessionError> {
        self.request(message_stanza(&message)).await
    }

    async fn receive_next(&self) -> Result<InboundEvent, SessionError> {
        let mut inbound = self.inbound.lock().await;
        match inbound.recv().await {
            Some(event) => event,
            None => Err(SessionError::Closed),
        }
    }

    async fn ping_presence(&self, own_jid: &str, target: &str) -> Result<(), SessionError> {
        let seq = self.ping_seq.fetch_add(1, Ordering::Relaxed);
        self.request(ping_stanza(own_jid, target, seq)).await
    }

    async fn approve_subscription(&self, from: &str) -> Result<(), SessionError> {
        self.request(subscription_presence(from, "subscribed")).await
    }

    async fn request_subscription(&self, from: &str) -> Result<(), SessionError> {
        self.request(subscription_presence(from, "subscribe")).await
    }
}

fn initial_presence(status: &str) -> Element {
    let mut builder = Element::builder("presence", NS_CLIENT);
    if !status.is_empty() {
        builder = builder.append(
            Element::builder("status", NS_CLIENT)
                .append(status)
                .build(),
        );
    }
    builder.build()
}

/// Chatroom join presence, with room history suppressed.
fn join_presence(room_jid: &str, nick: &str) -> Element {
    Element::builder("presence", NS_CLIENT)
        .attr("to", format!("{room_jid}/{nick}"))
        .append(
            Element::builder("x", NS_MUC)
                .append(
                    Element::builder("history", NS_MUC)
                        .attr("maxstanzas", "0")
                        .build(),
                )
                .build(),
        )
        .build()
}

fn message_stanza(message: &ChatMessage) -> Element {
    Element::builder("message", NS_CLIENT)
        .attr("to", message.remote.as_str())
        .attr("type", message.kind.as_str())
        .append(
            Element::builder("body", NS_CLIENT)
                .append(message.text.as_str())
                .build(),
        )
        .build()
}

/// XEP-0199 client-to-server ping addressed at a room occupant.
fn ping_stanza(own_jid: &str, target: &str, seq: u64) -> Element {
    Element::builder("iq", NS_CLIENT)
        .attr("type", "get")
        .attr("from", own_jid)
        .attr("to", target)
        .attr("id", format!("ping-{seq}"))
        .append(Element::builder("ping", NS_PING).build())
        .build()
}

fn subscription_presence(to: &str, kind: &str) -> Element {
    Element::builder("presence", NS_CLIENT)
        .attr("to", to)
        .attr("type", kind)
        .build()
}

/// Map a raw stanza to a bridge-level event; stanzas the bridge does not act
/// on map to `None`.
fn translate_stanza(stanza: &Element) -> Option<InboundEvent> {
    if stanza.is("message", NS_CLIENT) {
        let remote = stanza.attr("from")?.to_string();
        let kind = stanza.attr("type").unwrap_or("normal").to_string();
        let text = stanza.get_child("body", NS_CLIENT).map(|body| body.text())?;
        return Some(InboundEvent::Message { remote, kind, text });
    }
    if stanza.is("presence", NS_CLIENT) {
        let kind = stanza.attr("type")?;
        if kind == "subscribe" {
            return Some(InboundEvent::PresenceRequest {
                from: stanza.attr("from")?.to_string(),
                kind: kind.to_string(),
            });
        }
    }
    None
}
