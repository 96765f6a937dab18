//! Bridge runtime: constructs the task set and supervises it.
//!
//! Everything is built once at startup and handed to the tasks explicitly;
//! the only things tasks share are the session handle, the event bus and the
//! shutdown flag.
//!
//! Supervision is two-tier, matching the error policy: action-scoped
//! failures stay inside the tasks, fatal failures travel over an error
//! channel to the supervisor, which stops the task set and returns the error
//! for `main` to exit non-zero with. A termination signal takes the orderly
//! path: flag flip, task wind-down, socket removal, exit 0.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::chatlog::ChatLogger;
use crate::config::Config;
use crate::control::{self, ControlConsumer, ControlListener};
use crate::dispatch::{ForwardPolicy, InboundDispatcher, Notifier};
use crate::keepalive::KeepaliveTask;
use crate::session::ChatSession;
use crate::shutdown;

/// How long tasks get to observe the shutdown flag before the runtime stops
/// waiting for them.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// The assembled bridge.
pub struct Bridge<S> {
    session: Arc<S>,
    config: Config,
}

impl<S: ChatSession> Bridge<S> {
    /// Create a bridge over an established session.
    pub fn new(session: Arc<S>, config: Config) -> Self {
        Self { session, config }
    }

    /// Join the configured chatrooms, spawn the task set and supervise it
    /// until a termination signal or the first fatal error.
    pub async fn run(self) -> Result<()> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (fatal_tx, mut fatal_rx) = mpsc::channel::<anyhow::Error>(4);

        for room in &self.config.chatrooms {
            self.session
                .join_room(&room.jid, &room.nick)
                .await
                .with_context(|| format!("failed to join chatroom {}", room.jid))?;
            info!(room = %room.jid, nick = %room.nick, "joined chatroom");
        }

        let chat_log = self
            .config
            .logging
            .enabled
            .then(|| ChatLogger::new(self.config.logging.directory.clone()));

        let (bus_tx, bus_rx) = control::event_bus();
        let listener = ControlListener::bind(&self.config.control.socket, bus_tx)
            .context("failed to bind control socket")?;

        let mut consumer = ControlConsumer::new(
            bus_rx,
            self.session.clone(),
            self.config.connection.jid.clone(),
        );
        if let Some(chat_log) = &chat_log {
            consumer = consumer.with_chat_log(chat_log.clone());
        }

        let policy = ForwardPolicy::new(
            self.config.whitelist.enabled,
            self.config.whitelist.senders.clone(),
        );
        let mut dispatcher = InboundDispatcher::new(self.session.clone(), policy)
            .with_auto_accept(self.config.presence.auto_accept_subscriptions);
        if let Some(chat_log) = &chat_log {
            dispatcher = dispatcher.with_chat_log(chat_log.clone());
        }
        if !self.config.notifier.script.as_os_str().is_empty() {
            dispatcher = dispatcher.with_notifier(Notifier::new(self.config.notifier.script.clone()));
        }

        let keepalive = KeepaliveTask::new(
            self.session.clone(),
            self.config.connection.jid.clone(),
            self.config.chatrooms.clone(),
            self.config.presence.keepalive_interval(),
        );

        let mut tasks = Vec::new();

        tasks.push(tokio::spawn({
            let fatal_tx = fatal_tx.clone();
            let shutdown_rx = shutdown_rx.clone();
            async move {
                if let Err(e) = dispatcher.run(shutdown_rx).await {
                    let _ = fatal_tx.send(anyhow::Error::new(e)).await;
                }
            }
        }));

        tasks.push(tokio::spawn({
            let fatal_tx = fatal_tx.clone();
            let shutdown_rx = shutdown_rx.clone();
            async move {
                if let Err(e) = listener.run(shutdown_rx).await {
                    let _ = fatal_tx.send(anyhow::Error::new(e)).await;
                }
            }
        }));

        tasks.push(tokio::spawn(consumer.run(shutdown_rx.clone())));
        tasks.push(tokio::spawn(keepalive.run(shutdown_rx.clone())));

        tasks.push(tokio::spawn({
            let fatal_tx = fatal_tx.clone();
            async move {
                if let Err(e) = shutdown::watch_signals(shutdown_tx).await {
                    let _ = fatal_tx
                        .send(anyhow::Error::new(e).context("signal handler failed"))
                        .await;
                }
            }
        }));

        info!("bridge running");

        // The supervisor holds its own fatal_tx clone, so recv() can only
        // yield an actual error, never a closed-channel None.
        let mut shutdown_watch = shutdown_rx.clone();
        let outcome = tokio::select! {
            Some(error) = fatal_rx.recv() => Err(error),
            _ = shutdown_watch.changed() => {
                if *shutdown_watch.borrow() {
                    Ok(())
                } else {
                    Err(anyhow::anyhow!("signal handler stopped unexpectedly"))
                }
            }
        };

        // Stop whatever is still running. Tasks on the orderly path are
        // already winding down; aborts cover the fatal path.
        for task in &tasks {
            task.abort();
        }
        for task in tasks {
            let _ = tokio::time::timeout(SHUTDOWN_GRACE, task).await;
        }
        debug!("bridge task set stopped");

        outcome
    }
}
