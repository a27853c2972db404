//! Reconnecting real-time message channel.
//!
//! A background task keeps one connection to `base + endpoint` open:
//!
//! - open succeeds → `Connected`
//! - each text frame is parsed as a [`ChannelMessage`]; well-formed ones are
//!   appended to the message list and broadcast, malformed ones are logged and
//!   dropped
//! - transport error or close → `Disconnected`, then a reconnect after the
//!   policy delay (3000 ms fixed by default, forever unless `max_attempts` is set)
//! - [`ReconnectingChannel::deactivate`] cancels any pending reconnect and
//!   closes the live connection
//!
//! Outbound messages are only accepted while connected. Each connection gets
//! its own outbound queue, so nothing sent during an outage is replayed after
//! reconnecting.

pub mod connector;
pub mod message;

pub use connector::{Connection, Connector, WebSocketConnector};
pub use message::{ChannelMessage, ProjectEvent};

use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Disconnected => write!(f, "disconnected"),
        }
    }
}

#[derive(Default)]
struct Shared {
    messages: Mutex<Vec<ChannelMessage>>,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct ReconnectingChannel {
    url: String,
    state: watch::Receiver<ConnectionState>,
    shared: Arc<Shared>,
    inbound: broadcast::Sender<ChannelMessage>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ReconnectingChannel {
    /// Start connecting to `base_url` + `endpoint` in the background.
    pub fn activate(
        connector: Arc<dyn Connector>,
        base_url: &str,
        endpoint: &str,
        policy: RetryPolicy,
    ) -> Self {
        let url = format!("{}{}", base_url.trim_end_matches('/'), endpoint);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (inbound, _) = broadcast::channel(1024);
        let shared = Arc::new(Shared::default());
        let cancel = CancellationToken::new();

        let task = tokio::spawn(
            Supervisor {
                connector,
                url: url.clone(),
                policy,
                shared: shared.clone(),
                state: state_tx,
                inbound: inbound.clone(),
                cancel: cancel.clone(),
            }
            .run(),
        );

        Self {
            url,
            state: state_rx,
            shared,
            inbound,
            cancel,
            task: Some(task),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Every well-formed message received since activation, in arrival order.
    pub fn messages(&self) -> Vec<ChannelMessage> {
        lock(&self.shared.messages).clone()
    }

    /// Live feed of messages received from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ChannelMessage> {
        self.inbound.subscribe()
    }

    /// Serialize `message` as JSON and send it if connected.
    ///
    /// Returns whether the message was handed to the live connection. While
    /// not connected the message is dropped.
    pub fn send<T: Serialize + ?Sized>(&self, message: &T) -> bool {
        match serde_json::to_string(message) {
            Ok(text) => self.send_text(&text),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize outbound message");
                false
            }
        }
    }

    /// Send a raw text frame (the backend understands `ping` and `status`).
    pub fn send_text(&self, text: &str) -> bool {
        if self.state() != ConnectionState::Connected {
            tracing::debug!(url = %self.url, "Dropping outbound message while not connected");
            return false;
        }
        match lock(&self.shared.outbound).as_ref() {
            Some(tx) => tx.send(text.to_string()).is_ok(),
            None => false,
        }
    }

    /// Stop reconnecting and close the live connection. Idempotent.
    pub async fn deactivate(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::error!(error = %e, "Channel task ended abnormally");
        }
    }
}

impl Drop for ReconnectingChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Supervisor {
    connector: Arc<dyn Connector>,
    url: String,
    policy: RetryPolicy,
    shared: Arc<Shared>,
    state: watch::Sender<ConnectionState>,
    inbound: broadcast::Sender<ChannelMessage>,
    cancel: CancellationToken,
}

enum Ended {
    Closed,
    Cancelled,
}

impl Supervisor {
    async fn run(self) {
        // Reconnect attempts since the last successful open.
        let mut retries = 0u32;

        loop {
            self.state.send_replace(ConnectionState::Connecting);
            let attempt = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                result = self.connector.connect(&self.url) => result,
            };

            match attempt {
                Ok(connection) => {
                    retries = 0;
                    tracing::debug!(url = %self.url, "Channel connected");
                    if let Ended::Cancelled = self.serve(connection).await {
                        break;
                    }
                    tracing::debug!(url = %self.url, "Channel disconnected");
                }
                Err(e) => {
                    tracing::warn!(url = %self.url, error = %e, "Channel connection failed");
                    self.state.send_replace(ConnectionState::Disconnected);
                }
            }

            if !self.policy.allows(retries) {
                tracing::error!(
                    url = %self.url,
                    attempts = retries,
                    "Giving up on channel after reaching max reconnect attempts"
                );
                break;
            }
            retries += 1;
            let delay = self.policy.delay(retries);
            tracing::debug!(url = %self.url, ?delay, attempt = retries, "Scheduling reconnect");
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        *lock(&self.shared.outbound) = None;
        self.state.send_replace(ConnectionState::Disconnected);
    }

    async fn serve(&self, connection: Connection) -> Ended {
        let Connection {
            mut inbound,
            mut outbound,
        } = connection;
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        *lock(&self.shared.outbound) = Some(tx);
        self.state.send_replace(ConnectionState::Connected);

        let ended = loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    if let Err(e) = outbound.close().await {
                        tracing::debug!(error = %e, "Error while closing channel");
                    }
                    break Ended::Cancelled;
                }
                Some(text) = rx.recv() => {
                    if let Err(e) = outbound.send(text).await {
                        tracing::warn!(url = %self.url, error = %e, "Channel send failed");
                        break Ended::Closed;
                    }
                }
                frame = inbound.next() => match frame {
                    Some(Ok(text)) => self.accept(&text),
                    Some(Err(e)) => {
                        tracing::warn!(url = %self.url, error = %e, "Channel transport error");
                        break Ended::Closed;
                    }
                    None => break Ended::Closed,
                },
            }
        };

        *lock(&self.shared.outbound) = None;
        self.state.send_replace(ConnectionState::Disconnected);
        ended
    }

    fn accept(&self, text: &str) {
        match ChannelMessage::parse(text) {
            Ok(message) => {
                tracing::debug!(kind = %message.kind, "Channel message received");
                lock(&self.shared.messages).push(message.clone());
                let _ = self.inbound.send(message);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Discarding malformed channel message");
            }
        }
    }
}
