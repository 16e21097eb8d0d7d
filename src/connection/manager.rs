use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{error, info, warn};

use super::messages::{ClientMessage, ServerMessage};
use crate::error::ClientError;

/// Connection lifecycle state, published through a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    #[serde(rename = "error")]
    Errored,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Errored => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Delay before each reconnect attempt. Retries repeat indefinitely;
    /// there is no backoff and no cap.
    pub reconnect_delay: Duration,

    /// Interval between health pings while connected.
    pub ping_interval: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(3),
            ping_interval: Duration::from_secs(30),
        }
    }
}

/// Owns the persistent WebSocket to the chat service.
///
/// Spawning the manager starts the connect loop. Inbound text frames are
/// parsed one at a time and forwarded in arrival order; payloads that do not
/// parse are logged and dropped. Any closure or transport error tears the
/// connection down and schedules a reconnect after the fixed delay.
pub struct ConnectionManager {
    endpoint: String,
    config: ConnectionConfig,
    state_tx: watch::Sender<ConnectionState>,
    outbound_rx: mpsc::Receiver<ClientMessage>,
    inbound_tx: mpsc::Sender<ServerMessage>,
}

/// Handle held by the session coordinator.
pub struct ConnectionHandle {
    outbound_tx: mpsc::Sender<ClientMessage>,
    state_rx: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl ConnectionHandle {
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Watch connection state transitions.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Transmit a message, fire-and-forget. Fails when the connection is not
    /// established; the message is dropped, never queued for later.
    pub fn send(&self, message: ClientMessage) -> Result<(), ClientError> {
        if self.state() != ConnectionState::Connected {
            return Err(ClientError::NotConnected);
        }

        // A closed or saturated queue means the link is effectively down.
        self.outbound_tx
            .try_send(message)
            .map_err(|_| ClientError::NotConnected)
    }

    /// Close the connection and wait for the manager task to exit.
    pub async fn shutdown(self) {
        drop(self.outbound_tx);
        if let Err(e) = self.task.await {
            error!("Connection task panicked: {}", e);
        }
    }
}

impl ConnectionManager {
    /// Start connecting to the per-session endpoint. The returned handle is
    /// the only way to send; dropping it shuts the connection down.
    pub fn spawn(
        endpoint: String,
        config: ConnectionConfig,
        inbound_tx: mpsc::Sender<ServerMessage>,
    ) -> ConnectionHandle {
        let (outbound_tx, outbound_rx) = mpsc::channel(32);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        let manager = Self {
            endpoint,
            config,
            state_tx,
            outbound_rx,
            inbound_tx,
        };

        let task = tokio::spawn(manager.run());

        ConnectionHandle {
            outbound_tx,
            state_rx,
            task,
        }
    }

    async fn run(mut self) {
        loop {
            if self.outbound_rx.is_closed() {
                break;
            }

            self.set_state(ConnectionState::Connecting);
            info!("Connecting to {}", self.endpoint);

            match connect_async(self.endpoint.as_str()).await {
                Ok((stream, _)) => {
                    info!("Connected to {}", self.endpoint);
                    self.set_state(ConnectionState::Connected);
                    self.serve(stream).await;
                    self.set_state(ConnectionState::Disconnected);
                    if self.outbound_rx.is_closed() {
                        break;
                    }
                    warn!(
                        "Disconnected, reconnecting in {:?}",
                        self.config.reconnect_delay
                    );
                }
                Err(e) => {
                    warn!("Connection to {} failed: {}", self.endpoint, e);
                    self.set_state(ConnectionState::Errored);
                }
            }

            tokio::time::sleep(self.config.reconnect_delay).await;
        }
    }

    /// Pump one established connection until it drops.
    async fn serve(&mut self, stream: WebSocketStream<MaybeTlsStream<TcpStream>>) {
        let (mut ws_tx, mut ws_rx) = stream.split();

        let mut ping = tokio::time::interval(self.config.ping_interval);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Consume the immediate first tick.
        ping.tick().await;

        loop {
            tokio::select! {
                outbound = self.outbound_rx.recv() => {
                    let Some(message) = outbound else {
                        let _ = ws_tx.close().await;
                        return;
                    };
                    if Self::transmit(&mut ws_tx, &message).await.is_err() {
                        return;
                    }
                }

                inbound = ws_rx.next() => {
                    match inbound {
                        Some(Ok(Message::Text(text))) => self.dispatch(&text).await,
                        Some(Ok(Message::Close(_))) => {
                            info!("Server closed the connection");
                            return;
                        }
                        // Binary and control frames are not part of the protocol.
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("WebSocket error: {}", e);
                            return;
                        }
                        None => return,
                    }
                }

                _ = ping.tick() => {
                    if Self::transmit(&mut ws_tx, &ClientMessage::Ping).await.is_err() {
                        return;
                    }
                }
            }
        }
    }

    async fn transmit<S>(ws_tx: &mut S, message: &ClientMessage) -> Result<(), ()>
    where
        S: futures::Sink<Message> + Unpin,
        S::Error: std::fmt::Display,
    {
        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to serialize outbound message: {}", e);
                return Ok(());
            }
        };

        ws_tx.send(Message::Text(text)).await.map_err(|e| {
            warn!("Send failed: {}", e);
        })
    }

    async fn dispatch(&self, text: &str) {
        match serde_json::from_str::<ServerMessage>(text) {
            Ok(message) => {
                // A dropped receiver means the session is shutting down; the
                // outer loop exits once the outbound channel closes too.
                let _ = self.inbound_tx.send(message).await;
            }
            Err(e) => warn!("Dropping malformed message: {}", e),
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }
}
