use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::snapshot::SessionSnapshot;
use crate::capture::{CaptureController, CaptureService, EpisodeOutcome};
use crate::config::Config;
use crate::connection::{
    ClientMessage, ConnectionHandle, ConnectionManager, ConnectionState, ServerMessage,
};
use crate::error::ClientError;
use crate::events::{UiEvent, UserIntent};
use crate::playback::{PlaybackController, Synthesizer};
use crate::prefs::KvStore;

/// Session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Waiting for the user to speak.
    Idle,
    /// A capture episode is open.
    Capturing,
    /// An utterance was sent; reply chunks may still be streaming in.
    AwaitingReply,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Capturing => write!(f, "Capturing"),
            SessionState::AwaitingReply => write!(f, "AwaitingReply"),
        }
    }
}

/// Composes the connection, capture, and playback controllers and runs the
/// session state machine over them.
///
/// The coordinator is the only component that sends on the connection.
/// Starting a capture episode always cancels in-flight playback first, so
/// the user's speech never overlaps the assistant's.
pub struct SessionCoordinator {
    session_id: String,
    state: SessionState,
    reply_text: String,
    started_at: DateTime<Utc>,
    connection: ConnectionHandle,
    capture: CaptureController,
    playback: PlaybackController,
    inbound_rx: mpsc::Receiver<ServerMessage>,
    outcome_rx: mpsc::Receiver<EpisodeOutcome>,
    intent_rx: mpsc::Receiver<UserIntent>,
    events: broadcast::Sender<UiEvent>,
}

/// One input to the session state machine, whatever channel it arrived on.
enum Input {
    Intent(Option<UserIntent>),
    Outcome(Option<EpisodeOutcome>),
    Server(Option<ServerMessage>),
    Connection(bool),
}

impl SessionCoordinator {
    /// Wire up a session: generate its identifier, start connecting, and
    /// compose the controllers. Returns the coordinator and the intent
    /// sender for the UI layer.
    pub fn new(
        config: &Config,
        store: Arc<dyn KvStore>,
        capture_service: Arc<dyn CaptureService>,
        synthesizer: Arc<dyn Synthesizer>,
    ) -> (Self, mpsc::Sender<UserIntent>) {
        let session_id = format!("client-{}", Uuid::new_v4());
        let (events, _) = broadcast::channel(64);

        let (inbound_tx, inbound_rx) = mpsc::channel(64);
        let connection = ConnectionManager::spawn(
            config.server.endpoint(&session_id),
            config.server.connection(),
            inbound_tx,
        );

        let (outcome_tx, outcome_rx) = mpsc::channel(4);
        let capture = CaptureController::new(
            capture_service,
            config.capture.stream(),
            config.capture.timing(),
            outcome_tx,
            events.clone(),
        );

        let playback = PlaybackController::new(synthesizer, store);

        let (intent_tx, intent_rx) = mpsc::channel(16);

        let coordinator = Self {
            session_id,
            state: SessionState::Idle,
            reply_text: String::new(),
            started_at: Utc::now(),
            connection,
            capture,
            playback,
            inbound_rx,
            outcome_rx,
            intent_rx,
            events,
        };

        (coordinator, intent_tx)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Subscribe to UI events.
    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            state: self.state,
            connection: self.connection.state(),
            started_at: self.started_at,
            reply_text: self.reply_text.clone(),
        }
    }

    /// Drive the session until the intent channel closes.
    pub async fn run(mut self) {
        info!("Session {} started", self.session_id);

        self.playback.refresh_voices().await;

        let mut connection_state = self.connection.state_changes();
        let _ = self
            .events
            .send(UiEvent::Connection(*connection_state.borrow_and_update()));

        loop {
            let input = tokio::select! {
                intent = self.intent_rx.recv() => Input::Intent(intent),
                outcome = self.outcome_rx.recv() => Input::Outcome(outcome),
                message = self.inbound_rx.recv() => Input::Server(message),
                changed = connection_state.changed() => Input::Connection(changed.is_ok()),
            };

            match input {
                Input::Intent(Some(intent)) => self.handle_intent(intent).await,
                Input::Outcome(Some(outcome)) => self.handle_episode_outcome(outcome).await,
                Input::Server(Some(message)) => self.handle_server_message(message).await,
                Input::Connection(true) => {
                    let state = *connection_state.borrow_and_update();
                    let _ = self.events.send(UiEvent::Connection(state));
                }
                // The UI dropped its intent sender: shut down.
                Input::Intent(None) => break,
                // Internal channels only close when a component died.
                Input::Outcome(None) | Input::Server(None) | Input::Connection(false) => {
                    warn!("Session channel closed unexpectedly");
                    break;
                }
            }
        }

        info!("Session {} shutting down", self.session_id);
        self.playback.cancel();
        self.capture.stop_episode();
        self.connection.shutdown().await;
    }

    /// Dispatch one user intent.
    pub async fn handle_intent(&mut self, intent: UserIntent) {
        match intent {
            UserIntent::StartCapture => self.begin_capture().await,
            UserIntent::StopCapture => self.capture.stop_episode(),
        }
    }

    /// Dispatch the outcome of one capture episode.
    pub async fn handle_episode_outcome(&mut self, outcome: EpisodeOutcome) {
        self.capture.clear_finished();

        let Some(unit) = outcome.unit else {
            debug!("Episode produced no audio");
            self.transition_to(SessionState::Idle);
            return;
        };

        match self.connection.send(ClientMessage::audio(&unit)) {
            Ok(()) => self.transition_to(SessionState::AwaitingReply),
            Err(e) => {
                // Dropped, not queued: the user is told and the turn is over.
                warn!("Dropping captured audio: {}", e);
                let _ = self.events.send(UiEvent::Error {
                    message: e.to_string(),
                });
                self.transition_to(SessionState::Idle);
            }
        }
    }

    /// Dispatch one inbound server message.
    pub async fn handle_server_message(&mut self, message: ServerMessage) {
        match message {
            // Streamed chunks are spoken as they arrive, whatever the
            // current state.
            ServerMessage::ResponseChunk { text } => {
                self.reply_text.push_str(&text);
                let _ = self.events.send(UiEvent::Reply { text: text.clone() });
                self.playback.speak(&text).await;
            }
            ServerMessage::ResponseEnd => {
                self.reply_text.clear();
                let _ = self.events.send(UiEvent::ReplyEnded);
                if self.state == SessionState::AwaitingReply {
                    self.transition_to(SessionState::Idle);
                }
            }
            // Status only; the state machine does not move.
            ServerMessage::Error { message } => {
                warn!("Server error: {}", message);
                let _ = self.events.send(UiEvent::Error { message });
            }
            ServerMessage::Pong => debug!("Pong received"),
        }
    }

    /// Speaking always wins over listening: cancel playback, then acquire
    /// the microphone.
    async fn begin_capture(&mut self) {
        self.playback.cancel();

        match self.capture.start_episode().await {
            Ok(()) => self.transition_to(SessionState::Capturing),
            Err(ClientError::CaptureBusy) => debug!("Capture already in progress"),
            Err(e) => {
                warn!("Failed to start capture: {}", e);
                let _ = self.events.send(UiEvent::Error {
                    message: e.to_string(),
                });
            }
        }
    }

    fn transition_to(&mut self, next: SessionState) {
        if next == self.state {
            return;
        }

        info!(from = %self.state, to = %next, "Session state transition");
        self.state = next;
    }
}
