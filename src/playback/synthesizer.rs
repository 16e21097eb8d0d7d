use tokio::sync::{mpsc, oneshot};

use crate::error::ClientError;

/// A voice offered by the synthesis service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    pub language: Option<String>,
}

impl Voice {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language: None,
        }
    }
}

/// One utterance submitted for synthesis.
#[derive(Debug, Clone)]
pub struct Utterance {
    pub text: String,
    /// `None` selects the platform default voice.
    pub voice: Option<Voice>,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

/// Utterance lifecycle notifications. Observational only; they never affect
/// session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisEvent {
    Started,
    Ended,
    Failed(String),
}

/// Handle to one in-flight utterance.
pub struct UtteranceHandle {
    cancel_tx: Option<oneshot::Sender<()>>,
    events: Option<mpsc::Receiver<SynthesisEvent>>,
}

impl UtteranceHandle {
    pub fn new(cancel_tx: oneshot::Sender<()>, events: mpsc::Receiver<SynthesisEvent>) -> Self {
        Self {
            cancel_tx: Some(cancel_tx),
            events: Some(events),
        }
    }

    /// Take the lifecycle event stream. Yields `None` after the first call.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<SynthesisEvent>> {
        self.events.take()
    }

    /// Stop the utterance immediately.
    pub fn cancel(mut self) {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            let _ = cancel_tx.send(());
        }
    }
}

/// Speech synthesis service seam.
#[async_trait::async_trait]
pub trait Synthesizer: Send + Sync {
    /// Voice catalog. May be empty until the platform has loaded voices.
    async fn voices(&self) -> Result<Vec<Voice>, ClientError>;

    /// Begin speaking. Returns once the utterance is submitted; progress
    /// arrives through the handle's event stream.
    async fn speak(&self, utterance: Utterance) -> Result<UtteranceHandle, ClientError>;
}
