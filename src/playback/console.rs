use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::synthesizer::{SynthesisEvent, Synthesizer, Utterance, UtteranceHandle, Voice};
use crate::error::ClientError;

/// Milliseconds of simulated speech per word at rate 1.0.
const MS_PER_WORD: u64 = 300;

/// Headless stand-in for a platform TTS engine: prints utterance text and
/// holds the utterance "speaking" for a duration proportional to its word
/// count, honoring cancellation.
#[derive(Debug, Default)]
pub struct ConsoleSynthesizer;

impl ConsoleSynthesizer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Synthesizer for ConsoleSynthesizer {
    async fn voices(&self) -> Result<Vec<Voice>, ClientError> {
        // No platform catalog; the controller falls back to the default.
        Ok(Vec::new())
    }

    async fn speak(&self, utterance: Utterance) -> Result<UtteranceHandle, ClientError> {
        let (events_tx, events_rx) = mpsc::channel(4);
        let (cancel_tx, cancel_rx) = oneshot::channel();

        tokio::spawn(async move {
            let _ = events_tx.send(SynthesisEvent::Started).await;
            println!("{}", utterance.text);

            let words = utterance.text.split_whitespace().count().max(1) as u64;
            let rate = utterance.rate.max(0.1);
            let duration = Duration::from_millis(words * MS_PER_WORD).div_f32(rate);

            tokio::select! {
                _ = tokio::time::sleep(duration) => {
                    let _ = events_tx.send(SynthesisEvent::Ended).await;
                }
                _ = cancel_rx => {
                    debug!("Utterance canceled");
                }
            }
        });

        Ok(UtteranceHandle::new(cancel_tx, events_rx))
    }
}
