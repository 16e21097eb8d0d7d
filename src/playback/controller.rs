use std::sync::Arc;

use tracing::{debug, warn};

use super::synthesizer::{SynthesisEvent, Synthesizer, Utterance, UtteranceHandle, Voice};
use crate::prefs::{KvStore, VoicePreferences};

/// Voices tried in order when the user has no explicit selection.
const PREFERRED_VOICES: &[&str] = &[
    "Samantha",
    "Alex",
    "Victoria",
    "Daniel",
    "Karen",
    "Tom",
    "Google UK English Female",
    "Google UK English Male",
    "Google US English Female",
    "Google US English Male",
    "Microsoft David - English (United States)",
    "Microsoft Zira - English (United States)",
    "Natural",
    "Enhanced",
    "Premium",
];

/// Last-resort markers for a decent-sounding voice.
const FALLBACK_MARKERS: &[&str] = &["enhanced", "premium", "natural", "google", "microsoft"];

const DEFAULT_VOLUME: f32 = 0.9;

/// Speaks incoming reply text. Each `speak` call preempts the previous
/// utterance; there is no queue, so streamed reply chunks interrupt each
/// other.
pub struct PlaybackController {
    synthesizer: Arc<dyn Synthesizer>,
    store: Arc<dyn KvStore>,
    voices: Vec<Voice>,
    current: Option<UtteranceHandle>,
}

impl PlaybackController {
    pub fn new(synthesizer: Arc<dyn Synthesizer>, store: Arc<dyn KvStore>) -> Self {
        Self {
            synthesizer,
            store,
            voices: Vec::new(),
            current: None,
        }
    }

    /// Re-query the voice catalog. The platform may populate it after
    /// startup, so an empty result is not an error.
    pub async fn refresh_voices(&mut self) {
        match self.synthesizer.voices().await {
            Ok(voices) => {
                debug!("Voice catalog loaded: {} voices", voices.len());
                self.voices = voices;
            }
            Err(e) => warn!("Failed to query voices: {}", e),
        }
    }

    /// Cancel the active utterance and speak `text` with the current voice
    /// preferences. Synthesis failures are logged; the session continues.
    pub async fn speak(&mut self, text: &str) {
        self.cancel();

        if self.voices.is_empty() {
            self.refresh_voices().await;
        }

        let prefs = VoicePreferences::load(self.store.as_ref());
        let voice = select_voice(&self.voices, prefs.voice.as_deref());

        let utterance = Utterance {
            text: add_natural_pauses(text),
            voice,
            rate: prefs.speed,
            pitch: prefs.pitch,
            volume: DEFAULT_VOLUME,
        };

        match self.synthesizer.speak(utterance).await {
            Ok(mut handle) => {
                if let Some(mut events) = handle.take_events() {
                    tokio::spawn(async move {
                        while let Some(event) = events.recv().await {
                            match event {
                                SynthesisEvent::Started => debug!("Utterance started"),
                                SynthesisEvent::Ended => debug!("Utterance finished"),
                                SynthesisEvent::Failed(e) => warn!("Synthesis error: {}", e),
                            }
                        }
                    });
                }
                self.current = Some(handle);
            }
            Err(e) => warn!("Failed to start synthesis: {}", e),
        }
    }

    /// The interruption primitive: stop any in-progress utterance now.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.cancel();
        }
    }
}

/// Resolve a voice: explicit preference when present in the catalog, else
/// the preference list, else a marker scan, else the platform default.
fn select_voice(voices: &[Voice], preferred: Option<&str>) -> Option<Voice> {
    if let Some(name) = preferred {
        if let Some(voice) = voices.iter().find(|v| v.name == name) {
            return Some(voice.clone());
        }
    }

    for wanted in PREFERRED_VOICES {
        let wanted_lower = wanted.to_lowercase();
        if let Some(voice) = voices
            .iter()
            .find(|v| v.name.contains(wanted) || v.name.to_lowercase().contains(&wanted_lower))
        {
            return Some(voice.clone());
        }
    }

    voices
        .iter()
        .find(|v| {
            let name = v.name.to_lowercase();
            FALLBACK_MARKERS.iter().any(|marker| name.contains(marker))
        })
        .cloned()
}

/// Rewrite sentence punctuation into pauses so synthesized speech breathes.
fn add_natural_pauses(text: &str) -> String {
    text.replace('.', "... ")
        .replace('!', "... ")
        .replace('?', "... ")
        .replace(',', ", ")
        .replace(':', "... ")
        .replace(';', "... ")
}
