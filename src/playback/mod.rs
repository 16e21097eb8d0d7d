pub mod console;
pub mod controller;
pub mod synthesizer;

pub use console::ConsoleSynthesizer;
pub use controller::PlaybackController;
pub use synthesizer::{SynthesisEvent, Synthesizer, Utterance, UtteranceHandle, Voice};
