pub mod capture;
pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod playback;
pub mod prefs;
pub mod session;

pub use capture::{
    AudioFragment, AudioUnit, CaptureConfig, CaptureController, CaptureDevice, CaptureService,
    EpisodeOutcome, EpisodeTiming, FileCaptureService, StopReason,
};
pub use config::Config;
pub use connection::{
    ClientMessage, ConnectionConfig, ConnectionHandle, ConnectionManager, ConnectionState,
    ServerMessage,
};
pub use error::ClientError;
pub use events::{UiEvent, UserIntent};
pub use playback::{
    ConsoleSynthesizer, PlaybackController, SynthesisEvent, Synthesizer, Utterance,
    UtteranceHandle, Voice,
};
pub use prefs::{FileStore, KvStore, MemoryStore, Theme, VoicePreferences};
pub use session::{SessionCoordinator, SessionSnapshot, SessionState};
