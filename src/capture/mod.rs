pub mod episode;
pub mod file;
pub mod source;

pub use episode::{CaptureController, EpisodeOutcome, EpisodeTiming, StopReason};
pub use file::FileCaptureService;
pub use source::{AudioFragment, AudioUnit, CaptureConfig, CaptureDevice, CaptureService};
