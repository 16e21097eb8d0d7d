use anyhow::Result;
use tokio::sync::mpsc;

use crate::error::ClientError;

/// One encoded audio fragment delivered by a capture device.
#[derive(Debug, Clone)]
pub struct AudioFragment {
    pub bytes: Vec<u8>,
    /// Milliseconds since the device started capturing.
    pub timestamp_ms: u64,
}

/// A finalized utterance: every fragment of one episode, concatenated, with
/// a single media type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioUnit {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Requested capture stream parameters.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub sample_rate: u32,
    /// 1 = mono, 2 = stereo.
    pub channels: u16,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            echo_cancellation: true,
            noise_suppression: true,
        }
    }
}

/// An acquired capture device, held for the duration of one episode.
#[async_trait::async_trait]
pub trait CaptureDevice: Send {
    /// Begin capturing.
    ///
    /// Returns a channel receiver that will receive audio fragments in
    /// arrival order.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFragment>, ClientError>;

    /// Release the device.
    async fn stop(&mut self) -> Result<(), ClientError>;

    /// Media type of the fragments this device produces.
    fn mime_type(&self) -> &str;
}

/// Hardware capture service: acquires the microphone for one episode at a
/// time. Acquisition fails with `MicrophoneUnavailable` when the device is
/// denied or busy.
#[async_trait::async_trait]
pub trait CaptureService: Send + Sync {
    async fn acquire(&self, config: &CaptureConfig) -> Result<Box<dyn CaptureDevice>, ClientError>;
}
