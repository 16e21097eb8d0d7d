use std::path::{Path, PathBuf};

use hound::WavReader;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::source::{AudioFragment, CaptureConfig, CaptureDevice, CaptureService};
use crate::error::ClientError;

/// Duration of each emitted fragment.
const FRAGMENT_MS: u64 = 100;

/// Capture service backed by a WAV file, paced in real time. Stands in for
/// platform microphone capture in the reference client: each acquisition
/// replays the file from the beginning.
pub struct FileCaptureService {
    path: PathBuf,
}

impl FileCaptureService {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait::async_trait]
impl CaptureService for FileCaptureService {
    async fn acquire(&self, config: &CaptureConfig) -> Result<Box<dyn CaptureDevice>, ClientError> {
        let reader = WavReader::open(&self.path)
            .map_err(|e| ClientError::MicrophoneUnavailable(e.to_string()))?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ClientError::MicrophoneUnavailable(e.to_string()))?;

        if spec.sample_rate != config.sample_rate || spec.channels != config.channels {
            warn!(
                "Capture file is {}Hz/{}ch, requested {}Hz/{}ch",
                spec.sample_rate, spec.channels, config.sample_rate, config.channels
            );
        }

        info!(
            "Acquired file capture source: {} ({}Hz, {} channels, {} samples)",
            self.path.display(),
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Box::new(FileCaptureDevice {
            samples,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            mime_type: format!("audio/pcm;rate={}", spec.sample_rate),
            task: None,
        }))
    }
}

/// Replays decoded samples as raw little-endian PCM fragments.
pub struct FileCaptureDevice {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
    mime_type: String,
    task: Option<JoinHandle<()>>,
}

#[async_trait::async_trait]
impl CaptureDevice for FileCaptureDevice {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFragment>, ClientError> {
        let (tx, rx) = mpsc::channel(16);

        let samples = std::mem::take(&mut self.samples);
        let samples_per_fragment =
            (self.sample_rate as u64 * self.channels as u64 * FRAGMENT_MS / 1000).max(1) as usize;

        let task = tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_millis(FRAGMENT_MS));
            let mut timestamp_ms = 0;

            for chunk in samples.chunks(samples_per_fragment) {
                interval.tick().await;

                let bytes: Vec<u8> = chunk.iter().flat_map(|s| s.to_le_bytes()).collect();
                let fragment = AudioFragment {
                    bytes,
                    timestamp_ms,
                };

                // Receiver gone: the episode has already closed.
                if tx.send(fragment).await.is_err() {
                    return;
                }

                timestamp_ms += FRAGMENT_MS;
            }
            // Sender drops here; the episode ends via its own timers.
        });

        self.task = Some(task);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), ClientError> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }
}
