use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::source::{AudioFragment, AudioUnit, CaptureConfig, CaptureDevice, CaptureService};
use crate::error::ClientError;
use crate::events::UiEvent;

/// Why an episode ended. The silence and hard timers race; whichever fires
/// first wins, and all three paths converge on the same stop sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No fragment arrived within the silence window.
    Silence,
    /// The unconditional per-episode cap fired.
    MaxDuration,
    /// `stop_episode` was called.
    Manual,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Silence => write!(f, "silence"),
            StopReason::MaxDuration => write!(f, "max-duration"),
            StopReason::Manual => write!(f, "manual"),
        }
    }
}

/// Timer configuration for one episode.
#[derive(Debug, Clone)]
pub struct EpisodeTiming {
    /// Auto-stop after this long without a new fragment.
    pub silence_timeout: Duration,
    /// Auto-stop this long after the episode opens, regardless of activity.
    pub max_duration: Duration,
    /// Granularity of the countdown feedback ticks.
    pub countdown_tick: Duration,
}

impl Default for EpisodeTiming {
    fn default() -> Self {
        Self {
            silence_timeout: Duration::from_secs(2),
            max_duration: Duration::from_secs(3),
            countdown_tick: Duration::from_millis(100),
        }
    }
}

/// The single result of one capture episode. `unit` is `None` when no
/// fragments were captured.
#[derive(Debug)]
pub struct EpisodeOutcome {
    pub unit: Option<AudioUnit>,
    pub reason: StopReason,
}

/// Owns the capture lifecycle: at most one open episode at a time, dual
/// auto-stop timers, and packaging of captured fragments into one outbound
/// unit delivered to the session coordinator.
pub struct CaptureController {
    service: Arc<dyn CaptureService>,
    config: CaptureConfig,
    timing: EpisodeTiming,
    outcome_tx: mpsc::Sender<EpisodeOutcome>,
    events: broadcast::Sender<UiEvent>,
    episode: Option<EpisodeHandle>,
}

struct EpisodeHandle {
    stop_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl CaptureController {
    pub fn new(
        service: Arc<dyn CaptureService>,
        config: CaptureConfig,
        timing: EpisodeTiming,
        outcome_tx: mpsc::Sender<EpisodeOutcome>,
        events: broadcast::Sender<UiEvent>,
    ) -> Self {
        Self {
            service,
            config,
            timing,
            outcome_tx,
            events,
            episode: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.episode
            .as_ref()
            .is_some_and(|episode| !episode.task.is_finished())
    }

    /// Open a capture episode.
    ///
    /// Fails with `MicrophoneUnavailable` when the device cannot be acquired
    /// and `CaptureBusy` when an episode is already open. On success the
    /// episode runs until a timer fires or `stop_episode` is called.
    pub async fn start_episode(&mut self) -> Result<(), ClientError> {
        self.clear_finished();
        if self.episode.is_some() {
            return Err(ClientError::CaptureBusy);
        }

        let mut device = self.service.acquire(&self.config).await?;

        let fragments = match device.start().await {
            Ok(fragments) => fragments,
            Err(e) => {
                // Release on the error path too.
                if let Err(stop_err) = device.stop().await {
                    warn!("Failed to release capture device: {}", stop_err);
                }
                return Err(e);
            }
        };

        let (stop_tx, stop_rx) = mpsc::channel(1);
        let task = tokio::spawn(run_episode(
            device,
            fragments,
            stop_rx,
            self.timing.clone(),
            self.outcome_tx.clone(),
            self.events.clone(),
        ));

        self.episode = Some(EpisodeHandle { stop_tx, task });
        Ok(())
    }

    /// Request the open episode to stop. A no-op when none is open.
    pub fn stop_episode(&mut self) {
        if let Some(episode) = &self.episode {
            let _ = episode.stop_tx.try_send(());
        }
    }

    /// Drop the episode handle once its task has ended. Called after the
    /// episode outcome is observed, and again before the next start.
    pub fn clear_finished(&mut self) {
        if self
            .episode
            .as_ref()
            .is_some_and(|episode| episode.task.is_finished())
        {
            self.episode = None;
        }
    }
}

/// One episode: accumulate fragments until a stop path fires, release the
/// device, and emit the finalized unit.
async fn run_episode(
    mut device: Box<dyn CaptureDevice>,
    mut fragments: mpsc::Receiver<AudioFragment>,
    mut stop_rx: mpsc::Receiver<()>,
    timing: EpisodeTiming,
    outcome_tx: mpsc::Sender<EpisodeOutcome>,
    events: broadcast::Sender<UiEvent>,
) {
    let hard_deadline = Instant::now() + timing.max_duration;
    let mut collected: Vec<AudioFragment> = Vec::new();
    let mut last_fragment: Option<Instant> = None;
    let mut source_open = true;

    let mut countdown = tokio::time::interval(timing.countdown_tick);
    countdown.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let _ = events.send(UiEvent::RecordingStarted);
    info!("Capture episode opened");

    let reason = loop {
        // The silence window is armed by the first fragment and recomputed
        // from the latest arrival.
        let silence_deadline = last_fragment.map(|at| at + timing.silence_timeout);

        tokio::select! {
            fragment = fragments.recv(), if source_open => {
                match fragment {
                    Some(fragment) => {
                        collected.push(fragment);
                        last_fragment = Some(Instant::now());
                    }
                    // A drained source does not end the episode; the timers do.
                    None => source_open = false,
                }
            }

            _ = stop_rx.recv() => break StopReason::Manual,

            _ = tokio::time::sleep_until(hard_deadline) => break StopReason::MaxDuration,

            _ = async {
                match silence_deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            } => break StopReason::Silence,

            _ = countdown.tick() => {
                if let Some(deadline) = silence_deadline {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    let _ = events.send(UiEvent::Countdown { remaining });
                }
            }
        }
    };

    if let Err(e) = device.stop().await {
        warn!("Failed to release capture device: {}", e);
    }

    info!(
        "Capture episode closed: {} ({} fragments)",
        reason,
        collected.len()
    );

    let unit = finalize(collected, device.mime_type());
    let _ = events.send(UiEvent::RecordingStopped { reason });

    if outcome_tx
        .send(EpisodeOutcome { unit, reason })
        .await
        .is_err()
    {
        debug!("Episode outcome dropped, coordinator gone");
    }
}

fn finalize(fragments: Vec<AudioFragment>, mime_type: &str) -> Option<AudioUnit> {
    if fragments.is_empty() {
        return None;
    }

    let data = fragments
        .into_iter()
        .flat_map(|fragment| fragment.bytes)
        .collect();

    Some(AudioUnit {
        data,
        mime_type: mime_type.to_string(),
    })
}
