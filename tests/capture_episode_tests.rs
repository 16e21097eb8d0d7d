// Capture episode lifecycle tests.
//
// These run on the paused tokio clock, so the silence window, the hard cap,
// and the countdown ticks fire deterministically and the tests finish in
// milliseconds of real time.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use voxlink::{
    AudioFragment, CaptureConfig, CaptureController, CaptureDevice, CaptureService, ClientError,
    EpisodeOutcome, EpisodeTiming, StopReason, UiEvent,
};

/// Capture service fed by the test: each acquisition hands out the next
/// pre-built fragment channel.
struct ScriptedMic {
    streams: Mutex<VecDeque<mpsc::Receiver<AudioFragment>>>,
    fail: bool,
}

impl ScriptedMic {
    fn with_streams(count: usize) -> (Arc<Self>, Vec<mpsc::Sender<AudioFragment>>) {
        let mut streams = VecDeque::new();
        let mut senders = Vec::new();

        for _ in 0..count {
            let (tx, rx) = mpsc::channel(32);
            streams.push_back(rx);
            senders.push(tx);
        }

        let service = Arc::new(Self {
            streams: Mutex::new(streams),
            fail: false,
        });

        (service, senders)
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            streams: Mutex::new(VecDeque::new()),
            fail: true,
        })
    }
}

#[async_trait::async_trait]
impl CaptureService for ScriptedMic {
    async fn acquire(&self, _config: &CaptureConfig) -> Result<Box<dyn CaptureDevice>, ClientError> {
        if self.fail {
            return Err(ClientError::MicrophoneUnavailable(
                "permission denied".to_string(),
            ));
        }

        let stream = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ClientError::MicrophoneUnavailable("device busy".to_string()))?;

        Ok(Box::new(ScriptedDevice {
            stream: Some(stream),
        }))
    }
}

struct ScriptedDevice {
    stream: Option<mpsc::Receiver<AudioFragment>>,
}

#[async_trait::async_trait]
impl CaptureDevice for ScriptedDevice {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFragment>, ClientError> {
        self.stream
            .take()
            .ok_or_else(|| ClientError::MicrophoneUnavailable("already started".to_string()))
    }

    async fn stop(&mut self) -> Result<(), ClientError> {
        Ok(())
    }

    fn mime_type(&self) -> &str {
        "audio/pcm;rate=16000"
    }
}

fn controller(
    service: Arc<ScriptedMic>,
) -> (
    CaptureController,
    mpsc::Receiver<EpisodeOutcome>,
    broadcast::Receiver<UiEvent>,
) {
    let (outcome_tx, outcome_rx) = mpsc::channel(4);
    let (events, events_rx) = broadcast::channel(256);

    let controller = CaptureController::new(
        service,
        CaptureConfig::default(),
        EpisodeTiming::default(),
        outcome_tx,
        events,
    );

    (controller, outcome_rx, events_rx)
}

fn fragment(index: u8) -> AudioFragment {
    AudioFragment {
        bytes: vec![index; 10],
        timestamp_ms: index as u64 * 200,
    }
}

#[tokio::test(start_paused = true)]
async fn silence_window_ends_episode_with_all_fragments() {
    let (service, mut senders) = ScriptedMic::with_streams(1);
    let (mut controller, mut outcome_rx, _events) = controller(service);
    let tx = senders.remove(0);

    let started = tokio::time::Instant::now();
    controller.start_episode().await.unwrap();
    assert!(controller.is_recording());

    // Five fragments at 200ms intervals, then the speaker goes quiet.
    for i in 0..5u8 {
        if i > 0 {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        tx.send(fragment(i)).await.unwrap();
    }

    let outcome = outcome_rx.recv().await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(outcome.reason, StopReason::Silence);

    // Last fragment at 800ms, silence window 2000ms.
    assert!(
        elapsed >= Duration::from_millis(2800) && elapsed < Duration::from_millis(2900),
        "stopped after {:?}",
        elapsed
    );

    let unit = outcome.unit.unwrap();
    let expected: Vec<u8> = (0..5u8).flat_map(|i| vec![i; 10]).collect();
    assert_eq!(unit.data, expected);
    assert_eq!(unit.mime_type, "audio/pcm;rate=16000");
}

#[tokio::test(start_paused = true)]
async fn hard_cap_ends_episode_despite_steady_fragments() {
    let (service, mut senders) = ScriptedMic::with_streams(1);
    let (mut controller, mut outcome_rx, _events) = controller(service);
    let tx = senders.remove(0);

    let started = tokio::time::Instant::now();
    controller.start_episode().await.unwrap();

    // Fragments keep arriving well inside the silence window.
    let feeder = tokio::spawn(async move {
        let mut i = 0u8;
        loop {
            if tx.send(fragment(i)).await.is_err() {
                break;
            }
            i = i.wrapping_add(1);
            tokio::time::sleep(Duration::from_millis(90)).await;
        }
    });

    let outcome = outcome_rx.recv().await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(outcome.reason, StopReason::MaxDuration);
    assert!(
        elapsed >= Duration::from_millis(3000) && elapsed < Duration::from_millis(3100),
        "stopped after {:?}",
        elapsed
    );
    assert!(outcome.unit.is_some());

    feeder.abort();
}

#[tokio::test(start_paused = true)]
async fn episode_with_no_fragments_emits_no_unit() {
    let (service, senders) = ScriptedMic::with_streams(1);
    let (mut controller, mut outcome_rx, _events) = controller(service);

    controller.start_episode().await.unwrap();

    // Nobody speaks; the hard cap still closes the episode.
    let outcome = outcome_rx.recv().await.unwrap();
    assert_eq!(outcome.reason, StopReason::MaxDuration);
    assert!(outcome.unit.is_none());

    drop(senders);
}

#[tokio::test(start_paused = true)]
async fn manual_stop_finalizes_collected_fragments() {
    let (service, mut senders) = ScriptedMic::with_streams(1);
    let (mut controller, mut outcome_rx, _events) = controller(service);
    let tx = senders.remove(0);

    controller.start_episode().await.unwrap();

    for i in 0..2u8 {
        tx.send(fragment(i)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    controller.stop_episode();

    let outcome = outcome_rx.recv().await.unwrap();
    assert_eq!(outcome.reason, StopReason::Manual);

    let unit = outcome.unit.unwrap();
    assert_eq!(unit.data.len(), 20);
}

#[tokio::test(start_paused = true)]
async fn stop_without_episode_is_a_no_op() {
    let (service, _senders) = ScriptedMic::with_streams(1);
    let (mut controller, mut outcome_rx, _events) = controller(service);

    controller.stop_episode();

    assert!(!controller.is_recording());
    assert!(matches!(
        outcome_rx.try_recv(),
        Err(mpsc::error::TryRecvError::Empty)
    ));
}

#[tokio::test(start_paused = true)]
async fn double_start_is_rejected() {
    let (service, _senders) = ScriptedMic::with_streams(2);
    let (mut controller, mut outcome_rx, _events) = controller(service);

    controller.start_episode().await.unwrap();

    let err = controller.start_episode().await.unwrap_err();
    assert!(matches!(err, ClientError::CaptureBusy));

    controller.stop_episode();
    let outcome = outcome_rx.recv().await.unwrap();
    assert_eq!(outcome.reason, StopReason::Manual);
}

#[tokio::test(start_paused = true)]
async fn start_after_finished_episode_succeeds() {
    let (service, senders) = ScriptedMic::with_streams(2);
    let (mut controller, mut outcome_rx, _events) = controller(service);

    controller.start_episode().await.unwrap();
    controller.stop_episode();
    outcome_rx.recv().await.unwrap();

    // Give the episode task a chance to fully finish.
    tokio::time::sleep(Duration::from_millis(10)).await;
    controller.clear_finished();

    controller.start_episode().await.unwrap();
    assert!(controller.is_recording());

    drop(senders);
}

#[tokio::test(start_paused = true)]
async fn unavailable_microphone_surfaces_and_aborts() {
    let service = ScriptedMic::failing();
    let (mut controller, mut outcome_rx, _events) = controller(service);

    let err = controller.start_episode().await.unwrap_err();
    assert!(matches!(err, ClientError::MicrophoneUnavailable(_)));
    assert!(!controller.is_recording());
    assert!(outcome_rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn countdown_ticks_while_silence_window_is_armed() {
    let (service, mut senders) = ScriptedMic::with_streams(1);
    let (mut controller, mut outcome_rx, mut events_rx) = controller(service);
    let tx = senders.remove(0);

    controller.start_episode().await.unwrap();
    tx.send(fragment(0)).await.unwrap();

    let outcome = outcome_rx.recv().await.unwrap();
    assert_eq!(outcome.reason, StopReason::Silence);

    let mut saw_started = false;
    let mut countdowns = Vec::new();
    let mut saw_stopped = false;

    while let Ok(event) = events_rx.try_recv() {
        match event {
            UiEvent::RecordingStarted => saw_started = true,
            UiEvent::Countdown { remaining } => countdowns.push(remaining),
            UiEvent::RecordingStopped { reason } => {
                assert_eq!(reason, StopReason::Silence);
                saw_stopped = true;
            }
            _ => {}
        }
    }

    assert!(saw_started);
    assert!(saw_stopped);
    assert!(!countdowns.is_empty());
    // Remaining time shrinks toward the silence deadline.
    assert!(countdowns.windows(2).all(|w| w[1] <= w[0]));
    assert!(countdowns.iter().all(|r| *r <= Duration::from_secs(2)));
}
