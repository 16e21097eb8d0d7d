use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use voxlink::{
    Config, ConsoleSynthesizer, FileCaptureService, FileStore, SessionCoordinator, UiEvent,
    UserIntent,
};

/// Voice chat client: records bounded utterances, sends them to the chat
/// service, and speaks the streamed reply.
#[derive(Parser, Debug)]
#[command(name = "voxlink", version)]
struct Args {
    /// Config file (TOML, optional)
    #[arg(long, default_value = "config/voxlink")]
    config: String,

    /// Override the server URL
    #[arg(long)]
    server: Option<String>,

    /// WAV file used as the microphone source
    #[arg(long)]
    input: PathBuf,

    /// Persisted settings store
    #[arg(long, default_value = "voxlink-settings.json")]
    settings: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut cfg = Config::load(&args.config)?;
    if let Some(url) = args.server {
        cfg.server.url = url;
    }

    let store = Arc::new(FileStore::open(&args.settings)?);
    let capture = Arc::new(FileCaptureService::new(&args.input));
    let synthesizer = Arc::new(ConsoleSynthesizer::new());

    let (coordinator, intents) = SessionCoordinator::new(&cfg, store, capture, synthesizer);
    info!("Session {}", coordinator.session_id());

    let mut events = coordinator.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                UiEvent::Connection(state) => info!("Connection: {}", state),
                UiEvent::RecordingStarted => info!("Recording... speak now"),
                UiEvent::RecordingStopped { reason } => info!("Recording stopped ({})", reason),
                UiEvent::Countdown { remaining } => {
                    debug!("Auto-stop in {:.1}s", remaining.as_secs_f32());
                }
                UiEvent::Reply { text } => debug!("Reply chunk: {}", text),
                UiEvent::ReplyEnded => info!("Reply complete"),
                UiEvent::Error { message } => info!("Error: {}", message),
            }
        }
    });

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        println!("Press Enter to talk, type 'stop' to end a recording, 'quit' to exit.");

        while let Ok(Some(line)) = lines.next_line().await {
            let intent = match line.trim() {
                "" => UserIntent::StartCapture,
                "stop" | "s" => UserIntent::StopCapture,
                "quit" | "q" => break,
                other => {
                    println!("Unknown command: {}", other);
                    continue;
                }
            };

            if intents.send(intent).await.is_err() {
                break;
            }
        }
        // Dropping the sender shuts the session down.
    });

    coordinator.run().await;
    Ok(())
}
