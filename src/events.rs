use std::time::Duration;

use crate::capture::StopReason;
use crate::connection::ConnectionState;

/// Events surfaced to the UI layer over a broadcast channel. Status only;
/// nothing here feeds back into the core state machine.
#[derive(Debug, Clone)]
pub enum UiEvent {
    /// Connection status changed.
    Connection(ConnectionState),
    /// A capture episode opened.
    RecordingStarted,
    /// A capture episode closed.
    RecordingStopped { reason: StopReason },
    /// Time left until the silence auto-stop fires.
    Countdown { remaining: Duration },
    /// One streamed chunk of the assistant reply.
    Reply { text: String },
    /// The current reply finished streaming.
    ReplyEnded,
    /// A non-fatal error the user should see.
    Error { message: String },
}

/// User intents consumed from the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserIntent {
    StartCapture,
    StopCapture,
}
