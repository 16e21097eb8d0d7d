use thiserror::Error;

/// Failure taxonomy for the voice client.
///
/// None of these are fatal to the session: connection errors feed the
/// reconnect loop, capture and synthesis failures surface to the UI, and the
/// coordinator returns to an idle state.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Send attempted while the connection is not established. The outbound
    /// unit is dropped, not queued.
    #[error("not connected to server")]
    NotConnected,

    /// The microphone could not be acquired (permission denied or device
    /// busy).
    #[error("microphone unavailable: {0}")]
    MicrophoneUnavailable(String),

    /// Transport-level failure.
    #[error("connection error: {0}")]
    Connection(String),

    /// Inbound payload that does not parse as a known message.
    #[error("malformed message: {0}")]
    MalformedMessage(#[from] serde_json::Error),

    /// Speech synthesis failure.
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// A capture episode is already open.
    #[error("capture already in progress")]
    CaptureBusy,
}
