use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::capture::AudioUnit;

/// Outbound message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// One complete captured utterance, base64-encoded.
    Audio {
        audio_data: String,
        mime_type: String,
    },
    /// Connection health probe.
    Ping,
}

impl ClientMessage {
    /// Package a finalized audio unit for the wire.
    pub fn audio(unit: &AudioUnit) -> Self {
        Self::Audio {
            audio_data: base64::engine::general_purpose::STANDARD.encode(&unit.data),
            mime_type: unit.mime_type.clone(),
        }
    }
}

/// Inbound message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// One streamed chunk of the assistant reply.
    ResponseChunk { text: String },
    /// End of the current reply.
    ResponseEnd,
    /// Server-side failure description.
    Error { message: String },
    /// Reply to a ping.
    Pong,
}
