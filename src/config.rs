use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::capture::{CaptureConfig, EpisodeTiming};
use crate::connection::ConnectionConfig;

/// Client configuration. Every field has a default, so a missing config file
/// yields a client pointed at a local server.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub capture: CaptureSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the chat service (ws:// or wss://).
    pub url: String,

    /// Delay before each reconnect attempt. Retries repeat indefinitely.
    pub reconnect_delay_secs: u64,

    /// Interval between connection health pings.
    pub ping_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8000".to_string(),
            reconnect_delay_secs: 3,
            ping_interval_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Per-session endpoint address.
    pub fn endpoint(&self, session_id: &str) -> String {
        format!("{}/ws/{}", self.url.trim_end_matches('/'), session_id)
    }

    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            reconnect_delay: Duration::from_secs(self.reconnect_delay_secs),
            ping_interval: Duration::from_secs(self.ping_interval_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Requested sample rate in Hz.
    pub sample_rate: u32,

    /// Requested channel count (1 = mono).
    pub channels: u16,

    pub echo_cancellation: bool,
    pub noise_suppression: bool,

    /// Episode auto-stops this long after the last fragment.
    pub silence_timeout_ms: u64,

    /// Episode auto-stops this long after it starts, regardless of activity.
    pub max_utterance_ms: u64,

    /// Granularity of the silence-countdown feedback ticks.
    pub countdown_tick_ms: u64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            echo_cancellation: true,
            noise_suppression: true,
            silence_timeout_ms: 2000,
            max_utterance_ms: 3000,
            countdown_tick_ms: 100,
        }
    }
}

impl CaptureSettings {
    pub fn stream(&self) -> CaptureConfig {
        CaptureConfig {
            sample_rate: self.sample_rate,
            channels: self.channels,
            echo_cancellation: self.echo_cancellation,
            noise_suppression: self.noise_suppression,
        }
    }

    pub fn timing(&self) -> EpisodeTiming {
        EpisodeTiming {
            silence_timeout: Duration::from_millis(self.silence_timeout_ms),
            max_duration: Duration::from_millis(self.max_utterance_ms),
            countdown_tick: Duration::from_millis(self.countdown_tick_ms),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_client_timing() {
        let cfg = Config::default();
        assert_eq!(cfg.server.reconnect_delay_secs, 3);
        assert_eq!(cfg.capture.silence_timeout_ms, 2000);
        assert_eq!(cfg.capture.max_utterance_ms, 3000);
        assert_eq!(cfg.capture.sample_rate, 16000);
        assert_eq!(cfg.capture.channels, 1);
    }

    #[test]
    fn endpoint_appends_session_path() {
        let server = ServerConfig {
            url: "ws://example.com:9000/".to_string(),
            ..ServerConfig::default()
        };
        assert_eq!(
            server.endpoint("client-abc"),
            "ws://example.com:9000/ws/client-abc"
        );
    }
}
