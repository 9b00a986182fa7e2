//! Abstraction of the component that actually plays streams.
//!
//! The engine only hands over resolved entries and forwards the transport
//! setters; decoding and output live behind this trait.

use crate::error::Result;
use async_trait::async_trait;
use sbsource::{CanonicalTrack, StreamDescriptor};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// Largest value accepted by [`PlaybackTransport::set_volume`]
pub const MAX_VOLUME: u16 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RepeatMode {
    #[default]
    Off,
    One,
    All,
}

/// Last values forwarded to the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportState {
    pub volume: u16,
    pub muted: bool,
    pub repeat: RepeatMode,
    pub position: Duration,
}

impl Default for TransportState {
    fn default() -> Self {
        Self {
            volume: MAX_VOLUME,
            muted: false,
            repeat: RepeatMode::Off,
            position: Duration::ZERO,
        }
    }
}

/// Capacités de lecture du player actif.
#[async_trait]
pub trait PlaybackTransport: Send + Sync {
    /// Charge le flux résolu de l'entrée courante et démarre la lecture.
    async fn open(&self, track: &CanonicalTrack, stream: &StreamDescriptor) -> Result<()>;

    /// Volume logique, `0..=MAX_VOLUME`.
    async fn set_volume(&self, volume: u16) -> Result<()>;

    async fn set_muted(&self, muted: bool) -> Result<()>;

    async fn set_repeat(&self, mode: RepeatMode) -> Result<()>;

    /// Seek à une position absolue dans le morceau courant.
    async fn seek(&self, position: Duration) -> Result<()>;
}

/// Headless transport: logs what a real player would do
#[derive(Debug, Clone, Default)]
pub struct LoggingTransport;

#[async_trait]
impl PlaybackTransport for LoggingTransport {
    async fn open(&self, track: &CanonicalTrack, stream: &StreamDescriptor) -> Result<()> {
        info!(
            track = %track.key(),
            title = track.title.as_str(),
            kind = ?stream.kind,
            mime = stream.mime_type.as_deref().unwrap_or("-"),
            "▶️ {}",
            stream.url
        );
        Ok(())
    }

    async fn set_volume(&self, volume: u16) -> Result<()> {
        info!(volume, "volume");
        Ok(())
    }

    async fn set_muted(&self, muted: bool) -> Result<()> {
        info!(muted, "mute");
        Ok(())
    }

    async fn set_repeat(&self, mode: RepeatMode) -> Result<()> {
        info!(mode = ?mode, "repeat");
        Ok(())
    }

    async fn seek(&self, position: Duration) -> Result<()> {
        info!(position_ms = position.as_millis() as u64, "seek");
        Ok(())
    }
}
