//! Delivery sinks for synchronized media units.
//!
//! Sinks are external collaborators with a single contract: accept one unit,
//! synchronously, and return. They are called from the orchestrator's task,
//! so a slow sink backpressures the whole pipeline by design.

pub mod audio;
pub mod video;

pub use audio::DeviceAudioSink;
pub use video::RawFileSink;

use crate::pipeline::types::MediaUnit;
use anyhow::Result;

/// Receives one paced video frame per delivery cycle.
pub trait VideoSink: Send {
    fn present(&mut self, unit: &MediaUnit) -> Result<()>;
}

/// Receives one paced audio sample buffer per delivery cycle.
pub trait AudioSink: Send {
    fn play(&mut self, unit: &MediaUnit) -> Result<()>;
}

/// Discards frames, counting them. Fallback when no video target is set.
pub struct NullVideoSink {
    presented: u64,
}

impl NullVideoSink {
    pub fn new() -> Self {
        Self { presented: 0 }
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl Default for NullVideoSink {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoSink for NullVideoSink {
    fn present(&mut self, _unit: &MediaUnit) -> Result<()> {
        self.presented += 1;
        Ok(())
    }
}

/// Discards sample buffers, counting them. Fallback when the audio device
/// is unavailable or muted.
pub struct NullAudioSink {
    played: u64,
}

impl NullAudioSink {
    pub fn new() -> Self {
        Self { played: 0 }
    }

    pub fn played(&self) -> u64 {
        self.played
    }
}

impl Default for NullAudioSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSink for NullAudioSink {
    fn play(&mut self, _unit: &MediaUnit) -> Result<()> {
        self.played += 1;
        Ok(())
    }
}
