//! Playback configuration: stream formats, source locations and validation.
//!
//! Defaults match the canonical deployment: raw YUV 4:2:2 video at 640x480
//! / 25 fps on `/tmp/vpipe`, mono signed 16-bit little-endian PCM at 48 kHz
//! on `/tmp/apipe`.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Pixel layout of the raw video source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// Packed YUV 4:2:2, two bytes per pixel
    Yuv422,
    /// Planar YUV 4:2:0, twelve bits per pixel
    Nv12,
    /// Packed RGBA, four bytes per pixel
    Rgba,
}

impl PixelFormat {
    /// Frame payload size for the given dimensions.
    pub fn frame_bytes(&self, width: u32, height: u32) -> usize {
        let pixels = width as usize * height as usize;
        match self {
            PixelFormat::Yuv422 => pixels * 2,
            PixelFormat::Nv12 => pixels * 3 / 2,
            PixelFormat::Rgba => pixels * 4,
        }
    }
}

impl FromStr for PixelFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "yuv422" => Ok(PixelFormat::Yuv422),
            "nv12" => Ok(PixelFormat::Nv12),
            "rgba" => Ok(PixelFormat::Rgba),
            other => bail!("unknown pixel format: {}", other),
        }
    }
}

/// Video stream format descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoFormat {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub frame_rate: f64,
}

impl Default for VideoFormat {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            pixel_format: PixelFormat::Yuv422,
            frame_rate: 25.0,
        }
    }
}

impl VideoFormat {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            bail!("invalid frame size: {}x{}", self.width, self.height);
        }
        if !(self.frame_rate > 0.0) {
            bail!("invalid frame rate: {}", self.frame_rate);
        }
        Ok(())
    }

    /// Size of one raw frame in bytes.
    pub fn frame_bytes(&self) -> usize {
        self.pixel_format.frame_bytes(self.width, self.height)
    }

    /// Nominal duration of one frame at the configured rate.
    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate)
    }
}

/// Width of one PCM sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleWidth {
    /// Signed 16-bit integer
    S16,
    /// 32-bit float
    F32,
}

impl SampleWidth {
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            SampleWidth::S16 => 2,
            SampleWidth::F32 => 4,
        }
    }
}

impl FromStr for SampleWidth {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "s16" => Ok(SampleWidth::S16),
            "f32" => Ok(SampleWidth::F32),
            other => bail!("unknown sample format: {}", other),
        }
    }
}

/// Byte order of multi-byte PCM samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    Little,
    Big,
}

impl FromStr for ByteOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "little" | "le" => Ok(ByteOrder::Little),
            "big" | "be" => Ok(ByteOrder::Big),
            other => bail!("unknown byte order: {}", other),
        }
    }
}

/// Audio stream format descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioFormat {
    pub channels: u16,
    pub sample_rate: u32,
    pub sample_width: SampleWidth,
    pub byte_order: ByteOrder,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            channels: 1,
            sample_rate: 48_000,
            sample_width: SampleWidth::S16,
            byte_order: ByteOrder::Little,
        }
    }
}

impl AudioFormat {
    pub fn validate(&self) -> Result<()> {
        if self.channels == 0 {
            bail!("invalid channel count: 0");
        }
        if self.sample_rate == 0 {
            bail!("invalid sample rate: 0");
        }
        Ok(())
    }

    /// Size of one PCM frame (one sample per channel) in bytes.
    pub fn bytes_per_frame(&self) -> usize {
        self.channels as usize * self.sample_width.bytes_per_sample()
    }

    /// Number of PCM frames covering `duration` at the configured rate.
    pub fn frames_for_duration(&self, duration: Duration) -> usize {
        (self.sample_rate as u128 * duration.as_micros() / 1_000_000) as usize
    }

    /// Size in bytes of the sample buffer covering `duration`.
    pub fn buffer_bytes(&self, duration: Duration) -> usize {
        self.frames_for_duration(duration) * self.bytes_per_frame()
    }
}

/// Full player configuration.
///
/// Loaded from an optional JSON file and overridden by command-line flags;
/// format validity is checked by each reader before its first open attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Raw video byte source (file or named FIFO)
    pub video_source: PathBuf,
    /// Raw audio byte source (file or named FIFO)
    pub audio_source: PathBuf,
    /// Where synchronized raw frames are written; discarded when unset
    pub video_out: Option<PathBuf>,
    pub video: VideoFormat,
    pub audio: AudioFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            video_source: PathBuf::from("/tmp/vpipe"),
            audio_source: PathBuf::from("/tmp/apipe"),
            video_out: None,
            video: VideoFormat::default(),
            audio: AudioFormat::default(),
        }
    }
}

impl Config {
    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.video.validate()?;
        self.audio.validate()
    }
}

/// Returns a version as specified in Cargo.toml
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn app_name() -> &'static str {
    env!("CARGO_PKG_NAME")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_video_sizing() {
        let video = VideoFormat::default();
        assert!(video.validate().is_ok());
        // 640 * 480 * 2 bytes per pixel
        assert_eq!(video.frame_bytes(), 614_400);
        assert_eq!(video.frame_duration(), Duration::from_millis(40));
    }

    #[test]
    fn test_pixel_format_sizing() {
        assert_eq!(PixelFormat::Yuv422.frame_bytes(640, 480), 614_400);
        assert_eq!(PixelFormat::Nv12.frame_bytes(640, 480), 460_800);
        assert_eq!(PixelFormat::Rgba.frame_bytes(2, 2), 16);
    }

    #[test]
    fn test_audio_buffer_sizing() {
        let audio = AudioFormat::default();
        assert!(audio.validate().is_ok());
        // One video tick at 25 fps spans 1920 mono s16 frames.
        let tick = Duration::from_millis(40);
        assert_eq!(audio.frames_for_duration(tick), 1920);
        assert_eq!(audio.bytes_per_frame(), 2);
        assert_eq!(audio.buffer_bytes(tick), 3840);
    }

    #[test]
    fn test_validation_failures() {
        let mut video = VideoFormat::default();
        video.width = 0;
        assert!(video.validate().is_err());

        let mut video = VideoFormat::default();
        video.frame_rate = 0.0;
        assert!(video.validate().is_err());
        video.frame_rate = f64::NAN;
        assert!(video.validate().is_err());

        let mut audio = AudioFormat::default();
        audio.channels = 0;
        assert!(audio.validate().is_err());

        let mut audio = AudioFormat::default();
        audio.sample_rate = 0;
        assert!(audio.validate().is_err());
    }

    #[test]
    fn test_partial_config_file() {
        // Missing fields fall back to defaults.
        let config: Config = serde_json::from_str(
            r#"{
                "video_source": "/run/video0",
                "video": { "width": 1280, "height": 720, "frame_rate": 30.0 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.video_source, PathBuf::from("/run/video0"));
        assert_eq!(config.audio_source, PathBuf::from("/tmp/apipe"));
        assert_eq!(config.video.width, 1280);
        assert_eq!(config.video.pixel_format, PixelFormat::Yuv422);
        assert_eq!(config.audio.sample_rate, 48_000);
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("nv12".parse::<PixelFormat>().unwrap(), PixelFormat::Nv12);
        assert_eq!("S16".parse::<SampleWidth>().unwrap(), SampleWidth::S16);
        assert_eq!("be".parse::<ByteOrder>().unwrap(), ByteOrder::Big);
        assert!("pcm24".parse::<SampleWidth>().is_err());
    }
}
