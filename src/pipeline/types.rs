//! Core types for the playback pipeline

use bytes::Bytes;

/// Kind of media data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Video frame data
    Video,
    /// Audio sample data
    Audio,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Video => write!(f, "Video"),
            MediaKind::Audio => write!(f, "Audio"),
        }
    }
}

/// One fixed-size unit of raw media payload
///
/// A video unit holds exactly one frame at the configured resolution; an
/// audio unit holds exactly the PCM frames that span one video frame
/// duration. The payload is immutable after creation and is dropped once the
/// consuming sink returns.
#[derive(Clone)]
pub struct MediaUnit {
    /// Kind of media (video or audio)
    pub kind: MediaKind,

    /// Raw media payload
    pub data: Bytes,

    /// Position in the reader's emission order, starting at zero.
    /// Carried for observability; pairing stays positional.
    pub seq: u64,

    /// Frame width (for video only)
    pub width: Option<u32>,

    /// Frame height (for video only)
    pub height: Option<u32>,

    /// Sample rate (for audio only)
    pub sample_rate: Option<u32>,

    /// Number of channels (for audio only)
    pub channels: Option<u16>,
}

impl MediaUnit {
    /// Create a new video unit
    pub fn video(data: Bytes, seq: u64, width: u32, height: u32) -> Self {
        Self {
            kind: MediaKind::Video,
            data,
            seq,
            width: Some(width),
            height: Some(height),
            sample_rate: None,
            channels: None,
        }
    }

    /// Create a new audio unit
    pub fn audio(data: Bytes, seq: u64, sample_rate: u32, channels: u16) -> Self {
        Self {
            kind: MediaKind::Audio,
            data,
            seq,
            width: None,
            height: None,
            sample_rate: Some(sample_rate),
            channels: Some(channels),
        }
    }

    /// Get the size of the unit payload in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl std::fmt::Debug for MediaUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("MediaUnit");
        debug
            .field("kind", &self.kind)
            .field("seq", &self.seq)
            .field("size", &self.size());

        if let Some(width) = self.width {
            debug.field("width", &width);
        }
        if let Some(height) = self.height {
            debug.field("height", &height);
        }
        if let Some(sample_rate) = self.sample_rate {
            debug.field("sample_rate", &sample_rate);
        }
        if let Some(channels) = self.channels {
            debug.field("channels", &channels);
        }

        debug.finish()
    }
}
