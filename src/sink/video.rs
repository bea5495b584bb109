//! Raw frame writer for downstream renderers.

use super::VideoSink;
use crate::pipeline::types::MediaUnit;
use anyhow::Result;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Appends raw frame bytes to a file or named FIFO, for a downstream
/// renderer such as `ffplay` reading the other end.
pub struct RawFileSink {
    path: PathBuf,
    out: File,
    frames_written: u64,
}

impl RawFileSink {
    pub fn create(path: &Path) -> Result<Self> {
        let out = File::create(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            out,
            frames_written: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VideoSink for RawFileSink {
    fn present(&mut self, unit: &MediaUnit) -> Result<()> {
        self.out.write_all(&unit.data)?;
        self.frames_written += 1;
        Ok(())
    }
}
