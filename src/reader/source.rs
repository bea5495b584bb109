//! Reconnectable byte sources

use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

/// A reconnectable stream of raw bytes.
///
/// The production implementation reads a file or named FIFO; tests
/// substitute scripted sources. `open` and `read` may park for a long time
/// (a FIFO with no writer blocks until one appears), so callers race every
/// await against their cancellation token.
#[async_trait]
pub trait ByteSource: Send {
    /// Open or reopen the source.
    async fn open(&mut self) -> io::Result<()>;

    /// Read up to `buf.len()` bytes. Returns 0 at end of source.
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Close the source; the next `open` reconnects.
    fn close(&mut self);

    /// Source location for logging.
    fn describe(&self) -> String;
}

/// Byte source backed by a file or named FIFO on disk.
pub struct FileSource {
    path: PathBuf,
    file: Option<tokio::fs::File>,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }
}

#[async_trait]
impl ByteSource for FileSource {
    async fn open(&mut self) -> io::Result<()> {
        // Opening a FIFO read-only parks until a writer appears. The open
        // runs on the blocking pool; a cancelled reader abandons the await
        // and the parked open is dropped with the pool thread's result.
        let file = tokio::fs::File::open(&self.path).await?;
        self.file = Some(file);
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.file.as_mut() {
            Some(file) => file.read(buf).await,
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "source not open",
            )),
        }
    }

    fn close(&mut self) {
        self.file = None;
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
