//! Fixed-size unit acquisition from reconnectable byte sources.
//!
//! One design serves both media kinds: a reader validates its format, opens
//! its source with retry, assembles one fixed-size unit per read cycle,
//! paces emission to the nominal unit duration, and reconnects on EOF or
//! read error. Every await (open, read, queue admission, cadence sleep,
//! reopen backoff) is raced against the reader's cancellation token, so a
//! stop request interrupts even a read parked on a writer-less FIFO without
//! anyone having to write into the source.

use crate::config::{AudioFormat, VideoFormat};
use crate::pipeline::clock::PacingClock;
use crate::pipeline::health::PipelineHealth;
use crate::pipeline::stage::PipelineStage;
use crate::pipeline::types::MediaUnit;
use crate::reader::source::ByteSource;
use anyhow::{Result, bail};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Delay between attempts to open a source that is not available yet.
const REOPEN_DELAY: Duration = Duration::from_secs(1);

/// Format-specific part of a reader's configuration.
enum ReaderFormat {
    Video(VideoFormat),
    Audio {
        format: AudioFormat,
        /// Audio units are sized to span exactly one video frame duration.
        video_frame_rate: f64,
    },
}

/// Validated sizing derived from the format before the first open attempt.
struct ReadPlan {
    unit_bytes: usize,
    pace: Duration,
}

/// Result of assembling one fixed-size unit.
enum Fill {
    Complete(Bytes),
    Eof,
    Failed(std::io::Error),
    Cancelled,
}

/// Paced acquisition loop over one reconnectable byte source.
pub struct StreamReader<S: ByteSource> {
    format: ReaderFormat,
    source: S,
    tx: mpsc::Sender<MediaUnit>,
    cancel: CancellationToken,
    health: Arc<PipelineHealth>,
    seq: u64,
}

impl<S: ByteSource> StreamReader<S> {
    /// Create the video reader.
    pub fn video(
        format: VideoFormat,
        source: S,
        tx: mpsc::Sender<MediaUnit>,
        cancel: CancellationToken,
        health: Arc<PipelineHealth>,
    ) -> Self {
        Self {
            format: ReaderFormat::Video(format),
            source,
            tx,
            cancel,
            health,
            seq: 0,
        }
    }

    /// Create the audio reader. `video_frame_rate` sizes each audio unit to
    /// one video tick so the queues stay in 1:1 correspondence.
    pub fn audio(
        format: AudioFormat,
        video_frame_rate: f64,
        source: S,
        tx: mpsc::Sender<MediaUnit>,
        cancel: CancellationToken,
        health: Arc<PipelineHealth>,
    ) -> Self {
        Self {
            format: ReaderFormat::Audio {
                format,
                video_frame_rate,
            },
            source,
            tx,
            cancel,
            health,
            seq: 0,
        }
    }

    /// Number of units emitted so far.
    pub fn units_emitted(&self) -> u64 {
        self.seq
    }

    fn plan(&self) -> Result<ReadPlan> {
        match &self.format {
            ReaderFormat::Video(video) => {
                video.validate()?;
                Ok(ReadPlan {
                    unit_bytes: video.frame_bytes(),
                    pace: video.frame_duration(),
                })
            }
            ReaderFormat::Audio {
                format,
                video_frame_rate,
            } => {
                format.validate()?;
                if !(*video_frame_rate > 0.0) {
                    bail!("invalid video frame rate: {}", video_frame_rate);
                }
                let pace = Duration::from_secs_f64(1.0 / video_frame_rate);
                let unit_bytes = format.buffer_bytes(pace);
                if unit_bytes == 0 {
                    bail!("audio unit size is zero for a {:?} tick", pace);
                }
                Ok(ReadPlan { unit_bytes, pace })
            }
        }
    }

    fn make_unit(&self, data: Bytes) -> MediaUnit {
        match &self.format {
            ReaderFormat::Video(video) => {
                MediaUnit::video(data, self.seq, video.width, video.height)
            }
            ReaderFormat::Audio { format, .. } => {
                MediaUnit::audio(data, self.seq, format.sample_rate, format.channels)
            }
        }
    }

    /// Assemble exactly `unit_bytes` bytes. A read that returns less than
    /// the remainder is retried in place; a malformed (truncated) unit is
    /// never produced.
    async fn fill_unit(
        source: &mut S,
        cancel: &CancellationToken,
        health: &PipelineHealth,
        name: &str,
        unit_bytes: usize,
    ) -> Fill {
        let mut buf = BytesMut::zeroed(unit_bytes);
        let mut filled = 0usize;
        while filled < unit_bytes {
            let n = tokio::select! {
                _ = cancel.cancelled() => return Fill::Cancelled,
                read = source.read(&mut buf[filled..]) => match read {
                    Ok(n) => n,
                    Err(e) => return Fill::Failed(e),
                },
            };
            if n == 0 {
                if filled > 0 {
                    warn!(
                        "{}: source ended mid-unit ({} of {} bytes), unit discarded",
                        name, filled, unit_bytes
                    );
                }
                return Fill::Eof;
            }
            filled += n;
            if filled < unit_bytes {
                health.record_short_read();
                debug!(
                    "{}: short read ({} of {} bytes), retrying",
                    name, filled, unit_bytes
                );
            }
        }
        Fill::Complete(buf.freeze())
    }
}

#[async_trait]
impl<S: ByteSource> PipelineStage for StreamReader<S> {
    async fn run(&mut self) -> Result<()> {
        let plan = self.plan()?;
        let name = self.name();
        let cancel = self.cancel.clone();
        info!(
            "{}: {} byte units every {:?} from {}",
            name,
            plan.unit_bytes,
            plan.pace,
            self.source.describe()
        );

        'reconnect: while !cancel.is_cancelled() {
            debug!("{}: attempting to open source: {}", name, self.source.describe());
            tokio::select! {
                _ = cancel.cancelled() => break,
                opened = self.source.open() => {
                    if let Err(e) = opened {
                        warn!("{}: failed to open {}: {}", name, self.source.describe(), e);
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(REOPEN_DELAY) => {}
                        }
                        continue;
                    }
                }
            }
            info!("{}: source open for reading: {}", name, self.source.describe());

            let mut clock = PacingClock::new(plan.pace);
            while !cancel.is_cancelled() {
                let fill = Self::fill_unit(
                    &mut self.source,
                    &cancel,
                    &self.health,
                    name,
                    plan.unit_bytes,
                )
                .await;
                match fill {
                    Fill::Complete(data) => {
                        let unit = self.make_unit(data);
                        self.health.record_unit(unit.kind, unit.size());
                        self.seq += 1;
                        tokio::select! {
                            _ = cancel.cancelled() => break 'reconnect,
                            sent = self.tx.send(unit) => {
                                if sent.is_err() {
                                    info!("{}: output channel closed", name);
                                    break 'reconnect;
                                }
                            }
                        }
                        // Hold cadence so a bulk-readable source is not
                        // drained faster than real time.
                        tokio::select! {
                            _ = cancel.cancelled() => break 'reconnect,
                            _ = clock.wait_next_tick() => {}
                        }
                    }
                    Fill::Eof => {
                        warn!("{}: EOF on {}", name, self.source.describe());
                        self.source.close();
                        self.health.record_reopen();
                        continue 'reconnect;
                    }
                    Fill::Failed(e) => {
                        warn!("{}: read error on {}: {}", name, self.source.describe(), e);
                        self.source.close();
                        self.health.record_reopen();
                        continue 'reconnect;
                    }
                    Fill::Cancelled => break 'reconnect,
                }
            }
        }

        info!("{}: stopped after {} units", name, self.seq);
        Ok(())
    }

    fn name(&self) -> &'static str {
        match self.format {
            ReaderFormat::Video(_) => "VideoReader",
            ReaderFormat::Audio { .. } => "AudioReader",
        }
    }
}
