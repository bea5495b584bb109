//! Paced pairing of the two bounded unit queues.
//!
//! The orchestrator is the sole consumer of both queues. It delivers a
//! video/audio pair only when both queues hold at least one unit, so no
//! partial pair ever reaches the sinks, and it holds delivery cadence
//! against an absolute deadline clock. Draining a queue is what wakes a
//! producer blocked on admission; the orchestrator itself never drops a
//! unit and never force-unblocks a producer.

use crate::pipeline::clock::PacingClock;
use crate::pipeline::health::PipelineHealth;
use crate::pipeline::stage::PipelineStage;
use crate::pipeline::types::MediaUnit;
use crate::sink::{AudioSink, VideoSink};
use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Capacity of each unit queue. Admission blocks when full.
pub const QUEUE_CAPACITY: usize = 12;

/// Re-check interval while either queue is empty. Empty cycles do not
/// advance the pacing deadline.
const EMPTY_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Drains the video and audio queues in lockstep at the nominal tick.
pub struct Orchestrator {
    video_rx: mpsc::Receiver<MediaUnit>,
    audio_rx: mpsc::Receiver<MediaUnit>,
    video_sink: Box<dyn VideoSink>,
    audio_sink: Box<dyn AudioSink>,
    clock: PacingClock,
    health: Arc<PipelineHealth>,
    cancel: CancellationToken,
    pairs_delivered: u64,
}

impl Orchestrator {
    /// Create the orchestrator. `tick` is the nominal delivery interval,
    /// derived from the configured video frame rate.
    pub fn new(
        tick: Duration,
        video_rx: mpsc::Receiver<MediaUnit>,
        audio_rx: mpsc::Receiver<MediaUnit>,
        video_sink: Box<dyn VideoSink>,
        audio_sink: Box<dyn AudioSink>,
        health: Arc<PipelineHealth>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            video_rx,
            audio_rx,
            video_sink,
            audio_sink,
            clock: PacingClock::new(tick),
            health,
            cancel,
            pairs_delivered: 0,
        }
    }

    /// Number of pairs delivered so far.
    pub fn pairs_delivered(&self) -> u64 {
        self.pairs_delivered
    }

    fn deliver(&mut self, video: MediaUnit, audio: MediaUnit) {
        if video.seq != audio.seq {
            // Positional pairing only: skew is observed, not reconciled.
            debug!(
                "Orchestrator: pair sequence skew (video {}, audio {})",
                video.seq, audio.seq
            );
        }
        if let Err(e) = self.video_sink.present(&video) {
            warn!("Orchestrator: video sink error: {}", e);
            self.health.record_sink_error();
        }
        if let Err(e) = self.audio_sink.play(&audio) {
            warn!("Orchestrator: audio sink error: {}", e);
            self.health.record_sink_error();
        }
        self.pairs_delivered += 1;
        self.health.record_pair();
    }
}

#[async_trait]
impl PipelineStage for Orchestrator {
    async fn run(&mut self) -> Result<()> {
        let cancel = self.cancel.clone();
        info!("Orchestrator: pacing deliveries every {:?}", self.clock.tick());
        self.clock.restart();

        while !cancel.is_cancelled() {
            if self.video_rx.is_empty() || self.audio_rx.is_empty() {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(EMPTY_POLL_INTERVAL) => {}
                }
                continue;
            }

            // Sole consumer: a non-empty queue cannot drain underneath us,
            // so these resolve immediately. None only on a torn-down queue.
            let Some(video) = self.video_rx.recv().await else {
                break;
            };
            let Some(audio) = self.audio_rx.recv().await else {
                break;
            };

            // Synchronous delivery: a slow sink stalls pacing, which stalls
            // dequeuing, which backpressures the producers.
            self.deliver(video, audio);

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.clock.wait_next_tick() => {}
            }
        }

        info!(
            "Orchestrator: stopped after {} pairs",
            self.pairs_delivered
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Orchestrator"
    }
}
