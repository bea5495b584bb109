//! Playback pipeline coordinator
//!
//! Wires readers → bounded queues → orchestrator → sinks and manages their
//! lifecycle, including the teardown ordering that keeps shutdown free of
//! deadlock: producers are stopped and joined before the pacer, so no
//! producer is left parked on a queue that will never drain again.

use crate::config::Config;
use crate::pipeline::health::PipelineHealth;
use crate::pipeline::orchestrator::{Orchestrator, QUEUE_CAPACITY};
use crate::pipeline::stage::PipelineStage;
use crate::pipeline::state::PipelineState;
use crate::reader::source::FileSource;
use crate::reader::stream::StreamReader;
use crate::sink::{AudioSink, VideoSink};
use log::{error, info};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Interval between health summary log lines.
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(30);

fn spawn_stage<S: PipelineStage + 'static>(mut stage: S) -> JoinHandle<()> {
    tokio::spawn(async move {
        let name = stage.name();
        if let Err(e) = stage.run().await {
            error!("{}: stage failed: {}", name, e);
        }
    })
}

/// Owns the running pipeline: reader tasks, the pacer task and the health
/// monitor, with ordered teardown.
pub struct PlaybackCoordinator {
    state: PipelineState,
    health: Arc<PipelineHealth>,
    reader_cancel: CancellationToken,
    pacer_cancel: CancellationToken,
    reader_handles: Vec<JoinHandle<()>>,
    pacer_handle: Option<JoinHandle<()>>,
    monitor_handle: Option<JoinHandle<()>>,
}

impl PlaybackCoordinator {
    /// Build and start the full pipeline.
    ///
    /// A reader whose configuration is invalid fails alone: its stage logs
    /// the error and exits, the other channel keeps flowing and the
    /// orchestrator simply polls a queue that never fills.
    pub fn launch(
        config: &Config,
        video_sink: Box<dyn VideoSink>,
        audio_sink: Box<dyn AudioSink>,
    ) -> Self {
        let mut state = PipelineState::Initializing;

        let health = Arc::new(PipelineHealth::new());
        let reader_cancel = CancellationToken::new();
        let pacer_cancel = CancellationToken::new();

        let (video_tx, video_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (audio_tx, audio_rx) = mpsc::channel(QUEUE_CAPACITY);

        let video_reader = StreamReader::video(
            config.video.clone(),
            FileSource::new(&config.video_source),
            video_tx,
            reader_cancel.child_token(),
            health.clone(),
        );
        let audio_reader = StreamReader::audio(
            config.audio.clone(),
            config.video.frame_rate,
            FileSource::new(&config.audio_source),
            audio_tx,
            reader_cancel.child_token(),
            health.clone(),
        );
        let orchestrator = Orchestrator::new(
            config.video.frame_duration(),
            video_rx,
            audio_rx,
            video_sink,
            audio_sink,
            health.clone(),
            pacer_cancel.child_token(),
        );

        let reader_handles = vec![spawn_stage(video_reader), spawn_stage(audio_reader)];
        let pacer_handle = Some(spawn_stage(orchestrator));

        let monitor_health = health.clone();
        let monitor_cancel = pacer_cancel.child_token();
        let monitor_handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(HEALTH_LOG_INTERVAL);
            interval.tick().await; // immediate first tick
            loop {
                tokio::select! {
                    _ = monitor_cancel.cancelled() => break,
                    _ = interval.tick() => {
                        info!("PlaybackCoordinator: {}", monitor_health.summary());
                    }
                }
            }
        }));

        let running = PipelineState::Running {
            started_at: Instant::now(),
        };
        debug_assert!(state.can_transition_to(&running));
        state = running;
        info!("PlaybackCoordinator: pipeline started");

        Self {
            state,
            health,
            reader_cancel,
            pacer_cancel,
            reader_handles,
            pacer_handle,
            monitor_handle,
        }
    }

    /// Get the pipeline health metrics
    pub fn health(&self) -> &Arc<PipelineHealth> {
        &self.health
    }

    /// Get the current pipeline state
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Stop the pipeline.
    ///
    /// Producers first: cancelling the pacer before the readers would leave
    /// a producer parked on a full queue with no consumer to drain it. The
    /// readers interrupt their own blocking opens/reads and queue admission,
    /// so joining them is bounded by one loop iteration.
    pub async fn shutdown(mut self) {
        self.state = PipelineState::Stopping;
        info!("PlaybackCoordinator: stopping pipeline");

        self.reader_cancel.cancel();
        for handle in self.reader_handles.drain(..) {
            let _ = handle.await;
        }

        self.pacer_cancel.cancel();
        if let Some(handle) = self.pacer_handle.take() {
            let _ = handle.await;
        }
        if let Some(handle) = self.monitor_handle.take() {
            let _ = handle.await;
        }

        self.state = PipelineState::Stopped;
        info!(
            "PlaybackCoordinator: pipeline stopped ({})",
            self.health.summary()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PixelFormat, VideoFormat};
    use crate::pipeline::types::MediaUnit;
    use anyhow::Result;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tokio::time::timeout;

    #[derive(Clone, Default)]
    struct CountingSink {
        delivered: Arc<Mutex<Vec<u64>>>,
    }

    impl CountingSink {
        fn count(&self) -> usize {
            self.delivered.lock().unwrap().len()
        }
    }

    impl VideoSink for CountingSink {
        fn present(&mut self, unit: &MediaUnit) -> Result<()> {
            self.delivered.lock().unwrap().push(unit.seq);
            Ok(())
        }
    }

    impl AudioSink for CountingSink {
        fn play(&mut self, unit: &MediaUnit) -> Result<()> {
            self.delivered.lock().unwrap().push(unit.seq);
            Ok(())
        }
    }

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pipeplay-{}-{}", tag, std::process::id()))
    }

    fn tiny_config(video_source: PathBuf, audio_source: PathBuf) -> Config {
        Config {
            video_source,
            audio_source,
            video_out: None,
            video: VideoFormat {
                width: 4,
                height: 2,
                pixel_format: PixelFormat::Yuv422,
                frame_rate: 100.0,
            },
            audio: crate::config::AudioFormat::default(),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pipeline_end_to_end_over_files() {
        let video_path = temp_path("e2e-video");
        let audio_path = temp_path("e2e-audio");
        let config = tiny_config(video_path.clone(), audio_path.clone());

        // Three 16-byte video frames; three 10ms audio units (960 bytes
        // each: 480 frames of mono s16 at 48kHz).
        std::fs::write(&video_path, vec![7u8; 16 * 3]).unwrap();
        std::fs::write(&audio_path, vec![9u8; 960 * 3]).unwrap();

        let video_sink = CountingSink::default();
        let audio_sink = CountingSink::default();
        let coordinator = PlaybackCoordinator::launch(
            &config,
            Box::new(video_sink.clone()),
            Box::new(audio_sink.clone()),
        );
        assert!(coordinator.state().is_running());

        // Regular files hit EOF and reopen, so at least three pairs flow.
        let health = coordinator.health().clone();
        timeout(Duration::from_secs(5), async {
            while health.pairs_delivered() < 3 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("three pairs delivered");

        assert!(video_sink.count() >= 3);
        assert!(audio_sink.count() >= 3);
        assert!(health.video_units_read() >= 3);
        assert!(health.audio_units_read() >= 3);

        timeout(Duration::from_secs(2), coordinator.shutdown())
            .await
            .expect("ordered shutdown completes");

        let _ = std::fs::remove_file(&video_path);
        let _ = std::fs::remove_file(&audio_path);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_with_unavailable_sources() {
        // Sources that never exist: both readers sit in the open/backoff
        // loop. Shutdown must still complete promptly.
        let config = tiny_config(
            PathBuf::from("/nonexistent/pipeplay-video"),
            PathBuf::from("/nonexistent/pipeplay-audio"),
        );

        let coordinator = PlaybackCoordinator::launch(
            &config,
            Box::new(CountingSink::default()),
            Box::new(CountingSink::default()),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(coordinator.health().pairs_delivered(), 0);

        timeout(Duration::from_secs(2), coordinator.shutdown())
            .await
            .expect("shutdown completes while sources are unavailable");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_invalid_video_config_degrades_one_channel() {
        let audio_path = temp_path("degraded-audio");
        std::fs::write(&audio_path, vec![1u8; 960 * 2]).unwrap();

        let mut config = tiny_config(PathBuf::from("/nonexistent/unused"), audio_path.clone());
        config.video.width = 0;

        let coordinator = PlaybackCoordinator::launch(
            &config,
            Box::new(CountingSink::default()),
            Box::new(CountingSink::default()),
        );

        // The audio reader keeps flowing into its queue; the dead video
        // reader means no pair is ever delivered. No crash, no deadlock.
        let health = coordinator.health().clone();
        timeout(Duration::from_secs(5), async {
            while health.audio_units_read() == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("audio channel still flows");

        assert_eq!(health.video_units_read(), 0);
        assert_eq!(health.pairs_delivered(), 0);

        timeout(Duration::from_secs(2), coordinator.shutdown())
            .await
            .expect("shutdown completes in degraded state");

        let _ = std::fs::remove_file(&audio_path);
    }
}
