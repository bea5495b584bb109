//! Health monitoring and metrics for the playback pipeline

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::types::MediaKind;

/// Health metrics for the playback pipeline
///
/// Tracks counters and timestamps to monitor pipeline health.
/// All fields use atomic operations for thread-safe access.
pub struct PipelineHealth {
    /// Number of video units read from the source
    pub video_units_read: AtomicU64,

    /// Number of audio units read from the source
    pub audio_units_read: AtomicU64,

    /// Total bytes of media payload read
    pub bytes_read: AtomicU64,

    /// Number of synchronized pairs delivered to the sinks
    pub pairs_delivered: AtomicU64,

    /// Number of source reopen cycles (EOF or read error)
    pub source_reopens: AtomicU64,

    /// Number of transient short reads that were retried in place
    pub short_reads: AtomicU64,

    /// Number of sink delivery failures
    pub sink_errors: AtomicU64,

    /// Timestamp (as Unix microseconds) of the last delivered pair
    pub last_delivery_time: AtomicU64,
}

fn now_micros() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}

impl PipelineHealth {
    /// Create a new health metrics instance
    pub fn new() -> Self {
        Self {
            video_units_read: AtomicU64::new(0),
            audio_units_read: AtomicU64::new(0),
            bytes_read: AtomicU64::new(0),
            pairs_delivered: AtomicU64::new(0),
            source_reopens: AtomicU64::new(0),
            short_reads: AtomicU64::new(0),
            sink_errors: AtomicU64::new(0),
            last_delivery_time: AtomicU64::new(now_micros()),
        }
    }

    /// Record one unit read from a source
    pub fn record_unit(&self, kind: MediaKind, size: usize) {
        match kind {
            MediaKind::Video => self.video_units_read.fetch_add(1, Ordering::Relaxed),
            MediaKind::Audio => self.audio_units_read.fetch_add(1, Ordering::Relaxed),
        };
        self.bytes_read.fetch_add(size as u64, Ordering::Relaxed);
    }

    /// Record one synchronized pair delivered to the sinks
    pub fn record_pair(&self) {
        self.pairs_delivered.fetch_add(1, Ordering::Relaxed);
        self.last_delivery_time
            .store(now_micros(), Ordering::Relaxed);
    }

    /// Record a source reopen cycle
    pub fn record_reopen(&self) {
        self.source_reopens.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a transient short read
    pub fn record_short_read(&self) {
        self.short_reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a sink delivery failure
    pub fn record_sink_error(&self) {
        self.sink_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the number of video units read
    pub fn video_units_read(&self) -> u64 {
        self.video_units_read.load(Ordering::Relaxed)
    }

    /// Get the number of audio units read
    pub fn audio_units_read(&self) -> u64 {
        self.audio_units_read.load(Ordering::Relaxed)
    }

    /// Get the total bytes read
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    /// Get the number of pairs delivered
    pub fn pairs_delivered(&self) -> u64 {
        self.pairs_delivered.load(Ordering::Relaxed)
    }

    /// Get the number of source reopens
    pub fn source_reopens(&self) -> u64 {
        self.source_reopens.load(Ordering::Relaxed)
    }

    /// Get the number of short reads
    pub fn short_reads(&self) -> u64 {
        self.short_reads.load(Ordering::Relaxed)
    }

    /// Get the number of sink errors
    pub fn sink_errors(&self) -> u64 {
        self.sink_errors.load(Ordering::Relaxed)
    }

    /// Check if delivery has stalled (no pairs for given duration)
    pub fn is_stalled(&self, threshold: Duration) -> bool {
        let last = self.last_delivery_time.load(Ordering::Relaxed);
        let elapsed_micros = now_micros().saturating_sub(last);
        elapsed_micros > threshold.as_micros() as u64
    }

    /// Get a summary of health metrics
    pub fn summary(&self) -> HealthSummary {
        HealthSummary {
            video_units_read: self.video_units_read(),
            audio_units_read: self.audio_units_read(),
            bytes_read: self.bytes_read(),
            pairs_delivered: self.pairs_delivered(),
            source_reopens: self.source_reopens(),
            short_reads: self.short_reads(),
            sink_errors: self.sink_errors(),
        }
    }
}

impl Default for PipelineHealth {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of health metrics
#[derive(Debug, Clone)]
pub struct HealthSummary {
    pub video_units_read: u64,
    pub audio_units_read: u64,
    pub bytes_read: u64,
    pub pairs_delivered: u64,
    pub source_reopens: u64,
    pub short_reads: u64,
    pub sink_errors: u64,
}

impl std::fmt::Display for HealthSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Health: {} pairs delivered ({} video / {} audio units, {} bytes), {} reopens, {} short reads, {} sink errors",
            self.pairs_delivered,
            self.video_units_read,
            self.audio_units_read,
            self.bytes_read,
            self.source_reopens,
            self.short_reads,
            self.sink_errors
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_metrics() {
        let health = PipelineHealth::new();

        health.record_unit(MediaKind::Video, 1000);
        health.record_unit(MediaKind::Video, 1000);
        health.record_unit(MediaKind::Audio, 500);
        health.record_pair();

        assert_eq!(health.video_units_read(), 2);
        assert_eq!(health.audio_units_read(), 1);
        assert_eq!(health.bytes_read(), 2500);
        assert_eq!(health.pairs_delivered(), 1);
        assert_eq!(health.source_reopens(), 0);

        health.record_reopen();
        health.record_short_read();
        health.record_sink_error();

        assert_eq!(health.source_reopens(), 1);
        assert_eq!(health.short_reads(), 1);
        assert_eq!(health.sink_errors(), 1);
    }

    #[test]
    fn test_stall_detection() {
        let health = PipelineHealth::new();

        // Should not be stalled immediately
        assert!(!health.is_stalled(Duration::from_secs(1)));

        health.record_pair();

        // Simulate stall by not delivering pairs
        std::thread::sleep(Duration::from_millis(150));

        // Should be stalled after 150ms if threshold is 100ms
        assert!(health.is_stalled(Duration::from_millis(100)));
    }
}
