//! Playback pipeline for pipeplay
//!
//! This module provides the dual-stream synchronization pipeline,
//! separating concerns between:
//! - Control/Coordination: lifecycle management and ordered teardown
//! - Data Transport: bounded queues and backpressure handling
//! - Pacing: real-time paired delivery against a deadline clock
//!
//! # Architecture
//!
//! The pipeline is organized into stages that communicate via channels:
//! - Each stage runs in its own async task
//! - Stages implement the `PipelineStage` trait
//! - The coordinator wires stages together and manages lifecycle
//! - PacingClock anchors delivery cadence to the nominal tick
//! - Health monitoring tracks metrics for the periodic summary log

pub mod clock;
pub mod coordinator;
pub mod health;
pub mod orchestrator;
pub mod stage;
pub mod state;
pub mod types;

pub use clock::PacingClock;
pub use coordinator::PlaybackCoordinator;
pub use health::{HealthSummary, PipelineHealth};
pub use orchestrator::{Orchestrator, QUEUE_CAPACITY};
pub use stage::PipelineStage;
pub use state::PipelineState;
pub use types::{MediaKind, MediaUnit};
