//! Pipeline stage trait
//!
//! Defines the interface shared by the stream readers and the orchestrator,
//! so the coordinator can spawn and supervise them uniformly.

use anyhow::Result;
use async_trait::async_trait;

/// Trait for pipeline stages that process media data
#[async_trait]
pub trait PipelineStage: Send {
    /// Run the stage, processing data until cancellation
    async fn run(&mut self) -> Result<()>;

    /// Get the name of this stage for logging
    fn name(&self) -> &'static str;
}
