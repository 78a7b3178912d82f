//! Forwarding pipeline: input, orchestration, statistics.

mod input;
mod orchestrator;
mod stats;

pub use orchestrator::{Pipeline, PipelineConfig};
pub use stats::{RunStats, SendMode};
