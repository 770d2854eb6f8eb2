//! Pipeline execution: single recordings, batches and job partitioning

pub mod orchestrator;
pub mod partition;

pub use orchestrator::{BatchFailure, BatchReport, EventHandler, PipelineEvent, PipelineOrchestrator, RunSummary};
pub use partition::{JobSelection, Partition, LIST_SENTINEL};
