//! sara - capture analysis settings once, replay them over a batch of recordings

pub mod backend;
pub mod cli;
pub mod core;
pub mod execution;
pub mod export;
pub mod persistence;
pub mod prompt;
pub mod stages;
pub mod sweep;

// Re-export commonly used types
pub use backend::{AnalysisBackend, BackendError, SubprocessBackend};
pub use core::{Config, OutputLayout, PipelineStage, PipelineState, Recording, RecordingTargets, StageKind};
pub use execution::{BatchReport, JobSelection, Partition, PipelineEvent, PipelineOrchestrator};
pub use persistence::{Settings, SettingsStore, Value};
pub use prompt::Prompter;
pub use stages::{ConfigSource, StageOptions};
pub use sweep::{SweepParameter, SweepPlan};
