//! Core domain models
//!
//! Tool configuration, recordings and their output layout, segmented regions,
//! the view transform, per-run state and the shared error types.

pub mod config;
pub mod error;
pub mod recording;
pub mod region;
pub mod state;
pub mod transform;

pub use config::Config;
pub use error::{
    ExportError, PartitionError, PipelineError, PromptError, SettingsError, StageError, SweepError,
};
pub use recording::{OutputLayout, Recording, RecordingTargets};
pub use region::{Point, Region, Ring};
pub use state::{PipelineStage, PipelineState, StageKind};
pub use transform::{ImageSize, ViewTransform};
