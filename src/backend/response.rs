//! Backend request and response types

use crate::core::region::{Point, Region};
use crate::core::transform::{ImageSize, ViewTransform};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Error types for analysis backend operations
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Failed to start analysis backend '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Analysis backend exited with code {code}: {stderr}")]
    Exit { code: i32, stderr: String },

    #[error("Malformed backend response: {0}")]
    Protocol(String),

    #[error("Analysis failed: {0}")]
    Analysis(String),
}

/// Handle to a dataset the backend created or loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Working directory the backend keeps the dataset in
    pub dir: PathBuf,

    /// Number of frames in the recording
    pub frames: usize,
}

/// Motion correction input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionRequest {
    pub recording: PathBuf,
    pub dataset_dir: PathBuf,

    /// Registry name of the correction strategy
    pub strategy: String,

    /// Maximum displacement bounds `[x, y]` in pixels
    pub max_displacement: [u32; 2],
}

/// Segmentation input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRequest {
    pub components: usize,

    /// Spatial/temporal trade-off in [0, 1]
    pub mu: f64,

    /// Minimum overlap proportion in [0, 1]; 0 disables the merge step
    pub overlap_per: f64,
}

/// Background still image used for region plots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StillImage {
    pub path: Option<PathBuf>,
    pub size: ImageSize,
}

/// Where a render goes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderTarget {
    File(PathBuf),
    Interactive,
}

/// Region outlines over a background
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Untransformed still image
    pub background: StillImage,

    /// Transform the background must be drawn with
    pub transform: ViewTransform,

    /// Outlines already mapped through `transform`
    pub outlines: Vec<Region>,
    pub target: RenderTarget,
}

/// What came back from a render
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderOutcome {
    /// Points the operator clicked, in display coordinates
    #[serde(default)]
    pub clicks: Vec<Point>,
}

/// Extracted signal for a dataset's regions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub regions: usize,
    pub frames: usize,
}
