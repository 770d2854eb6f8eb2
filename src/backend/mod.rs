//! Seam to the external analysis backend
//!
//! Motion correction, segmentation, signal extraction and rendering all live
//! outside this crate. Stages talk to them only through [`AnalysisBackend`].

pub mod response;
pub mod subprocess;

use crate::core::region::{Region, Ring};
use std::path::Path;

pub use response::{
    BackendError, Dataset, MotionRequest, RenderOutcome, RenderRequest, RenderTarget,
    SegmentRequest, Signal, StillImage,
};
pub use subprocess::SubprocessBackend;

/// Trait for analysis backends - allows for different implementations
pub trait AnalysisBackend {
    /// Register and motion-correct a recording into a new dataset
    fn correct_motion(&self, request: &MotionRequest) -> Result<Dataset, BackendError>;

    /// Build a dataset from the raw recording without correction
    fn create_dataset(&self, recording: &Path, dataset_dir: &Path) -> Result<Dataset, BackendError>;

    /// Write the dataset's frames to `target`
    fn export_frames(&self, dataset: &Dataset, target: &Path) -> Result<(), BackendError>;

    /// Open a dataset previously written to `dataset_dir`
    fn load_dataset(&self, dataset_dir: &Path) -> Result<Dataset, BackendError>;

    /// Segment the dataset; one entry of boundary rings per region
    fn segment(&self, dataset: &Dataset, request: &SegmentRequest) -> Result<Vec<Vec<Ring>>, BackendError>;

    /// Time-averaged still image to draw outlines over
    fn still_image(&self, dataset: &Dataset) -> Result<StillImage, BackendError>;

    fn render(&self, request: &RenderRequest) -> Result<RenderOutcome, BackendError>;

    fn extract_signal(&self, dataset: &Dataset, regions: &[Region]) -> Result<Signal, BackendError>;

    /// Write the signal as a tab-separated file with a leading `frame` column
    fn export_signal(&self, dataset: &Dataset, signal: &Signal, target: &Path) -> Result<(), BackendError>;
}
