//! The four stage runners
//!
//! Every stage builds an immutable configuration either by prompting the
//! operator (capture) or by reading an already-loaded settings table (replay),
//! calls the analysis backend, and then merges the values it used plus any
//! derived paths back into the settings store.

pub mod motion;
pub mod segment;
pub mod signal;
pub mod visualize;

use crate::backend::{AnalysisBackend, Dataset};
use crate::core::config::Config;
use crate::core::error::StageError;
use crate::core::recording::RecordingTargets;
use crate::core::region::Point;
use crate::core::state::{PipelineState, StageKind};
use crate::persistence::{Settings, SettingsStore};
use crate::prompt::Prompter;
use std::path::Path;
use tracing::debug;

pub use motion::{CorrectionStrategy, MotionConfig, MotionCorrect};
pub use segment::{Segment, SegmentConfig};
pub use signal::{ExportConfig, ExportSignal};
pub use visualize::{Visualize, VisualizeConfig};

/// Where a stage gets its configuration from
pub enum ConfigSource<'a, 'io> {
    /// Ask the operator
    Capture(&'a mut Prompter<'io>),
    /// Read previously captured values
    Replay(&'a Settings),
}

impl ConfigSource<'_, '_> {
    pub fn is_capture(&self) -> bool {
        matches!(self, ConfigSource::Capture(_))
    }
}

/// Settings every stage needs that do not come from the settings store
#[derive(Debug, Clone)]
pub struct StageOptions {
    /// Suffix appended to analysis directories chosen interactively
    pub dataset_suffix: String,

    /// Regions at most this far apart are listed as neighbours
    pub neighbor_max_distance: f64,
}

impl Default for StageOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for StageOptions {
    fn from(config: &Config) -> Self {
        Self {
            dataset_suffix: config.dataset_suffix.clone(),
            neighbor_max_distance: config.neighbor_max_distance,
        }
    }
}

/// Everything a stage may read or mutate during one run
pub struct StageContext<'a> {
    pub backend: &'a dyn AnalysisBackend,
    pub state: &'a mut PipelineState,

    /// Capture mode may redirect these to operator-chosen paths
    pub targets: &'a mut RecordingTargets,

    pub options: &'a StageOptions,
}

impl StageContext<'_> {
    /// Loaded dataset, opening it from the analysis directory on first use
    pub fn dataset(&mut self) -> Result<Dataset, StageError> {
        if let Some(dataset) = &self.state.dataset {
            return Ok(dataset.clone());
        }
        debug!("Loading dataset from {}", self.targets.dataset_dir.display());
        let dataset = self.backend.load_dataset(&self.targets.dataset_dir)?;
        self.state.dataset = Some(dataset.clone());
        Ok(dataset)
    }
}

/// A click in an interactive plot and the region it landed on
#[derive(Debug, Clone, PartialEq)]
pub struct Identification {
    pub point: Point,
    pub region: Option<usize>,
}

/// What a stage produced besides its side effects on disk
#[derive(Debug, Clone, Default)]
pub struct StageOutcome {
    /// Keys to merge into the settings store
    pub entries: Settings,

    pub identified: Vec<Identification>,
}

impl From<Settings> for StageOutcome {
    fn from(entries: Settings) -> Self {
        Self {
            entries,
            identified: Vec::new(),
        }
    }
}

/// One step of the per-recording pipeline
pub trait Stage {
    fn kind(&self) -> StageKind;

    /// Configure, call the backend and report what to persist
    fn run(&self, ctx: &mut StageContext<'_>, source: &mut ConfigSource<'_, '_>) -> Result<StageOutcome, StageError>;

    /// Run, then merge the outcome's entries into the store at `store_path`
    fn execute(
        &self,
        ctx: &mut StageContext<'_>,
        source: &mut ConfigSource<'_, '_>,
        store_path: &Path,
    ) -> Result<StageOutcome, StageError> {
        let outcome = self.run(ctx, source)?;
        SettingsStore::merge_update(store_path, outcome.entries.iter())?;
        debug!(
            "Persisted {} {} settings to {}",
            outcome.entries.len(),
            self.kind(),
            store_path.display()
        );
        Ok(outcome)
    }
}

/// The four stages in execution order
pub fn pipeline() -> [Box<dyn Stage>; 4] {
    [
        Box::new(MotionCorrect),
        Box::new(Segment),
        Box::new(Visualize),
        Box::new(ExportSignal),
    ]
}

/// Replay may not turn a directory into a file or the reverse
pub(crate) fn check_file_target(path: &Path) -> Result<(), StageError> {
    if path.is_dir() {
        return Err(StageError::Conflict(path.to_path_buf()));
    }
    Ok(())
}

pub(crate) fn check_dir_target(path: &Path) -> Result<(), StageError> {
    if path.exists() && !path.is_dir() {
        return Err(StageError::Conflict(path.to_path_buf()));
    }
    Ok(())
}

/// Create the parent directory of a file about to be written
pub(crate) fn ensure_parent(path: &Path) -> Result<(), StageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
