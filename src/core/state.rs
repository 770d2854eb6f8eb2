//! Per-run pipeline state

use crate::backend::{Dataset, Signal};
use crate::core::region::Region;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Position of one recording in the four-stage pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    /// Nothing has run yet
    Init,
    MotionCorrected,
    Segmented,
    Visualized,
    Exported,
    /// Every stage completed
    Done,
    /// A stage failed; later stages never run
    Failed { at: StageKind },
}

/// The four stage runners, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageKind {
    MotionCorrect,
    Segment,
    Visualize,
    ExportSignal,
}

impl StageKind {
    pub const ALL: [StageKind; 4] = [
        StageKind::MotionCorrect,
        StageKind::Segment,
        StageKind::Visualize,
        StageKind::ExportSignal,
    ];

    /// Stage reached once this runner succeeds
    pub fn completes(&self) -> PipelineStage {
        match self {
            StageKind::MotionCorrect => PipelineStage::MotionCorrected,
            StageKind::Segment => PipelineStage::Segmented,
            StageKind::Visualize => PipelineStage::Visualized,
            StageKind::ExportSignal => PipelineStage::Exported,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageKind::MotionCorrect => "motion correction",
            StageKind::Segment => "segmentation",
            StageKind::Visualize => "visualization",
            StageKind::ExportSignal => "signal export",
        };
        f.write_str(name)
    }
}

impl PipelineStage {
    /// The only legal successor, if any
    pub fn next(&self) -> Option<PipelineStage> {
        match self {
            PipelineStage::Init => Some(PipelineStage::MotionCorrected),
            PipelineStage::MotionCorrected => Some(PipelineStage::Segmented),
            PipelineStage::Segmented => Some(PipelineStage::Visualized),
            PipelineStage::Visualized => Some(PipelineStage::Exported),
            PipelineStage::Exported => Some(PipelineStage::Done),
            PipelineStage::Done | PipelineStage::Failed { .. } => None,
        }
    }

    /// Check if the pipeline is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed { .. })
    }
}

/// Attempted transition that is not the current stage's successor
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Illegal stage transition from {from:?} to {to:?}")]
pub struct IllegalTransition {
    pub from: PipelineStage,
    pub to: PipelineStage,
}

/// Working state for one recording's run
///
/// Owned by a single orchestrator run and discarded afterwards.
#[derive(Debug, Clone)]
pub struct PipelineState {
    /// Unique run ID
    pub run_id: Uuid,

    pub stage: PipelineStage,

    pub started_at: DateTime<Utc>,

    /// When the run reached Done or Failed
    pub completed_at: Option<DateTime<Utc>>,

    /// Loaded lazily by whichever stage first needs it
    pub dataset: Option<Dataset>,

    pub regions: Option<Vec<Region>>,

    pub signal: Option<Signal>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            stage: PipelineStage::Init,
            started_at: Utc::now(),
            completed_at: None,
            dataset: None,
            regions: None,
            signal: None,
        }
    }

    /// Move to `to`, which must be the current stage's successor
    pub fn advance(&mut self, to: PipelineStage) -> Result<(), IllegalTransition> {
        if self.stage.next() != Some(to) {
            return Err(IllegalTransition {
                from: self.stage,
                to,
            });
        }
        self.stage = to;
        if to == PipelineStage::Done {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Mark the run as failed at `stage`
    pub fn fail(&mut self, at: StageKind) {
        self.stage = PipelineStage::Failed { at };
        self.completed_at = Some(Utc::now());
    }

    /// Wall-clock duration, once terminal
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|end| end - self.started_at)
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}
