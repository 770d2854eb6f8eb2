//! Error taxonomy shared across the pipeline
//!
//! Invalid interactive input never shows up here: prompts recover from it
//! locally by asking again. Everything below is fatal for the recording being
//! processed, never for the whole batch.

use crate::backend::BackendError;
use crate::core::state::{IllegalTransition, StageKind};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading or writing a settings store
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Settings key '{0}' is missing")]
    MissingKey(String),

    #[error("Settings key '{key}' has undecodable value '{value}': {reason}")]
    Decode {
        key: String,
        value: String,
        reason: String,
    },

    #[error("I/O error on settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed settings file: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to replace settings file {}: {reason}", path.display())]
    Persist { path: PathBuf, reason: String },
}

/// Errors raised while acquiring interactive input
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Input stream closed while waiting for an answer")]
    EndOfInput,

    #[error("No valid answer after {0} attempts")]
    AttemptsExhausted(usize),

    #[error("Terminal I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by a stage runner
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output already exists and cannot be overwritten: {}", .0.display())]
    Conflict(PathBuf),

    #[error("Invalid value for '{key}': {reason}")]
    InvalidParameter { key: String, reason: String },

    #[error("Stage requires {0} but it is not available")]
    MissingState(&'static str),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Transition(#[from] IllegalTransition),
}

impl StageError {
    pub fn invalid(key: &str, reason: impl Into<String>) -> Self {
        StageError::InvalidParameter {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failure of one recording's pipeline run
///
/// Fatal for that recording only; a batch moves on to the next one.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Could not prepare {}: {source}", recording.display())]
    Setup { recording: PathBuf, source: StageError },

    #[error("{stage} failed for {}: {source}", recording.display())]
    Stage {
        recording: PathBuf,
        stage: StageKind,
        source: StageError,
    },
}

impl PipelineError {
    /// Stage that failed, if the run got that far
    pub fn stage(&self) -> Option<StageKind> {
        match self {
            PipelineError::Setup { .. } => None,
            PipelineError::Stage { stage, .. } => Some(*stage),
        }
    }
}

/// Errors raised while writing or rewriting exported tables
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed table: {0}")]
    Csv(#[from] csv::Error),

    #[error("No '{column}' column in {}", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("Row {row} has non-numeric frame value '{value}'")]
    NotNumeric { row: usize, value: String },
}

/// Errors raised when mapping a job id onto a recording
#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("Job id {job_id} is outside the valid range 1..={count}")]
    JobOutOfRange { job_id: i64, count: usize },

    #[error("Data root does not exist or is not a directory: {}", .0.display())]
    DataRootMissing(PathBuf),

    #[error("Failed to walk data root: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Errors raised while generating a parameter sweep
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Output directory {} is not empty, please empty it before continuing", .0.display())]
    OutputNotEmpty(PathBuf),

    #[error("Invalid range for '{name}': {reason}")]
    InvalidRange { name: String, reason: String },

    #[error("Parameter points {first} and {second} both encode to '{filename}'")]
    FilenameCollision {
        filename: String,
        first: usize,
        second: usize,
    },

    #[error("Filename '{0}' does not match the sweep abbreviations")]
    AbbreviationMismatch(String),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
