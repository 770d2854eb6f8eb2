//! Sequences the four stages for one recording

use crate::backend::AnalysisBackend;
use crate::core::error::{PipelineError, StageError};
use crate::core::recording::{OutputLayout, Recording, RecordingTargets};
use crate::core::region::Point;
use crate::core::state::{PipelineStage, PipelineState, StageKind};
use crate::persistence::{Settings, SettingsStore};
use crate::stages::{self, ConfigSource, StageContext, StageOptions};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Events emitted while recordings are processed
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    RecordingStarted {
        run_id: Uuid,
        recording: PathBuf,
        capture: bool,
    },
    StageStarted {
        run_id: Uuid,
        stage: StageKind,
    },
    StageCompleted {
        run_id: Uuid,
        stage: StageKind,
        persisted: usize,
    },
    RegionIdentified {
        run_id: Uuid,
        point: Point,
        region: Option<usize>,
    },
    RecordingCompleted {
        run_id: Uuid,
        recording: PathBuf,
        regions: usize,
    },
    RecordingFailed {
        run_id: Uuid,
        recording: PathBuf,
        stage: Option<StageKind>,
        error: String,
    },
}

pub type EventHandler = Box<dyn Fn(PipelineEvent)>;

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub targets: RecordingTargets,
    pub stage: PipelineStage,
    pub regions: usize,
    pub elapsed: Option<chrono::Duration>,
}

/// One recording that failed in a batch
#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub recording: PathBuf,
    pub stage: Option<StageKind>,
    pub error: String,
}

/// Outcome of a batch; one failure never stops the rest
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub succeeded: Vec<RunSummary>,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs the pipeline against one recording at a time
pub struct PipelineOrchestrator<B> {
    backend: B,
    options: StageOptions,
    event_handlers: Vec<EventHandler>,
}

impl<B: AnalysisBackend> PipelineOrchestrator<B> {
    pub fn new(backend: B, options: StageOptions) -> Self {
        Self {
            backend,
            options,
            event_handlers: Vec::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(PipelineEvent) + 'static,
    {
        self.event_handlers.push(Box::new(handler));
    }

    /// Emit an event to all handlers
    fn emit_event(&self, event: PipelineEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    /// Run all four stages for one recording
    ///
    /// Each stage persists into `store_path` as soon as it succeeds, so a
    /// failure leaves the settings of every earlier stage on disk.
    pub fn run(
        &self,
        source: &mut ConfigSource<'_, '_>,
        mut targets: RecordingTargets,
        store_path: &Path,
    ) -> Result<RunSummary, PipelineError> {
        let mut state = PipelineState::new();
        let run_id = state.run_id;
        let recording = targets.recording.clone();

        info!(%run_id, recording = %recording.display(), "Starting pipeline");
        self.emit_event(PipelineEvent::RecordingStarted {
            run_id,
            recording: recording.clone(),
            capture: source.is_capture(),
        });

        for stage in stages::pipeline() {
            let kind = stage.kind();
            self.emit_event(PipelineEvent::StageStarted { run_id, stage: kind });
            info!(%run_id, recording = %recording.display(), "Running {}", kind);

            let mut ctx = StageContext {
                backend: &self.backend,
                state: &mut state,
                targets: &mut targets,
                options: &self.options,
            };
            let result = stage
                .execute(&mut ctx, source, store_path)
                .and_then(|outcome| {
                    state.advance(kind.completes())?;
                    Ok(outcome)
                });

            let outcome = match result {
                Ok(outcome) => outcome,
                Err(err) => {
                    state.fail(kind);
                    error!(%run_id, recording = %recording.display(), "{} failed: {}", kind, err);
                    self.emit_event(PipelineEvent::RecordingFailed {
                        run_id,
                        recording: recording.clone(),
                        stage: Some(kind),
                        error: err.to_string(),
                    });
                    return Err(PipelineError::Stage {
                        recording,
                        stage: kind,
                        source: err,
                    });
                }
            };

            for identified in outcome.identified {
                self.emit_event(PipelineEvent::RegionIdentified {
                    run_id,
                    point: identified.point,
                    region: identified.region,
                });
            }
            self.emit_event(PipelineEvent::StageCompleted {
                run_id,
                stage: kind,
                persisted: outcome.entries.len(),
            });
        }

        state
            .advance(PipelineStage::Done)
            .map_err(|e| PipelineError::Stage {
                recording: recording.clone(),
                stage: StageKind::ExportSignal,
                source: e.into(),
            })?;

        let regions = state.regions.as_ref().map_or(0, Vec::len);
        info!(%run_id, recording = %recording.display(), "Pipeline finished with {} regions", regions);
        self.emit_event(PipelineEvent::RecordingCompleted {
            run_id,
            recording,
            regions,
        });

        Ok(RunSummary {
            run_id,
            targets,
            stage: state.stage,
            regions,
            elapsed: state.elapsed(),
        })
    }

    /// Replay the shared settings against one recording
    ///
    /// The shared file is copied into the recording's analysis directory first;
    /// derived settings are written to that copy only.
    pub fn replay(
        &self,
        recording: &Recording,
        settings_path: &Path,
        layout: &OutputLayout,
    ) -> Result<RunSummary, PipelineError> {
        let store_path = layout.settings_copy_for(recording);
        let settings = prepare_replay(settings_path, &store_path, layout).map_err(|source| {
            let recording = recording.path().to_path_buf();
            warn!(recording = %recording.display(), "Could not prepare replay: {}", source);
            self.emit_event(PipelineEvent::RecordingFailed {
                run_id: Uuid::nil(),
                recording: recording.clone(),
                stage: None,
                error: source.to_string(),
            });
            PipelineError::Setup { recording, source }
        })?;

        let mut source = ConfigSource::Replay(&settings);
        self.run(&mut source, layout.targets_for(recording), &store_path)
    }

    /// Replay every recording in order with fresh state per recording
    pub fn run_batch(&self, recordings: &[Recording], settings_path: &Path, layout: &OutputLayout) -> BatchReport {
        let mut report = BatchReport::default();
        for recording in recordings {
            match self.replay(recording, settings_path, layout) {
                Ok(summary) => report.succeeded.push(summary),
                Err(e) => report.failed.push(BatchFailure {
                    recording: recording.path().to_path_buf(),
                    stage: e.stage(),
                    error: e.to_string(),
                }),
            }
        }
        info!(
            "Batch finished: {} succeeded, {} failed",
            report.succeeded.len(),
            report.failed.len()
        );
        report
    }
}

fn prepare_replay(shared: &Path, copy: &Path, layout: &OutputLayout) -> Result<Settings, StageError> {
    let settings = SettingsStore::load(shared)?;
    layout.ensure_dirs()?;
    SettingsStore::save(copy, &settings)?;
    Ok(settings)
}
