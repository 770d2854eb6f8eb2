//! Motion correction stage

use crate::backend::{AnalysisBackend, BackendError, Dataset, MotionRequest};
use crate::core::error::StageError;
use crate::core::state::StageKind;
use crate::persistence::{Settings, Value};
use crate::prompt::Prompter;
use crate::stages::{
    check_dir_target, check_file_target, ensure_parent, ConfigSource, Stage, StageContext, StageOutcome,
};
use tracing::info;

pub const KEY_STRATEGY: &str = "mc_strategy";
pub const KEY_MAX_DISPLACEMENT: &str = "max_displacement";
pub const KEY_CORRECTED_PATH: &str = "corrected_path";
pub const KEY_DATASET_DIR: &str = "dataset_dir";

const DEFAULT_MAX_DISPLACEMENT: usize = 50;

/// A named way of turning a raw recording into a dataset
pub trait CorrectionStrategy: Sync {
    /// Registry name stored in settings
    fn name(&self) -> &'static str;

    /// Human-readable label for menus
    fn label(&self) -> &'static str;

    /// Whether the strategy takes displacement bounds
    fn uses_displacement(&self) -> bool;

    fn apply(&self, backend: &dyn AnalysisBackend, request: &MotionRequest) -> Result<Dataset, BackendError>;
}

/// Rigid translation of every frame within a plane
pub struct PlaneTranslation2d;

impl CorrectionStrategy for PlaneTranslation2d {
    fn name(&self) -> &'static str {
        "plane_translation_2d"
    }

    fn label(&self) -> &'static str {
        "2D Plane Correction"
    }

    fn uses_displacement(&self) -> bool {
        true
    }

    fn apply(&self, backend: &dyn AnalysisBackend, request: &MotionRequest) -> Result<Dataset, BackendError> {
        backend.correct_motion(request)
    }
}

/// Leaves frames as recorded
pub struct NoCorrection;

impl CorrectionStrategy for NoCorrection {
    fn name(&self) -> &'static str {
        "none"
    }

    fn label(&self) -> &'static str {
        "No Correction"
    }

    fn uses_displacement(&self) -> bool {
        false
    }

    fn apply(&self, backend: &dyn AnalysisBackend, request: &MotionRequest) -> Result<Dataset, BackendError> {
        backend.create_dataset(&request.recording, &request.dataset_dir)
    }
}

static STRATEGIES: [&dyn CorrectionStrategy; 2] = [&PlaneTranslation2d, &NoCorrection];

/// All strategies, ordered by label
pub fn strategies() -> Vec<&'static dyn CorrectionStrategy> {
    let mut all = STRATEGIES.to_vec();
    all.sort_by_key(|strategy| strategy.label());
    all
}

/// Look up a strategy by registry name
pub fn find_strategy(name: &str) -> Option<&'static dyn CorrectionStrategy> {
    STRATEGIES.iter().copied().find(|strategy| strategy.name() == name)
}

/// Motion correction parameters for one run
#[derive(Clone, Copy)]
pub struct MotionConfig {
    pub strategy: &'static dyn CorrectionStrategy,

    /// `[x, y]` bounds in pixels; absent for strategies without them
    pub max_displacement: Option<[u32; 2]>,
}

impl std::fmt::Debug for MotionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotionConfig")
            .field("strategy", &self.strategy.name())
            .field("max_displacement", &self.max_displacement)
            .finish()
    }
}

impl MotionConfig {
    pub fn from_source(source: &mut ConfigSource<'_, '_>) -> Result<Self, StageError> {
        match source {
            ConfigSource::Capture(prompter) => Self::capture(prompter),
            ConfigSource::Replay(settings) => Self::replay(settings),
        }
    }

    pub fn capture(prompter: &mut Prompter<'_>) -> Result<Self, StageError> {
        let options = strategies();
        let labels: Vec<&str> = options.iter().map(|strategy| strategy.label()).collect();
        let default = options.iter().position(|strategy| strategy.uses_displacement());
        let choice = prompter.choose(Some("Which motion correction strategy should be used?"), &labels, default)?;
        let strategy = options[choice];

        let max_displacement = if strategy.uses_displacement() {
            let x = prompter.natural(
                Some("Maximum displacement along x, in pixels:"),
                Some(DEFAULT_MAX_DISPLACEMENT),
            )?;
            let y = prompter.natural(
                Some("Maximum displacement along y, in pixels:"),
                Some(DEFAULT_MAX_DISPLACEMENT),
            )?;
            Some([to_pixels(x)?, to_pixels(y)?])
        } else {
            None
        };

        Ok(Self {
            strategy,
            max_displacement,
        })
    }

    pub fn replay(settings: &Settings) -> Result<Self, StageError> {
        let name = settings.get(KEY_STRATEGY)?;
        let strategy = find_strategy(name.trim()).ok_or_else(|| {
            StageError::invalid(KEY_STRATEGY, format!("unknown correction strategy '{}'", name))
        })?;

        let max_displacement = if strategy.uses_displacement() {
            let bounds: Vec<u32> = settings.get_list(KEY_MAX_DISPLACEMENT)?;
            match bounds.as_slice() {
                &[x, y] => Some([x, y]),
                _ => {
                    return Err(StageError::invalid(
                        KEY_MAX_DISPLACEMENT,
                        format!("expected two values (x,y), got {}", bounds.len()),
                    ))
                }
            }
        } else {
            None
        };

        Ok(Self {
            strategy,
            max_displacement,
        })
    }

    /// Parameter slice persisted by this stage
    pub fn entries(&self) -> Settings {
        let mut entries = Settings::new();
        entries.set(KEY_STRATEGY, self.strategy.name());
        if let Some(bounds) = self.max_displacement {
            entries.set(KEY_MAX_DISPLACEMENT, Value::list(&bounds));
        }
        entries
    }
}

fn to_pixels(value: usize) -> Result<u32, StageError> {
    u32::try_from(value).map_err(|_| StageError::invalid(KEY_MAX_DISPLACEMENT, "value too large"))
}

/// Motion correction stage runner
pub struct MotionCorrect;

impl Stage for MotionCorrect {
    fn kind(&self) -> StageKind {
        StageKind::MotionCorrect
    }

    fn run(&self, ctx: &mut StageContext<'_>, source: &mut ConfigSource<'_, '_>) -> Result<StageOutcome, StageError> {
        let config = MotionConfig::from_source(source)?;

        match source {
            ConfigSource::Capture(prompter) => {
                ctx.targets.dataset_dir = prompter.directory(
                    Some("Where should the analysis directory be created?"),
                    Some(ctx.targets.dataset_dir.clone()),
                    Some(ctx.options.dataset_suffix.as_str()),
                )?;
                ctx.targets.corrected_path = prompter.new_file(
                    Some("Where should the corrected frames be saved?"),
                    Some(ctx.targets.corrected_path.clone()),
                    false,
                )?;
            }
            ConfigSource::Replay(_) => {
                check_dir_target(&ctx.targets.dataset_dir)?;
                check_file_target(&ctx.targets.corrected_path)?;
            }
        }

        std::fs::create_dir_all(&ctx.targets.dataset_dir)?;
        ensure_parent(&ctx.targets.corrected_path)?;

        let request = MotionRequest {
            recording: ctx.targets.recording.clone(),
            dataset_dir: ctx.targets.dataset_dir.clone(),
            strategy: config.strategy.name().to_string(),
            max_displacement: config.max_displacement.unwrap_or([0, 0]),
        };

        info!(
            "Correcting {} with {} (max displacement {:?})",
            request.recording.display(),
            config.strategy.label(),
            config.max_displacement
        );
        let dataset = config.strategy.apply(ctx.backend, &request)?;
        ctx.backend.export_frames(&dataset, &ctx.targets.corrected_path)?;
        ctx.state.dataset = Some(dataset);

        let mut entries = config.entries();
        entries.set(KEY_CORRECTED_PATH, &ctx.targets.corrected_path);
        entries.set(KEY_DATASET_DIR, &ctx.targets.dataset_dir);
        Ok(entries.into())
    }
}
