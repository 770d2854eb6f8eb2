//! Signal export stage

use crate::core::error::StageError;
use crate::core::state::StageKind;
use crate::export;
use crate::persistence::Settings;
use crate::prompt::Prompter;
use crate::stages::{check_file_target, ensure_parent, ConfigSource, Stage, StageContext, StageOutcome};
use tracing::{debug, info};

pub const KEY_FRAMES_TO_TIME: &str = "frames_to_time";
pub const KEY_SECONDS_PER_FRAME: &str = "seconds_per_frame";
pub const KEY_SIGNAL_PATH: &str = "signal_path";

/// Export parameters for one run
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExportConfig {
    /// Seconds per frame when the frame column is to be rewritten as time
    pub seconds_per_frame: Option<f64>,
}

impl ExportConfig {
    pub fn from_source(source: &mut ConfigSource<'_, '_>) -> Result<Self, StageError> {
        match source {
            ConfigSource::Capture(prompter) => Self::capture(prompter),
            ConfigSource::Replay(settings) => Self::replay(settings),
        }
    }

    pub fn capture(prompter: &mut Prompter<'_>) -> Result<Self, StageError> {
        if !prompter.boolean(Some("Convert frame numbers to time (y/n)?"), Some(false))? {
            return Ok(Self::default());
        }
        let seconds = prompter.parsed(
            "How many seconds does one frame last?",
            None,
            "Please enter a positive number of seconds:",
            |line| {
                let value: f64 = line.parse().map_err(|_| format!("'{}' is not a number", line))?;
                check_seconds(value)?;
                Ok(value)
            },
        )?;
        Ok(Self {
            seconds_per_frame: Some(seconds),
        })
    }

    pub fn replay(settings: &Settings) -> Result<Self, StageError> {
        if !settings.get_bool(KEY_FRAMES_TO_TIME)? {
            return Ok(Self::default());
        }
        let seconds: f64 = settings.get_parsed(KEY_SECONDS_PER_FRAME)?;
        check_seconds(seconds).map_err(|reason| StageError::invalid(KEY_SECONDS_PER_FRAME, reason))?;
        Ok(Self {
            seconds_per_frame: Some(seconds),
        })
    }

    pub fn entries(&self) -> Settings {
        let mut entries = Settings::new();
        entries.set(KEY_FRAMES_TO_TIME, self.seconds_per_frame.is_some());
        if let Some(seconds) = self.seconds_per_frame {
            entries.set(KEY_SECONDS_PER_FRAME, seconds);
        }
        entries
    }
}

fn check_seconds(value: f64) -> Result<(), String> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(format!("{} is not a positive number of seconds", value))
    }
}

/// Signal export stage runner
pub struct ExportSignal;

impl Stage for ExportSignal {
    fn kind(&self) -> StageKind {
        StageKind::ExportSignal
    }

    fn run(&self, ctx: &mut StageContext<'_>, source: &mut ConfigSource<'_, '_>) -> Result<StageOutcome, StageError> {
        let config = ExportConfig::from_source(source)?;

        match source {
            ConfigSource::Capture(prompter) => {
                ctx.targets.signal_path = prompter.new_file(
                    Some("Where should the signal be exported?"),
                    Some(ctx.targets.signal_path.clone()),
                    false,
                )?;
            }
            ConfigSource::Replay(_) => check_file_target(&ctx.targets.signal_path)?,
        }

        let dataset = ctx.dataset()?;
        let signal = if let Some(signal) = ctx.state.signal.clone() {
            signal
        } else {
            let regions = ctx
                .state
                .regions
                .as_ref()
                .ok_or(StageError::MissingState("segmented regions"))?;
            debug!("Extracting signal for {} regions", regions.len());
            let signal = ctx.backend.extract_signal(&dataset, regions)?;
            ctx.state.signal = Some(signal.clone());
            signal
        };

        let path = ctx.targets.signal_path.clone();
        ensure_parent(&path)?;
        info!("Exporting signal for {} regions to {}", signal.regions, path.display());
        ctx.backend.export_signal(&dataset, &signal, &path)?;

        if let Some(seconds) = config.seconds_per_frame {
            let rows = export::frames_to_time(&path, seconds)?;
            debug!("Converted {} rows to time at {} s/frame", rows, seconds);
        }

        let mut entries = config.entries();
        entries.set(KEY_SIGNAL_PATH, &path);
        Ok(entries.into())
    }
}
