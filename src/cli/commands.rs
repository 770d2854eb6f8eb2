//! CLI command definitions

use crate::core::error::SweepError;
use crate::execution::LIST_SENTINEL;
use crate::persistence::Settings;
use crate::sweep::{self, ParameterRange, Scale, SweepParameter};
use clap::Args;
use std::path::PathBuf;

/// Batch worker for one job of an externally scheduled array
#[derive(Debug, Args, Clone)]
pub struct BatchCommand {
    /// 1-based index into the sorted recordings; -1 lists them instead
    #[arg(allow_negative_numbers = true)]
    pub job_id: i64,

    /// Settings file to replay
    pub settings_file: Option<PathBuf>,

    /// Root of the batch output tree
    pub out_dir: Option<PathBuf>,

    /// Directory searched for recordings (overrides the configuration)
    #[arg(long)]
    pub data_root: Option<PathBuf>,
}

/// What a batch invocation asks for once its arguments are checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchInvocation {
    List,
    Run {
        job_id: i64,
        settings_file: PathBuf,
        out_dir: PathBuf,
    },
}

impl BatchCommand {
    /// Check the positional arguments
    ///
    /// `-1` needs nothing else; any other job id needs both the settings file
    /// and the output directory. The error text is meant for usage output.
    pub fn invocation(&self) -> Result<BatchInvocation, String> {
        if self.job_id == LIST_SENTINEL {
            return Ok(BatchInvocation::List);
        }
        match (&self.settings_file, &self.out_dir) {
            (Some(settings_file), Some(out_dir)) => Ok(BatchInvocation::Run {
                job_id: self.job_id,
                settings_file: settings_file.clone(),
                out_dir: out_dir.clone(),
            }),
            _ => Err(format!(
                "job id {} needs both <SETTINGS_FILE> and <OUT_DIR> (only {} may be given alone)",
                self.job_id, LIST_SENTINEL
            )),
        }
    }
}

/// Replay one settings file over every recording, one after another
#[derive(Debug, Args, Clone)]
pub struct SerialCommand {
    /// Settings file to replay
    pub settings_file: PathBuf,

    /// Root of the batch output tree
    pub out_dir: PathBuf,

    /// Directory searched for recordings (overrides the configuration)
    #[arg(long)]
    pub data_root: Option<PathBuf>,
}

/// Interactive capture of one recording
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Recording to analyze (prompted for when omitted)
    #[arg(long)]
    pub recording: Option<PathBuf>,

    /// Where the captured settings are stored (prompted for when omitted)
    #[arg(long)]
    pub settings: Option<PathBuf>,
}

/// Replay against a single recording
#[derive(Debug, Args, Clone)]
pub struct ReplayCommand {
    /// Recording to analyze
    pub recording: PathBuf,

    /// Settings file to replay
    pub settings_file: PathBuf,

    /// Root of the output tree
    pub out_dir: PathBuf,
}

/// Generate sweep settings files
#[derive(Debug, Args, Clone)]
pub struct SweepCommand {
    /// Settings file every generated file starts from
    #[arg(long)]
    pub defaults: Option<PathBuf>,

    /// Settings file holding `<name>_start`, `<name>_stop` and `<name>_step`
    #[arg(long)]
    pub params: Option<PathBuf>,

    /// Empty (or missing) directory to write into
    #[arg(long)]
    pub outdir: Option<PathBuf>,

    /// Swept parameter as NAME:ABBR, in filename order (default: mu, overlap_per, components)
    #[arg(long = "param", value_parser = parse_param_pair)]
    pub params_swept: Vec<(String, String)>,

    /// Abbreviation of a count-like parameter, written unscaled
    #[arg(long)]
    pub count: Vec<String>,

    /// Skip the confirmation question
    #[arg(short, long)]
    pub yes: bool,
}

impl SweepCommand {
    /// Swept parameters with their ranges read from `params`
    pub fn parameters(&self, params: &Settings) -> Result<Vec<SweepParameter>, SweepError> {
        if self.params_swept.is_empty() {
            return sweep::default_parameters(params);
        }

        self.params_swept
            .iter()
            .map(|(name, abbreviation)| {
                let scale = if self.count.iter().any(|count| count == abbreviation) {
                    Scale::Count
                } else {
                    Scale::Proportion
                };
                let range = ParameterRange::from_settings(params, name)?;
                Ok(SweepParameter::new(name.as_str(), abbreviation.as_str(), range, scale))
            })
            .collect()
    }
}

/// Standalone frame-to-time rewrite
#[derive(Debug, Args, Clone)]
pub struct FramesToTimeCommand {
    /// Tab-separated signal file, rewritten in place
    pub file: PathBuf,

    /// Duration of one frame in seconds
    #[arg(long)]
    pub seconds_per_frame: f64,
}

/// List recordings in job order
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Directory searched for recordings (overrides the configuration)
    #[arg(long)]
    pub data_root: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Parse NAME:ABBR pairs
pub fn parse_param_pair(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, ':').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(format!("Invalid NAME:ABBR pair: {}", s));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}
