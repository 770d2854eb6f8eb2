//! Parameter sweep generation
//!
//! Expands per-parameter ranges into the cartesian product of settings files.
//! Each file is named by concatenating `<abbreviation><scaled value>` for every
//! swept parameter in declared order, so distinct points get distinct names
//! and a name can be decoded back into its values.

use crate::core::error::SweepError;
use crate::persistence::{Settings, SettingsStore};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Extension given to generated settings files
pub const SETTINGS_EXTENSION: &str = "csv";

/// Swept by default: (settings key, filename abbreviation, scale)
pub const DEFAULT_SWEEP: [(&str, &str, Scale); 3] = [
    ("mu", "mu", Scale::Proportion),
    ("overlap_per", "op", Scale::Proportion),
    ("components", "c", Scale::Count),
];

/// Upper bound on the values a single range may expand to
pub const MAX_RANGE_VALUES: usize = 100_000;

/// How a swept value is scaled before it goes into a filename
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    /// Values in [0, 1], written as percentages
    Proportion,
    /// Unit counts, written as-is
    Count,
}

impl Scale {
    pub fn factor(&self) -> f64 {
        match self {
            Scale::Proportion => 100.0,
            Scale::Count => 1.0,
        }
    }
}

/// Half-open arithmetic range `start, start + step, ... < stop`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterRange {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl ParameterRange {
    pub fn new(start: f64, stop: f64, step: f64) -> Self {
        Self { start, stop, step }
    }

    /// Read `<name>_start`, `<name>_stop` and `<name>_step`
    pub fn from_settings(params: &Settings, name: &str) -> Result<Self, SweepError> {
        let bound = |suffix: &str| params.get_parsed::<f64>(&format!("{}_{}", name, suffix));
        Ok(Self::new(bound("start")?, bound("stop")?, bound("step")?))
    }

    /// Every value in the range
    ///
    /// Values are computed as `start + i * step` rather than by accumulation.
    /// The count is `ceil((stop - start) / step)`, so float error in the
    /// bounds can still add or drop an endpoint.
    pub fn values(&self, name: &str) -> Result<Vec<f64>, SweepError> {
        let invalid = |reason: &str| SweepError::InvalidRange {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if !(self.start.is_finite() && self.stop.is_finite() && self.step.is_finite()) {
            return Err(invalid("bounds must be finite"));
        }
        if self.step <= 0.0 {
            return Err(invalid("step must be positive"));
        }

        let count = ((self.stop - self.start) / self.step).ceil();
        if count < 1.0 {
            return Err(invalid("range produces no values"));
        }
        if count > MAX_RANGE_VALUES as f64 {
            return Err(invalid(&format!(
                "range produces too many values (more than {})",
                MAX_RANGE_VALUES
            )));
        }

        Ok((0..count as usize)
            .map(|i| self.start + i as f64 * self.step)
            .collect())
    }
}

/// One swept parameter
#[derive(Debug, Clone, PartialEq)]
pub struct SweepParameter {
    /// Settings key the value is written to
    pub name: String,
    pub abbreviation: String,
    pub range: ParameterRange,
    pub scale: Scale,
}

impl SweepParameter {
    pub fn new(name: impl Into<String>, abbreviation: impl Into<String>, range: ParameterRange, scale: Scale) -> Self {
        Self {
            name: name.into(),
            abbreviation: abbreviation.into(),
            range,
            scale,
        }
    }
}

/// Build the default swept parameters with ranges taken from `params`
pub fn default_parameters(params: &Settings) -> Result<Vec<SweepParameter>, SweepError> {
    DEFAULT_SWEEP
        .iter()
        .map(|&(name, abbreviation, scale)| {
            let range = ParameterRange::from_settings(params, name)?;
            Ok(SweepParameter::new(name, abbreviation, range, scale))
        })
        .collect()
}

/// One resolved combination of swept values
#[derive(Debug, Clone)]
pub struct ParameterPoint {
    /// Unscaled values in parameter order
    pub values: Vec<f64>,

    /// File name without extension
    pub filename: String,

    /// Defaults with the swept keys overwritten
    pub settings: Settings,
}

/// Concatenate `<abbreviation><value * scale>` with zero decimals
pub fn build_filename(parameters: &[SweepParameter], values: &[f64]) -> String {
    parameters
        .iter()
        .zip(values)
        .map(|(param, value)| format!("{}{:.0}", param.abbreviation, value * param.scale.factor()))
        .collect()
}

/// Recover the scaled values encoded in a generated filename
///
/// A trailing `.csv` is ignored.
pub fn decode_filename(filename: &str, parameters: &[SweepParameter]) -> Result<Vec<f64>, SweepError> {
    let stem = filename
        .strip_suffix(&format!(".{}", SETTINGS_EXTENSION))
        .unwrap_or(filename);

    let pattern: String = parameters
        .iter()
        .map(|param| format!("{}(-?[0-9]+)", regex::escape(&param.abbreviation)))
        .collect();
    let re = Regex::new(&format!("^{}$", pattern))
        .map_err(|_| SweepError::AbbreviationMismatch(filename.to_string()))?;

    let captures = re
        .captures(stem)
        .ok_or_else(|| SweepError::AbbreviationMismatch(filename.to_string()))?;

    captures
        .iter()
        .skip(1)
        .map(|group| {
            group
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .ok_or_else(|| SweepError::AbbreviationMismatch(filename.to_string()))
        })
        .collect()
}

/// The full cartesian product of a set of swept parameters
#[derive(Debug, Clone)]
pub struct SweepPlan {
    parameters: Vec<SweepParameter>,
    points: Vec<ParameterPoint>,
}

impl SweepPlan {
    /// Expand every combination; the first parameter varies slowest
    pub fn new(defaults: &Settings, parameters: Vec<SweepParameter>) -> Result<Self, SweepError> {
        let ranges = parameters
            .iter()
            .map(|param| param.range.values(&param.name))
            .collect::<Result<Vec<_>, _>>()?;

        let mut combinations: Vec<Vec<f64>> = vec![Vec::new()];
        for values in &ranges {
            combinations = combinations
                .into_iter()
                .flat_map(|prefix| {
                    values.iter().map(move |&value| {
                        let mut combination = prefix.clone();
                        combination.push(value);
                        combination
                    })
                })
                .collect();
        }

        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut points = Vec::with_capacity(combinations.len());
        for (index, values) in combinations.into_iter().enumerate() {
            let filename = build_filename(&parameters, &values);
            if let Some(&first) = seen.get(&filename) {
                return Err(SweepError::FilenameCollision {
                    filename,
                    first,
                    second: index,
                });
            }
            seen.insert(filename.clone(), index);

            let mut settings = defaults.clone();
            for (param, &value) in parameters.iter().zip(&values) {
                settings.set(param.name.as_str(), value);
            }
            points.push(ParameterPoint {
                values,
                filename,
                settings,
            });
        }

        debug!("Sweep over {} parameters expands to {} points", parameters.len(), points.len());
        Ok(Self { parameters, points })
    }

    pub fn parameters(&self) -> &[SweepParameter] {
        &self.parameters
    }

    pub fn points(&self) -> &[ParameterPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Approximate total size on disk in megabytes
    pub fn estimated_size_mb(&self, per_file_mb: f64) -> f64 {
        per_file_mb * self.points.len() as f64
    }

    /// Path a point is written to inside `outdir`
    pub fn path_for(outdir: &Path, point: &ParameterPoint) -> PathBuf {
        outdir.join(format!("{}.{}", point.filename, SETTINGS_EXTENSION))
    }

    /// Write one settings file per point into `outdir`
    ///
    /// `outdir` must be empty or absent. `on_written` is called after each file.
    pub fn write_all<F>(&self, outdir: &Path, mut on_written: F) -> Result<usize, SweepError>
    where
        F: FnMut(&ParameterPoint, &Path),
    {
        ensure_empty_dir(outdir)?;

        for point in &self.points {
            let path = Self::path_for(outdir, point);
            SettingsStore::save(&path, &point.settings)?;
            on_written(point, &path);
        }

        info!("Wrote {} settings files to {}", self.points.len(), outdir.display());
        Ok(self.points.len())
    }
}

/// Create `dir` if missing; refuse if it already has entries
pub fn ensure_empty_dir(dir: &Path) -> Result<(), SweepError> {
    if dir.exists() {
        if fs::read_dir(dir)?.next().is_some() {
            return Err(SweepError::OutputNotEmpty(dir.to_path_buf()));
        }
    } else {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}
