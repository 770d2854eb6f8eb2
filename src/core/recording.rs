//! Recordings and the per-recording output layout

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the per-recording settings copy inside the analysis directory
pub const SETTINGS_COPY_NAME: &str = "settings.csv";

/// One input recording discovered under the data root
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Recording {
    path: PathBuf,
}

impl Recording {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Full path to the recording
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name including extension, e.g. `cell01.tif`
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Base name without extension, e.g. `cell01`
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Directory holding the recording
    pub fn parent(&self) -> Option<&Path> {
        self.path.parent()
    }
}

impl std::fmt::Display for Recording {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Every path a pipeline run reads or writes for one recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingTargets {
    pub recording: PathBuf,
    pub dataset_dir: PathBuf,
    pub corrected_path: PathBuf,
    pub plot_path: PathBuf,
    pub signal_path: PathBuf,
}

/// Batch output tree: `analysis/`, `corrected/`, `plots/`, `signals/`
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
    dataset_suffix: String,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>, dataset_suffix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            dataset_suffix: dataset_suffix.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn analysis_dir(&self) -> PathBuf {
        self.root.join("analysis")
    }

    pub fn corrected_dir(&self) -> PathBuf {
        self.root.join("corrected")
    }

    pub fn plots_dir(&self) -> PathBuf {
        self.root.join("plots")
    }

    pub fn signals_dir(&self) -> PathBuf {
        self.root.join("signals")
    }

    /// Create the four output collections; existing contents are kept
    pub fn ensure_dirs(&self) -> io::Result<()> {
        for dir in [
            self.analysis_dir(),
            self.corrected_dir(),
            self.plots_dir(),
            self.signals_dir(),
        ] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Output paths for one recording
    pub fn targets_for(&self, recording: &Recording) -> RecordingTargets {
        let stem = recording.stem();
        RecordingTargets {
            recording: recording.path().to_path_buf(),
            dataset_dir: self
                .analysis_dir()
                .join(format!("{}.{}", stem, self.dataset_suffix)),
            corrected_path: self.corrected_dir().join(recording.file_name()),
            plot_path: self.plots_dir().join(format!("{}.png", stem)),
            signal_path: self.signals_dir().join(format!("{}.csv", stem)),
        }
    }

    /// Private settings store path for one recording's replay
    pub fn settings_copy_for(&self, recording: &Recording) -> PathBuf {
        self.targets_for(recording).dataset_dir.join(SETTINGS_COPY_NAME)
    }
}
