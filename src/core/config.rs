//! Tool configuration from YAML

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};

/// Default extension of recordings discovered under the data root
pub const DEFAULT_RECORDING_EXTENSION: &str = "tif";

/// Default suffix of per-recording analysis directories
pub const DEFAULT_DATASET_SUFFIX: &str = "sara";

/// How to reach the external analysis backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend executable (looked up on PATH when not absolute)
    pub command: String,

    /// Arguments placed before the operation name
    pub args: Vec<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            command: "sara-backend".to_string(),
            args: Vec::new(),
        }
    }
}

/// Top-level tool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// External analysis backend
    pub backend: BackendConfig,

    /// Extension (without dot) identifying recordings
    pub recording_extension: String,

    /// Suffix (without dot) of per-recording analysis directories
    pub dataset_suffix: String,

    /// Where recordings live; `$HOME/data` when unset
    pub data_root: Option<PathBuf>,

    /// Regions closer than this (pixels) are reported as neighbours
    pub neighbor_max_distance: f64,

    /// Approximate size of one generated settings file, in megabytes
    pub sweep_file_size_mb: f64,

    /// Cap on attempts per interactive question; unbounded when unset
    pub max_prompt_attempts: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            recording_extension: DEFAULT_RECORDING_EXTENSION.to_string(),
            dataset_suffix: DEFAULT_DATASET_SUFFIX.to_string(),
            data_root: None,
            neighbor_max_distance: 10.0,
            sweep_file_size_mb: 0.004,
            max_prompt_attempts: None,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise use defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.backend.command.trim().is_empty() {
            anyhow::bail!("backend.command must not be empty");
        }

        for (name, value) in [
            ("recording_extension", &self.recording_extension),
            ("dataset_suffix", &self.dataset_suffix),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("{} must not be empty", name);
            }
            if value.starts_with('.') {
                anyhow::bail!("{} must be given without a leading dot: '{}'", name, value);
            }
        }

        if !(self.neighbor_max_distance >= 0.0) {
            anyhow::bail!(
                "neighbor_max_distance must be 0 or greater, got {}",
                self.neighbor_max_distance
            );
        }

        if !(self.sweep_file_size_mb >= 0.0) {
            anyhow::bail!(
                "sweep_file_size_mb must be 0 or greater, got {}",
                self.sweep_file_size_mb
            );
        }

        if self.max_prompt_attempts == Some(0) {
            anyhow::bail!("max_prompt_attempts must be at least 1 when set");
        }

        Ok(())
    }

    /// Data root, falling back to `$HOME/data`
    pub fn data_root(&self) -> PathBuf {
        self.data_root.clone().unwrap_or_else(default_data_root)
    }
}

/// `$HOME/data`, or `./data` when no home directory is known
pub fn default_data_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("data")
}
