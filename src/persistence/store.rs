//! File-backed settings store
//!
//! Settings files hold one `key,value` record per line with no header row.
//! List values are comma-joined, so the CSV writer quotes them into a single
//! field. Writes go to a temporary file in the target directory which is then
//! renamed over the destination, so readers never observe a truncated file.

use crate::core::error::SettingsError;
use crate::persistence::{Settings, Value};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Load/save/merge operations on settings files
pub struct SettingsStore;

impl SettingsStore {
    /// Load a settings file
    ///
    /// Fails with [`SettingsError::NotFound`] when the file is absent; callers
    /// for which the file is optional must check existence first.
    pub fn load(path: &Path) -> Result<Settings, SettingsError> {
        if !path.exists() {
            return Err(SettingsError::NotFound(path.to_path_buf()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;

        let mut settings = Settings::new();
        for record in reader.records() {
            let record = record?;
            let Some(key) = record.get(0) else {
                continue;
            };
            if key.is_empty() {
                continue;
            }
            let value = record.get(1).unwrap_or("");
            settings.set(key, value);
        }

        debug!("Loaded {} settings from {}", settings.len(), path.display());
        Ok(settings)
    }

    /// Write a complete settings table, replacing the file atomically
    pub fn save(path: &Path, settings: &Settings) -> Result<(), SettingsError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut temp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(temp.as_file_mut());
            for (key, value) in settings.iter() {
                writer.write_record([key, value])?;
            }
            writer.flush()?;
        }
        temp.as_file_mut().flush()?;

        temp.persist(path).map_err(|e| SettingsError::Persist {
            path: path.to_path_buf(),
            reason: e.error.to_string(),
        })?;

        debug!("Saved {} settings to {}", settings.len(), path.display());
        Ok(())
    }

    /// Merge `entries` into the store at `path`
    ///
    /// Only the supplied keys are overwritten; pre-existing keys keep their
    /// value and position and new keys are appended. An absent file is
    /// treated as an empty store. Returns the merged table.
    pub fn merge_update<K, V, I>(path: &Path, entries: I) -> Result<Settings, SettingsError>
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut settings = if path.exists() {
            Self::load(path)?
        } else {
            Settings::new()
        };
        settings.merge(entries);
        Self::save(path, &settings)?;
        Ok(settings)
    }
}
