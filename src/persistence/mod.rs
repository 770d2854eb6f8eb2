//! Settings persistence
//!
//! A settings store is a flat, ordered key/value table. Every pipeline stage
//! owns a slice of the keys and updates only that slice, so the merge must
//! never drop keys it was not asked to touch.

pub mod store;

pub use store::SettingsStore;

use crate::core::error::SettingsError;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Separator used to join list-valued entries into one field
pub const LIST_SEPARATOR: char = ',';

/// A value to be written into a settings store
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Scalar, already rendered as text
    Text(String),
    /// Ordered sequence, stored as one comma-joined field
    List(Vec<String>),
}

impl Value {
    /// Encode the value as the single text field stored on disk
    pub fn encode(&self) -> String {
        match self {
            Value::Text(text) => text.clone(),
            Value::List(items) => items.join(&LIST_SEPARATOR.to_string()),
        }
    }

    /// Build a list value from any displayable items
    pub fn list<T: Display>(items: &[T]) -> Self {
        Value::List(items.iter().map(|item| item.to_string()).collect())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&Path> for Value {
    fn from(value: &Path) -> Self {
        Value::Text(value.display().to_string())
    }
}

impl From<PathBuf> for Value {
    fn from(value: PathBuf) -> Self {
        Value::from(value.as_path())
    }
}

impl From<&PathBuf> for Value {
    fn from(value: &PathBuf) -> Self {
        Value::from(value.as_path())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Text(value.to_string())
    }
}

impl<T: Display> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::list(&value)
    }
}

/// Ordered mapping from key to encoded value
///
/// Keys are unique. Insertion order is preserved and is also the order in
/// which entries are written back to disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    entries: Vec<(String, String)>,
}

impl Settings {
    /// Create an empty settings table
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `key` is present
    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Keys in stored order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Key/encoded-value pairs in stored order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Set one key; an existing key keeps its position, a new key is appended
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let encoded = value.into().encode();
        match self.position(&key) {
            Some(index) => self.entries[index].1 = encoded,
            None => self.entries.push((key, encoded)),
        }
    }

    /// Point-update every supplied key, leaving all others untouched
    pub fn merge<K, V, I>(&mut self, updates: I)
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in updates {
            self.set(key, value);
        }
    }

    /// Raw encoded value for `key`
    pub fn get(&self, key: &str) -> Result<&str, SettingsError> {
        self.position(key)
            .map(|index| self.entries[index].1.as_str())
            .ok_or_else(|| SettingsError::MissingKey(key.to_string()))
    }

    /// Value for `key` decoded with a caller-supplied cast
    pub fn get_with<T, E, F>(&self, key: &str, cast: F) -> Result<T, SettingsError>
    where
        F: FnOnce(&str) -> Result<T, E>,
        E: Display,
    {
        let raw = self.get(key)?;
        cast(raw.trim()).map_err(|e| SettingsError::Decode {
            key: key.to_string(),
            value: raw.to_string(),
            reason: e.to_string(),
        })
    }

    /// Value for `key` parsed via `FromStr`
    pub fn get_parsed<T>(&self, key: &str) -> Result<T, SettingsError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.get_with(key, str::parse::<T>)
    }

    /// List-typed value for `key`, re-split and parsed element by element
    pub fn get_list<T>(&self, key: &str) -> Result<Vec<T>, SettingsError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.get_with(key, |raw| -> Result<Vec<T>, String> {
            if raw.is_empty() {
                return Ok(Vec::new());
            }
            raw.split(LIST_SEPARATOR)
                .map(|item| {
                    item.trim()
                        .parse::<T>()
                        .map_err(|e| format!("list item '{}': {}", item.trim(), e))
                })
                .collect()
        })
    }

    /// Boolean value for `key`
    pub fn get_bool(&self, key: &str) -> Result<bool, SettingsError> {
        self.get_with(key, parse_bool)
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Settings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut settings = Settings::new();
        settings.merge(iter);
        settings
    }
}

/// Parse a boolean setting, tolerant of the spellings older files used
pub fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        other => Err(format!("'{}' is not a boolean", other)),
    }
}

/// Parse a non-negative whole count, accepting float spellings such as `20.0`
///
/// Sweep-generated files store every swept value as a float.
pub fn parse_count(raw: &str) -> Result<usize, String> {
    if let Ok(count) = raw.parse::<usize>() {
        return Ok(count);
    }
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("'{}' is not a number", raw))?;
    if value < 0.0 || value.fract() != 0.0 || !value.is_finite() {
        return Err(format!("'{}' is not a non-negative whole number", raw));
    }
    Ok(value as usize)
}
