//! Persisted per-control settings
//!
//! The host persists a flat map of string keys to primitive values for each
//! control. [`SettingsStore`] is that boundary; [`SettingsMap`] is one
//! control's map and [`SettingsFile`] keeps every control's map in a JSON
//! document on disk (last write wins, no transactions).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A primitive setting value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    /// Also catches integers beyond i64; read back rounded and saturated
    Float(f64),
    Str(String),
}

impl From<bool> for SettingValue {
    fn from(v: bool) -> Self {
        SettingValue::Bool(v)
    }
}

impl From<i64> for SettingValue {
    fn from(v: i64) -> Self {
        SettingValue::Int(v)
    }
}

impl From<u8> for SettingValue {
    fn from(v: u8) -> Self {
        SettingValue::Int(i64::from(v))
    }
}

impl From<&str> for SettingValue {
    fn from(v: &str) -> Self {
        SettingValue::Str(v.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(v: String) -> Self {
        SettingValue::Str(v)
    }
}

/// Key-value settings boundary
///
/// Typed getters fall back to `default` when the key is missing or holds a
/// value of another type, so malformed settings never fail a control.
pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<SettingValue>;

    fn set(&mut self, key: &str, value: SettingValue);

    fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.get(key) {
            Some(SettingValue::Int(v)) => v,
            Some(SettingValue::Float(v)) if v.is_finite() => v.round() as i64,
            Some(SettingValue::Float(_)) => default,
            Some(SettingValue::Bool(v)) => i64::from(v),
            Some(SettingValue::Str(s)) => s.trim().parse().unwrap_or(default),
            None => default,
        }
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(SettingValue::Bool(v)) => v,
            Some(SettingValue::Int(v)) => v != 0,
            Some(SettingValue::Float(v)) => v != 0.0,
            Some(SettingValue::Str(s)) => match s.trim() {
                "true" => true,
                "false" => false,
                _ => default,
            },
            None => default,
        }
    }

    fn get_str(&self, key: &str, default: &str) -> String {
        match self.get(key) {
            Some(SettingValue::Str(s)) => s,
            _ => default.to_string(),
        }
    }

    /// First key present among `keys` (newest name first), as an int
    fn get_int_any(&self, keys: &[&str], default: i64) -> i64 {
        keys.iter()
            .find(|key| self.get(key).is_some())
            .map(|key| self.get_int(key, default))
            .unwrap_or(default)
    }

    /// First key present among `keys`, as a bool
    fn get_bool_any(&self, keys: &[&str], default: bool) -> bool {
        keys.iter()
            .find(|key| self.get(key).is_some())
            .map(|key| self.get_bool(key, default))
            .unwrap_or(default)
    }
}

/// One control's settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsMap(BTreeMap<String, SettingValue>);

impl SettingsMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and profiles
    pub fn with(mut self, key: &str, value: impl Into<SettingValue>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Overlay `other` on top of `self`
    pub fn merged_with(mut self, other: &SettingsMap) -> Self {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
        self
    }

    /// Only the entries under `keys`
    pub fn only(&self, keys: &[&str]) -> SettingsMap {
        self.0
            .iter()
            .filter(|(key, _)| keys.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl SettingsStore for SettingsMap {
    fn get(&self, key: &str) -> Option<SettingValue> {
        self.0.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: SettingValue) {
        self.0.insert(key.to_string(), value);
    }
}

impl FromIterator<(String, SettingValue)> for SettingsMap {
    fn from_iter<T: IntoIterator<Item = (String, SettingValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// JSON file holding every control's settings, keyed by control id
#[derive(Debug, Clone)]
pub struct SettingsFile {
    path: Option<PathBuf>,
    controls: BTreeMap<String, SettingsMap>,
}

impl SettingsFile {
    /// Settings that are never written to disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            controls: BTreeMap::new(),
        }
    }

    /// Load from `path`
    ///
    /// A missing file starts empty. A corrupted one is logged and also starts
    /// empty; it will be overwritten on the next save.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let controls = match std::fs::read_to_string(&path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(document) => parse_controls(document),
                Err(e) => {
                    warn!("Ignoring unreadable settings file {}: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings file at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => {
                warn!("Failed to read settings file {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };

        Self {
            path: Some(path),
            controls,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Stored settings for `control_id` (empty if none)
    pub fn control(&self, control_id: &str) -> SettingsMap {
        self.controls.get(control_id).cloned().unwrap_or_default()
    }

    pub fn update(&mut self, control_id: &str, settings: SettingsMap) {
        self.controls.insert(control_id.to_string(), settings);
    }

    /// Write the document to disk (no-op for in-memory settings)
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings directory: {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(&self.controls)
            .context("Failed to serialize settings")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write settings file: {}", path.display()))?;
        Ok(())
    }
}

/// Keep every control and value that parses; log and skip the rest
fn parse_controls(document: serde_json::Value) -> BTreeMap<String, SettingsMap> {
    let serde_json::Value::Object(document) = document else {
        warn!("Settings file is not a JSON object, starting empty");
        return BTreeMap::new();
    };

    let mut controls = BTreeMap::new();
    for (control_id, entries) in document {
        let serde_json::Value::Object(entries) = entries else {
            warn!("Skipping settings of '{}': not an object", control_id);
            continue;
        };

        let mut map = SettingsMap::new();
        for (key, value) in entries {
            match serde_json::from_value::<SettingValue>(value) {
                Ok(value) => map.set(&key, value),
                Err(_) => warn!("Skipping setting '{}' of '{}': unsupported value", key, control_id),
            }
        }
        controls.insert(control_id, map);
    }
    controls
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_typed_getters_fall_back() {
        let map = SettingsMap::new()
            .with("channel", 3i64)
            .with("port", "Synth")
            .with("is_muted", true)
            .with("step_size", "6")
            .with("broken", "abc");

        assert_eq!(map.get_int("channel", 0), 3);
        assert_eq!(map.get_int("step_size", 4), 6);
        assert_eq!(map.get_int("broken", 4), 4);
        assert_eq!(map.get_int("missing", 9), 9);
        assert!(map.get_bool("is_muted", false));
        assert_eq!(map.get_str("port", ""), "Synth");
        assert_eq!(map.get_str("channel", "x"), "x");
    }

    #[test]
    fn test_legacy_key_fallback() {
        let map = SettingsMap::new().with("cc", 10i64).with("muted", true);
        assert_eq!(map.get_int_any(&["cc_number", "cc"], 7), 10);
        assert!(map.get_bool_any(&["is_muted", "muted"], false));

        let map = map.with("cc_number", 11i64);
        assert_eq!(map.get_int_any(&["cc_number", "cc"], 7), 11);
    }

    #[test]
    fn test_merge_overlays() {
        let base = SettingsMap::new().with("port", "A").with("channel", 1i64);
        let top = SettingsMap::new().with("port", "B");
        let merged = base.merged_with(&top);
        assert_eq!(merged.get_str("port", ""), "B");
        assert_eq!(merged.get_int("channel", 0), 1);
    }

    #[test]
    fn test_untagged_json_values() {
        let map: SettingsMap =
            serde_json::from_str(r#"{"port":"Synth","channel":2,"is_muted":false}"#).unwrap();
        assert_eq!(map.get("port"), Some(SettingValue::Str("Synth".into())));
        assert_eq!(map.get("channel"), Some(SettingValue::Int(2)));
        assert_eq!(map.get("is_muted"), Some(SettingValue::Bool(false)));
    }

    #[test]
    fn test_file_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("settings.json");

        let mut file = SettingsFile::load(&path);
        assert!(file.control("vol").is_empty());

        file.update("vol", SettingsMap::new().with("current_value", 104i64));
        file.save().unwrap();

        let reloaded = SettingsFile::load(&path);
        assert_eq!(reloaded.control("vol").get_int("current_value", 0), 104);
    }

    #[test]
    fn test_corrupted_file_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        let file = SettingsFile::load(&path);
        assert!(file.control("vol").is_empty());
        assert_eq!(file.path(), Some(path.as_path()));
    }

    #[test]
    fn test_odd_values_do_not_lose_other_controls() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{
                "volume": {"current_value": 90, "is_muted": true, "pre_mute_value": 90},
                "pan": {"step_size": 4.0, "label": null, "huge": 18446744073709551615},
                "broken": 7
            }"#,
        )
        .unwrap();

        let file = SettingsFile::load(&path);

        let volume = file.control("volume");
        assert!(volume.get_bool("is_muted", false));
        assert_eq!(volume.get_int("pre_mute_value", -1), 90);

        let pan = file.control("pan");
        assert_eq!(pan.get_int("step_size", 1), 4);
        assert!(!pan.contains_key("label"));
        assert_eq!(pan.get_int("huge", 0), i64::MAX);
        assert!(file.control("broken").is_empty());
    }

    #[test]
    fn test_only_keeps_listed_keys() {
        let map = SettingsMap::new()
            .with("port", "Synth")
            .with("current_value", 12i64)
            .with("is_muted", false);
        let state = map.only(&["current_value", "is_muted", "pre_mute_value"]);
        assert_eq!(state.len(), 2);
        assert!(!state.contains_key("port"));
    }

    #[test]
    fn test_in_memory_save_is_noop() {
        let mut file = SettingsFile::in_memory();
        file.update("a", SettingsMap::new().with("x", 1i64));
        file.save().unwrap();
        assert_eq!(file.control("a").get_int("x", 0), 1);
    }
}
