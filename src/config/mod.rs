//! Configuration management for Deck MIDI
//!
//! Handles loading and validating the YAML deck profile, which lists the
//! controls of a surface and their initial settings. Typed per-action
//! configuration read from those settings lives in [`actions`].

pub mod actions;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;

use crate::settings::SettingsMap;

pub use actions::{
    keys, CcConfig, CcMode, CommandConfig, CommandType, DialConfig, NoteConfig, NoteMode,
    PressActionKind, ProgramConfig,
};

/// Root profile structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeckProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Settings applied to every control unless the control overrides them
    #[serde(default, skip_serializing_if = "SettingsMap::is_empty")]
    pub defaults: SettingsMap,
    pub controls: Vec<ControlProfile>,
}

/// One button or dial on the surface
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControlProfile {
    pub id: String,
    #[serde(rename = "type")]
    pub action: ActionType,
    #[serde(default, skip_serializing_if = "SettingsMap::is_empty")]
    pub settings: SettingsMap,
}

/// Action bound to a control
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Note,
    Cc,
    Program,
    Command,
    Dial,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Note => "note",
            ActionType::Cc => "cc",
            ActionType::Program => "program",
            ActionType::Command => "command",
            ActionType::Dial => "dial",
        }
    }
}

impl DeckProfile {
    /// Load profile from YAML file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read profile: {}", path.display()))?;

        Self::from_yaml(&contents)
            .with_context(|| format!("Invalid profile: {}", path.display()))
    }

    /// Parse and validate a profile
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let profile: DeckProfile =
            serde_yaml::from_str(contents).context("Failed to parse YAML profile")?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<()> {
        if self.controls.is_empty() {
            anyhow::bail!("At least one control must be defined");
        }

        let mut seen = HashSet::new();
        for (idx, control) in self.controls.iter().enumerate() {
            if control.id.trim().is_empty() {
                anyhow::bail!("Control {} id cannot be empty", idx);
            }
            if control.id.contains(char::is_whitespace) {
                anyhow::bail!("Control id '{}' cannot contain whitespace", control.id);
            }
            if !seen.insert(control.id.as_str()) {
                anyhow::bail!("Duplicate control id '{}'", control.id);
            }
        }

        Ok(())
    }

    /// Initial settings of `control`: profile defaults overlaid with its own
    pub fn settings_for(&self, control: &ControlProfile) -> SettingsMap {
        self.defaults.clone().merged_with(&control.settings)
    }
}
