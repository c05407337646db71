//! Application path management for portable and installed modes.
//!
//! - **Portable mode**: a `.portable` marker next to the executable keeps the
//!   profile, settings and logs in that directory.
//! - **Installed mode** (default): data lives under the platform data
//!   directory, e.g. `~/.local/share/Deck MIDI` or `%APPDATA%\Deck MIDI`.

use std::path::{Path, PathBuf};
use tracing::debug;

/// Application name used for directories in installed mode
const APP_NAME: &str = "Deck MIDI";

const PROFILE_FILE: &str = "deck.yaml";
const SETTINGS_FILE: &str = "settings.json";

/// Default locations of the profile, settings and logs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// Deck profile (YAML)
    pub profile: PathBuf,
    /// Persisted per-control settings (JSON)
    pub settings: PathBuf,
    pub logs_dir: PathBuf,
    /// Whether running in portable mode (files next to exe)
    pub is_portable: bool,
}

impl AppPaths {
    /// Detect the appropriate paths based on environment.
    ///
    /// Called before logging is initialized; nothing here logs above debug.
    pub fn detect() -> Self {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));

        if exe_dir.join(".portable").exists() {
            return Self::in_dir(&exe_dir, true);
        }

        // Fall back to the exe dir when the platform has no data dir
        let base = dirs::data_dir().unwrap_or_else(|| exe_dir.clone()).join(APP_NAME);
        Self::in_dir(&base, false)
    }

    /// All files under `dir`
    pub fn in_dir(dir: &Path, is_portable: bool) -> Self {
        Self {
            profile: dir.join(PROFILE_FILE),
            settings: dir.join(SETTINGS_FILE),
            logs_dir: dir.join("logs"),
            is_portable,
        }
    }

    /// Ensure the logs directory exists
    pub fn ensure_logs_dir(&self) -> anyhow::Result<()> {
        if !self.logs_dir.exists() {
            debug!("Creating logs directory: {}", self.logs_dir.display());
            std::fs::create_dir_all(&self.logs_dir)?;
        }
        Ok(())
    }
}
