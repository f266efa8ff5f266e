// Probe settings and persistence
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Tunable probe behavior. Changing these shifts scheduling, not what the
/// verdict means.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSettings {
    pub version: i32, // Settings schema version for future migrations
    /// Delay before the probe touches the audio stack, in milliseconds.
    pub startup_delay_ms: u64,
    /// Upper bound on waiting for the clip to leave the output buffer.
    pub drain_timeout_ms: u64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            version: 1,
            startup_delay_ms: 2500,
            drain_timeout_ms: 250,
        }
    }
}

impl ProbeSettings {
    /// Get the settings file path
    pub fn settings_path(dir: &Path) -> PathBuf {
        dir.join("autoplay-probe.json")
    }

    /// Load settings from file, or return defaults if the file doesn't exist
    pub fn load(dir: &Path) -> Result<Self> {
        let path = Self::settings_path(dir);

        if !path.exists() {
            tracing::debug!("no settings file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read settings file {:?}", path))?;

        let settings: ProbeSettings =
            serde_json::from_str(&content).context("failed to parse settings")?;

        tracing::debug!("loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).context("failed to create settings directory")?;

        let path = Self::settings_path(dir);
        let content =
            serde_json::to_string_pretty(self).context("failed to serialize settings")?;

        fs::write(&path, content)
            .with_context(|| format!("failed to write settings file {:?}", path))?;

        tracing::debug!("saved settings to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = ProbeSettings::default();

        assert_eq!(settings.version, 1);
        assert_eq!(settings.startup_delay_ms, 2500);
        assert_eq!(settings.drain_timeout_ms, 250);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();

        let settings = ProbeSettings::load(dir.path()).unwrap();

        assert_eq!(settings.startup_delay_ms, 2500);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();

        let settings = ProbeSettings {
            startup_delay_ms: 100,
            ..ProbeSettings::default()
        };
        settings.save(dir.path()).unwrap();

        let loaded = ProbeSettings::load(dir.path()).unwrap();

        assert_eq!(loaded.startup_delay_ms, 100);
        assert_eq!(loaded.drain_timeout_ms, 250);
        assert_eq!(loaded.version, 1);
    }
}
