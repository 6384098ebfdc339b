use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};
use tokio::time::Duration;

use crate::coaching::controller::{DEFAULT_CYCLE_TIMEOUT, DEFAULT_JPEG_QUALITY, DEFAULT_TARGET_WIDTH};
use crate::coaching::scheduler::{DEFAULT_MINIMUM_INTERVAL, DEFAULT_NOMINAL_INTERVAL};
use crate::coaching::{AnalysisOptions, LoopConfig, RateScheduler};

/// Shortest cycle timeout a settings file may ask for; anything lower would
/// fail every cycle before the model can answer.
const MIN_CYCLE_TIMEOUT_MS: u64 = 1000;

/// Persisted coaching preferences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CoachSettings {
    pub minimum_interval_ms: u64,
    pub nominal_interval_ms: u64,
    pub cycle_timeout_ms: u64,
    pub target_width: u32,
    pub jpeg_quality: u8,
    /// Options a new coaching session starts with.
    pub default_options: AnalysisOptions,
}

impl Default for CoachSettings {
    fn default() -> Self {
        Self {
            minimum_interval_ms: DEFAULT_MINIMUM_INTERVAL.as_millis() as u64,
            nominal_interval_ms: DEFAULT_NOMINAL_INTERVAL.as_millis() as u64,
            cycle_timeout_ms: DEFAULT_CYCLE_TIMEOUT.as_millis() as u64,
            target_width: DEFAULT_TARGET_WIDTH,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            default_options: AnalysisOptions::default(),
        }
    }
}

impl From<&CoachSettings> for LoopConfig {
    fn from(settings: &CoachSettings) -> Self {
        Self {
            scheduler: RateScheduler::new(
                Duration::from_millis(settings.minimum_interval_ms),
                Duration::from_millis(settings.nominal_interval_ms),
            ),
            cycle_timeout: Duration::from_millis(
                settings.cycle_timeout_ms.max(MIN_CYCLE_TIMEOUT_MS),
            ),
            target_width: settings.target_width,
            jpeg_quality: settings.jpeg_quality.clamp(1, 100),
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<CoachSettings>,
}

impl SettingsStore {
    /// Load settings from `path`; a missing or unreadable-as-JSON file falls
    /// back to defaults.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            CoachSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn settings(&self) -> CoachSettings {
        self.data
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig::from(&self.settings())
    }

    pub fn update(&self, settings: CoachSettings) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    pub fn update_default_options(&self, options: AnalysisOptions) -> Result<()> {
        let mut settings = self.settings();
        settings.default_options = options;
        self.update(settings)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: CoachSettings = serde_json::from_str(&contents)?;
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        *guard = data;
        Ok(())
    }

    fn persist(&self, data: &CoachSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coaching::SkillLevel;

    #[test]
    fn missing_file_uses_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = SettingsStore::new(dir.path().join("coach.json"))?;
        assert_eq!(store.settings(), CoachSettings::default());
        assert_eq!(store.loop_config(), LoopConfig::default());
        Ok(())
    }

    #[test]
    fn updates_persist_across_reopen() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("coach.json");
        let store = SettingsStore::new(path.clone())?;

        store.update_default_options(AnalysisOptions {
            skill_level: SkillLevel::Advanced,
            ai_control_enabled: true,
            ..Default::default()
        })?;

        let reopened = SettingsStore::new(path)?;
        let settings = reopened.settings();
        assert_eq!(settings.default_options.skill_level, SkillLevel::Advanced);
        assert!(settings.default_options.ai_control_enabled);
        assert_eq!(settings.minimum_interval_ms, 2000);
        Ok(())
    }

    #[test]
    fn corrupt_file_falls_back_and_partial_file_fills_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let corrupt = dir.path().join("corrupt.json");
        fs::write(&corrupt, "{not json")?;
        assert_eq!(SettingsStore::new(corrupt)?.settings(), CoachSettings::default());

        let partial = dir.path().join("partial.json");
        fs::write(&partial, r#"{"minimumIntervalMs": 1500, "jpegQuality": 0}"#)?;
        let store = SettingsStore::new(partial)?;
        let config = store.loop_config();
        assert_eq!(config.scheduler.minimum_interval(), Duration::from_millis(1500));
        assert_eq!(config.scheduler.nominal_interval(), Duration::from_millis(3000));
        assert_eq!(config.jpeg_quality, 1);
        Ok(())
    }

    #[test]
    fn zero_cycle_timeout_is_raised_to_the_floor() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("coach.json");
        fs::write(&path, r#"{"cycleTimeoutMs": 0}"#)?;
        let config = SettingsStore::new(path)?.loop_config();
        assert_eq!(config.cycle_timeout, Duration::from_millis(MIN_CYCLE_TIMEOUT_MS));

        let custom = CoachSettings {
            cycle_timeout_ms: 12_000,
            ..Default::default()
        };
        assert_eq!(LoopConfig::from(&custom).cycle_timeout, Duration::from_secs(12));
        Ok(())
    }

    #[test]
    fn reload_picks_up_external_edits() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("coach.json");
        let store = SettingsStore::new(path.clone())?;
        store.update(CoachSettings::default())?;

        fs::write(&path, r#"{"targetWidth": 320}"#)?;
        store.reload()?;
        assert_eq!(store.settings().target_width, 320);
        Ok(())
    }
}
