use crate::constants::{DEFAULT_IDLE_THRESHOLD_SECS, DEFAULT_WORK_APPS, MAX_IDLE_THRESHOLD_SECS};
use crate::error::AppError;
use crate::validation::{parse_work_apps, validate_idle_threshold, validate_work_app_name};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

/// Tracker configuration as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    pub auto_detect_enabled: bool,
    pub idle_threshold_secs: i64,
    /// Comma-separated app display names.
    pub work_apps: String,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            auto_detect_enabled: true,
            idle_threshold_secs: i64::try_from(DEFAULT_IDLE_THRESHOLD_SECS).unwrap_or(300),
            work_apps: DEFAULT_WORK_APPS.into(),
        }
    }
}

/// Settings after validation, ready for the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveSettings {
    pub auto_detect_enabled: bool,
    pub idle_threshold_secs: u64,
    pub work_apps: Vec<String>,
}

impl TrackerSettings {
    /// Validate, replacing what is invalid instead of failing.
    ///
    /// A non-positive idle threshold falls back to the default; one longer
    /// than a day is clamped to a day. Invalid work app names are dropped.
    pub fn effective(&self) -> EffectiveSettings {
        let idle_threshold_secs = match validate_idle_threshold(self.idle_threshold_secs) {
            Ok(secs) => secs,
            Err(e) => {
                let replacement = if self.idle_threshold_secs > 0 {
                    MAX_IDLE_THRESHOLD_SECS
                } else {
                    DEFAULT_IDLE_THRESHOLD_SECS
                };
                log::warn!("{e}; using {replacement}s");
                replacement
            }
        };

        let work_apps = parse_work_apps(&self.work_apps)
            .into_iter()
            .filter(|name| match validate_work_app_name(name) {
                Ok(_) => true,
                Err(e) => {
                    log::warn!("Ignoring work app: {e}");
                    false
                }
            })
            .collect();

        EffectiveSettings {
            auto_detect_enabled: self.auto_detect_enabled,
            idle_threshold_secs,
            work_apps,
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<TrackerSettings>,
}

impl SettingsStore {
    /// Load settings from `path`, or start from defaults when the file is missing.
    /// A file that no longer parses is logged and replaced by defaults in memory.
    pub fn new(path: PathBuf) -> Self {
        let data = if path.exists() {
            Self::read_file(&path).unwrap_or_else(|e| {
                log::warn!("Failed to parse settings at {}: {e}; using defaults", path.display());
                TrackerSettings::default()
            })
        } else {
            TrackerSettings::default()
        };

        Self {
            path,
            data: RwLock::new(data),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> TrackerSettings {
        self.read().clone()
    }

    pub fn update(&self, settings: TrackerSettings) -> Result<(), AppError> {
        let mut guard = self.write();
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    /// Re-read the file, keeping the current settings if it cannot be read.
    pub fn reload(&self) -> Result<TrackerSettings, AppError> {
        let data = Self::read_file(&self.path)?;
        *self.write() = data.clone();
        Ok(data)
    }

    fn read_file(path: &Path) -> Result<TrackerSettings, AppError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn persist(&self, data: &TrackerSettings) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)?;
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, TrackerSettings> {
        self.data.read().unwrap_or_else(|poisoned| {
            log::warn!("Settings lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, TrackerSettings> {
        self.data.write().unwrap_or_else(|poisoned| {
            log::warn!("Settings lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}
