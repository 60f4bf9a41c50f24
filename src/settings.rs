use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::config::SchedulerConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PopupSettings {
    scheduler: SchedulerConfig,
}

impl Default for PopupSettings {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
        }
    }
}

/// JSON-file backed settings for deployments that tune the scheduler knobs.
/// An unreadable or missing file falls back to defaults.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<PopupSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            PopupSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        self.data.read().unwrap().scheduler.clone()
    }

    pub fn update_scheduler(&self, config: SchedulerConfig) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            guard.scheduler = config;
            self.persist(&guard)?;
        }
        Ok(())
    }

    fn persist(&self, data: &PopupSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
