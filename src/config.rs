use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::media::devices::types::DeviceKind;

/// Key names used in the key-value store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageKeys {
    pub audio_input_preferences: String,
    pub video_input_preferences: String,
    pub audio_input_id: String,
    pub video_input_id: String,
    pub audio_input_confirmed: String,
    pub video_input_confirmed: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            audio_input_preferences: "preferredAudioInputDevices".to_string(),
            video_input_preferences: "preferredVideoInputDevices".to_string(),
            audio_input_id: "audioInputId".to_string(),
            video_input_id: "videoInputId".to_string(),
            audio_input_confirmed: "audioInputPreferenceConfirmed".to_string(),
            video_input_confirmed: "videoInputPreferenceConfirmed".to_string(),
        }
    }
}

impl StorageKeys {
    pub fn preferences(&self, kind: DeviceKind) -> Option<&str> {
        match kind {
            DeviceKind::AudioInput => Some(&self.audio_input_preferences),
            DeviceKind::VideoInput => Some(&self.video_input_preferences),
            DeviceKind::AudioOutput => None,
        }
    }

    pub fn selection(&self, kind: DeviceKind) -> Option<&str> {
        match kind {
            DeviceKind::AudioInput => Some(&self.audio_input_id),
            DeviceKind::VideoInput => Some(&self.video_input_id),
            DeviceKind::AudioOutput => None,
        }
    }

    pub fn confirmed(&self, kind: DeviceKind) -> Option<&str> {
        match kind {
            DeviceKind::AudioInput => Some(&self.audio_input_confirmed),
            DeviceKind::VideoInput => Some(&self.video_input_confirmed),
            DeviceKind::AudioOutput => None,
        }
    }
}

/// Device manager configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceManagerConfig {
    /// Storage key names
    pub storage_keys: StorageKeys,
    /// Stored selection value meaning "user disabled this kind"
    pub disabled_sentinel: String,

    /// Run one enumeration as part of `MediaDeviceManager::start`
    pub refresh_on_start: bool,

    /// Logging
    pub log_filter: String,

    /// Buffered change events per broadcast subscriber
    pub event_capacity: usize,

    /// Longest `acquire` waits on an enumeration before moving on
    pub enumeration_wait_ms: u64,

    /// JSON store location; `None` uses the platform config directory
    pub store_path: Option<PathBuf>,
}

impl Default for DeviceManagerConfig {
    fn default() -> Self {
        Self {
            storage_keys: StorageKeys::default(),
            disabled_sentinel: "__disabled__".to_string(),
            refresh_on_start: true,
            log_filter: "info".to_string(),
            event_capacity: 64,
            enumeration_wait_ms: 3000,
            store_path: None,
        }
    }
}

impl DeviceManagerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse device manager configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?;
        Self::from_json_str(&contents)
    }

    /// Resolved JSON store location
    pub fn store_path(&self) -> PathBuf {
        self.store_path.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("media-devices")
                .join("devices.json")
        })
    }
}
