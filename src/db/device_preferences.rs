use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{KeyValueStore, StoreResult};
use crate::config::StorageKeys;
use crate::media::devices::preferences::{DevicePreferences, PreferenceList};
use crate::media::devices::types::{DeviceKind, DeviceSelection};

/// Current preference list format version
pub const PREFERENCE_FORMAT_VERSION: u32 = 1;

/// Serialized preference list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPreferenceList {
    pub version: u32,
    pub ids: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredListFormat {
    Versioned(StoredPreferenceList),
    Bare(Vec<String>),
}

impl StoredPreferenceList {
    pub fn from_list(list: &PreferenceList) -> Self {
        Self {
            version: PREFERENCE_FORMAT_VERSION,
            ids: list.ids().to_vec(),
        }
    }

    /// Parse either the versioned object or a bare array of ids
    pub fn parse(raw: &str) -> Result<PreferenceList, serde_json::Error> {
        let ids = match serde_json::from_str::<StoredListFormat>(raw)? {
            StoredListFormat::Versioned(stored) => {
                if stored.version > PREFERENCE_FORMAT_VERSION {
                    debug!(
                        "Preference list version {} is newer than {}, reading ids anyway",
                        stored.version, PREFERENCE_FORMAT_VERSION
                    );
                }
                stored.ids
            }
            StoredListFormat::Bare(ids) => ids,
        };
        Ok(PreferenceList::from_ids(ids))
    }
}

/// Maps device preference state onto key-value entries
#[derive(Clone)]
pub struct DevicePreferenceRepository {
    store: Arc<dyn KeyValueStore>,
    keys: StorageKeys,
    disabled_sentinel: String,
}

impl DevicePreferenceRepository {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        keys: StorageKeys,
        disabled_sentinel: impl Into<String>,
    ) -> Self {
        Self {
            store,
            keys,
            disabled_sentinel: disabled_sentinel.into(),
        }
    }

    /// Load a preference list. Unreadable entries are logged and read as empty.
    pub fn load_preferences(&self, kind: DeviceKind) -> PreferenceList {
        let Some(key) = self.keys.preferences(kind) else {
            return PreferenceList::new();
        };

        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return PreferenceList::new(),
            Err(err) => {
                warn!("⚠️ Could not read {}: {}", key, err);
                return PreferenceList::new();
            }
        };

        match StoredPreferenceList::parse(&raw) {
            Ok(list) => list,
            Err(err) => {
                warn!("⚠️ Ignoring malformed preference list {}: {}", key, err);
                PreferenceList::new()
            }
        }
    }

    pub fn save_preferences(&self, kind: DeviceKind, list: &PreferenceList) -> StoreResult<()> {
        let Some(key) = self.keys.preferences(kind) else {
            return Ok(());
        };
        let json = serde_json::to_string(&StoredPreferenceList::from_list(list))
            .map_err(anyhow::Error::from)?;
        self.store.set(key, &json)
    }

    /// Load a selection; an unreadable entry reads as `Unset`
    pub fn load_selection(&self, kind: DeviceKind) -> DeviceSelection {
        let Some(key) = self.keys.selection(kind) else {
            return DeviceSelection::Unset;
        };

        match self.store.get(key) {
            Ok(Some(value)) if value == self.disabled_sentinel => DeviceSelection::Disabled,
            Ok(Some(value)) => DeviceSelection::Pinned(value),
            Ok(None) => DeviceSelection::Unset,
            Err(err) => {
                warn!("⚠️ Could not read {}: {}", key, err);
                DeviceSelection::Unset
            }
        }
    }

    pub fn save_selection(&self, kind: DeviceKind, selection: &DeviceSelection) -> StoreResult<()> {
        let Some(key) = self.keys.selection(kind) else {
            return Ok(());
        };

        match selection {
            DeviceSelection::Unset => self.store.remove(key),
            DeviceSelection::Disabled => self.store.set(key, &self.disabled_sentinel),
            DeviceSelection::Pinned(id) => self.store.set(key, id),
        }
    }

    pub fn is_confirmed(&self, kind: DeviceKind) -> bool {
        let Some(key) = self.keys.confirmed(kind) else {
            return false;
        };
        matches!(self.store.get(key), Ok(Some(value)) if value == "true")
    }

    pub fn set_confirmed(&self, kind: DeviceKind) -> StoreResult<()> {
        match self.keys.confirmed(kind) {
            Some(key) => self.store.set(key, "true"),
            None => Ok(()),
        }
    }

    /// Preferences and selections persisted by a previous session
    pub fn load_state(&self) -> (DevicePreferences, DeviceSelection, DeviceSelection) {
        let preferences = DevicePreferences::new(
            self.load_preferences(DeviceKind::AudioInput),
            self.load_preferences(DeviceKind::VideoInput),
        );
        (
            preferences,
            self.load_selection(DeviceKind::AudioInput),
            self.load_selection(DeviceKind::VideoInput),
        )
    }
}
