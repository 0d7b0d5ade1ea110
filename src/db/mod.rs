// Key-value persistence for device preferences
//
// The manager only needs string get/set/remove. Two backends ship with the
// crate: an in-memory map and a JSON file. `DevicePreferenceRepository` maps
// preference lists, selections and confirmation flags onto keys.

pub mod device_preferences;
pub mod json_file;
pub mod memory;

pub use device_preferences::{DevicePreferenceRepository, StoredPreferenceList};
pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// Errors raised by a key-value backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed value for '{key}': {message}")]
    Malformed { key: String, message: String },

    #[error("Storage I/O error: {0:#}")]
    Io(#[from] anyhow::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// String key-value store
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    fn remove(&self, key: &str) -> StoreResult<()>;
}
