pub mod config;
pub mod db;
pub mod log;
pub mod media;
pub mod utils;

pub use config::{DeviceManagerConfig, StorageKeys};
pub use db::{JsonFileStore, KeyValueStore, MemoryStore, StoreError};
// Re-export the device management surface for consumers and integration tests
pub use media::{
    ChangeEvent, Device, DeviceChangeListener, DeviceDiff, DeviceIdConstraint, DeviceInfo,
    DeviceKey, DeviceKind, DeviceReport, DeviceSelection, Field, FieldValue, HardwareError,
    ListenerId, MediaConstraint, MediaDeviceError, MediaDeviceManager, MediaDevices, MediaStream,
    MediaTrack, StreamConstraints, TrackConstraints, TrackKind, TrackObserver,
};

/// Install the tracing subscriber using the configured default filter
pub fn init_logging(config: &DeviceManagerConfig) -> bool {
    log::init_tracing(&config.log_filter)
}
