// Media device management
//
// Layout:
// - devices: registry, preferences, known-device cache, notifications
// - streams: acquisition planning and the active track registry
// - hardware / constraints: the injected platform port and its request types
// - events: observable change notifications
// - manager: the MediaDeviceManager facade

pub mod constraints;
pub mod devices;
pub mod error;
pub mod events;
pub mod hardware;
pub mod manager;
pub mod streams;

pub use constraints::{DeviceIdConstraint, MediaConstraint, StreamConstraints, TrackConstraints};
pub use devices::{
    Device, DeviceDiff, DeviceInfo, DeviceKey, DeviceKind, DeviceReport, DeviceSelection,
    PreferenceList,
};
pub use error::MediaDeviceError;
pub use events::{ChangeEvent, Field, FieldValue, ListenerId};
pub use hardware::{
    DeviceChangeListener, HardwareError, MediaDevices, MediaStream, MediaTrack, TrackKind,
    TrackObserver,
};
pub use manager::MediaDeviceManager;
pub use streams::TrackRegistry;
