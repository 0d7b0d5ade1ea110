pub mod diagnostics;
pub mod known_devices;
pub mod notifications;
pub mod preferences;
pub mod registry;
pub mod types;

pub use diagnostics::{DeviceReport, DeviceReportEntry};
pub use known_devices::KnownDeviceCache;
pub use notifications::DeviceChangeSubscription;
pub use preferences::{DevicePreferences, PreferenceList};
pub use registry::{DeviceRegistry, EnumerationOutcome};
pub use types::*;
