// Core device types for capture device management
//
// This module contains the fundamental data structures shared by the
// registry, the preference store and the acquisition engine: device kinds,
// raw hardware records, tracked devices, the tri-state selection and the
// per-pass diff summary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Device id reported by the platform for the system default device
pub const DEFAULT_DEVICE_ID: &str = "default";

/// Returns true for the sentinel ids meaning "system default device"
pub fn is_default_device_id(device_id: &str) -> bool {
    device_id.is_empty() || device_id == DEFAULT_DEVICE_ID
}

/// Device category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeviceKind {
    #[serde(rename = "audioinput")]
    AudioInput,
    #[serde(rename = "videoinput")]
    VideoInput,
    #[serde(rename = "audiooutput")]
    AudioOutput,
}

impl DeviceKind {
    /// Kinds that carry a selection and a preference list
    pub const INPUTS: [DeviceKind; 2] = [DeviceKind::AudioInput, DeviceKind::VideoInput];

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceKind::AudioInput => "audioinput",
            DeviceKind::VideoInput => "videoinput",
            DeviceKind::AudioOutput => "audiooutput",
        }
    }

    /// Name used when generating numbered fallback labels
    pub fn fallback_name(self) -> &'static str {
        match self {
            DeviceKind::AudioInput => "Microphone",
            DeviceKind::VideoInput => "Camera",
            DeviceKind::AudioOutput => "Speaker",
        }
    }

    pub fn is_input(self) -> bool {
        !matches!(self, DeviceKind::AudioOutput)
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a device: the `(kind, device_id)` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceKey {
    pub kind: DeviceKind,
    pub device_id: String,
}

impl DeviceKey {
    pub fn new(kind: DeviceKind, device_id: impl Into<String>) -> Self {
        Self {
            kind,
            device_id: device_id.into(),
        }
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.device_id)
    }
}

/// Anything that can be matched against a device identity
pub trait DeviceIdentity {
    fn device_id(&self) -> &str;
    fn kind(&self) -> DeviceKind;

    fn key(&self) -> DeviceKey {
        DeviceKey::new(self.kind(), self.device_id())
    }

    fn same_device(&self, other: &impl DeviceIdentity) -> bool {
        self.kind() == other.kind() && self.device_id() == other.device_id()
    }
}

impl<T: DeviceIdentity + ?Sized> DeviceIdentity for &T {
    fn device_id(&self) -> &str {
        (**self).device_id()
    }

    fn kind(&self) -> DeviceKind {
        (**self).kind()
    }
}

/// Raw record returned by a hardware enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_id: String,
    pub kind: DeviceKind,
    #[serde(default)]
    pub group_id: String,
    /// Empty until the user grants capture permission
    #[serde(default)]
    pub label: String,
}

impl DeviceInfo {
    pub fn new(device_id: impl Into<String>, kind: DeviceKind) -> Self {
        Self {
            device_id: device_id.into(),
            kind,
            group_id: String::new(),
            label: String::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = group_id.into();
        self
    }
}

impl DeviceIdentity for DeviceInfo {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn kind(&self) -> DeviceKind {
        self.kind
    }
}

/// A device tracked by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub device_id: String,
    pub kind: DeviceKind,
    pub group_id: String,
    pub label: String,
    /// Generated display name used while `label` is empty
    pub fallback_label: String,
}

impl Device {
    pub fn from_info(info: &DeviceInfo, fallback_label: impl Into<String>) -> Self {
        Self {
            device_id: info.device_id.clone(),
            kind: info.kind,
            group_id: info.group_id.clone(),
            label: info.label.clone(),
            fallback_label: fallback_label.into(),
        }
    }

    /// Hardware label when known, otherwise the generated fallback
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.fallback_label
        } else {
            &self.label
        }
    }

    pub fn is_default(&self) -> bool {
        is_default_device_id(&self.device_id)
    }
}

impl DeviceIdentity for Device {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn kind(&self) -> DeviceKind {
        self.kind
    }
}

/// User intent for one input kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceSelection {
    /// No explicit choice, follow the automatic default
    #[default]
    Unset,
    /// The user opted out of this media kind
    Disabled,
    /// A concrete device id
    Pinned(String),
}

impl DeviceSelection {
    pub fn pinned(device_id: impl Into<String>) -> Self {
        Self::Pinned(device_id.into())
    }

    /// Maps an automatic default onto a selection value
    pub fn from_default(device_id: Option<String>) -> Self {
        device_id.map_or(Self::Unset, Self::Pinned)
    }

    pub fn device_id(&self) -> Option<&str> {
        match self {
            Self::Pinned(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }

    /// Whether this selection is the same as an automatic default value
    pub fn matches_default(&self, default: Option<&str>) -> bool {
        match self {
            Self::Disabled => false,
            _ => self.device_id() == default,
        }
    }
}

impl fmt::Display for DeviceSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => f.write_str("<unset>"),
            Self::Disabled => f.write_str("<disabled>"),
            Self::Pinned(id) => f.write_str(id),
        }
    }
}

/// Result of reconciling one enumeration against the device list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceDiff {
    pub added: Vec<DeviceKey>,
    /// Devices present before and after whose label or group changed
    pub updated: Vec<DeviceKey>,
    pub removed: Vec<DeviceKey>,
}

impl DeviceDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}
