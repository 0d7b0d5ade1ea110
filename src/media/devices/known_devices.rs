// Known-device cache and fallback label assignment
//
// Every device ever seen by this manager is remembered here, keyed by kind
// and id, so that a device keeps its generated fallback label and its best
// known hardware label when it disappears and comes back. Entries are never
// pruned.

use std::collections::HashMap;

use super::types::{is_default_device_id, Device, DeviceIdentity, DeviceInfo, DeviceKey, DeviceKind};

/// Label given to the system default device
pub const DEFAULT_DEVICE_LABEL: &str = "Default";

/// Process-lifetime record of every device seen
#[derive(Debug, Default)]
pub struct KnownDeviceCache {
    entries: HashMap<DeviceKey, Device>,
}

impl KnownDeviceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: DeviceKind, device_id: &str) -> Option<&Device> {
        self.entries.get(&DeviceKey::new(kind, device_id))
    }

    pub fn upsert(&mut self, device: Device) {
        self.entries.insert(device.key(), device);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of known, non-sentinel devices of a kind
    pub fn numbered_count(&self, kind: DeviceKind) -> usize {
        self.entries
            .values()
            .filter(|device| device.kind == kind && !device.is_default())
            .count()
    }

    /// Build the tracked record for a device that just appeared.
    ///
    /// A device seen before keeps its fallback label and, while the fresh
    /// record carries no label, its last known label. A first sighting of a
    /// sentinel id is labelled "Default"; any other first sighting gets the
    /// next number for its kind. The caller must `upsert` the result before
    /// labelling the next device so numbers stay unique within one pass.
    pub fn label_new_device(&self, info: &DeviceInfo) -> Device {
        if let Some(known) = self.get(info.kind, &info.device_id) {
            let mut device = Device::from_info(info, known.fallback_label.clone());
            if device.label.is_empty() {
                device.label = known.label.clone();
            }
            crate::device_debug!(
                "Reusing fallback label '{}' for {}",
                device.fallback_label,
                info.key()
            );
            return device;
        }

        let fallback = if is_default_device_id(&info.device_id) {
            DEFAULT_DEVICE_LABEL.to_string()
        } else {
            format!(
                "{} {}",
                info.kind.fallback_name(),
                self.numbered_count(info.kind) + 1
            )
        };

        Device::from_info(info, fallback)
    }
}
