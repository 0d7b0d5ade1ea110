// Device registry and enumeration diff engine
//
// The registry owns the live device list, the known-device cache, the
// preference lists and the selection state. Each hardware enumeration is fed
// through `apply_enumeration`, which diffs it against the live list, absorbs
// new devices into the preferences and re-runs the automatic default policy.
// Everything here is synchronous; the caller handles persistence and event
// emission from the returned outcome.
//
// A pin restored from storage is trusted until the first pass. If that pass
// does not report the pinned device, the selection reverts to `Unset` and the
// automatic default takes over. The stored key is left as it was, so the pin
// is restored again on the next start.

use colored::*;
use tracing::{debug, info};

use super::known_devices::KnownDeviceCache;
use super::preferences::{DevicePreferences, PreferenceList};
use super::types::{
    Device, DeviceDiff, DeviceIdentity, DeviceInfo, DeviceKind, DeviceSelection,
};

/// Everything a single enumeration pass changed
#[derive(Debug, Clone, Default)]
pub struct EnumerationOutcome {
    pub diff: DeviceDiff,
    /// Live device list after the pass
    pub devices: Vec<Device>,
    /// Kinds whose preference list grew and must be persisted
    pub changed_preferences: Vec<DeviceKind>,
    /// Selection fields whose value differs from the start of the pass
    pub selection_changes: Vec<(DeviceKind, DeviceSelection)>,
}

impl EnumerationOutcome {
    pub fn devices_changed(&self) -> bool {
        !self.diff.is_empty()
    }
}

/// In-memory device state for one manager
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
    known: KnownDeviceCache,
    preferences: DevicePreferences,
    audio_input: DeviceSelection,
    video_input: DeviceSelection,
    passes: u64,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with state restored from storage
    pub fn restore(
        preferences: DevicePreferences,
        audio_input: DeviceSelection,
        video_input: DeviceSelection,
    ) -> Self {
        Self {
            preferences,
            audio_input,
            video_input,
            ..Self::default()
        }
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn device(&self, kind: DeviceKind, device_id: &str) -> Option<&Device> {
        self.devices
            .iter()
            .find(|device| device.kind == kind && device.device_id == device_id)
    }

    pub fn known_devices(&self) -> &KnownDeviceCache {
        &self.known
    }

    pub fn preferences(&self) -> &DevicePreferences {
        &self.preferences
    }

    pub fn preference_list(&self, kind: DeviceKind) -> Option<&PreferenceList> {
        self.preferences.list(kind)
    }

    /// Number of enumeration passes applied so far
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Current selection; audio outputs are always `Unset`
    pub fn selection(&self, kind: DeviceKind) -> &DeviceSelection {
        static OUTPUT: DeviceSelection = DeviceSelection::Unset;
        match kind {
            DeviceKind::AudioInput => &self.audio_input,
            DeviceKind::VideoInput => &self.video_input,
            DeviceKind::AudioOutput => &OUTPUT,
        }
    }

    /// Replace a selection. Returns whether the value changed.
    pub fn set_selection(&mut self, kind: DeviceKind, selection: DeviceSelection) -> bool {
        let slot = match kind {
            DeviceKind::AudioInput => &mut self.audio_input,
            DeviceKind::VideoInput => &mut self.video_input,
            DeviceKind::AudioOutput => return false,
        };

        if *slot == selection {
            return false;
        }
        *slot = selection;
        true
    }

    /// Move a device id to the top of its kind's preference list
    pub fn promote(&mut self, kind: DeviceKind, device_id: &str) -> bool {
        self.preferences.promote(kind, &self.devices, device_id)
    }

    /// Automatic default for `kind` against the live device list
    pub fn automatic_default(&self, kind: DeviceKind) -> Option<String> {
        self.default_among(kind, &self.devices)
    }

    /// First preferred id present in `devices`, else the first device of
    /// that kind in enumeration order.
    fn default_among<D: DeviceIdentity>(&self, kind: DeviceKind, devices: &[D]) -> Option<String> {
        self.preferences
            .list(kind)
            .and_then(|list| list.first_present(kind, devices))
            .or_else(|| {
                devices
                    .iter()
                    .find(|device| device.kind() == kind)
                    .map(|device| device.device_id())
            })
            .map(str::to_string)
    }

    /// Reconcile a fresh enumeration with the live device list.
    pub fn apply_enumeration(&mut self, enumerated: &[DeviceInfo]) -> EnumerationOutcome {
        let fresh = dedupe(enumerated);
        let first_pass = self.passes == 0;

        let selections_before: Vec<(DeviceKind, DeviceSelection)> = DeviceKind::INPUTS
            .iter()
            .map(|kind| (*kind, self.selection(*kind).clone()))
            .collect();

        // Best-effort stickiness: the previous automatic default is taken
        // from the device list and preferences as they stood when this pass
        // started. A preference reshuffle made since the last pass therefore
        // counts as "user overrode the pick".
        let previous_defaults: Vec<(DeviceKind, Option<String>)> = DeviceKind::INPUTS
            .iter()
            .map(|kind| (*kind, self.automatic_default(*kind)))
            .collect();

        let mut diff = DeviceDiff::default();

        // Removed: present before, missing now
        let previous = std::mem::take(&mut self.devices);
        for device in previous {
            if fresh.iter().any(|info| info.same_device(&device)) {
                self.devices.push(device);
                continue;
            }

            info!(
                "🔌 {}: {} '{}' disconnected",
                "DEVICE_REMOVED".yellow(),
                device.kind,
                device.display_label()
            );
            if self.selection(device.kind).device_id() == Some(device.device_id.as_str()) {
                self.set_selection(device.kind, DeviceSelection::Unset);
            }
            diff.removed.push(device.key());
        }

        // A pin restored from a previous session only survives the first
        // pass if its device is actually present.
        if first_pass {
            for kind in DeviceKind::INPUTS {
                let missing = match self.selection(kind) {
                    DeviceSelection::Pinned(id) => !fresh
                        .iter()
                        .any(|info| info.kind == kind && info.device_id == *id),
                    _ => false,
                };
                if missing {
                    info!("Restored {} selection is not connected, reverting to automatic", kind);
                    self.set_selection(kind, DeviceSelection::Unset);
                }
            }
        }

        // Updated: present before and now
        for device in self.devices.iter_mut() {
            let Some(info) = fresh.iter().find(|info| info.same_device(&*device)) else {
                continue;
            };

            let mut changed = false;
            if !info.label.is_empty() && info.label != device.label {
                device.label = info.label.clone();
                changed = true;
            }
            if info.group_id != device.group_id {
                device.group_id = info.group_id.clone();
                changed = true;
            }
            device.kind = info.kind;

            if changed {
                crate::device_debug!("Updated {} -> '{}'", device.key(), device.display_label());
                self.known.upsert(device.clone());
                diff.updated.push(device.key());
            }
        }

        // Added: missing before, present now
        for info in &fresh {
            if self.devices.iter().any(|device| device.same_device(*info)) {
                continue;
            }

            let device = self.known.label_new_device(info);
            info!(
                "🔌 {}: {} '{}'",
                "DEVICE_ADDED".green(),
                device.kind,
                device.display_label()
            );
            self.known.upsert(device.clone());
            diff.added.push(device.key());
            self.devices.push(device);
        }

        let changed_preferences = self.preferences.populate(&fresh);

        for (kind, previous_default) in previous_defaults {
            let current = self.selection(kind);
            if current.is_unset() || current.matches_default(previous_default.as_deref()) {
                let next = DeviceSelection::from_default(self.default_among(kind, &fresh));
                if self.set_selection(kind, next) {
                    debug!("Automatic {} selection -> {}", kind, self.selection(kind));
                }
            }
        }

        let selection_changes = selections_before
            .into_iter()
            .filter(|(kind, before)| self.selection(*kind) != before)
            .map(|(kind, _)| (kind, self.selection(kind).clone()))
            .collect();

        self.passes += 1;

        EnumerationOutcome {
            diff,
            devices: self.devices.clone(),
            changed_preferences,
            selection_changes,
        }
    }
}

/// Drop repeated identities from an enumeration, keeping the first
fn dedupe(enumerated: &[DeviceInfo]) -> Vec<&DeviceInfo> {
    let mut fresh: Vec<&DeviceInfo> = Vec::with_capacity(enumerated.len());
    for info in enumerated {
        if !fresh.iter().any(|seen| seen.same_device(info)) {
            fresh.push(info);
        }
    }
    fresh
}
