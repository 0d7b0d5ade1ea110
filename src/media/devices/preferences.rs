// Ranked device preferences per input kind
//
// A preference list is an ordered, duplicate-free sequence of device ids,
// most preferred first. Unknown devices are appended as they are first
// enumerated; an explicit selection moves its id to the front. Ids of
// devices that are currently unplugged are kept so that a reconnecting
// device regains its rank.

use tracing::debug;

use super::types::{DeviceIdentity, DeviceKind};

/// Ordered device ids, most preferred first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferenceList {
    ids: Vec<String>,
}

impl PreferenceList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from stored ids, dropping repeats (first occurrence wins)
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Self::new();
        for id in ids {
            let id = id.into();
            if !list.contains(&id) {
                list.ids.push(id);
            }
        }
        list
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.ids.iter().any(|id| id == device_id)
    }

    pub fn rank_of(&self, device_id: &str) -> Option<usize> {
        self.ids.iter().position(|id| id == device_id)
    }

    /// Append an id at the lowest rank. Returns false if already present.
    pub fn append(&mut self, device_id: &str) -> bool {
        if self.contains(device_id) {
            return false;
        }
        self.ids.push(device_id.to_string());
        true
    }

    /// Move `selected_id` to the front, keeping the order of the rest.
    ///
    /// Empty ids and the current head are no-ops; an id not yet ranked is
    /// inserted at the front. Returns whether the list changed.
    pub fn promote(&mut self, selected_id: &str) -> bool {
        if selected_id.is_empty() || self.ids.first().map(String::as_str) == Some(selected_id) {
            return false;
        }

        self.ids.retain(|id| id != selected_id);
        self.ids.insert(0, selected_id.to_string());
        true
    }

    /// First ranked id that names a device of `kind` in `devices`
    pub fn first_present<D: DeviceIdentity>(&self, kind: DeviceKind, devices: &[D]) -> Option<&str> {
        self.ids
            .iter()
            .find(|id| {
                devices
                    .iter()
                    .any(|device| device.kind() == kind && device.device_id() == id.as_str())
            })
            .map(String::as_str)
    }
}

/// Preference lists for every kind that carries a selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DevicePreferences {
    audio_input: PreferenceList,
    video_input: PreferenceList,
}

impl DevicePreferences {
    pub fn new(audio_input: PreferenceList, video_input: PreferenceList) -> Self {
        Self {
            audio_input,
            video_input,
        }
    }

    /// Preference list for a kind; audio outputs are not ranked
    pub fn list(&self, kind: DeviceKind) -> Option<&PreferenceList> {
        match kind {
            DeviceKind::AudioInput => Some(&self.audio_input),
            DeviceKind::VideoInput => Some(&self.video_input),
            DeviceKind::AudioOutput => None,
        }
    }

    pub fn list_mut(&mut self, kind: DeviceKind) -> Option<&mut PreferenceList> {
        match kind {
            DeviceKind::AudioInput => Some(&mut self.audio_input),
            DeviceKind::VideoInput => Some(&mut self.video_input),
            DeviceKind::AudioOutput => None,
        }
    }

    /// Absorb newly seen devices at the lowest rank.
    ///
    /// Returns the kinds whose list changed so only those are persisted.
    pub fn populate<D: DeviceIdentity>(&mut self, fresh: &[D]) -> Vec<DeviceKind> {
        let mut changed = Vec::new();

        for kind in DeviceKind::INPUTS {
            let Some(list) = self.list_mut(kind) else {
                continue;
            };

            let mut list_changed = false;
            for device in fresh.iter().filter(|device| device.kind() == kind) {
                list_changed |= list.append(device.device_id());
            }

            if list_changed {
                debug!("Preference list for {} now has {} entries", kind, list.len());
                changed.push(kind);
            }
        }

        changed
    }

    /// Make `selected_id` the top preference for `kind`.
    ///
    /// `devices` is the current device list; promoting an id that is not
    /// currently enumerated is allowed (the device may reconnect later).
    pub fn promote<D: DeviceIdentity>(
        &mut self,
        kind: DeviceKind,
        devices: &[D],
        selected_id: &str,
    ) -> bool {
        let Some(list) = self.list_mut(kind) else {
            return false;
        };

        if !devices
            .iter()
            .any(|device| device.kind() == kind && device.device_id() == selected_id)
        {
            debug!("Promoting {} device '{}' that is not currently present", kind, selected_id);
        }

        list.promote(selected_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::devices::types::DeviceInfo;
    use proptest::prelude::*;

    fn list(ids: &[&str]) -> PreferenceList {
        PreferenceList::from_ids(ids.iter().copied())
    }

    #[test]
    fn test_promote_moves_to_front() {
        let mut prefs = list(&["A", "B", "C"]);
        assert!(prefs.promote("C"));
        assert_eq!(prefs.ids(), ["C", "A", "B"]);
    }

    #[test]
    fn test_promote_unknown_inserts_at_front() {
        let mut prefs = list(&["A", "B"]);
        assert!(prefs.promote("D"));
        assert_eq!(prefs.ids(), ["D", "A", "B"]);
    }

    #[test]
    fn test_promote_head_and_empty_are_noops() {
        let mut prefs = list(&["A", "B"]);
        assert!(!prefs.promote("A"));
        assert!(!prefs.promote(""));
        assert_eq!(prefs.ids(), ["A", "B"]);
    }

    #[test]
    fn test_from_ids_drops_duplicates() {
        let prefs = list(&["A", "B", "A", "C", "B"]);
        assert_eq!(prefs.ids(), ["A", "B", "C"]);
    }

    #[test]
    fn test_populate_appends_only_new_devices() {
        let mut prefs = DevicePreferences::new(list(&["mic2"]), PreferenceList::new());
        let fresh = vec![
            DeviceInfo::new("mic1", DeviceKind::AudioInput),
            DeviceInfo::new("mic2", DeviceKind::AudioInput),
            DeviceInfo::new("spk1", DeviceKind::AudioOutput),
        ];

        let changed = prefs.populate(&fresh);
        assert_eq!(changed, vec![DeviceKind::AudioInput]);
        assert_eq!(prefs.list(DeviceKind::AudioInput).unwrap().ids(), ["mic2", "mic1"]);
        assert!(prefs.list(DeviceKind::VideoInput).unwrap().is_empty());
        assert!(prefs.list(DeviceKind::AudioOutput).is_none());

        // Nothing new on the second pass
        assert!(prefs.populate(&fresh).is_empty());
    }

    #[test]
    fn test_first_present_skips_stale_ids() {
        let prefs = list(&["gone", "mic2", "mic1"]);
        let devices = vec![
            DeviceInfo::new("mic1", DeviceKind::AudioInput),
            DeviceInfo::new("mic2", DeviceKind::AudioInput),
        ];
        assert_eq!(prefs.first_present(DeviceKind::AudioInput, &devices), Some("mic2"));
        assert_eq!(prefs.first_present(DeviceKind::VideoInput, &devices), None);
    }

    #[test]
    fn test_promote_output_kind_is_ignored() {
        let mut prefs = DevicePreferences::default();
        let devices: Vec<DeviceInfo> = Vec::new();
        assert!(!prefs.promote(DeviceKind::AudioOutput, &devices, "spk"));
    }

    proptest! {
        #[test]
        fn prop_promote_keeps_ids_unique(
            ids in proptest::collection::vec("[a-d]", 0..8),
            selected in "[a-e]",
        ) {
            let mut prefs = PreferenceList::from_ids(ids.clone());
            prefs.promote(&selected);

            prop_assert_eq!(prefs.ids().first().map(String::as_str), Some(selected.as_str()));
            let mut seen = std::collections::HashSet::new();
            prop_assert!(prefs.ids().iter().all(|id| seen.insert(id.clone())));

            // Remaining ids keep their relative order
            let original = PreferenceList::from_ids(ids);
            let rest: Vec<&String> = prefs.ids().iter().skip(1).collect();
            let expected: Vec<&String> = original
                .ids()
                .iter()
                .filter(|id| **id != selected)
                .collect();
            prop_assert_eq!(rest, expected);
        }
    }
}
