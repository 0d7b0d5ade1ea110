// Stream acquisition planning
//
// Pure steps of `MediaDeviceManager::acquire`:
// - resolve_request: inject the stored selection into the caller's constraints
// - conflicting_tracks: find live tracks an exact request would collide with
// - negotiated_changes: compare negotiated device ids with the requested ones

use std::sync::Arc;
use tracing::debug;

use crate::media::constraints::{DeviceIdConstraint, MediaConstraint, StreamConstraints};
use crate::media::devices::types::{DeviceKind, DeviceSelection};
use crate::media::hardware::{MediaStream, MediaTrack, TrackKind};

const TRACK_KINDS: [TrackKind; 2] = [TrackKind::Audio, TrackKind::Video];

/// Constraints ready for the hardware plus the kinds whose negotiated
/// device should be read back into the selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionPlan {
    pub constraints: StreamConstraints,
    /// Kinds to reconcile with the selected id they were requested with
    /// (`None` while the selection was unset)
    pub reconcile: Vec<(DeviceKind, Option<String>)>,
    /// Kinds the caller asked for that a `Disabled` selection switched off
    pub disabled: Vec<DeviceKind>,
}

impl AcquisitionPlan {
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

/// Apply the current selections to a capture request.
///
/// A caller-supplied device id always wins. Otherwise a pinned selection is
/// requested exactly and a disabled selection turns the kind off.
pub fn resolve_request<F>(requested: &StreamConstraints, selection: F) -> AcquisitionPlan
where
    F: Fn(DeviceKind) -> DeviceSelection,
{
    let mut constraints = requested.clone();
    let mut reconcile = Vec::new();
    let mut disabled = Vec::new();

    for track_kind in TRACK_KINDS {
        let kind = track_kind.device_kind();
        let constraint = constraints.get_mut(track_kind);

        let MediaConstraint::On(track) = &mut *constraint else {
            continue;
        };
        if track.device_id.is_some() {
            continue;
        }

        match selection(kind) {
            DeviceSelection::Disabled => {
                debug!("{} is disabled, dropping it from the request", kind);
                *constraint = MediaConstraint::Off;
                disabled.push(kind);
            }
            DeviceSelection::Pinned(device_id) => {
                track.device_id = Some(DeviceIdConstraint::Exact(device_id.clone()));
                reconcile.push((kind, Some(device_id)));
            }
            DeviceSelection::Unset => reconcile.push((kind, None)),
        }
    }

    AcquisitionPlan {
        constraints,
        reconcile,
        disabled,
    }
}

/// Ids of active tracks that must stop before an exact request can open its device
pub fn conflicting_tracks(
    active: &[Arc<dyn MediaTrack>],
    constraints: &StreamConstraints,
) -> Vec<String> {
    active
        .iter()
        .filter(|track| {
            constraints
                .get(track.kind())
                .exact_device_id()
                .is_some_and(|requested| track.device_id().as_deref() != Some(requested))
        })
        .map(|track| track.id().to_string())
        .collect()
}

/// A negotiated device that differs from the id the request was built with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedChange {
    pub kind: DeviceKind,
    pub requested: Option<String>,
    pub negotiated: String,
}

/// Kinds where the platform opened a different device than was requested
pub fn negotiated_changes(
    stream: &MediaStream,
    reconcile: &[(DeviceKind, Option<String>)],
) -> Vec<NegotiatedChange> {
    reconcile
        .iter()
        .filter_map(|(kind, requested)| {
            let track_kind = TRACK_KINDS
                .into_iter()
                .find(|track_kind| track_kind.device_kind() == *kind)?;
            let negotiated = stream.track(track_kind)?.device_id()?;
            if negotiated.is_empty() || requested.as_deref() == Some(negotiated.as_str()) {
                return None;
            }
            Some(NegotiatedChange {
                kind: *kind,
                requested: requested.clone(),
                negotiated,
            })
        })
        .collect()
}
