// Hardware device API port
//
// The platform media stack (browser bridge, native capture backend, test
// fake) is injected through these traits:
// - MediaDevices: enumeration, stream acquisition and topology notifications
// - MediaTrack: a live capture track handed back by `get_user_media`
// - DeviceChangeListener / TrackObserver: callbacks installed by the manager

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use super::constraints::StreamConstraints;
use super::devices::types::{DeviceInfo, DeviceKind};

/// Error reported by the platform, carrying its named error kind
/// (e.g. `NotAllowedError`, `NotFoundError`, `OverconstrainedError`).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{name}: {message}")]
pub struct HardwareError {
    pub name: String,
    pub message: String,
}

impl HardwareError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn not_allowed(message: impl Into<String>) -> Self {
        Self::new("NotAllowedError", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NotFoundError", message)
    }

    pub fn not_readable(message: impl Into<String>) -> Self {
        Self::new("NotReadableError", message)
    }
}

/// Device topology change listener installed while device events are enabled
pub trait DeviceChangeListener: Send + Sync {
    fn on_device_change(&self);
}

/// Media type carried by a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TrackKind {
    Audio,
    Video,
}

impl TrackKind {
    /// Capture device kind backing tracks of this type
    pub fn device_kind(self) -> DeviceKind {
        match self {
            TrackKind::Audio => DeviceKind::AudioInput,
            TrackKind::Video => DeviceKind::VideoInput,
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Audio => f.write_str("audio"),
            TrackKind::Video => f.write_str("video"),
        }
    }
}

/// Lifecycle callbacks a track delivers to its owner
pub trait TrackObserver: Send + Sync {
    /// The track terminated (stopped, device lost, permission revoked)
    fn on_ended(&self, track_id: &str);

    /// The track was cloned; the clone is a new, independent track
    fn on_cloned(&self, clone: Arc<dyn MediaTrack>);
}

/// A live capture track
pub trait MediaTrack: Send + Sync + fmt::Debug {
    fn id(&self) -> &str;

    fn kind(&self) -> TrackKind;

    /// Device id the platform actually negotiated, read from the track settings
    fn device_id(&self) -> Option<String>;

    fn is_live(&self) -> bool;

    /// Stop capturing. Implementations notify `on_ended` if an observer is set.
    fn stop(&self);

    /// Install the owner's observer, replacing any previous one
    fn set_observer(&self, observer: Arc<dyn TrackObserver>);
}

/// A captured stream: the tracks returned by one acquisition
#[derive(Debug, Clone)]
pub struct MediaStream {
    pub id: String,
    pub tracks: Vec<Arc<dyn MediaTrack>>,
}

impl MediaStream {
    pub fn new(id: impl Into<String>, tracks: Vec<Arc<dyn MediaTrack>>) -> Self {
        Self {
            id: id.into(),
            tracks,
        }
    }

    pub fn track(&self, kind: TrackKind) -> Option<&Arc<dyn MediaTrack>> {
        self.tracks.iter().find(|track| track.kind() == kind)
    }
}

/// Platform device capability
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Whether capture devices are available in this environment at all
    fn is_supported(&self) -> bool;

    async fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, HardwareError>;

    async fn get_user_media(
        &self,
        constraints: StreamConstraints,
    ) -> Result<MediaStream, HardwareError>;

    /// Install the single topology listener
    fn add_device_change_listener(&self, listener: Arc<dyn DeviceChangeListener>);

    fn remove_device_change_listener(&self);
}
