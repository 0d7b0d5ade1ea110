// Capture constraints passed to `MediaDevices::get_user_media`

use serde::{Deserialize, Serialize};

use super::devices::types::DeviceKind;
use super::hardware::TrackKind;

/// How strongly a device id is requested
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceIdConstraint {
    /// The platform must use this device or fail
    Exact(String),
    /// The platform should prefer this device
    Ideal(String),
}

impl DeviceIdConstraint {
    pub fn device_id(&self) -> &str {
        match self {
            DeviceIdConstraint::Exact(id) | DeviceIdConstraint::Ideal(id) => id,
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, DeviceIdConstraint::Exact(_))
    }
}

/// Per-track capture constraints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<DeviceIdConstraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub echo_cancellation: Option<bool>,
}

impl TrackConstraints {
    pub fn exact(device_id: impl Into<String>) -> Self {
        Self {
            device_id: Some(DeviceIdConstraint::Exact(device_id.into())),
            ..Self::default()
        }
    }

    pub fn ideal(device_id: impl Into<String>) -> Self {
        Self {
            device_id: Some(DeviceIdConstraint::Ideal(device_id.into())),
            ..Self::default()
        }
    }
}

/// Whether a media kind is requested, and with which constraints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaConstraint {
    #[default]
    Off,
    On(TrackConstraints),
}

impl MediaConstraint {
    /// Requested with no further constraints
    pub fn any() -> Self {
        MediaConstraint::On(TrackConstraints::default())
    }

    pub fn is_requested(&self) -> bool {
        matches!(self, MediaConstraint::On(_))
    }

    pub fn device_id(&self) -> Option<&DeviceIdConstraint> {
        match self {
            MediaConstraint::On(track) => track.device_id.as_ref(),
            MediaConstraint::Off => None,
        }
    }

    /// Device id the caller insists on, if any
    pub fn exact_device_id(&self) -> Option<&str> {
        self.device_id()
            .filter(|constraint| constraint.is_exact())
            .map(DeviceIdConstraint::device_id)
    }
}

/// Audio and video constraints for one acquisition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConstraints {
    #[serde(default)]
    pub audio: MediaConstraint,
    #[serde(default)]
    pub video: MediaConstraint,
}

impl StreamConstraints {
    pub fn audio_only() -> Self {
        Self {
            audio: MediaConstraint::any(),
            video: MediaConstraint::Off,
        }
    }

    pub fn video_only() -> Self {
        Self {
            audio: MediaConstraint::Off,
            video: MediaConstraint::any(),
        }
    }

    pub fn audio_video() -> Self {
        Self {
            audio: MediaConstraint::any(),
            video: MediaConstraint::any(),
        }
    }

    pub fn with_audio(mut self, track: TrackConstraints) -> Self {
        self.audio = MediaConstraint::On(track);
        self
    }

    pub fn with_video(mut self, track: TrackConstraints) -> Self {
        self.video = MediaConstraint::On(track);
        self
    }

    pub fn get(&self, kind: TrackKind) -> &MediaConstraint {
        match kind {
            TrackKind::Audio => &self.audio,
            TrackKind::Video => &self.video,
        }
    }

    pub fn get_mut(&mut self, kind: TrackKind) -> &mut MediaConstraint {
        match kind {
            TrackKind::Audio => &mut self.audio,
            TrackKind::Video => &mut self.video,
        }
    }

    /// Constraint for the media kind backed by a capture device kind
    pub fn for_device_kind(&self, kind: DeviceKind) -> Option<&MediaConstraint> {
        match kind {
            DeviceKind::AudioInput => Some(&self.audio),
            DeviceKind::VideoInput => Some(&self.video),
            DeviceKind::AudioOutput => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.audio.is_requested() && !self.video.is_requested()
    }
}
