use crate::db::StoreError;

use super::hardware::HardwareError;

/// Errors that can occur during device management operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaDeviceError {
    #[error("Media capture is not supported in this environment")]
    NotSupported,

    #[error("Device enumeration failed: {0}")]
    EnumerationFailed(HardwareError),

    /// The platform rejected the capture request; the original error is kept intact
    #[error(transparent)]
    AcquisitionFailed(HardwareError),

    #[error("Every requested media kind is disabled")]
    NoMediaRequested,

    #[error("Field '{0}' is read-only")]
    ReadOnlyField(String),

    #[error("Value does not fit field '{0}'")]
    InvalidValue(String),

    #[error("Preference storage error: {0}")]
    Store(String),
}

impl From<StoreError> for MediaDeviceError {
    fn from(err: StoreError) -> Self {
        MediaDeviceError::Store(err.to_string())
    }
}

impl MediaDeviceError {
    /// Hardware error behind an acquisition or enumeration failure
    pub fn hardware_error(&self) -> Option<&HardwareError> {
        match self {
            MediaDeviceError::EnumerationFailed(err) | MediaDeviceError::AcquisitionFailed(err) => {
                Some(err)
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, MediaDeviceError>;
