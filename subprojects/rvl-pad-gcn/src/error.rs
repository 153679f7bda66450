//! Bring-up and polling failures.

use rvl_ios::IosError;
use rvl_usb_hid::ProbeError;

/// Step of the request chain, as recorded for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Stage {
    Open = 1,
    Version = 2,
    DeviceChange = 3,
    Init = 4,
    Poll = 5,
    AttachFinish = 6,
    Resume = 7,
    Params = 8,
}

/// A failed step of the request chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    #[error("failed to open the HID interface")]
    Open(#[source] IosError),
    #[error("no supported HID interface version")]
    Version(#[source] ProbeError),
    #[error("device change query failed")]
    DeviceChange(#[source] IosError),
    #[error("attach finish failed")]
    AttachFinish(#[source] IosError),
    #[error("failed to resume the adapter")]
    Resume(#[source] IosError),
    #[error("failed to read the adapter parameters")]
    Params(#[source] IosError),
    #[error("failed to start the adapter")]
    Init(#[source] IosError),
    #[error("input transfer failed")]
    Poll(#[source] IosError),
}

impl StageError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Open(_) => Stage::Open,
            Self::Version(_) => Stage::Version,
            Self::DeviceChange(_) => Stage::DeviceChange,
            Self::AttachFinish(_) => Stage::AttachFinish,
            Self::Resume(_) => Stage::Resume,
            Self::Params(_) => Stage::Params,
            Self::Init(_) => Stage::Init,
            Self::Poll(_) => Stage::Poll,
        }
    }

    /// Raw result code of the failed request.
    pub fn code(&self) -> i32 {
        match self {
            Self::Version(err) => err.code(),
            Self::Open(err)
            | Self::DeviceChange(err)
            | Self::AttachFinish(err)
            | Self::Resume(err)
            | Self::Params(err)
            | Self::Init(err)
            | Self::Poll(err) => err.code(),
        }
    }

    /// Returns `true` if the failure leaves the interface itself unusable, as opposed to only
    /// the attached adapter.
    pub fn is_transport_fatal(&self) -> bool {
        matches!(
            self,
            Self::Open(_) | Self::Version(_) | Self::DeviceChange(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_ordinals() {
        let err = IosError::from_code(-4);
        assert_eq!(StageError::Open(err).stage() as u8, 1);
        assert_eq!(StageError::Poll(err).stage() as u8, 5);
        assert_eq!(StageError::Params(err).stage() as u8, 8);
    }

    #[test]
    fn only_link_failures_are_fatal() {
        let err = IosError::from_code(-6);
        assert!(StageError::DeviceChange(err).is_transport_fatal());
        assert!(StageError::Version(ProbeError::Mismatch { found: 0 }).is_transport_fatal());
        assert!(!StageError::Init(err).is_transport_fatal());
        assert!(!StageError::AttachFinish(err).is_transport_fatal());
        assert_eq!(StageError::Resume(err).code(), -6);
    }
}
