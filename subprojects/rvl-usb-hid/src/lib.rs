//! USB HID transport over IOS (`/dev/usb/hid`).
//!
//! IOS exposes USB HID devices through a single resource manager. Two incompatible revisions
//! of its ioctl interface exist in the wild:
//!
//! - **v4** (`0x00040001`): device list as variable-size descriptor records, interrupt
//!   transfers as plain ioctls with a 0x20-byte message.
//! - **v5** (`0x00050001`): fixed 12-byte device entries, an explicit attach/resume handshake,
//!   and interrupt transfers as ioctlv with a 0x40-byte message.
//!
//! Both are driven through the [`HidTransport`] trait. A transport owns one distinct,
//! cache-line aligned buffer per operation, so different operations can be in flight at the
//! same time without sharing memory. Operations only *describe* the request ([`Request`]); the
//! caller submits it with [`rvl_ios::submit`].

#![cfg_attr(not(test), no_std)]

use rvl_ios::{IosError, Request};

pub mod proto;
mod v4;
mod v5;

pub use self::{v4::HidV4, v5::HidV5};

/// Revision of the `/dev/usb/hid` interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V4,
    V5,
}

/// Handle IOS assigns to an attached USB device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct DeviceId(pub u32);

/// USB vendor/product pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsbId {
    pub vid: u16,
    pub pid: u16,
}

impl UsbId {
    /// Creates a new vendor/product pair.
    pub const fn new(vid: u16, pid: u16) -> Self {
        Self { vid, pid }
    }

    /// Packed `vid << 16 | pid`, as found in v4 device records.
    pub const fn to_u32(self) -> u32 {
        (self.vid as u32) << 16 | self.pid as u32
    }
}

/// Description of the one device a transport looks for and talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    /// Vendor/product identity.
    pub id: UsbId,
    /// Size of the device's v4 descriptor record, in bytes.
    pub descriptor_size: u32,
    /// Interrupt IN endpoint address.
    pub endpoint_in: u8,
    /// Interrupt OUT endpoint address.
    pub endpoint_out: u8,
    /// Length of one input report, in bytes.
    pub report_len: usize,
}

/// A command set for `/dev/usb/hid`.
///
/// Methods returning a [`Request`] prepare the transport's buffer for that operation and
/// describe it; they do not submit anything. Each operation has its own buffers, which must not
/// be prepared again until the previous request for the same operation has completed.
pub trait HidTransport {
    /// Describes the "get version" query.
    fn get_version(&mut self) -> Request<'_>;

    /// Validates the completion of [`HidTransport::get_version`].
    fn check_version(&self, ret: i32) -> Result<(), ProbeError>;

    /// Describes the device-change query. It completes immediately the first time, then
    /// whenever the set of attached devices changes.
    fn get_device_change(&mut self) -> Request<'_>;

    /// Scans the device list filled by a completed device-change query for `target`.
    ///
    /// `ret` is the (non-negative) completion result. The first matching entry wins.
    fn find_device(&self, ret: i32, target: &Target) -> Option<DeviceId>;

    /// Describes the "attach finish" acknowledgement of a device-change completion.
    ///
    /// The handshake steps (`attach_finish`, `resume`, `get_params`) return `None` when the
    /// command set has no such step; callers treat the step as already completed.
    fn attach_finish(&mut self) -> Option<Request<'_>> {
        None
    }

    /// Describes the request powering `device` on.
    fn resume(&mut self, _device: DeviceId) -> Option<Request<'_>> {
        None
    }

    /// Describes the "get device parameters" query for `device`.
    fn get_params(&mut self, _device: DeviceId) -> Option<Request<'_>> {
        None
    }

    /// Describes an interrupt OUT transfer of the initialization `report`.
    fn send_init(&mut self, device: DeviceId, target: &Target, report: &[u8]) -> Request<'_>;

    /// Describes an interrupt IN transfer of one input report.
    fn send_poll(&mut self, device: DeviceId, target: &Target) -> Request<'_>;

    /// Input report received by the last completed [`HidTransport::send_poll`].
    fn poll_report(&self) -> &[u8];

    /// Describes an interrupt OUT transfer of a rumble `report`.
    fn send_rumble(&mut self, device: DeviceId, target: &Target, report: &[u8]) -> Request<'_>;
}

/// Error returned by [`HidTransport::check_version`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    /// The query itself failed.
    #[error("version query failed")]
    Ios(#[source] IosError),
    /// The interface answered with a different revision.
    #[error("unexpected interface version {found:#010x}")]
    Mismatch { found: u32 },
}

impl ProbeError {
    /// Raw code recorded for diagnostics.
    pub fn code(&self) -> i32 {
        match self {
            ProbeError::Ios(err) => err.code(),
            ProbeError::Mismatch { found } => *found as i32,
        }
    }
}

/// Copies `report` into an outbound buffer and returns the used prefix.
fn fill<'a>(buf: &'a mut [u8], report: &[u8]) -> &'a mut [u8] {
    let len = report.len().min(buf.len());
    buf[..len].copy_from_slice(&report[..len]);
    &mut buf[..len]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usb_id_packs_vendor_high() {
        assert_eq!(UsbId::new(0x057e, 0x0337).to_u32(), 0x057e_0337);
    }

    #[test]
    fn probe_error_codes() {
        assert_eq!(ProbeError::Ios(IosError::from_code(-6)).code(), -6);
        assert_eq!(ProbeError::Mismatch { found: 0x50001 }.code(), 0x50001);
    }
}
