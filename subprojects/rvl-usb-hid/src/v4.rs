//! `/dev/usb/hid` v4 command set.
//!
//! ## Device list
//!
//! The device-change query fills a 0x600-byte buffer with variable-size records of big-endian
//! words:
//!
//! ```text
//! Word  Field
//! ──────────────────────────────
//! 0     record size, in bytes
//! 1     device id
//! 2..3  (unused here)
//! 4     vendor id << 16 | product id
//! ...   rest of the device descriptor
//! ```
//!
//! A record whose size is zero, not word-aligned or not smaller than the buffer ends the list.
//!
//! ## Interrupt transfers
//!
//! Interrupt IN/OUT are ioctls whose only input is a 0x20-byte [`IntrMsg`] pointing at the data
//! buffer.

use rvl_ios::{
    IoBuf, IosError, Request,
    align::{Aligned, DmaBuf},
};
use static_assertions::const_assert_eq;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, big_endian::U32};

use crate::{
    DeviceId, HidTransport, ProbeError, Target, fill,
    proto::{IN_REPORT_SIZE, OUT_REPORT_SIZE, v4},
};

const DEVICE_WORDS: usize = v4::DEVICES_SIZE / 4;

/// Interrupt transfer message.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct IntrMsg {
    _padding: [u8; 16],
    /// Target device id
    pub device: U32,
    /// Endpoint address
    pub endpoint: U32,
    /// Transfer length in bytes
    pub length: U32,
    /// Address of the data buffer
    pub data: U32,
}

const_assert_eq!(size_of::<IntrMsg>(), 0x20);

impl IntrMsg {
    const EMPTY: Self = Self {
        _padding: [0; 16],
        device: U32::ZERO,
        endpoint: U32::ZERO,
        length: U32::ZERO,
        data: U32::ZERO,
    };
}

/// Message and data buffer of one kind of interrupt transfer.
struct Transfer<const N: usize> {
    msg: Aligned<IntrMsg>,
    data: DmaBuf<N>,
    len: usize,
}

impl<const N: usize> Transfer<N> {
    const fn new() -> Self {
        Self {
            msg: Aligned::new(IntrMsg::EMPTY),
            data: Aligned::new([0; N]),
            len: 0,
        }
    }

    fn request(&mut self, ioctl: u32, device: DeviceId, endpoint: u8) -> Request<'_> {
        let data = IoBuf::from_mut(&mut self.data[..self.len]);
        self.msg.device = U32::new(device.0);
        self.msg.endpoint = U32::new(endpoint as u32);
        self.msg.length = U32::new(self.len as u32);
        self.msg.data = U32::new(data.addr32());

        Request::ioctl(ioctl, IoBuf::from_slice(self.msg.as_bytes()), IoBuf::EMPTY)
            .with_payload(data)
    }
}

/// The v4 command set.
pub struct HidV4 {
    devices: Aligned<[U32; DEVICE_WORDS]>,
    init: Transfer<OUT_REPORT_SIZE>,
    poll: Transfer<IN_REPORT_SIZE>,
    rumble: Transfer<OUT_REPORT_SIZE>,
}

impl HidV4 {
    /// Creates the transport with zeroed buffers.
    pub const fn new() -> Self {
        Self {
            devices: Aligned::new([U32::ZERO; DEVICE_WORDS]),
            init: Transfer::new(),
            poll: Transfer::new(),
            rumble: Transfer::new(),
        }
    }
}

impl Default for HidV4 {
    fn default() -> Self {
        Self::new()
    }
}

impl HidTransport for HidV4 {
    fn get_version(&mut self) -> Request<'_> {
        // The version is the completion result itself.
        Request::ioctl(v4::GET_VERSION, IoBuf::EMPTY, IoBuf::EMPTY)
    }

    fn check_version(&self, ret: i32) -> Result<(), ProbeError> {
        let version = IosError::check(ret).map_err(ProbeError::Ios)?;
        if version == v4::VERSION {
            Ok(())
        } else {
            Err(ProbeError::Mismatch { found: version })
        }
    }

    fn get_device_change(&mut self) -> Request<'_> {
        let output = IoBuf::from_mut(self.devices.as_mut_bytes());
        Request::ioctl(v4::GET_DEVICE_CHANGE, IoBuf::EMPTY, output)
    }

    fn find_device(&self, _ret: i32, target: &Target) -> Option<DeviceId> {
        let words = &self.devices.0;
        let id = target.id.to_u32();

        let mut i = 0;
        while i < words.len() {
            let size = words[i].get() as usize;
            if size == 0 || size % 4 != 0 || size >= v4::DEVICES_SIZE {
                break;
            }

            if size == target.descriptor_size as usize
                && i + 4 < words.len()
                && words[i + 4].get() == id
            {
                return Some(DeviceId(words[i + 1].get()));
            }

            i += size / 4;
        }

        None
    }

    fn send_init(&mut self, device: DeviceId, target: &Target, report: &[u8]) -> Request<'_> {
        self.init.len = fill(&mut self.init.data.0, report).len();
        self.init.request(v4::INTR_MSG_OUT, device, target.endpoint_out)
    }

    fn send_poll(&mut self, device: DeviceId, target: &Target) -> Request<'_> {
        self.poll.len = target.report_len.min(IN_REPORT_SIZE);
        self.poll.request(v4::INTR_MSG_IN, device, target.endpoint_in)
    }

    fn poll_report(&self) -> &[u8] {
        &self.poll.data[..self.poll.len]
    }

    fn send_rumble(&mut self, device: DeviceId, target: &Target, report: &[u8]) -> Request<'_> {
        self.rumble.len = fill(&mut self.rumble.data.0, report).len();
        self.rumble.request(v4::INTR_MSG_OUT, device, target.endpoint_out)
    }
}

#[cfg(test)]
mod tests {
    use rvl_ios::RequestKind;

    use super::*;
    use crate::UsbId;

    const TARGET: Target = Target {
        id: UsbId::new(0x057e, 0x0337),
        descriptor_size: 0x44,
        endpoint_in: 0x81,
        endpoint_out: 0x02,
        report_len: 37,
    };

    fn write_record(hid: &mut HidV4, at: usize, size: u32, device: u32, id: u32) {
        hid.devices[at] = U32::new(size);
        hid.devices[at + 1] = U32::new(device);
        hid.devices[at + 4] = U32::new(id);
    }

    #[test]
    fn version_must_match_exactly() {
        let hid = HidV4::new();
        assert_eq!(hid.check_version(0x0004_0001), Ok(()));
        assert_eq!(
            hid.check_version(0),
            Err(ProbeError::Mismatch { found: 0 })
        );
        assert_eq!(
            hid.check_version(-6),
            Err(ProbeError::Ios(IosError::from_code(-6)))
        );
    }

    #[test]
    fn find_device_skips_other_records() {
        let mut hid = HidV4::new();
        // A keyboard with a larger descriptor, then the adapter.
        write_record(&mut hid, 0, 0x50, 0x100, 0x046d_c31c);
        write_record(&mut hid, 0x14, 0x44, 0x200, 0x057e_0337);
        hid.devices[0x14 + 0x11] = U32::new(0xffff_ffff);

        assert_eq!(hid.find_device(0, &TARGET), Some(DeviceId(0x200)));
    }

    #[test]
    fn find_device_requires_descriptor_size() {
        let mut hid = HidV4::new();
        write_record(&mut hid, 0, 0x48, 0x100, 0x057e_0337);
        hid.devices[0x12] = U32::new(0xffff_ffff);

        assert_eq!(hid.find_device(0, &TARGET), None);
    }

    #[test]
    fn find_device_first_match_wins() {
        let mut hid = HidV4::new();
        write_record(&mut hid, 0, 0x44, 0x111, 0x057e_0337);
        write_record(&mut hid, 0x11, 0x44, 0x222, 0x057e_0337);

        assert_eq!(hid.find_device(0, &TARGET), Some(DeviceId(0x111)));
    }

    #[test]
    fn find_device_stops_on_empty_record() {
        let hid = HidV4::new();
        assert_eq!(hid.find_device(0, &TARGET), None);
    }

    #[test]
    fn poll_message_points_at_payload() {
        let mut hid = HidV4::new();
        let req = hid.send_poll(DeviceId(0x200), &TARGET);

        assert_eq!(req.ioctl, v4::INTR_MSG_IN);
        assert_eq!(req.payload.len(), 37);
        let RequestKind::Ioctl { input, output } = req.kind else {
            panic!("expected ioctl");
        };
        assert_eq!(input.len(), 0x20);
        assert!(output.is_empty());
        let payload = req.payload;

        let msg = &hid.poll.msg;
        assert_eq!(msg.device.get(), 0x200);
        assert_eq!(msg.endpoint.get(), 0x81);
        assert_eq!(msg.length.get(), 37);
        assert_eq!(msg.data.get(), payload.addr32());
    }

    #[test]
    fn rumble_and_init_use_distinct_buffers() {
        let mut hid = HidV4::new();
        let init = hid.send_init(DeviceId(1), &TARGET, &[0x13]).payload;
        let rumble = hid.send_rumble(DeviceId(1), &TARGET, &[0x11, 1, 0, 0, 0]).payload;

        assert_ne!(init.ptr(), rumble.ptr());
        assert_eq!(init.len(), 1);
        assert_eq!(rumble.len(), 5);
        assert_eq!(hid.rumble.data[..5], [0x11, 1, 0, 0, 0]);
        assert_eq!(hid.init.msg.endpoint.get(), 0x02);
    }
}
