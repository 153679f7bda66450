//! `/dev/usb/hid` v5 command set.
//!
//! Differences from v4:
//! - "get version" writes the version into a 0x20-byte output buffer and completes with 0.
//! - The device-change query completes with the number of [`DeviceEntry`] records written.
//! - Every device-change completion must be acknowledged with "attach finish" before the list
//!   is acted upon, and a newly attached device must be resumed and have its parameters read
//!   before it accepts transfers.
//! - Interrupt transfers are ioctlv requests: one input vector holding a 0x40-byte
//!   [`IntrMsg`], one in/out vector holding the data.

use rvl_ios::{
    IoBuf, IoVec, IosError, Request,
    align::{Aligned, DmaBuf},
};
use static_assertions::const_assert_eq;
use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout,
    big_endian::{U16, U32},
};

use crate::{
    DeviceId, HidTransport, ProbeError, Target, fill,
    proto::{IN_REPORT_SIZE, OUT_REPORT_SIZE, v5},
};

/// One attached device, as returned by the device-change query.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct DeviceEntry {
    pub device_id: U32,
    pub vid: U16,
    pub pid: U16,
    pub number: U16,
    pub interface: u8,
    pub alt_settings: u8,
}

const_assert_eq!(size_of::<DeviceEntry>(), 0xc);

impl DeviceEntry {
    const EMPTY: Self = Self {
        device_id: U32::ZERO,
        vid: U16::ZERO,
        pid: U16::ZERO,
        number: U16::ZERO,
        interface: 0,
        alt_settings: 0,
    };
}

/// Per-device command input (resume, get parameters).
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct DeviceCmd {
    pub device_id: U32,
    _reserved: [u8; 7],
    /// Resume flag for "suspend/resume", zero otherwise
    pub flag: u8,
    _reserved2: [u8; 0x14],
}

const_assert_eq!(size_of::<DeviceCmd>(), 0x20);

impl DeviceCmd {
    const EMPTY: Self = Self {
        device_id: U32::ZERO,
        _reserved: [0; 7],
        flag: 0,
        _reserved2: [0; 0x14],
    };

    fn set(&mut self, device: DeviceId, flag: u8) {
        *self = Self::EMPTY;
        self.device_id = U32::new(device.0);
        self.flag = flag;
    }
}

/// Interrupt transfer message.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct IntrMsg {
    /// Target device id
    pub device_id: U32,
    _reserved: U32,
    /// Address of the data buffer
    pub data: U32,
    /// Transfer length in bytes
    pub length: U16,
    _reserved2: [u8; 4],
    /// Endpoint address
    pub endpoint: u8,
    _reserved3: [u8; 0x2d],
}

const_assert_eq!(size_of::<IntrMsg>(), 0x40);

impl IntrMsg {
    const EMPTY: Self = Self {
        device_id: U32::ZERO,
        _reserved: U32::ZERO,
        data: U32::ZERO,
        length: U16::ZERO,
        _reserved2: [0; 4],
        endpoint: 0,
        _reserved3: [0; 0x2d],
    };
}

/// Message, vectors and data buffer of one kind of interrupt transfer.
struct Transfer<const N: usize> {
    msg: Aligned<IntrMsg>,
    vecs: Aligned<[IoVec; 2]>,
    data: DmaBuf<N>,
    len: usize,
}

impl<const N: usize> Transfer<N> {
    const fn new() -> Self {
        Self {
            msg: Aligned::new(IntrMsg::EMPTY),
            vecs: Aligned::new([IoVec::EMPTY; 2]),
            data: Aligned::new([0; N]),
            len: 0,
        }
    }

    fn request(&mut self, device: DeviceId, endpoint: u8) -> Request<'_> {
        let data = IoBuf::from_mut(&mut self.data[..self.len]);
        self.msg.device_id = U32::new(device.0);
        self.msg.data = U32::new(data.addr32());
        self.msg.length = U16::new(self.len as u16);
        self.msg.endpoint = endpoint;

        self.vecs[0] = IoVec::new(IoBuf::from_slice(self.msg.as_bytes()));
        self.vecs[1] = IoVec::new(data);
        Request::ioctlv(v5::INTR_MSG, 1, &mut self.vecs.0)
    }
}

/// The v5 command set.
pub struct HidV5 {
    version: DmaBuf<{ v5::VERSION_SIZE }>,
    devices: Aligned<[DeviceEntry; v5::MAX_DEVICES]>,
    resume: Aligned<DeviceCmd>,
    params_in: Aligned<DeviceCmd>,
    params_out: DmaBuf<{ v5::DEVICE_PARAMS_SIZE }>,
    init: Transfer<OUT_REPORT_SIZE>,
    poll: Transfer<IN_REPORT_SIZE>,
    rumble: Transfer<OUT_REPORT_SIZE>,
}

impl HidV5 {
    /// Creates the transport with zeroed buffers.
    pub const fn new() -> Self {
        Self {
            version: Aligned::new([0; v5::VERSION_SIZE]),
            devices: Aligned::new([DeviceEntry::EMPTY; v5::MAX_DEVICES]),
            resume: Aligned::new(DeviceCmd::EMPTY),
            params_in: Aligned::new(DeviceCmd::EMPTY),
            params_out: Aligned::new([0; v5::DEVICE_PARAMS_SIZE]),
            init: Transfer::new(),
            poll: Transfer::new(),
            rumble: Transfer::new(),
        }
    }
}

impl Default for HidV5 {
    fn default() -> Self {
        Self::new()
    }
}

impl HidTransport for HidV5 {
    fn get_version(&mut self) -> Request<'_> {
        self.version.fill(0);
        Request::ioctl(
            v5::GET_VERSION,
            IoBuf::EMPTY,
            IoBuf::from_mut(&mut self.version.0),
        )
    }

    fn check_version(&self, ret: i32) -> Result<(), ProbeError> {
        let ret = IosError::check(ret).map_err(ProbeError::Ios)?;
        let [a, b, c, d, ..] = self.version.0;
        let version = u32::from_be_bytes([a, b, c, d]);

        if ret == 0 && version == v5::VERSION {
            Ok(())
        } else {
            Err(ProbeError::Mismatch { found: version })
        }
    }

    fn get_device_change(&mut self) -> Request<'_> {
        let output = IoBuf::from_mut(self.devices.as_mut_bytes());
        Request::ioctl(v5::GET_DEVICE_CHANGE, IoBuf::EMPTY, output)
    }

    fn find_device(&self, ret: i32, target: &Target) -> Option<DeviceId> {
        let count = usize::try_from(ret).ok()?.min(v5::MAX_DEVICES);

        self.devices[..count]
            .iter()
            .find(|entry| entry.vid.get() == target.id.vid && entry.pid.get() == target.id.pid)
            .map(|entry| DeviceId(entry.device_id.get()))
    }

    fn attach_finish(&mut self) -> Option<Request<'_>> {
        Some(Request::ioctl(v5::ATTACH_FINISH, IoBuf::EMPTY, IoBuf::EMPTY))
    }

    fn resume(&mut self, device: DeviceId) -> Option<Request<'_>> {
        self.resume.set(device, 1);
        Some(Request::ioctl(
            v5::SUSPEND_RESUME,
            IoBuf::from_slice(self.resume.as_bytes()),
            IoBuf::EMPTY,
        ))
    }

    fn get_params(&mut self, device: DeviceId) -> Option<Request<'_>> {
        self.params_in.set(device, 0);
        Some(Request::ioctl(
            v5::GET_DEVICE_PARAMS,
            IoBuf::from_slice(self.params_in.as_bytes()),
            IoBuf::from_mut(&mut self.params_out.0),
        ))
    }

    fn send_init(&mut self, device: DeviceId, target: &Target, report: &[u8]) -> Request<'_> {
        self.init.len = fill(&mut self.init.data.0, report).len();
        self.init.request(device, target.endpoint_out)
    }

    fn send_poll(&mut self, device: DeviceId, target: &Target) -> Request<'_> {
        self.poll.len = target.report_len.min(IN_REPORT_SIZE);
        self.poll.request(device, target.endpoint_in)
    }

    fn poll_report(&self) -> &[u8] {
        &self.poll.data[..self.poll.len]
    }

    fn send_rumble(&mut self, device: DeviceId, target: &Target, report: &[u8]) -> Request<'_> {
        self.rumble.len = fill(&mut self.rumble.data.0, report).len();
        self.rumble.request(device, target.endpoint_out)
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

    fn entry(device_id: u32, vid: u16, pid: u16) -> DeviceEntry {
        DeviceEntry {
            device_id: U32::new(device_id),
            vid: U16::new(vid),
            pid: U16::new(pid),
            ..DeviceEntry::EMPTY
        }
    }

    #[test]
    fn version_is_read_from_output_buffer() {
        let mut hid = HidV5::new();
        let _ = hid.get_version();
        hid.version[..4].copy_from_slice(&0x0005_0001u32.to_be_bytes());

        assert_eq!(hid.check_version(0), Ok(()));
        assert_eq!(
            hid.check_version(-4),
            Err(ProbeError::Ios(IosError::from_code(-4)))
        );
    }

    #[test]
    fn stale_version_buffer_is_cleared() {
        let mut hid = HidV5::new();
        hid.version[..4].copy_from_slice(&0x0005_0001u32.to_be_bytes());
        let _ = hid.get_version();

        assert_eq!(hid.check_version(0), Err(ProbeError::Mismatch { found: 0 }));
    }

    #[test]
    fn find_device_only_scans_reported_entries() {
        let mut hid = HidV5::new();
        hid.devices[0] = entry(0x10, 0x046d, 0xc31c);
        hid.devices[1] = entry(0x20, 0x057e, 0x0337);
        hid.devices[2] = entry(0x30, 0x057e, 0x0337);

        assert_eq!(hid.find_device(1, &TARGET), None);
        assert_eq!(hid.find_device(3, &TARGET), Some(DeviceId(0x20)));
        assert_eq!(hid.find_device(-1, &TARGET), None);
    }

    #[test]
    fn resume_sets_flag_byte() {
        let mut hid = HidV5::new();
        let req = hid.resume(DeviceId(0x1234_5678)).unwrap();
        assert_eq!(req.ioctl, v5::SUSPEND_RESUME);

        let bytes = hid.resume.as_bytes();
        assert_eq!(bytes[..4], [0x12, 0x34, 0x56, 0x78]);
        assert_eq!(bytes[0xb], 1);
        assert_eq!(hid.params_in.flag, 0);
    }

    #[test]
    fn params_reads_into_its_own_buffer() {
        let mut hid = HidV5::new();
        let req = hid.get_params(DeviceId(7)).unwrap();
        let RequestKind::Ioctl { input, output } = req.kind else {
            panic!("expected ioctl");
        };
        assert_eq!(input.len(), 0x20);
        assert_eq!(output.len(), 0xc0);
    }

    #[test]
    fn poll_is_an_ioctlv_with_one_input() {
        let mut hid = HidV5::new();
        let req = hid.send_poll(DeviceId(0x20), &TARGET);
        assert_eq!(req.ioctl, v5::INTR_MSG);

        let RequestKind::Ioctlv { input_count, vecs } = req.kind else {
            panic!("expected ioctlv");
        };
        assert_eq!(input_count, 1);
        assert_eq!(vecs.len(), 2);
        assert_eq!(vecs[0].len, 0x40);
        assert_eq!(vecs[1].len, 37);
        let data = vecs[1].data;

        let bytes = hid.poll.msg.as_bytes();
        assert_eq!(bytes[..4], [0, 0, 0, 0x20]);
        assert_eq!(bytes[0xc..0xe], [0, 37]);
        assert_eq!(bytes[0x12], 0x81);
        assert_eq!(hid.poll.msg.data.get(), data as usize as u32);
    }
}
