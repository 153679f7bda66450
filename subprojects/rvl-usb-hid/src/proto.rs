//! `/dev/usb/hid` protocol constants.

use core::ffi::CStr;

/// Path of the HID resource manager.
pub const PATH: &CStr = c"/dev/usb/hid";

/// v4 interface ioctl numbers and sizes.
pub mod v4 {
    pub const VERSION: u32 = 0x0004_0001;

    pub const GET_DEVICE_CHANGE: u32 = 0;
    pub const SET_SUSPEND: u32 = 1;
    pub const CTRL_MSG: u32 = 2;
    pub const INTR_MSG_IN: u32 = 3;
    pub const INTR_MSG_OUT: u32 = 4;
    pub const GET_VERSION: u32 = 6;

    /// Size of the device-change output buffer, in bytes.
    pub const DEVICES_SIZE: usize = 0x600;
}

/// v5 interface ioctl numbers and sizes.
pub mod v5 {
    pub const VERSION: u32 = 0x0005_0001;

    pub const GET_VERSION: u32 = 0;
    pub const GET_DEVICE_CHANGE: u32 = 1;
    pub const SHUTDOWN: u32 = 2;
    pub const GET_DEVICE_PARAMS: u32 = 3;
    pub const ATTACH_FINISH: u32 = 6;
    pub const SET_ALTERNATE: u32 = 7;
    pub const SUSPEND_RESUME: u32 = 16;
    pub const CANCEL_ENDPOINT: u32 = 17;
    pub const CTRL_MSG: u32 = 18;
    pub const INTR_MSG: u32 = 19;

    /// Maximum number of entries in a device-change answer.
    pub const MAX_DEVICES: usize = 32;
    /// Size of the "get version" output buffer.
    pub const VERSION_SIZE: usize = 0x20;
    /// Size of the "get device parameters" output buffer.
    pub const DEVICE_PARAMS_SIZE: usize = 0xc0;
}

/// Size of the outbound report buffers (init, rumble).
pub const OUT_REPORT_SIZE: usize = 0x20;

/// Size of the inbound report buffer.
pub const IN_REPORT_SIZE: usize = 0x40;
