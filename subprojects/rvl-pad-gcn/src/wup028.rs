//! WUP-028 adapter constants.
//!
//! ## References
//! - <https://gbatemp.net/threads/wii-u-gamecube-adapter-reverse-engineering-cont.388169/>

use rvl_usb_hid::{Target, UsbId};

/// Nintendo's USB vendor id.
pub const VENDOR_ID: u16 = 0x057e;

/// The adapter's USB product id.
pub const PRODUCT_ID: u16 = 0x0337;

/// Size of the adapter's device record in the v4 device list.
pub const DESCRIPTOR_SIZE: u32 = 0x44;

/// Interrupt IN endpoint.
pub const ENDPOINT_IN: u8 = 0x81;

/// Interrupt OUT endpoint.
pub const ENDPOINT_OUT: u8 = 0x02;

/// Length of an input report: type byte plus four pad records.
pub const REPORT_LEN: usize = 1 + 4 * SLOT_LEN;

/// Length of one pad record inside an input report.
pub const SLOT_LEN: usize = 9;

/// First byte of an input report.
pub const REPORT_INPUT: u8 = 0x21;

/// Command starting the adapter's input report stream.
pub const CMD_INIT: u8 = 0x13;

/// Command setting the four rumble motors, followed by one byte per port.
pub const CMD_RUMBLE: u8 = 0x11;

/// Length of a rumble report.
pub const RUMBLE_LEN: usize = 5;

/// The adapter as seen by the HID transport.
pub const TARGET: Target = Target {
    id: UsbId::new(VENDOR_ID, PRODUCT_ID),
    descriptor_size: DESCRIPTOR_SIZE,
    endpoint_in: ENDPOINT_IN,
    endpoint_out: ENDPOINT_OUT,
    report_len: REPORT_LEN,
};

/// Builds a rumble report from per-port intensities.
pub const fn rumble_report(ports: [u8; 4]) -> [u8; RUMBLE_LEN] {
    [CMD_RUMBLE, ports[0], ports[1], ports[2], ports[3]]
}
