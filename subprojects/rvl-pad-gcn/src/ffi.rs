//! Pad driver FFI
//!
//! The host module forwards its `PADInit`, `PADRead` and `PADControlMotor` hooks here.

use core::ffi::c_void;

use rvl_ios::{Rvl, Tag};
use rvl_sys_sync::OsInterrupts;

use crate::{Driver, MotorCommand, PAD_COUNT, PadStatus, Platform};

/// `PAD_CHAN0_BIT`; port `n` is `PAD_CHAN0_BIT >> n`.
const PAD_CHAN0_BIT: u32 = 0x8000_0000;

impl Platform for Rvl {
    type Interrupts = OsInterrupts;
}

static DRIVER: Driver<Rvl> = Driver::new(Rvl::new(on_ios_complete));

/// IPC completion callback for every request the driver submits.
unsafe extern "C" fn on_ios_complete(result: i32, usrdata: *mut c_void) -> i32 {
    DRIVER.on_completion(Tag(usrdata as usize as u32), result);
    0
}

/// Starts the driver.
///
/// Corresponds to `PADInit()`.
#[unsafe(no_mangle)]
pub extern "C" fn gcn_pad_init() {
    DRIVER.initialize();
}

/// Copies the state of the four ports into `status` and returns the `PAD_CHANn_BIT` mask of
/// connected ports.
///
/// Corresponds to `PADRead()`.
///
/// # Safety
///
/// `status` must be null or point to four writable `PADStatus` records.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn gcn_pad_read(status: *mut PadStatus) -> u32 {
    let pads = DRIVER.read();

    if !status.is_null() {
        // SAFETY: The caller guarantees `status` points to `PAD_COUNT` records.
        unsafe { core::ptr::copy_nonoverlapping(pads.as_ptr(), status, PAD_COUNT) };
    }

    pads.iter()
        .enumerate()
        .filter(|(_, pad)| pad.is_connected())
        .fold(0, |mask, (chan, _)| mask | PAD_CHAN0_BIT >> chan)
}

/// Starts or stops the rumble motor of port `chan`.
///
/// Corresponds to `PADControlMotor()`.
#[unsafe(no_mangle)]
pub extern "C" fn gcn_pad_control_motor(chan: i32, cmd: u32) {
    let Ok(slot) = usize::try_from(chan) else {
        return;
    };
    DRIVER.control_motor(slot, MotorCommand::from_raw(cmd).intensity());
}
