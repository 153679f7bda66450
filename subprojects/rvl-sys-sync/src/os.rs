//! Console interrupt masking.
//!
//! ## References
//! - <https://wiibrew.org/wiki/Hardware/Broadway#MSR>

use core::ffi::c_int;

use crate::Interrupts;

unsafe extern "C" {
    /// `BOOL OSDisableInterrupts(void);`
    fn OSDisableInterrupts() -> c_int;

    /// `BOOL OSRestoreInterrupts(BOOL level);`
    fn OSRestoreInterrupts(level: c_int) -> c_int;
}

/// Interrupt masking through the OS library (`MSR[EE]`).
#[derive(Debug, Clone, Copy, Default)]
pub struct OsInterrupts;

impl Interrupts for OsInterrupts {
    type Level = c_int;

    #[inline]
    fn disable() -> c_int {
        // SAFETY: The OS call only clears MSR[EE] and returns its previous value.
        unsafe { OSDisableInterrupts() }
    }

    #[inline]
    fn restore(level: c_int) {
        // SAFETY: `level` was produced by `OSDisableInterrupts`.
        unsafe {
            OSRestoreInterrupts(level);
        }
    }
}
