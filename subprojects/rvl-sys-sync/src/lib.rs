//! # rvl-sys-sync
//!
//! Interrupt-masking synchronization primitives.
//!
//! The console runs a single CPU core. Asynchronous IOS completions are delivered from the IPC
//! interrupt path and may preempt any code running on the main thread. Mutual exclusion between
//! the two is therefore obtained by masking external interrupts for the duration of a (very
//! short) critical section rather than with a sleeping lock.
//!
//! The masking operations themselves are a capability ([`Interrupts`]). The console
//! implementation, [`OsInterrupts`], is only available with the `ffi` feature.

#![cfg_attr(not(test), no_std)]

mod irq_mutex;

#[cfg(feature = "ffi")]
mod os;

#[doc(inline)]
pub use self::irq_mutex::{IrqMutex, IrqMutexGuard};
#[cfg(feature = "ffi")]
#[doc(inline)]
pub use self::os::OsInterrupts;

/// Capability to mask and unmask external interrupts.
///
/// `disable` returns the previous mask level so that critical sections can nest: every
/// `restore` puts back exactly the level observed by the matching `disable`.
pub trait Interrupts {
    /// Saved interrupt mask level.
    type Level: Copy;

    /// Masks interrupts and returns the previous level.
    fn disable() -> Self::Level;

    /// Restores a level previously returned by [`Interrupts::disable`].
    fn restore(level: Self::Level);
}
