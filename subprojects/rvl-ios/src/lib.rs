//! # rvl-ios
//!
//! Asynchronous access to the IOS coprocessor's resource manager interface.
//!
//! Drivers talk to IOS devices (`/dev/usb/hid`, ...) by opening a path and submitting ioctl or
//! ioctlv requests against the returned file descriptor. Every request is asynchronous: the
//! submission returns immediately and a completion callback later receives the signed result
//! of the operation together with the user [`Tag`] given at submission time. The callback may
//! run from interrupt context and preempt the submitting code.
//!
//! This crate models those primitives as capabilities so that the code driving them can be
//! exercised off-console:
//!
//! - [`Ios`]: open / ioctl / ioctlv / close submission.
//! - [`Cache`]: data cache flush before the coprocessor reads or writes a buffer.
//! - [`TimeBase`]: the free-running time base counter.
//!
//! The console implementation ([`Rvl`]) is only available with the `ffi` feature.
//!
//! ## References
//! - [WiiBrew: IOS](https://wiibrew.org/wiki/IOS)
//! - [WiiBrew: IPC (SDK)](https://wiibrew.org/wiki/IPC_(SDK))

#![cfg_attr(not(test), no_std)]

use core::ffi::CStr;

pub mod align;
pub mod buf;
mod fd;
pub mod request;
pub mod result;
pub mod time;

#[cfg(feature = "ffi")]
mod ffi;

#[cfg(feature = "ffi")]
#[doc(inline)]
pub use self::ffi::{IosCallback, Rvl};
#[doc(inline)]
pub use self::{
    buf::{IoBuf, IoVec},
    fd::{Fd, Tag},
    request::{Request, RequestKind, submit},
    result::IosError,
    time::TimeBase,
};

bitflags::bitflags! {
    /// Access mode of an IOS open request.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Mode: u32 {
        const READ = 1;
        const WRITE = 2;
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

/// Asynchronous IOS request submission.
///
/// Each method only queues the request. `Ok(())` means IOS accepted it and exactly one
/// completion carrying `tag` will follow; `Err` means nothing was queued and no completion will
/// be delivered.
///
/// # Safety
///
/// Every buffer handed to a submission (including buffers referenced from within a message or
/// an [`IoVec`] array) must stay valid, and must not be accessed by the CPU, until the
/// completion for that request has been delivered. Callers must flush those buffers with
/// [`Cache`] before submitting; [`submit`] does both.
pub trait Ios {
    /// Opens `path`. The completion result is the new descriptor or a negative error.
    ///
    /// # Safety
    ///
    /// See the [trait documentation](Ios#safety).
    unsafe fn open_async(&self, path: &'static CStr, mode: Mode, tag: Tag) -> Result<(), IosError>;

    /// Submits a single-buffer ioctl.
    ///
    /// # Safety
    ///
    /// See the [trait documentation](Ios#safety).
    unsafe fn ioctl_async(
        &self,
        fd: Fd,
        ioctl: u32,
        input: IoBuf,
        output: IoBuf,
        tag: Tag,
    ) -> Result<(), IosError>;

    /// Submits a scatter-gather ioctl. The first `input_count` vectors are read by IOS, the
    /// following `io_count` vectors are read and written.
    ///
    /// # Safety
    ///
    /// `vecs` must point to `input_count + io_count` vectors. See the
    /// [trait documentation](Ios#safety).
    unsafe fn ioctlv_async(
        &self,
        fd: Fd,
        ioctl: u32,
        input_count: u32,
        io_count: u32,
        vecs: *mut IoVec,
        tag: Tag,
    ) -> Result<(), IosError>;

    /// Closes `fd`. Pending requests on it complete with an error.
    fn close_async(&self, fd: Fd, tag: Tag) -> Result<(), IosError>;
}

/// Data cache maintenance for buffers shared with the coprocessor.
pub trait Cache {
    /// Writes back and invalidates the cache lines covering `len` bytes at `ptr`.
    fn flush_range(&self, ptr: *const u8, len: usize);

    /// Flushes the cache lines covering `buf`. Empty buffers are skipped.
    #[inline]
    fn flush(&self, buf: IoBuf) {
        if !buf.is_empty() {
            self.flush_range(buf.ptr(), align::round_up_to_line(buf.len()));
        }
    }
}
