//! Console implementation of the IOS capabilities.
//!
//! Binds to the SDK's IPC, cache and OS functions, which are provided by the host executable.

use core::ffi::{CStr, c_char, c_void};

use crate::{Cache, Fd, IoBuf, IoVec, Ios, IosError, Mode, Tag, TimeBase};

/// IPC completion callback.
///
/// `typedef s32 (*ipccallback)(s32 result, void *usrdata);`
pub type IosCallback = unsafe extern "C" fn(result: i32, usrdata: *mut c_void) -> i32;

unsafe extern "C" {
    fn IOS_OpenAsync(path: *const c_char, mode: u32, cb: IosCallback, usrdata: *mut c_void) -> i32;
    fn IOS_IoctlAsync(
        fd: i32,
        ioctl: i32,
        buffer_in: *mut c_void,
        len_in: i32,
        buffer_io: *mut c_void,
        len_io: i32,
        cb: IosCallback,
        usrdata: *mut c_void,
    ) -> i32;
    fn IOS_IoctlvAsync(
        fd: i32,
        ioctl: i32,
        cnt_in: i32,
        cnt_io: i32,
        argv: *mut IoVec,
        cb: IosCallback,
        usrdata: *mut c_void,
    ) -> i32;
    fn IOS_CloseAsync(fd: i32, cb: IosCallback, usrdata: *mut c_void) -> i32;
    fn DCFlushRange(start: *mut c_void, len: u32);
    fn OSGetTime() -> i64;
}

/// The console: IPC through the SDK, with every completion routed to one callback.
#[derive(Clone, Copy)]
pub struct Rvl {
    callback: IosCallback,
}

impl Rvl {
    /// Creates the platform; every completion will be delivered to `callback`.
    pub const fn new(callback: IosCallback) -> Self {
        Self { callback }
    }
}

#[inline]
fn usrdata(tag: Tag) -> *mut c_void {
    tag.to_raw() as usize as *mut c_void
}

#[inline]
fn status(ret: i32) -> Result<(), IosError> {
    IosError::check(ret).map(|_| ())
}

impl Ios for Rvl {
    unsafe fn open_async(&self, path: &'static CStr, mode: Mode, tag: Tag) -> Result<(), IosError> {
        // SAFETY: `path` is a static, nul-terminated string.
        status(unsafe { IOS_OpenAsync(path.as_ptr(), mode.bits(), self.callback, usrdata(tag)) })
    }

    unsafe fn ioctl_async(
        &self,
        fd: Fd,
        ioctl: u32,
        input: IoBuf,
        output: IoBuf,
        tag: Tag,
    ) -> Result<(), IosError> {
        // SAFETY: Buffer lifetime is upheld by the caller.
        status(unsafe {
            IOS_IoctlAsync(
                fd.to_raw(),
                ioctl as i32,
                input.ptr().cast(),
                input.len() as i32,
                output.ptr().cast(),
                output.len() as i32,
                self.callback,
                usrdata(tag),
            )
        })
    }

    unsafe fn ioctlv_async(
        &self,
        fd: Fd,
        ioctl: u32,
        input_count: u32,
        io_count: u32,
        vecs: *mut IoVec,
        tag: Tag,
    ) -> Result<(), IosError> {
        // SAFETY: Vector count and buffer lifetime are upheld by the caller.
        status(unsafe {
            IOS_IoctlvAsync(
                fd.to_raw(),
                ioctl as i32,
                input_count as i32,
                io_count as i32,
                vecs,
                self.callback,
                usrdata(tag),
            )
        })
    }

    fn close_async(&self, fd: Fd, tag: Tag) -> Result<(), IosError> {
        // SAFETY: Closing takes no buffers.
        status(unsafe { IOS_CloseAsync(fd.to_raw(), self.callback, usrdata(tag)) })
    }
}

impl Cache for Rvl {
    #[inline]
    fn flush_range(&self, ptr: *const u8, len: usize) {
        // SAFETY: Flushing only writes back cache lines; it never invalidates unflushed data.
        unsafe { DCFlushRange(ptr.cast_mut().cast(), len as u32) }
    }
}

impl TimeBase for Rvl {
    #[inline]
    fn now(&self) -> u64 {
        // SAFETY: Reads the time base register.
        unsafe { OSGetTime() as u64 }
    }
}
