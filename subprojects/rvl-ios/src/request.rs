//! Request descriptions and submission.
//!
//! Protocol code describes *what* to submit with a [`Request`] borrowing its own buffers;
//! [`submit`] flushes every buffer the coprocessor will touch and hands the request to an
//! [`Ios`] implementation.

use crate::{Cache, Fd, IoBuf, IoVec, Ios, IosError, Tag};

/// An ioctl or ioctlv request over caller-owned buffers.
#[derive(Debug)]
pub struct Request<'a> {
    /// Ioctl number.
    pub ioctl: u32,
    /// Buffers passed to IOS.
    pub kind: RequestKind<'a>,
    /// Buffer referenced by address from inside a message rather than passed directly.
    ///
    /// IOS does not translate such buffers, so they are flushed here.
    pub payload: IoBuf,
}

/// Buffer layout of a [`Request`].
#[derive(Debug)]
pub enum RequestKind<'a> {
    /// Single input and output buffer.
    Ioctl { input: IoBuf, output: IoBuf },
    /// Scatter-gather vectors: `input_count` input vectors followed by the in/out vectors.
    Ioctlv {
        input_count: u32,
        vecs: &'a mut [IoVec],
    },
}

impl<'a> Request<'a> {
    /// Builds an ioctl request.
    #[inline]
    pub fn ioctl(ioctl: u32, input: IoBuf, output: IoBuf) -> Self {
        Self {
            ioctl,
            kind: RequestKind::Ioctl { input, output },
            payload: IoBuf::EMPTY,
        }
    }

    /// Builds an ioctlv request.
    #[inline]
    pub fn ioctlv(ioctl: u32, input_count: u32, vecs: &'a mut [IoVec]) -> Self {
        Self {
            ioctl,
            kind: RequestKind::Ioctlv { input_count, vecs },
            payload: IoBuf::EMPTY,
        }
    }

    /// Attaches a buffer referenced from inside the message.
    #[inline]
    pub fn with_payload(mut self, payload: IoBuf) -> Self {
        self.payload = payload;
        self
    }

    /// Flushes every buffer of the request out of the data cache.
    pub fn flush<C: Cache + ?Sized>(&self, cache: &C) {
        cache.flush(self.payload);
        match &self.kind {
            RequestKind::Ioctl { input, output } => {
                cache.flush(*input);
                cache.flush(*output);
            }
            RequestKind::Ioctlv { vecs, .. } => {
                for vec in vecs.iter() {
                    cache.flush(vec.buf());
                }
                cache.flush(IoBuf::from_slice(vecs_as_bytes(vecs)));
            }
        }
    }
}

fn vecs_as_bytes(vecs: &[IoVec]) -> &[u8] {
    // SAFETY: `IoVec` is plain old data; viewing it as bytes is always valid.
    unsafe { core::slice::from_raw_parts(vecs.as_ptr().cast::<u8>(), size_of_val(vecs)) }
}

/// Flushes and submits `req` on `fd`.
///
/// # Safety
///
/// The buffers described by `req` must stay valid and untouched by the CPU until the completion
/// carrying `tag` has been delivered (see [`Ios`](crate::Ios#safety)).
pub unsafe fn submit<P>(platform: &P, fd: Fd, req: Request<'_>, tag: Tag) -> Result<(), IosError>
where
    P: Ios + Cache + ?Sized,
{
    req.flush(platform);

    match req.kind {
        RequestKind::Ioctl { input, output } => {
            // SAFETY: Buffer lifetime is upheld by the caller.
            unsafe { platform.ioctl_async(fd, req.ioctl, input, output, tag) }
        }
        RequestKind::Ioctlv { input_count, vecs } => {
            let io_count = vecs.len() as u32 - input_count;
            // SAFETY: `vecs` holds `input_count + io_count` vectors; buffer lifetime is upheld
            // by the caller.
            unsafe {
                platform.ioctlv_async(fd, req.ioctl, input_count, io_count, vecs.as_mut_ptr(), tag)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::Mode;

    #[derive(Default)]
    struct Recorder {
        flushed: RefCell<Vec<(usize, usize)>>,
        submitted: RefCell<Vec<(u32, u32, u32)>>,
    }

    impl Cache for Recorder {
        fn flush_range(&self, ptr: *const u8, len: usize) {
            self.flushed.borrow_mut().push((ptr as usize, len));
        }
    }

    impl Ios for Recorder {
        unsafe fn open_async(
            &self,
            _: &'static core::ffi::CStr,
            _: Mode,
            _: Tag,
        ) -> Result<(), IosError> {
            Ok(())
        }

        unsafe fn ioctl_async(
            &self,
            _: Fd,
            ioctl: u32,
            _: IoBuf,
            _: IoBuf,
            tag: Tag,
        ) -> Result<(), IosError> {
            self.submitted.borrow_mut().push((ioctl, 0, tag.0));
            Ok(())
        }

        unsafe fn ioctlv_async(
            &self,
            _: Fd,
            ioctl: u32,
            input_count: u32,
            io_count: u32,
            _: *mut IoVec,
            tag: Tag,
        ) -> Result<(), IosError> {
            self.submitted.borrow_mut().push((ioctl, input_count * 10 + io_count, tag.0));
            Ok(())
        }

        fn close_async(&self, _: Fd, _: Tag) -> Result<(), IosError> {
            Ok(())
        }
    }

    #[test]
    fn ioctl_flushes_whole_lines_of_every_buffer() {
        let rec = Recorder::default();
        let input = crate::align::DmaBuf::<0x20>::new([0; 0x20]);
        let mut output = crate::align::DmaBuf::<0x25>::new([0; 0x25]);
        let req = Request::ioctl(6, IoBuf::from_slice(&*input), IoBuf::from_mut(&mut *output));

        unsafe { submit(&rec, Fd::from_raw(3).unwrap(), req, Tag(9)) }.unwrap();

        let flushed = rec.flushed.borrow();
        assert_eq!(flushed.len(), 2);
        assert_eq!(flushed[0], (input.as_ptr() as usize, 0x20));
        assert_eq!(flushed[1], (output.as_ptr() as usize, 0x40));
        assert_eq!(*rec.submitted.borrow(), [(6, 0, 9)]);
    }

    #[test]
    fn ioctlv_counts_and_flushes_vectors() {
        let rec = Recorder::default();
        let msg = crate::align::DmaBuf::<0x40>::new([0; 0x40]);
        let mut data = crate::align::DmaBuf::<0x20>::new([0; 0x20]);
        let mut vecs = [
            IoVec::new(IoBuf::from_slice(&*msg)),
            IoVec::new(IoBuf::from_mut(&mut *data)),
        ];
        let req = Request::ioctlv(19, 1, &mut vecs);

        unsafe { submit(&rec, Fd::from_raw(3).unwrap(), req, Tag(1)) }.unwrap();

        // Two data buffers plus the vector array itself.
        assert_eq!(rec.flushed.borrow().len(), 3);
        assert_eq!(*rec.submitted.borrow(), [(19, 11, 1)]);
    }
}
