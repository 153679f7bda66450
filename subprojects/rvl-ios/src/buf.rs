//! Buffer descriptors passed to IOS.

use core::ptr;

/// A raw (pointer, length) descriptor of a buffer handed to IOS.
///
/// `IoBuf` does not borrow the memory it describes: IOS requests outlive the Rust borrow used to
/// build them. Keeping the memory alive until the completion is the submitter's obligation (see
/// [`Ios`](crate::Ios#safety)).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoBuf {
    ptr: *mut u8,
    len: usize,
}

// SAFETY: IoBuf is a plain address/length pair. The CPU never dereferences it except through
// `as_mut_slice`, whose caller guarantees exclusive access.
unsafe impl Send for IoBuf {}

impl IoBuf {
    /// Descriptor of no buffer (null pointer, zero length).
    pub const EMPTY: Self = Self {
        ptr: ptr::null_mut(),
        len: 0,
    };

    /// Describes a buffer that IOS only reads.
    #[inline]
    pub fn from_slice(buf: &[u8]) -> Self {
        if buf.is_empty() {
            return Self::EMPTY;
        }
        Self {
            ptr: buf.as_ptr().cast_mut(),
            len: buf.len(),
        }
    }

    /// Describes a buffer that IOS may write.
    #[inline]
    pub fn from_mut(buf: &mut [u8]) -> Self {
        if buf.is_empty() {
            return Self::EMPTY;
        }
        Self {
            ptr: buf.as_mut_ptr(),
            len: buf.len(),
        }
    }

    /// Start of the buffer, null for [`IoBuf::EMPTY`].
    #[inline]
    pub fn ptr(&self) -> *mut u8 {
        self.ptr
    }

    /// Length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the descriptor covers no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Address of the buffer as seen by IOS in a 32-bit message field.
    #[inline]
    pub fn addr32(&self) -> u32 {
        self.ptr as usize as u32
    }

    /// Reconstructs the described memory as a mutable slice.
    ///
    /// # Safety
    ///
    /// The memory must still be alive and not otherwise borrowed.
    pub unsafe fn as_mut_slice<'a>(&self) -> &'a mut [u8] {
        if self.is_empty() {
            return &mut [];
        }
        // SAFETY: Upheld by the caller.
        unsafe { core::slice::from_raw_parts_mut(self.ptr, self.len) }
    }
}

/// One element of an ioctlv vector array, in the layout IOS expects.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct IoVec {
    /// Start of the buffer.
    pub data: *mut u8,
    /// Length in bytes.
    pub len: u32,
}

// SAFETY: IoVec is an address/length pair read by IOS; the CPU never dereferences it.
unsafe impl Send for IoVec {}

impl IoVec {
    /// An empty vector.
    pub const EMPTY: Self = Self {
        data: ptr::null_mut(),
        len: 0,
    };

    /// Builds a vector from a descriptor.
    #[inline]
    pub fn new(buf: IoBuf) -> Self {
        Self {
            data: buf.ptr(),
            len: buf.len() as u32,
        }
    }

    /// Descriptor of the buffer this vector points at.
    #[inline]
    pub fn buf(&self) -> IoBuf {
        if self.data.is_null() || self.len == 0 {
            return IoBuf::EMPTY;
        }
        IoBuf {
            ptr: self.data,
            len: self.len as usize,
        }
    }
}

impl Default for IoVec {
    fn default() -> Self {
        Self::EMPTY
    }
}
