//! Cache-line alignment utilities for buffers shared with IOS.
//!
//! IOS reads and writes main memory directly, bypassing the CPU data cache. Every buffer it
//! touches must start on a cache line and span whole cache lines, otherwise flushing it would
//! also write back (or discard) unrelated neighbouring data.

use core::ops::{Deref, DerefMut};

/// Data cache line size (32 bytes).
pub const CACHE_LINE: usize = 0x20;

/// Cache line mask for alignment operations.
const LINE_MASK: usize = CACHE_LINE - 1;

/// Checks if a size is a multiple of [`CACHE_LINE`].
#[inline]
pub const fn is_line_aligned(size: usize) -> bool {
    size & LINE_MASK == 0
}

/// Rounds up a size to the next cache line boundary.
///
/// If the size is already line-aligned, it returns the same value.
#[inline]
pub const fn round_up_to_line(size: usize) -> usize {
    (size + LINE_MASK) & !LINE_MASK
}

/// A value placed on its own cache line(s).
///
/// The alignment also rounds the size of `T` up to a multiple of [`CACHE_LINE`], so flushing an
/// `Aligned<T>` never touches a neighbour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C, align(32))]
pub struct Aligned<T>(pub T);

static_assertions::const_assert_eq!(align_of::<Aligned<u8>>(), CACHE_LINE);

impl<T> Aligned<T> {
    /// Wraps `value`.
    #[inline]
    pub const fn new(value: T) -> Self {
        Self(value)
    }
}

impl<T> Deref for Aligned<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Aligned<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

/// A cache-line aligned byte buffer.
pub type DmaBuf<const N: usize> = Aligned<[u8; N]>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_up_covers_partial_lines() {
        assert_eq!(round_up_to_line(0), 0);
        assert_eq!(round_up_to_line(1), 0x20);
        assert_eq!(round_up_to_line(0x25), 0x40);
        assert_eq!(round_up_to_line(0x40), 0x40);
        assert!(is_line_aligned(0x180));
        assert!(!is_line_aligned(0x25));
    }

    #[test]
    fn aligned_buffers_span_whole_lines() {
        assert_eq!(size_of::<DmaBuf<5>>(), CACHE_LINE);
        assert_eq!(size_of::<DmaBuf<0x25>>(), 0x40);

        let buf = DmaBuf::<5>::new([0; 5]);
        assert_eq!(buf.as_ptr() as usize % CACHE_LINE, 0);
    }
}
