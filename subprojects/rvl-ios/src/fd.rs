//! Descriptor and completion tag types.

/// An open IOS file descriptor.
///
/// Descriptors are non-negative; negative open results are errors (see
/// [`IosError`](crate::IosError)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Fd(i32);

impl Fd {
    /// Converts an open result to a descriptor, `None` if it is an error code.
    #[inline]
    pub const fn from_raw(raw: i32) -> Option<Self> {
        if raw >= 0 { Some(Self(raw)) } else { None }
    }

    /// Returns the raw descriptor.
    #[inline]
    pub const fn to_raw(self) -> i32 {
        self.0
    }
}

/// User value passed along with an asynchronous request and handed back to its completion.
///
/// IOS stores it as the callback's `usrdata` pointer; only its 32-bit value is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Tag(pub u32);

impl Tag {
    /// Returns the raw tag value.
    #[inline]
    pub const fn to_raw(self) -> u32 {
        self.0
    }
}
