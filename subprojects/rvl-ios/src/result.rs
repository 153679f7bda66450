//! Result codes returned by IOS.
//!
//! Every IOS request completes with a signed 32-bit value. Non-negative values are successes
//! whose meaning depends on the request (a descriptor, a byte count, a version, ...). Negative
//! values are errors.
//!
//! # References
//! - [WiiBrew: IOS error codes](https://wiibrew.org/wiki/Error_codes#IOS_errors)

/// Raw signed result of an IOS request.
pub type IosResult = i32;

/// Permission denied.
pub const EACCES: i32 = -1;
/// Already exists.
pub const EEXIST: i32 = -2;
/// Invalid argument.
pub const EINVAL: i32 = -4;
/// No such file or device.
pub const ENOENT: i32 = -6;
/// The request queue is full.
pub const EQUEUEFULL: i32 = -8;
/// Out of memory.
pub const ENOMEM: i32 = -22;

/// A negative IOS result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[error("IOS error {0}")]
pub struct IosError(i32);

impl IosError {
    /// Creates an error from a raw result code.
    ///
    /// Non-negative codes are not errors; they are mapped to [`EINVAL`].
    #[inline]
    pub const fn from_code(code: i32) -> Self {
        if code < 0 { Self(code) } else { Self(EINVAL) }
    }

    /// Returns the raw (negative) result code.
    #[inline]
    pub const fn code(self) -> i32 {
        self.0
    }

    /// Splits a raw result into its success value or error.
    #[inline]
    pub const fn check(ret: IosResult) -> Result<u32, IosError> {
        if ret >= 0 {
            Ok(ret as u32)
        } else {
            Err(IosError(ret))
        }
    }
}
