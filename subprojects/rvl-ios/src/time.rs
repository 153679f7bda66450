//! Time base counter.
//!
//! The Broadway CPU's time base register increments at a quarter of the bus clock. It is
//! free-running and monotonic, which makes it suitable for timeouts measured in interrupt
//! context.
//!
//! ## References
//! - <https://wiibrew.org/wiki/Hardware/Broadway>

/// Bus clock frequency, in Hz.
pub const BUS_CLOCK_HZ: u64 = 243_000_000;

/// Time base frequency, in Hz.
pub const TIMER_CLOCK_HZ: u64 = BUS_CLOCK_HZ / 4;

/// Converts milliseconds to time base ticks.
#[inline]
pub const fn millis_to_ticks(ms: u64) -> u64 {
    ms * (TIMER_CLOCK_HZ / 1000)
}

/// Read access to the time base.
pub trait TimeBase {
    /// Returns the current time base value, in ticks.
    fn now(&self) -> u64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_convert_to_ticks() {
        assert_eq!(millis_to_ticks(1), 60_750);
        assert_eq!(millis_to_ticks(1500), 91_125_000);
    }
}
