//! Host-facing pad data model.
//!
//! [`PadStatus`] has the exact layout of the host SDK's `PADStatus` record so that an array of
//! them can be copied straight into the caller's buffer.

use static_assertions::const_assert_eq;

use crate::report::Origin;

/// Number of controller ports on the adapter.
pub const PAD_COUNT: usize = 4;

bitflags::bitflags! {
    /// Digital buttons, in the host's bit assignment.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Buttons: u16 {
        const LEFT = 1 << 0;
        const RIGHT = 1 << 1;
        const DOWN = 1 << 2;
        const UP = 1 << 3;
        const Z = 1 << 4;
        const R = 1 << 5;
        const L = 1 << 6;
        const A = 1 << 8;
        const B = 1 << 9;
        const X = 1 << 10;
        const Y = 1 << 11;
        const START = 1 << 12;
    }
}

/// Per-slot error code stored in [`PadStatus::err`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum PadError {
    None = 0,
    /// Nothing usable is plugged into the slot.
    NoController = -1,
    NotReady = -2,
    Transfer = -3,
}

/// State of one controller slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct PadStatus {
    /// [`Buttons`] bits
    pub buttons: u16,
    pub stick_x: i8,
    pub stick_y: i8,
    pub substick_x: i8,
    pub substick_y: i8,
    pub trigger_l: u8,
    pub trigger_r: u8,
    /// Reserved, always zero
    pub analog_a: u8,
    /// Reserved, always zero
    pub analog_b: u8,
    /// [`PadError`] code
    pub err: i8,
    pub(crate) _pad: u8,
}

const_assert_eq!(size_of::<PadStatus>(), 12);

impl PadStatus {
    /// An empty slot.
    pub const DISCONNECTED: Self = Self::with_error(PadError::NoController);

    /// A connected controller at rest.
    pub const NEUTRAL: Self = Self::with_error(PadError::None);

    const fn with_error(err: PadError) -> Self {
        Self {
            buttons: 0,
            stick_x: 0,
            stick_y: 0,
            substick_x: 0,
            substick_y: 0,
            trigger_l: 0,
            trigger_r: 0,
            analog_a: 0,
            analog_b: 0,
            err: err as i8,
            _pad: 0,
        }
    }

    /// Typed view of [`PadStatus::buttons`].
    #[inline]
    pub fn buttons(&self) -> Buttons {
        Buttons::from_bits_retain(self.buttons)
    }

    /// Returns `true` if a controller is reported in this slot.
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.err == PadError::None as i8
    }
}

impl Default for PadStatus {
    fn default() -> Self {
        Self::DISCONNECTED
    }
}

/// Host motor command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MotorCommand {
    Stop = 0,
    Rumble = 1,
    StopHard = 2,
}

impl MotorCommand {
    /// Parses a raw host command. Unknown values stop the motor.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => Self::Rumble,
            2 => Self::StopHard,
            _ => Self::Stop,
        }
    }

    /// Motor byte sent to the adapter. The adapter has no brake, so both stops are `0`.
    pub fn intensity(self) -> u8 {
        match self {
            Self::Rumble => 1,
            Self::Stop | Self::StopHard => 0,
        }
    }
}

/// The four slots and their calibration.
#[derive(Debug, Clone)]
pub struct Pads {
    pub(crate) status: [PadStatus; PAD_COUNT],
    pub(crate) origin: [Option<Origin>; PAD_COUNT],
}

impl Pads {
    /// All slots disconnected.
    pub const fn new() -> Self {
        Self {
            status: [PadStatus::DISCONNECTED; PAD_COUNT],
            origin: [None; PAD_COUNT],
        }
    }

    /// Resets one slot to "no connection" and forgets its origin.
    pub fn disconnect(&mut self, slot: usize) {
        if let (Some(status), Some(origin)) = (self.status.get_mut(slot), self.origin.get_mut(slot))
        {
            *status = PadStatus::DISCONNECTED;
            *origin = None;
        }
    }

    /// Drops every captured origin, keeping the slot states. The next valid report of each
    /// slot is taken as its new rest position.
    pub fn forget_origins(&mut self) {
        self.origin = [None; PAD_COUNT];
    }

    /// Resets every slot.
    pub fn disconnect_all(&mut self) {
        *self = Self::new();
    }

    /// Copy of the current slot states.
    #[inline]
    pub fn snapshot(&self) -> [PadStatus; PAD_COUNT] {
        self.status
    }
}

impl Default for Pads {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_starts_disconnected() {
        let status = PadStatus::default();
        assert!(!status.is_connected());
        assert_eq!(status.err, -1);
    }

    #[test]
    fn status_layout_matches_host_record() {
        assert_eq!(core::mem::offset_of!(PadStatus, buttons), 0);
        assert_eq!(core::mem::offset_of!(PadStatus, stick_x), 2);
        assert_eq!(core::mem::offset_of!(PadStatus, trigger_l), 6);
        assert_eq!(core::mem::offset_of!(PadStatus, analog_a), 8);
        assert_eq!(core::mem::offset_of!(PadStatus, err), 10);
    }

    #[test]
    fn motor_commands_map_to_adapter_bytes() {
        assert_eq!(MotorCommand::from_raw(0).intensity(), 0);
        assert_eq!(MotorCommand::from_raw(1).intensity(), 1);
        assert_eq!(MotorCommand::from_raw(2).intensity(), 0);
        assert_eq!(MotorCommand::from_raw(7), MotorCommand::Stop);
    }

    #[test]
    fn disconnect_out_of_range_is_ignored() {
        let mut pads = Pads::new();
        pads.status[1] = PadStatus::NEUTRAL;
        pads.disconnect(PAD_COUNT);
        assert!(pads.status[1].is_connected());

        pads.disconnect(1);
        assert_eq!(pads.snapshot(), [PadStatus::DISCONNECTED; PAD_COUNT]);
    }

    #[test]
    fn forget_origins_keeps_status() {
        let mut pads = Pads::new();
        pads.status[2] = PadStatus::NEUTRAL;
        pads.origin[2] = Some(Origin::default());

        pads.forget_origins();
        assert_eq!(pads.origin, [None; PAD_COUNT]);
        assert!(pads.status[2].is_connected());
    }
}
