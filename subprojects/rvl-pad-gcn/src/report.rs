//! Input report decoding and calibration.
//!
//! An input report is a type byte followed by one 9-byte record per port:
//!
//! ```text
//! Offset  Field
//! ─────────────────────────────────────────────
//! 0       status (high nibble: 1 wired, 2 wireless)
//! 1       A B X Y Left Right Down Up (bit 0..7)
//! 2       Start Z (bit 0..1)
//! 3..4    main stick X, Y
//! 5..6    C-stick X, Y
//! 7..8    L, R analog
//! ```
//!
//! Sticks are unsigned with the center near 128. The first valid record after a controller is
//! plugged in is taken as its rest position ([`Origin`]); later readings are reported relative
//! to it.

use static_assertions::const_assert_eq;
use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::{
    pad::{Buttons, PAD_COUNT, PadStatus, Pads},
    wup028,
};

/// Raw analog trigger value from which L/R also read as pressed.
pub const TRIGGER_THRESHOLD: u8 = 170;

const STATUS_WIRED: u8 = 1;
const STATUS_WIRELESS: u8 = 2;

/// Adapter button bits, in report order, and the host bit each one maps to.
const BUTTON_MAP: [(u16, Buttons); 10] = [
    (1 << 0, Buttons::A),
    (1 << 1, Buttons::B),
    (1 << 2, Buttons::X),
    (1 << 3, Buttons::Y),
    (1 << 4, Buttons::LEFT),
    (1 << 5, Buttons::RIGHT),
    (1 << 6, Buttons::DOWN),
    (1 << 7, Buttons::UP),
    (1 << 8, Buttons::START),
    (1 << 9, Buttons::Z),
];

/// One port record of an input report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct RawPad {
    pub status: u8,
    pub buttons: [u8; 2],
    pub stick: [u8; 2],
    pub substick: [u8; 2],
    pub triggers: [u8; 2],
}

const_assert_eq!(size_of::<RawPad>(), wup028::SLOT_LEN);

/// A complete input report.
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct RawReport {
    pub kind: u8,
    pub pads: [RawPad; PAD_COUNT],
}

const_assert_eq!(size_of::<RawReport>(), wup028::REPORT_LEN);

impl RawReport {
    /// Views `buf` as an input report. `None` if it is too short or not an input report.
    pub fn parse(buf: &[u8]) -> Option<&Self> {
        let (report, _) = Self::ref_from_prefix(buf).ok()?;
        (report.kind == wup028::REPORT_INPUT).then_some(report)
    }
}

impl RawPad {
    /// Returns `true` if a wired or wireless controller is present.
    #[inline]
    pub fn is_connected(&self) -> bool {
        matches!(self.status >> 4, STATUS_WIRED | STATUS_WIRELESS)
    }

    /// Digital buttons, including L/R from the analog triggers.
    pub fn buttons(&self) -> Buttons {
        let raw = u16::from_le_bytes(self.buttons);
        let mut buttons = BUTTON_MAP
            .iter()
            .filter(|(bit, _)| raw & bit != 0)
            .fold(Buttons::empty(), |acc, (_, button)| acc | *button);

        buttons.set(Buttons::L, self.triggers[0] >= TRIGGER_THRESHOLD);
        buttons.set(Buttons::R, self.triggers[1] >= TRIGGER_THRESHOLD);
        buttons
    }

    /// Normalizes this record against `origin`.
    pub fn calibrate(&self, origin: &Origin) -> PadStatus {
        PadStatus {
            buttons: self.buttons().bits(),
            stick_x: axis(self.stick[0], origin.stick[0]),
            stick_y: axis(self.stick[1], origin.stick[1]),
            substick_x: axis(self.substick[0], origin.substick[0]),
            substick_y: axis(self.substick[1], origin.substick[1]),
            trigger_l: self.triggers[0].saturating_sub(origin.triggers[0]),
            trigger_r: self.triggers[1].saturating_sub(origin.triggers[1]),
            ..PadStatus::NEUTRAL
        }
    }
}

/// Rest position of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Origin {
    /// Main stick, centered
    pub stick: [i8; 2],
    /// C-stick, centered
    pub substick: [i8; 2],
    /// Raw L/R analog
    pub triggers: [u8; 2],
}

impl Origin {
    /// Takes the current reading of `pad` as its rest position.
    pub fn capture(pad: &RawPad) -> Self {
        Self {
            stick: pad.stick.map(center),
            substick: pad.substick.map(center),
            triggers: pad.triggers,
        }
    }
}

#[inline]
fn center(raw: u8) -> i8 {
    (raw as i16 - 128) as i8
}

#[inline]
fn axis(raw: u8, origin: i8) -> i8 {
    (center(raw) as i16 - origin as i16).clamp(i8::MIN as i16, i8::MAX as i16) as i8
}

impl Pads {
    /// Applies an input report to the slots.
    ///
    /// Returns `false`, leaving every slot untouched, if `buf` is not an input report. Ports
    /// without a controller are reset individually.
    pub fn apply(&mut self, buf: &[u8]) -> bool {
        let Some(report) = RawReport::parse(buf) else {
            return false;
        };

        for (slot, raw) in report.pads.iter().enumerate() {
            if !raw.is_connected() {
                self.disconnect(slot);
                continue;
            }

            let origin = *self.origin[slot].get_or_insert_with(|| Origin::capture(raw));
            self.status[slot] = raw.calibrate(&origin);
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn raw_pad(status: u8, axes: [u8; 6]) -> RawPad {
        RawPad {
            status,
            buttons: [0, 0],
            stick: [axes[0], axes[1]],
            substick: [axes[2], axes[3]],
            triggers: [axes[4], axes[5]],
        }
    }

    fn report(pads: [RawPad; PAD_COUNT]) -> [u8; wup028::REPORT_LEN] {
        let mut buf = [0; wup028::REPORT_LEN];
        buf[0] = wup028::REPORT_INPUT;
        for (i, pad) in pads.iter().enumerate() {
            let at = 1 + i * wup028::SLOT_LEN;
            buf[at] = pad.status;
            buf[at + 1..at + 3].copy_from_slice(&pad.buttons);
            buf[at + 3..at + 5].copy_from_slice(&pad.stick);
            buf[at + 5..at + 7].copy_from_slice(&pad.substick);
            buf[at + 7..at + 9].copy_from_slice(&pad.triggers);
        }
        buf
    }

    const EMPTY: RawPad = RawPad {
        status: 0,
        buttons: [0, 0],
        stick: [0, 0],
        substick: [0, 0],
        triggers: [0, 0],
    };

    #[test]
    fn first_report_captures_origin() {
        let mut pads = Pads::new();
        let pad = raw_pad(0x10, [131, 131, 131, 131, 0, 0]);
        assert!(pads.apply(&report([pad, EMPTY, EMPTY, EMPTY])));

        assert_eq!(
            pads.origin[0],
            Some(Origin {
                stick: [3, 3],
                substick: [3, 3],
                triggers: [0, 0]
            })
        );
        assert_eq!(pads.status[0], PadStatus::NEUTRAL);

        let moved = raw_pad(0x10, [140, 131, 131, 131, 0, 0]);
        assert!(pads.apply(&report([moved, EMPTY, EMPTY, EMPTY])));
        assert_eq!(pads.status[0].stick_x, 9);
        assert_eq!(pads.status[0].stick_y, 0);
        assert_eq!(pads.status[0].substick_x, 0);
    }

    #[test]
    fn wireless_controller_is_connected() {
        let mut pads = Pads::new();
        assert!(pads.apply(&report([EMPTY, raw_pad(0x24, [128; 6]), EMPTY, EMPTY])));
        assert!(!pads.status[0].is_connected());
        assert!(pads.status[1].is_connected());
    }

    #[test]
    fn unknown_status_resets_only_that_slot() {
        let mut pads = Pads::new();
        let pad = raw_pad(0x10, [128; 6]);
        pads.apply(&report([pad, pad, EMPTY, EMPTY]));

        pads.apply(&report([pad, raw_pad(0x30, [128; 6]), EMPTY, EMPTY]));
        assert!(pads.status[0].is_connected());
        assert_eq!(pads.status[1], PadStatus::DISCONNECTED);
        assert_eq!(pads.origin[1], None);
    }

    #[test]
    fn wrong_report_type_is_discarded() {
        let mut pads = Pads::new();
        let mut buf = report([raw_pad(0x10, [128; 6]); PAD_COUNT]);
        buf[0] = 0x22;

        assert!(!pads.apply(&buf));
        assert_eq!(pads.snapshot(), [PadStatus::DISCONNECTED; PAD_COUNT]);
    }

    #[test]
    fn short_report_is_discarded() {
        let mut pads = Pads::new();
        let buf = report([raw_pad(0x10, [128; 6]); PAD_COUNT]);
        assert!(!pads.apply(&buf[..20]));
    }

    #[test]
    fn reconnect_recaptures_origin() {
        let mut pads = Pads::new();
        pads.apply(&report([raw_pad(0x10, [130; 6]), EMPTY, EMPTY, EMPTY]));
        pads.apply(&report([EMPTY; PAD_COUNT]));
        pads.apply(&report([raw_pad(0x10, [120; 6]), EMPTY, EMPTY, EMPTY]));

        assert_eq!(pads.origin[0].map(|o| o.stick), Some([-8, -8]));
        assert_eq!(pads.status[0].stick_x, 0);
    }

    #[test]
    fn axis_is_clamped() {
        let origin = Origin {
            stick: [100, -100],
            ..Origin::default()
        };
        let status = raw_pad(0x10, [0, 255, 128, 128, 0, 0]).calibrate(&origin);
        assert_eq!(status.stick_x, i8::MIN);
        assert_eq!(status.stick_y, i8::MAX);
    }

    #[test]
    fn buttons_follow_host_layout() {
        let mut pad = raw_pad(0x10, [128; 6]);
        pad.buttons = [0b1001_0001, 0b0000_0011];
        assert_eq!(
            pad.buttons(),
            Buttons::A | Buttons::LEFT | Buttons::UP | Buttons::START | Buttons::Z
        );
    }

    proptest! {
        #[test]
        fn digital_buttons_match_bits(lo in any::<u8>(), hi in 0u8..4) {
            let mut pad = raw_pad(0x10, [128, 128, 128, 128, 0, 0]);
            pad.buttons = [lo, hi];
            let buttons = pad.buttons();

            let raw = u16::from_le_bytes([lo, hi]);
            for (bit, button) in BUTTON_MAP {
                prop_assert_eq!(buttons.contains(button), raw & bit != 0);
            }
            prop_assert!(!buttons.intersects(Buttons::L | Buttons::R));
        }

        #[test]
        fn trigger_threshold_sets_digital(l in any::<u8>(), r in any::<u8>()) {
            let pad = raw_pad(0x10, [128, 128, 128, 128, l, r]);
            let buttons = pad.buttons();
            prop_assert_eq!(buttons.contains(Buttons::L), l >= TRIGGER_THRESHOLD);
            prop_assert_eq!(buttons.contains(Buttons::R), r >= TRIGGER_THRESHOLD);
        }

        #[test]
        fn same_report_twice_reads_as_rest(axes in any::<[u8; 6]>()) {
            let mut pads = Pads::new();
            let buf = report([raw_pad(0x10, axes), EMPTY, EMPTY, EMPTY]);
            pads.apply(&buf);
            pads.apply(&buf);

            let status = pads.status[0];
            prop_assert_eq!(
                [status.stick_x, status.stick_y, status.substick_x, status.substick_y],
                [0; 4]
            );
            prop_assert_eq!([status.trigger_l, status.trigger_r], [0, 0]);
        }

        #[test]
        fn trigger_never_underflows(origin in any::<u8>(), raw in any::<u8>()) {
            let pad = raw_pad(0x10, [128, 128, 128, 128, raw, raw]);
            let origin = Origin { triggers: [origin, origin], ..Origin::default() };
            let status = pad.calibrate(&origin);
            prop_assert_eq!(status.trigger_l, raw.saturating_sub(origin.triggers[0]));
            prop_assert_eq!(status.analog_a, 0);
            prop_assert_eq!(status.analog_b, 0);
        }
    }
}
