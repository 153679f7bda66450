//! Completion tags.
//!
//! Every request is tagged with the kind of operation it performs and a sequence number:
//!
//! ```text
//! 31      24 23                      0
//! ┌─────────┬─────────────────────────┐
//! │  kind   │        sequence         │
//! └─────────┴─────────────────────────┘
//! ```
//!
//! The sequence is the link session for link operations, the device generation for device
//! operations and the rumble token for rumble transfers. A completion whose sequence is no
//! longer current belongs to a superseded chain and is dropped.

use rvl_ios::Tag;

const SEQ_BITS: u32 = 24;
const SEQ_MASK: u32 = (1 << SEQ_BITS) - 1;

/// Advances a wrapping sequence number.
#[inline]
pub(crate) const fn next_seq(seq: u32) -> u32 {
    seq.wrapping_add(1) & SEQ_MASK
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum OpKind {
    Open = 1,
    Version = 2,
    DeviceChange = 3,
    AttachFinish = 4,
    Resume = 5,
    Params = 6,
    Init = 7,
    Poll = 8,
    Rumble = 9,
    Close = 10,
}

impl OpKind {
    fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            1 => Self::Open,
            2 => Self::Version,
            3 => Self::DeviceChange,
            4 => Self::AttachFinish,
            5 => Self::Resume,
            6 => Self::Params,
            7 => Self::Init,
            8 => Self::Poll,
            9 => Self::Rumble,
            10 => Self::Close,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Op {
    pub kind: OpKind,
    pub seq: u32,
}

impl Op {
    #[inline]
    pub const fn new(kind: OpKind, seq: u32) -> Self {
        Self {
            kind,
            seq: seq & SEQ_MASK,
        }
    }

    #[inline]
    pub const fn tag(self) -> Tag {
        Tag((self.kind as u32) << SEQ_BITS | self.seq)
    }

    pub fn from_tag(tag: Tag) -> Option<Self> {
        let kind = OpKind::from_raw((tag.to_raw() >> SEQ_BITS) as u8)?;
        Some(Self::new(kind, tag.to_raw()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_keeps_kind_and_sequence() {
        let op = Op::new(OpKind::Poll, 0x12_3456);
        assert_eq!(op.tag(), Tag(0x0812_3456));
        assert_eq!(Op::from_tag(op.tag()), Some(op));
    }

    #[test]
    fn sequence_wraps_within_tag() {
        assert_eq!(next_seq(SEQ_MASK), 0);
        assert_eq!(Op::new(OpKind::Rumble, u32::MAX).seq, SEQ_MASK);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert_eq!(Op::from_tag(Tag(0)), None);
        assert_eq!(Op::from_tag(Tag(0xff00_0001)), None);
    }
}
