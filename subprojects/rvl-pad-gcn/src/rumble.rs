//! Rumble command queue.
//!
//! [`Driver::control_motor`](crate::Driver::control_motor) enqueues complete four-port
//! snapshots; the poll loop drains them one at a time, interleaved with input polls. The adapter
//! cannot keep up with back-to-back OUT transfers, so after each send the queue waits for the
//! transfer's completion, or at most [`RUMBLE_DELAY`] poll cycles, before sending the next one.

use crate::{op, pad::PAD_COUNT};

/// Poll cycles after which an unacknowledged rumble transfer is abandoned.
pub const RUMBLE_DELAY: u8 = 3;

/// Number of snapshots the queue holds.
pub const QUEUE_LEN: usize = 16;

/// Motor intensity of every port.
pub type Snapshot = [u8; PAD_COUNT];

/// Ring of pending rumble snapshots.
///
/// The cursors increase monotonically (wrapping) and their difference is the number of pending
/// snapshots. The write side only moves `write`, the poll loop only moves `read`.
#[derive(Debug, Clone)]
pub struct RumbleQueue {
    entries: [Snapshot; QUEUE_LEN],
    write: u32,
    read: u32,
    /// Last intensity queued per port, `None` until the first request
    last: [Option<u8>; PAD_COUNT],
    /// Poll cycles left before the next send is allowed
    delay: u8,
    token: u32,
}

impl RumbleQueue {
    /// An empty queue with every motor off.
    pub const fn new() -> Self {
        Self {
            entries: [[0; PAD_COUNT]; QUEUE_LEN],
            write: 0,
            read: 0,
            last: [None; PAD_COUNT],
            delay: 0,
            token: 0,
        }
    }

    /// Number of snapshots waiting to be sent.
    #[inline]
    pub fn len(&self) -> usize {
        self.write.wrapping_sub(self.read) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Token of the last snapshot handed out by [`RumbleQueue::next_send`].
    #[inline]
    pub fn token(&self) -> u32 {
        self.token
    }

    /// Remaining wait, in poll cycles.
    #[inline]
    pub fn delay(&self) -> u8 {
        self.delay
    }

    /// Queues a new intensity for `slot`, carrying the other ports forward.
    ///
    /// Returns `false` if nothing was queued: `slot` is out of range or `intensity` equals the
    /// last queued value for it. Ports never requested are sent as off. When the ring is full
    /// the newest pending snapshot is replaced.
    pub fn push(&mut self, slot: usize, intensity: u8) -> bool {
        match self.last.get(slot) {
            Some(&last) if last != Some(intensity) => {}
            _ => return false,
        }

        self.last[slot] = Some(intensity);
        let snapshot = self.last.map(|last| last.unwrap_or(0));

        let index = if self.len() == QUEUE_LEN {
            self.write.wrapping_sub(1)
        } else {
            let index = self.write;
            self.write = self.write.wrapping_add(1);
            index
        };
        self.entries[index as usize % QUEUE_LEN] = snapshot;
        true
    }

    /// Advances the wait by one poll cycle and, if it is over, takes the oldest snapshot.
    ///
    /// Returns the snapshot and the token its transfer must be tagged with.
    pub fn next_send(&mut self) -> Option<(Snapshot, u32)> {
        self.delay = self.delay.saturating_sub(1);
        if self.delay > 0 || self.is_empty() {
            return None;
        }

        let snapshot = self.entries[self.read as usize % QUEUE_LEN];
        self.read = self.read.wrapping_add(1);
        self.token = op::next_seq(self.token);
        self.delay = RUMBLE_DELAY;
        Some((snapshot, self.token))
    }

    /// Ends the wait early if `token` is the transfer currently awaited.
    pub fn acknowledge(&mut self, token: u32) -> bool {
        if token == self.token && self.delay > 0 {
            self.delay = 0;
            true
        } else {
            false
        }
    }

    /// Drops pending snapshots after the adapter went away.
    ///
    /// The next request for any port is queued even if it repeats the previous one.
    pub fn forget(&mut self) {
        self.read = self.write;
        self.last = [None; PAD_COUNT];
        self.delay = 0;
    }
}

impl Default for RumbleQueue {
    fn default() -> Self {
        Self::new()
    }
}
