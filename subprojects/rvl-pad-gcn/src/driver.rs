//! Driver context and public polling interface.

use log::debug;
use rvl_ios::{Cache, Ios, Tag, TimeBase, time::millis_to_ticks};
use rvl_sys_sync::{Interrupts, IrqMutex};
use rvl_usb_hid::{DeviceId, Version};

use self::state::State;
use crate::{
    error::StageError,
    op::Op,
    pad::{PAD_COUNT, PadStatus},
};

mod state;


/// Time without a valid input report after which every slot reads as disconnected. Also the
/// wait before reopening the interface after a fatal failure.
pub const LIVENESS_TIMEOUT: u64 = millis_to_ticks(1500);

/// Everything the driver needs from the system.
pub trait Platform: Ios + Cache + TimeBase {
    /// Masking used for the driver's critical sections.
    type Interrupts: Interrupts;
}

/// Progress of the `/dev/usb/hid` session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No descriptor; waiting for the next open attempt.
    Closed,
    Opening,
    /// Querying the interface version with the given command set.
    Probing(Version),
    /// Waiting for the device list to change.
    Enumerating,
    /// Acknowledging a device list before scanning it.
    Attaching,
}

/// Progress of the adapter bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Detached,
    Resuming,
    ReadingParams,
    /// Sending the command that starts the input report stream.
    Initializing,
    Polling,
}

/// Snapshot of the driver's internal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostics {
    pub link: LinkState,
    pub device: DeviceState,
    /// Command set selected for the current session
    pub protocol: Option<Version>,
    /// The adapter currently being driven
    pub adapter: Option<DeviceId>,
    /// Most recent failure, kept until replaced
    pub last_error: Option<StageError>,
}

/// The adapter driver.
///
/// All state lives behind one interrupt-masking lock, shared by the caller-facing methods and
/// the completion path ([`Driver::on_completion`]). Follow-up requests are submitted from
/// inside the critical section; submission never blocks.
///
/// Methods that may start requests take `&'static self`: the request buffers are part of the
/// driver and must stay in place until IOS is done with them.
pub struct Driver<P: Platform> {
    platform: P,
    state: IrqMutex<P::Interrupts, State>,
}

impl<P: Platform> Driver<P> {
    /// Creates an idle driver. Nothing is submitted before the first
    /// [`initialize`](Driver::initialize) or [`read`](Driver::read).
    pub const fn new(platform: P) -> Self {
        Self {
            platform,
            state: IrqMutex::new(State::new()),
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Starts the request chain. Only the first call has any effect.
    pub fn initialize(&'static self) {
        let mut state = self.state.lock();
        let now = self.platform.now();
        state.initialize(&self.platform, now);
    }

    /// Returns the state of the four slots.
    ///
    /// Slots read as disconnected after any failure since the previous call and when no valid
    /// input report arrived for [`LIVENESS_TIMEOUT`]. If the interface was closed by a fatal
    /// failure at least that long ago, it is reopened.
    pub fn read(&'static self) -> [PadStatus; PAD_COUNT] {
        let mut state = self.state.lock();
        let now = self.platform.now();
        state.initialize(&self.platform, now);
        state.read(&self.platform, now)
    }

    /// Queues a rumble intensity for `slot`. Out-of-range slots and repeated values are ignored.
    pub fn control_motor(&self, slot: usize, intensity: u8) {
        self.state.lock().control_motor(slot, intensity);
    }

    /// Handles the completion of a request submitted by this driver.
    pub fn on_completion(&'static self, tag: Tag, ret: i32) {
        let Some(op) = Op::from_tag(tag) else {
            debug!("ignoring completion with unknown tag {:#010x}", tag.to_raw());
            return;
        };

        let mut state = self.state.lock();
        let now = self.platform.now();
        state.complete(&self.platform, op, ret, now);
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.state.lock().diagnostics()
    }
}
