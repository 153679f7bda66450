//! Request chain state machine.
//!
//! Link operations (open, version, device change, attach finish) are tagged with the session
//! number, device operations (resume, parameters, init, poll) with the device generation.
//! Closing the interface bumps the session, losing or replacing the adapter bumps the
//! generation, so completions of a superseded chain are recognized and dropped.

use log::{debug, info, trace, warn};
use rvl_ios::{Fd, IosError, Mode, submit};
use rvl_usb_hid::{DeviceId, HidTransport, HidV4, HidV5, Version, proto};

use super::{DeviceState, Diagnostics, LIVENESS_TIMEOUT, LinkState, Platform};
use crate::{
    error::StageError,
    op::{self, Op, OpKind},
    pad::{PAD_COUNT, PadStatus, Pads},
    rumble::{RumbleQueue, Snapshot},
    wup028,
};

pub(super) struct State {
    started: bool,
    pads: Pads,
    rumble: RumbleQueue,
    /// Time of the last valid input report
    last_update: u64,

    link: LinkState,
    fd: Option<Fd>,
    protocol: Option<Version>,
    session: u32,
    closed_at: u64,
    /// Result of the last device-change query, scanned once acknowledged
    device_count: i32,

    adapter: Option<DeviceId>,
    device: DeviceState,
    generation: u32,

    last_error: Option<StageError>,
    /// A failure happened since the last read
    error_pending: bool,

    v4: HidV4,
    v5: HidV5,
}

impl State {
    pub(super) const fn new() -> Self {
        Self {
            started: false,
            pads: Pads::new(),
            rumble: RumbleQueue::new(),
            last_update: 0,
            link: LinkState::Closed,
            fd: None,
            protocol: None,
            session: 0,
            closed_at: 0,
            device_count: 0,
            adapter: None,
            device: DeviceState::Detached,
            generation: 0,
            last_error: None,
            error_pending: false,
            v4: HidV4::new(),
            v5: HidV5::new(),
        }
    }

    pub(super) fn initialize<P: Platform>(&mut self, p: &P, now: u64) {
        if self.started {
            return;
        }

        self.started = true;
        self.pads.disconnect_all();
        self.last_update = now;
        self.open(p, now);
    }

    pub(super) fn read<P: Platform>(&mut self, p: &P, now: u64) -> [PadStatus; PAD_COUNT] {
        if core::mem::take(&mut self.error_pending) {
            self.pads.disconnect_all();
        }

        if now.saturating_sub(self.last_update) >= LIVENESS_TIMEOUT {
            self.pads.disconnect_all();
        }

        if self.link == LinkState::Closed && now.saturating_sub(self.closed_at) >= LIVENESS_TIMEOUT
        {
            debug!("reopening the HID interface");
            self.open(p, now);
        }

        self.pads.snapshot()
    }

    pub(super) fn control_motor(&mut self, slot: usize, intensity: u8) {
        if self.rumble.push(slot, intensity) {
            trace!("queued rumble {} for slot {}", intensity, slot);
        }
    }

    pub(super) fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            link: self.link,
            device: self.device,
            protocol: self.protocol,
            adapter: self.adapter,
            last_error: self.last_error,
        }
    }

    pub(super) fn complete<P: Platform>(&mut self, p: &P, op: Op, ret: i32, now: u64) {
        let current = match op.kind {
            OpKind::Open | OpKind::Version | OpKind::DeviceChange | OpKind::AttachFinish => {
                op.seq == self.session
            }
            OpKind::Resume | OpKind::Params | OpKind::Init | OpKind::Poll => {
                op.seq == self.generation
            }
            OpKind::Rumble | OpKind::Close => true,
        };
        if !current {
            return self.stale(op);
        }

        match op.kind {
            OpKind::Open => self.on_open(p, op, ret, now),
            OpKind::Version => self.on_version(p, op, ret, now),
            OpKind::DeviceChange => self.on_device_change(p, op, ret, now),
            OpKind::AttachFinish => self.on_attach_finish(p, op, ret, now),
            OpKind::Resume => self.on_resume(p, op, ret, now),
            OpKind::Params => self.on_params(p, op, ret, now),
            OpKind::Init => self.on_init(p, op, ret, now),
            OpKind::Poll => self.on_poll(p, op, ret, now),
            OpKind::Rumble => self.on_rumble(op, ret),
            OpKind::Close => {}
        }
    }

    fn on_open<P: Platform>(&mut self, p: &P, op: Op, ret: i32, now: u64) {
        if self.link != LinkState::Opening {
            return self.stale(op);
        }

        match Fd::from_raw(ret) {
            Some(fd) => {
                self.fd = Some(fd);
                self.probe(p, Version::V4, now);
            }
            None => self.fail(p, StageError::Open(IosError::from_code(ret)), now),
        }
    }

    fn on_version<P: Platform>(&mut self, p: &P, op: Op, ret: i32, now: u64) {
        let LinkState::Probing(version) = self.link else {
            return self.stale(op);
        };

        match self.transport(version).check_version(ret) {
            Ok(()) => {
                info!("using the {:?} HID interface", version);
                self.protocol = Some(version);
                self.enumerate(p, now);
            }
            Err(err) if version == Version::V4 => {
                debug!("not a v4 HID interface: {}", err);
                self.probe(p, Version::V5, now);
            }
            Err(err) => self.fail(p, StageError::Version(err), now),
        }
    }

    fn on_device_change<P: Platform>(&mut self, p: &P, op: Op, ret: i32, now: u64) {
        if self.link != LinkState::Enumerating {
            return self.stale(op);
        }

        if ret < 0 {
            return self.fail(p, StageError::DeviceChange(IosError::from_code(ret)), now);
        }

        self.device_count = ret;
        self.link = LinkState::Attaching;
        self.issue(p, OpKind::AttachFinish, now);
    }

    fn on_attach_finish<P: Platform>(&mut self, p: &P, op: Op, ret: i32, now: u64) {
        if self.link != LinkState::Attaching {
            return self.stale(op);
        }

        if ret < 0 {
            self.fail(p, StageError::AttachFinish(IosError::from_code(ret)), now);
        } else {
            self.scan(p, now);
        }

        self.enumerate(p, now);
    }

    fn on_resume<P: Platform>(&mut self, p: &P, op: Op, ret: i32, now: u64) {
        if self.device != DeviceState::Resuming {
            return self.stale(op);
        }

        if ret < 0 {
            return self.fail(p, StageError::Resume(IosError::from_code(ret)), now);
        }

        self.device = DeviceState::ReadingParams;
        self.issue(p, OpKind::Params, now);
    }

    fn on_params<P: Platform>(&mut self, p: &P, op: Op, ret: i32, now: u64) {
        if self.device != DeviceState::ReadingParams {
            return self.stale(op);
        }

        if ret < 0 {
            return self.fail(p, StageError::Params(IosError::from_code(ret)), now);
        }

        self.device = DeviceState::Initializing;
        self.issue(p, OpKind::Init, now);
    }

    fn on_init<P: Platform>(&mut self, p: &P, op: Op, ret: i32, now: u64) {
        if self.device != DeviceState::Initializing {
            return self.stale(op);
        }

        if ret < 0 {
            return self.fail(p, StageError::Init(IosError::from_code(ret)), now);
        }

        self.device = DeviceState::Polling;
        self.poll_cycle(p, now);
    }

    fn on_poll<P: Platform>(&mut self, p: &P, op: Op, ret: i32, now: u64) {
        if self.device != DeviceState::Polling {
            return self.stale(op);
        }

        if ret < 0 {
            return self.fail(p, StageError::Poll(IosError::from_code(ret)), now);
        }

        let report = match self.protocol {
            Some(Version::V4) => self.v4.poll_report(),
            Some(Version::V5) => self.v5.poll_report(),
            None => return,
        };
        // Only the transferred bytes are fresh.
        let report = &report[..report.len().min(ret as usize)];
        if self.pads.apply(report) {
            self.last_update = now;
        } else {
            debug!("discarding report of type {:?}", report.first());
        }

        self.poll_cycle(p, now);
    }

    fn on_rumble(&mut self, op: Op, ret: i32) {
        if ret < 0 {
            debug!("rumble transfer {} failed: {}", op.seq, ret);
        }
        if !self.rumble.acknowledge(op.seq) {
            self.stale(op);
        }
    }

    fn open<P: Platform>(&mut self, p: &P, now: u64) {
        self.session = op::next_seq(self.session);
        self.link = LinkState::Opening;

        let op = Op::new(OpKind::Open, self.session);
        // SAFETY: Opening takes no buffer besides the static path.
        if let Err(err) = unsafe { p.open_async(proto::PATH, Mode::WRITE, op.tag()) } {
            self.complete(p, op, err.code(), now);
        }
    }

    fn probe<P: Platform>(&mut self, p: &P, version: Version, now: u64) {
        self.link = LinkState::Probing(version);
        self.issue(p, OpKind::Version, now);
    }

    fn enumerate<P: Platform>(&mut self, p: &P, now: u64) {
        self.link = LinkState::Enumerating;
        self.issue(p, OpKind::DeviceChange, now);
    }

    /// Looks for the adapter in the acknowledged device list.
    fn scan<P: Platform>(&mut self, p: &P, now: u64) {
        let Some(version) = self.protocol else {
            return;
        };

        let count = self.device_count;
        match self.transport(version).find_device(count, &wup028::TARGET) {
            Some(id) if self.adapter == Some(id) => {}
            Some(id) => {
                info!("adapter attached as device {:#x}", id.0);
                self.adapter = Some(id);
                self.generation = op::next_seq(self.generation);
                self.device = DeviceState::Resuming;
                self.pads.forget_origins();
                self.rumble.forget();
                self.issue(p, OpKind::Resume, now);
            }
            // Slots are left to the liveness timeout.
            None if self.adapter.is_some() => {
                info!("adapter detached");
                self.detach();
            }
            None => {}
        }
    }

    fn poll_cycle<P: Platform>(&mut self, p: &P, now: u64) {
        if let Some((snapshot, token)) = self.rumble.next_send() {
            self.send_rumble(p, snapshot, token);
        }
        self.issue(p, OpKind::Poll, now);
    }

    /// Submits the next request of the chain.
    ///
    /// A failed submission is handled as a completion carrying the error. A handshake step the
    /// active command set does not have completes immediately with success.
    fn issue<P: Platform>(&mut self, p: &P, kind: OpKind, now: u64) {
        let Some(fd) = self.fd else {
            return;
        };

        let (version, seq) = match (kind, self.link, self.protocol) {
            (OpKind::Version, LinkState::Probing(version), _) => (version, self.session),
            (OpKind::DeviceChange | OpKind::AttachFinish, _, Some(version)) => {
                (version, self.session)
            }
            (_, _, Some(version)) => (version, self.generation),
            _ => return,
        };
        let op = Op::new(kind, seq);
        let device = self.adapter;

        let hid = self.transport(version);
        let req = match (kind, device) {
            (OpKind::Version, _) => Some(hid.get_version()),
            (OpKind::DeviceChange, _) => Some(hid.get_device_change()),
            (OpKind::AttachFinish, _) => hid.attach_finish(),
            (OpKind::Resume, Some(device)) => hid.resume(device),
            (OpKind::Params, Some(device)) => hid.get_params(device),
            (OpKind::Init, Some(device)) => {
                Some(hid.send_init(device, &wup028::TARGET, &[wup028::CMD_INIT]))
            }
            (OpKind::Poll, Some(device)) => Some(hid.send_poll(device, &wup028::TARGET)),
            _ => return,
        };

        // SAFETY: The buffers belong to the transport inside the driver state, which stays in
        // place for the driver's (static) lifetime.
        match req.map(|req| unsafe { submit(p, fd, req, op.tag()) }) {
            Some(Ok(())) => {}
            Some(Err(err)) => self.complete(p, op, err.code(), now),
            None => self.complete(p, op, 0, now),
        }
    }

    fn send_rumble<P: Platform>(&mut self, p: &P, snapshot: Snapshot, token: u32) {
        let (Some(fd), Some(device), Some(version)) = (self.fd, self.adapter, self.protocol) else {
            return;
        };

        trace!("rumble {:?} (token {})", snapshot, token);
        let op = Op::new(OpKind::Rumble, token);
        let report = wup028::rumble_report(snapshot);
        let req = self.transport(version).send_rumble(device, &wup028::TARGET, &report);

        // SAFETY: See `issue`.
        if let Err(err) = unsafe { submit(p, fd, req, op.tag()) } {
            debug!("rumble submission failed: {}", err);
            self.rumble.acknowledge(token);
        }
    }

    fn transport(&mut self, version: Version) -> &mut dyn HidTransport {
        match version {
            Version::V4 => &mut self.v4,
            Version::V5 => &mut self.v5,
        }
    }

    /// Records a failure. Link failures close the interface, anything else only drops the
    /// adapter.
    fn fail<P: Platform>(&mut self, p: &P, err: StageError, now: u64) {
        warn!("{}: {} (stage {})", err, err.code(), err.stage() as u8);
        self.last_error = Some(err);
        self.error_pending = true;

        if err.is_transport_fatal() {
            self.close(p, now);
        } else {
            self.detach();
        }
    }

    /// Forgets the adapter. Its pending device operations become stale.
    fn detach(&mut self) {
        self.adapter = None;
        self.device = DeviceState::Detached;
        self.generation = op::next_seq(self.generation);
    }

    fn close<P: Platform>(&mut self, p: &P, now: u64) {
        if let Some(fd) = self.fd.take() {
            let tag = Op::new(OpKind::Close, self.session).tag();
            if let Err(err) = p.close_async(fd, tag) {
                debug!("close failed: {}", err);
            }
        }

        self.link = LinkState::Closed;
        self.protocol = None;
        self.closed_at = now;
        self.session = op::next_seq(self.session);
        self.detach();
    }

    fn stale(&self, op: Op) {
        debug!("dropping stale {:?} completion ({})", op.kind, op.seq);
    }
}
