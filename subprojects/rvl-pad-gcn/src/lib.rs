//! # rvl-pad-gcn
//!
//! Pad driver for the official USB GameCube controller adapter (WUP-028), talking to it through
//! the IOS USB HID interface.
//!
//! The driver presents up to four controllers through the host's standard pad polling
//! interface: [`Driver::read`] returns one [`PadStatus`] per slot and never blocks or fails,
//! [`Driver::control_motor`] queues rumble commands. Everything that talks to the adapter runs
//! as an asynchronous chain of IOS requests driven by [`Driver::on_completion`]:
//!
//! ```text
//! open ─► probe v4 ─► probe v5 ─► device change ◄──────────────┐
//!                          │                                  │
//!                          └─► (attach finish) ─► scan ───────┘
//!                                                  │ new adapter
//!                                                  ▼
//!                       (resume ─► parameters) ─► init ─► poll ◄─┐
//!                                                          │    │
//!                                                          └────┘ (+ rumble)
//! ```
//!
//! Steps in parentheses only exist in the v5 command set.
//!
//! ## Features
//! - `ffi`: binds to the console SDK and exports the `gcn_pad_*` entry points.
//! - `panic-halt`: links a halting panic handler into the final module.

#![cfg_attr(not(test), no_std)]

#[cfg(all(feature = "panic-halt", not(test)))]
#[allow(unused_imports)]
use panic_halt as _;

mod driver;
mod error;
mod op;
pub mod pad;
pub mod report;
pub mod rumble;
pub mod wup028;

#[cfg(feature = "ffi")]
pub mod ffi;

#[doc(inline)]
pub use self::{
    driver::{DeviceState, Diagnostics, Driver, LIVENESS_TIMEOUT, LinkState, Platform},
    error::{Stage, StageError},
    pad::{Buttons, MotorCommand, PAD_COUNT, PadError, PadStatus},
};
