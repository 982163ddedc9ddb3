//! Voxgraph Synth - polyphonic FM/AM voice engine built on `vox-core`.
//!
//! # Core Components
//!
//! - [`voice::Voice`] - single voice: two-operator FM pair, filter, envelope
//!   pair and waveshaper, with modulation routed through `ParamInputs`
//! - [`voice::WavetableSet`] - wavetables shared by every voice in a bus
//! - [`modulation::ModulationFrame`] / [`modulation::ModRouting`] - the
//!   control-rate sources the orchestrator publishes per block, and the
//!   per-param routing that feeds them into the precedence resolver
//! - [`bus::Bus`] - fixed-size polyphonic voice pool with age-based stealing
//!   and a shared filter-coefficient cache
//! - [`synth::Synth`] - note/sustain/CC handling, the macro bank, the
//!   `SetParam`/`AssignController` surface and block rendering on top of a
//!   [`bus::Bus`]
//!
//! ```rust
//! use vox_synth::{Synth, ControlEvent};
//!
//! let mut synth: Synth<8> = Synth::new(48_000.0, 48_000);
//! synth.handle(ControlEvent::NoteOn { channel: 0, note: 60, velocity: 100 });
//!
//! let mut buffer = [0.0_f32; 512];
//! synth.generate_samples(&[], &mut buffer);
//! ```
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible. Disable the default `std` feature:
//!
//! ```toml
//! [dependencies]
//! vox-synth = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod bus;
pub mod modulation;
pub mod synth;
pub mod voice;

pub use bus::Bus;
pub use modulation::{ControllerRef, ModRouting, ModulationFrame, MACRO_COUNT};
pub use synth::{ControlEvent, ControllerBinding, MacroInput, Synth};
pub use voice::{Voice, WaveformKind, WavetableSet};
