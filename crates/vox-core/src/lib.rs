//! Vox Core - DSP primitives and render graph for the voxgraph synth engine
//!
//! This crate provides the foundational building blocks for the engine's
//! signal-processing core: the scheduled, cached, per-block render pipeline
//! ([`signal`]), the event queue that drives it ([`event`]), parameters with
//! source-binding precedence ([`param`]), envelopes, LFOs, macros, wavetable
//! oscillators, biquad filtering, and the ADAA-based nonlinear shaping core
//! shared by distortion and wavefolding.
//!
//! # Core Abstractions
//!
//! - [`signal::SignalProducer`] / [`signal::produce`] - cached, event-sliced
//!   render dispatch shared by every node in the graph
//! - [`event::Event`] / [`event::EventQueue`] - per-producer scheduled event
//!   queue with lazy reset-when-empty semantics
//! - [`param::Param`] - smoothed parameter with envelope/LFO/macro/MIDI
//!   source-binding precedence
//!
//! ## Filters
//!
//! - [`biquad::Biquad`] - second-order IIR filter with negated `a1`/`a2` and
//!   per-type boundary (no-op/silent) policies
//! - [`comb::CombFilter`] / [`allpass::AllpassFilter`] - reverb decay and
//!   diffusion primitives
//! - [`one_pole::OnePole`] - damping filter shared by the echo and reverb
//!   feedback paths
//!
//! ## Modulation
//!
//! - [`envelope::Envelope`] - DAHDSR envelope generator
//! - [`lfo::Lfo`] - low-frequency oscillator with tempo sync and bounded
//!   cyclic graph traversal
//! - [`macro_param::Macro`] - per-channel transform pipeline
//!
//! ## Oscillator
//!
//! - [`wavetable::Wavetable`] / [`wavetable::Oscillator`] - harmonic
//!   partial-sum wavetable lookup with interpolation switch
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible for embedded audio applications.
//! Disable the default `std` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! vox-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: no allocations on the audio render path
//! - **No dependency on std**: pure `no_std` with `libm` for math
//! - **Cache-coherent**: every node renders at most once per round

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod adaa;
pub mod allpass;
pub mod biquad;
pub mod comb;
pub mod delay;
pub mod effect;
pub mod envelope;
pub mod event;
pub mod lfo;
pub mod macro_param;
pub mod math;
pub mod one_pole;
pub mod param;
pub mod signal;
pub mod tempo;
pub mod tuning;
pub mod wavetable;

// Re-export main types at crate root
pub use adaa::Adaa1;
pub use allpass::AllpassFilter;
pub use biquad::{Biquad, BiquadFilterSharedBuffers, BiquadType};
pub use comb::CombFilter;
pub use delay::InterpolatedDelay;
pub use effect::Effect;
pub use envelope::{Envelope, EnvelopeSnapshot, EnvelopeStage};
pub use event::{Event, EventQueue, EventType};
pub use lfo::{Lfo, LfoOutputMode, LfoRate, LfoWaveform};
pub use macro_param::{Macro, MacroTransform};
pub use math::{
    asymmetric_clip, asymmetric_clip_ad, db_to_linear, flush_denormal, hard_clip, hard_clip_ad,
    linear_to_db, sine_fold, sine_fold_ad, soft_clip, soft_clip_ad, soft_limit, squeeze,
    squeeze_ad, tape_sat, tape_sat_ad, wet_dry_mix,
};
pub use one_pole::OnePole;
pub use param::{MpeParam, Param, ParamInputs, ParamScale, ParamSource, PolyphonicParam, VoiceStatus};
pub use signal::{ProducerState, Round, SignalProducer, produce};
pub use tempo::{NoteDivision, TempoManager};
pub use tuning::{NoteTuning, StandardTuning};
pub use wavetable::{CustomWaveform, Oscillator, Wavetable, WavetableState, MAX_CUSTOM_HARMONICS};
