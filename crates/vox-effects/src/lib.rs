//! Shared effects chain for the voxgraph synth: filter, distortion, chorus,
//! echo, reverb and side-chain compression, wired together in a fixed order
//! by [`chain::EffectsChain`].
//!
//! ```rust,ignore
//! use vox_core::Effect;
//! use vox_effects::EffectsChain;
//!
//! let mut chain = EffectsChain::new(48_000.0);
//! let output = chain.process(input);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub mod chain;
pub mod chorus;
pub mod compressor;
pub mod delay;
pub mod distortion;
pub mod filter;
pub mod reverb;

pub use chain::EffectsChain;
pub use chorus::Chorus;
pub use compressor::{PeakTracker, SideChain};
pub use delay::Echo;
pub use distortion::{Distortion, WaveShape};
pub use filter::ChainFilter;
pub use reverb::{Reverb, ReverbTuning};
