//! Schroeder/Moorer-style algorithmic reverb, the `reverb` chain stage.
//!
//! A bank of parallel damped comb filters (diffuses the decay tail, each
//! tuned to a different prime-ish length to avoid flutter) feeds a short
//! series of allpass diffusers. Three tunings change the comb/allpass
//! lengths and default decay/damping: small room, plate, hall.

use vox_core::math::wet_dry_mix;
use vox_core::{AllpassFilter, CombFilter, Effect, Param, ParamInputs, ParamScale};

/// Base comb-filter delay lengths in samples, tuned at 44.1 kHz (Freeverb's
/// classic proportions); scaled to the actual sample rate at construction.
const COMB_LENGTHS_44K: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
const ALLPASS_LENGTHS_44K: [usize; 4] = [556, 441, 341, 225];
const REFERENCE_SAMPLE_RATE: f32 = 44_100.0;

/// Which room tuning a [`Reverb`] uses: comb/allpass lengths plus decay and
/// damping defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReverbTuning {
    SmallRoom,
    Plate,
    Hall,
}

impl ReverbTuning {
    /// `(size_scale, decay, damping)` defaults for this tuning.
    fn defaults(self) -> (f32, f32, f32) {
        match self {
            ReverbTuning::SmallRoom => (0.6, 0.5, 0.6),
            ReverbTuning::Plate => (0.8, 0.7, 0.3),
            ReverbTuning::Hall => (1.3, 0.85, 0.4),
        }
    }
}

fn scale_length(base_44k: usize, sample_rate: f32, size_scale: f32) -> usize {
    let scaled = base_44k as f32 * (sample_rate / REFERENCE_SAMPLE_RATE) * size_scale;
    scaled.round().max(1.0) as usize
}

/// Map the user-facing `[0, 1]` damping ratio onto the in-loop lowpass
/// cutoff: `0` leaves the loop bright (16 kHz), `1` pulls it down to 1 kHz.
fn damping_to_hz(damping: f32) -> f32 {
    let damping = damping.clamp(0.0, 1.0);
    16_000.0 * libm::powf(1_000.0 / 16_000.0, damping)
}

/// Parallel comb bank feeding series allpass diffusion.
pub struct Reverb {
    combs: [CombFilter; 8],
    allpasses: [AllpassFilter; 4],
    decay: Param,
    damping: Param,
    mix: Param,
    last_decay: f32,
    last_damping: f32,
    sample_rate: f32,
    tuning: ReverbTuning,
}

impl Reverb {
    #[must_use]
    pub fn new(sample_rate: f32, tuning: ReverbTuning) -> Self {
        let (size_scale, decay, damping) = tuning.defaults();
        let combs = COMB_LENGTHS_44K.map(|len| {
            let mut comb = CombFilter::new(scale_length(len, sample_rate, size_scale), sample_rate);
            comb.set_feedback(decay);
            comb.set_damping_hz(damping_to_hz(damping));
            comb
        });
        let allpasses = ALLPASS_LENGTHS_44K.map(|len| {
            let mut allpass = AllpassFilter::new(scale_length(len, sample_rate, size_scale));
            allpass.set_feedback(0.5);
            allpass
        });
        Self {
            combs,
            allpasses,
            decay: Param::new(ParamScale::Linear, 0.0, 0.99, decay),
            damping: Param::new(ParamScale::Linear, 0.0, 1.0, damping),
            mix: Param::new(ParamScale::Linear, 0.0, 1.0, 0.3),
            last_decay: decay,
            last_damping: damping,
            sample_rate,
            tuning,
        }
    }

    /// Switch room tunings. Rebuilds the comb/allpass banks at the new
    /// lengths, which also clears their state — switching rooms mid-tail
    /// starts the new room clean rather than replaying the old tail through
    /// mismatched delay lengths.
    pub fn set_tuning(&mut self, tuning: ReverbTuning) {
        *self = Self::new(self.sample_rate, tuning);
    }

    pub fn set_decay(&mut self, ratio: f32) {
        self.decay.schedule_value(ratio);
    }

    pub fn set_damping(&mut self, ratio: f32) {
        self.damping.schedule_value(ratio);
    }

    pub fn set_mix(&mut self, ratio: f32) {
        self.mix.schedule_value(ratio);
    }
}

impl Effect for Reverb {
    fn process(&mut self, input: f32) -> f32 {
        let no_mod = ParamInputs::default();
        let decay = self.decay.advance(&no_mod);
        let damping = self.damping.advance(&no_mod);
        self.mix.advance(&no_mod);

        // The comb settings only depend on two params; skip the per-comb
        // coefficient updates on the (vastly more common) samples where
        // neither one moved.
        if decay != self.last_decay || damping != self.last_damping {
            let damping_hz = damping_to_hz(damping);
            for comb in &mut self.combs {
                comb.set_feedback(decay);
                comb.set_damping_hz(damping_hz);
            }
            self.last_decay = decay;
            self.last_damping = damping;
        }

        let comb_sum: f32 = self.combs.iter_mut().map(|comb| comb.process(input)).sum();
        let mut wet = comb_sum / self.combs.len() as f32;
        for allpass in &mut self.allpasses {
            wet = allpass.process(wet);
        }

        wet_dry_mix(input, wet, self.mix.value())
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        *self = Self::new(sample_rate, self.tuning);
    }

    fn reset(&mut self) {
        for comb in &mut self.combs {
            comb.clear();
        }
        for allpass in &mut self.allpasses {
            allpass.clear();
        }
    }
}
