//! Chain filter stage: a single biquad behind a wet/dry mix.
//!
//! `filter1` and `filter2` in the fixed effects chain are both instances of
//! this type, configured with a different [`vox_core::BiquadType`] default.

use vox_core::math::wet_dry_mix;
use vox_core::{Biquad, BiquadType, Effect, Param, ParamInputs, ParamScale};

/// Single-biquad filter stage with smoothed cutoff/resonance and a
/// wet/dry mix control.
pub struct ChainFilter {
    biquad: Biquad,
    filter_type: BiquadType,
    cutoff: Param,
    resonance: Param,
    mix: Param,
    sample_rate: f32,
    last_cutoff: f32,
    last_resonance: f32,
}

impl ChainFilter {
    #[must_use]
    pub fn new(sample_rate: f32, filter_type: BiquadType) -> Self {
        let nyquist = sample_rate * 0.5;
        let default_cutoff = nyquist.min(20_000.0);
        let mut filter = Self {
            biquad: Biquad::new(),
            filter_type,
            cutoff: Param::new(ParamScale::Logarithmic, 20.0, nyquist, default_cutoff),
            resonance: Param::new(ParamScale::Logarithmic, 0.1, 20.0, 0.707),
            mix: Param::new(ParamScale::Linear, 0.0, 1.0, 1.0),
            sample_rate,
            last_cutoff: default_cutoff,
            last_resonance: 0.707,
        };
        filter.recompute();
        filter
    }

    pub fn set_filter_type(&mut self, filter_type: BiquadType) {
        self.filter_type = filter_type;
        self.recompute();
    }

    pub fn set_cutoff(&mut self, hz: f32) {
        self.cutoff.schedule_value(hz);
    }

    pub fn set_resonance(&mut self, q: f32) {
        self.resonance.schedule_value(q);
    }

    pub fn set_mix(&mut self, ratio: f32) {
        self.mix.schedule_value(ratio);
    }

    fn recompute(&mut self) {
        self.last_cutoff = self.cutoff.value();
        self.last_resonance = self.resonance.value();
        self.biquad.set_type(
            self.filter_type,
            self.last_cutoff,
            self.last_resonance,
            0.0,
            self.sample_rate,
        );
    }
}

impl Effect for ChainFilter {
    fn process(&mut self, input: f32) -> f32 {
        let no_mod = ParamInputs::default();
        self.cutoff.advance(&no_mod);
        self.resonance.advance(&no_mod);
        self.mix.advance(&no_mod);
        if self.cutoff.value() != self.last_cutoff || self.resonance.value() != self.last_resonance {
            self.recompute();
        }

        let wet = self.biquad.process(input);
        wet_dry_mix(input, wet, self.mix.value())
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recompute();
    }

    fn reset(&mut self) {
        self.biquad.clear();
    }
}
