//! Feedback delay, the `echo` stage of the fixed effects chain.
//!
//! Each repeat passes through two taming stages on its way back into the
//! line: a one-pole lowpass, so repeats darken a little the way tape and
//! bucket-brigade echoes roll off high end, and an anti-aliased squeeze
//! shaper. The squeeze sits strictly inside the identity line, so however
//! hard the feedback knob is pushed the loop contracts a little every trip
//! and an undriven tail always decays to true silence instead of parking at
//! a self-sustaining level.

use vox_core::math::{flush_denormal, squeeze, squeeze_ad, wet_dry_mix};
use vox_core::{Adaa1, Effect, InterpolatedDelay, OnePole, Param, ParamInputs, ParamScale};

const MAX_DELAY_SECONDS: f32 = 2.0;

/// Feedback delay with a damped, squeezed feedback path.
pub struct Echo {
    line: InterpolatedDelay,
    damping: OnePole,
    feedback_shaper: Adaa1<fn(f32) -> f32, fn(f32) -> f32>,
    delay_time: Param,
    feedback: Param,
    damp_hz: Param,
    mix: Param,
    sample_rate: f32,
    feedback_sample: f32,
}

impl Echo {
    #[must_use]
    pub fn new(sample_rate: f32) -> Self {
        Self {
            line: InterpolatedDelay::from_time(sample_rate, MAX_DELAY_SECONDS),
            damping: OnePole::new(sample_rate, 8_000.0),
            feedback_shaper: Adaa1::new(squeeze as fn(f32) -> f32, squeeze_ad as fn(f32) -> f32),
            delay_time: Param::new(ParamScale::Logarithmic, 0.001, MAX_DELAY_SECONDS, 0.3),
            feedback: Param::new(ParamScale::Linear, 0.0, 0.98, 0.3),
            damp_hz: Param::new(ParamScale::Logarithmic, 200.0, 18_000.0, 8_000.0),
            mix: Param::new(ParamScale::Linear, 0.0, 1.0, 0.35),
            sample_rate,
            feedback_sample: 0.0,
        }
    }

    pub fn set_delay_seconds(&mut self, seconds: f32) {
        self.delay_time.schedule_value(seconds);
    }

    pub fn set_feedback(&mut self, ratio: f32) {
        self.feedback.schedule_value(ratio);
    }

    pub fn set_damping_hz(&mut self, hz: f32) {
        self.damp_hz.schedule_value(hz);
    }

    pub fn set_mix(&mut self, ratio: f32) {
        self.mix.schedule_value(ratio);
    }
}

impl Effect for Echo {
    fn process(&mut self, input: f32) -> f32 {
        let no_mod = ParamInputs::default();
        self.delay_time.advance(&no_mod);
        self.feedback.advance(&no_mod);
        self.mix.advance(&no_mod);
        let prev_damp = self.damp_hz.value();
        self.damp_hz.advance(&no_mod);
        if self.damp_hz.value() != prev_damp {
            self.damping.set_frequency(self.damp_hz.value());
        }

        let delay_samples = self.delay_time.value() * self.sample_rate;
        let fed = flush_denormal(input + self.feedback_sample * self.feedback.value());
        let wet = self.line.read_write(fed, delay_samples);
        let tamed = self.feedback_shaper.process(wet);
        self.feedback_sample = self.damping.process(tamed);

        wet_dry_mix(input, wet, self.mix.value())
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.line = InterpolatedDelay::from_time(sample_rate, MAX_DELAY_SECONDS);
        self.damping.set_sample_rate(sample_rate);
    }

    fn reset(&mut self) {
        self.line.clear();
        self.damping.reset();
        self.feedback_shaper.reset();
        self.feedback_sample = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_mix_passes_input_through() {
        let mut e = Echo::new(48_000.0);
        e.set_mix(0.0);
        for _ in 0..32 {
            e.process(0.5);
        }
        assert!((e.process(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn repeats_decay_under_unity_feedback() {
        let mut e = Echo::new(48_000.0);
        e.set_delay_seconds(0.01);
        e.set_feedback(0.5);
        e.set_mix(1.0);
        e.process(1.0);
        for _ in 0..480 {
            e.process(0.0);
        }
        let first_repeat = e.process(0.0);
        for _ in 0..480 {
            e.process(0.0);
        }
        let second_repeat = e.process(0.0);
        assert!(second_repeat.abs() < first_repeat.abs() + 1e-6);
    }

    #[test]
    fn maximum_feedback_still_decays_to_exact_silence() {
        let mut e = Echo::new(48_000.0);
        e.set_delay_seconds(0.002);
        e.set_feedback(0.98);
        e.set_mix(1.0);
        e.process(1.0);

        // Track the per-repeat peak: it must shrink monotonically (after
        // the first few trips) and eventually reach exactly zero, because
        // every trip through the squeezed loop is a strict contraction and
        // the denormal flush snaps the last remnant to zero.
        let repeat_len = (0.002_f32 * 48_000.0) as usize;
        let mut last_peak = f32::MAX;
        let mut reached_zero = false;
        for _ in 0..4000 {
            let mut peak = 0.0_f32;
            for _ in 0..repeat_len {
                peak = peak.max(e.process(0.0).abs());
            }
            assert!(peak <= last_peak + 1e-6, "repeat peak grew: {last_peak} -> {peak}");
            last_peak = peak;
            if peak == 0.0 {
                reached_zero = true;
                break;
            }
        }
        assert!(reached_zero, "loop never reached exact silence, peak still {last_peak}");
    }
}
