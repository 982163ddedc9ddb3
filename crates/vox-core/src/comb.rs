//! Feedback comb filter, the decay-building block of the reverb tail.
//!
//! A delay line whose output is fed back into its own input through a
//! [`OnePole`] damping filter — the same damping type the echo's feedback
//! path uses — so every trip around the loop loses a little high end, the
//! way reflections do against real walls. A bank of these at mutually
//! inharmonic lengths builds a reverb's late decay.

use crate::delay::InterpolatedDelay;
use crate::math::flush_denormal;
use crate::one_pole::OnePole;

/// Delay line with damped feedback.
#[derive(Debug, Clone)]
pub struct CombFilter {
    line: InterpolatedDelay,
    damping: OnePole,
    feedback: f32,
    sample_rate: f32,
}

impl CombFilter {
    /// Build a comb with `delay_samples` of loop delay at `sample_rate`.
    /// Damping starts wide open (cutoff near Nyquist).
    #[must_use]
    pub fn new(delay_samples: usize, sample_rate: f32) -> Self {
        Self {
            line: InterpolatedDelay::new(delay_samples),
            damping: OnePole::new(sample_rate, sample_rate * 0.45),
            feedback: 0.5,
            sample_rate,
        }
    }

    /// Loop gain per trip. Clamped below unity; at `0.99` the tail rings
    /// for seconds, at `0.0` the comb is a plain delay tap.
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 0.99);
    }

    /// Cutoff of the in-loop damping filter. Lower values darken the tail
    /// faster.
    pub fn set_damping_hz(&mut self, freq_hz: f32) {
        self.damping
            .set_frequency(freq_hz.clamp(100.0, self.sample_rate * 0.45));
    }

    /// Run one sample through the loop. Returns the delayed output; the
    /// damped, scaled feedback plus the fresh input becomes the new head of
    /// the line.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let delay_samples = (self.line.capacity() - 1) as f32;
        let output = self.line.read(delay_samples);
        let damped = self.damping.process(output);
        self.line.write(flush_denormal(input + damped * self.feedback));
        output
    }

    /// Zero the delay line and damping state.
    pub fn clear(&mut self) {
        self.line.clear();
        self.damping.reset();
    }

    /// Loop delay capacity in samples.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.line.capacity()
    }
}
