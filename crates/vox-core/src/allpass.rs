//! Schroeder allpass, the diffusion stage of the reverb tail.
//!
//! Flat in magnitude, scrambled in phase: an allpass smears an impulse into
//! a dense cluster of echoes without coloring the spectrum, which is why a
//! short series of them follows the comb bank — the combs build the decay,
//! the allpasses make it sound like a wash instead of discrete repeats.

use crate::delay::InterpolatedDelay;
use crate::math::flush_denormal;

/// Schroeder allpass diffuser:
///
/// ```text
/// y[n] = -x[n] + d[n]
/// d[n+L] = x[n] + g * d[n]
/// ```
#[derive(Debug, Clone)]
pub struct AllpassFilter {
    line: InterpolatedDelay,
    feedback: f32,
}

impl AllpassFilter {
    /// Build a diffuser with `delay_samples` of internal delay.
    #[must_use]
    pub fn new(delay_samples: usize) -> Self {
        Self {
            line: InterpolatedDelay::new(delay_samples),
            feedback: 0.5,
        }
    }

    /// Diffusion coefficient. Stable for `|g| < 1`; around `0.5` for reverb.
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(-0.99, 0.99);
    }

    /// Diffuse one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let delay_samples = (self.line.capacity() - 1) as f32;
        let delayed = self.line.read(delay_samples);
        self.line.write(flush_denormal(input + delayed * self.feedback));
        -input + delayed
    }

    /// Zero the internal delay.
    pub fn clear(&mut self) {
        self.line.clear();
    }

    /// Internal delay capacity in samples.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.line.capacity()
    }
}
