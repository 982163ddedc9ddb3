//! One-pole lowpass, the damping filter shared by the echo and reverb
//! delay paths.
//!
//! ```text
//! y[n] = x[n] + coeff * (y[n-1] - x[n]),  coeff = exp(-2π·freq/sample_rate)
//! ```
//!
//! 6 dB/octave, one multiply per sample. Not steep enough for a musical
//! filter stage ([`crate::biquad::Biquad`] covers that), but exactly the
//! gentle high-frequency rolloff each pass through a feedback loop wants:
//! repeats darken gradually the way reflections do in a real room.

use crate::math::flush_denormal;
use libm::expf;

/// One-pole (6 dB/oct) lowpass.
#[derive(Debug, Clone)]
pub struct OnePole {
    state: f32,
    coeff: f32,
    sample_rate: f32,
    freq: f32,
}

impl OnePole {
    /// Build a lowpass with its `-3 dB` point at `freq_hz`.
    #[must_use]
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        let mut filter = Self {
            state: 0.0,
            coeff: 0.0,
            sample_rate,
            freq: freq_hz,
        };
        filter.recompute();
        filter
    }

    /// Move the cutoff.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.freq = freq_hz;
        self.recompute();
    }

    /// Filter one sample. The running state is denormal-flushed since this
    /// filter usually sits inside a feedback loop decaying toward silence.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.state = flush_denormal(input + self.coeff * (self.state - input));
        self.state
    }

    /// Zero the filter state without touching the cutoff.
    pub fn reset(&mut self) {
        self.state = 0.0;
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recompute();
    }

    fn recompute(&mut self) {
        self.coeff = expf(-core::f32::consts::TAU * self.freq / self.sample_rate);
    }
}
