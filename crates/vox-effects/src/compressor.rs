//! Side-chain compression for the effect stages.
//!
//! Each compressable stage watches its own *input* level, not its wet
//! output: when the dry signal feeding the stage runs hot, the stage's wet
//! contribution is ducked out of the way, then ramped back to unity once
//! the input falls below threshold again. The level detector is a
//! decay-and-hold peak tracker; the gain itself moves only through scheduled
//! [`Param`] ramps, so ducking never steps the gain discontinuously.

use vox_core::{Param, ParamInputs, ParamScale};

/// How long, in samples, the gain must sit at unity before the stage stops
/// advancing its gain ramp machinery every sample and short-circuits to a
/// constant `1.0`. One small host block's worth.
const FAST_BYPASS_SAMPLES: u32 = 256;

/// Peak level detector: jumps up to any new maximum instantly, holds it for
/// a fixed window, then decays exponentially toward the signal.
#[derive(Debug, Clone)]
pub struct PeakTracker {
    peak: f32,
    hold_remaining: u32,
    hold_samples: u32,
    decay_coeff: f32,
}

impl PeakTracker {
    /// Track peaks, holding each for `hold_seconds` before decaying with a
    /// time constant of roughly `decay_seconds`.
    #[must_use]
    pub fn new(sample_rate: f32, hold_seconds: f32, decay_seconds: f32) -> Self {
        Self {
            peak: 0.0,
            hold_remaining: 0,
            hold_samples: (hold_seconds.max(0.0) * sample_rate) as u32,
            decay_coeff: decay_coefficient(decay_seconds, sample_rate),
        }
    }

    /// Feed one sample's absolute level; returns the tracked peak.
    #[inline]
    pub fn update(&mut self, level: f32) -> f32 {
        if level >= self.peak {
            self.peak = level;
            self.hold_remaining = self.hold_samples;
        } else if self.hold_remaining > 0 {
            self.hold_remaining -= 1;
        } else {
            self.peak = level + self.decay_coeff * (self.peak - level);
        }
        self.peak
    }

    #[must_use]
    pub fn peak(&self) -> f32 {
        self.peak
    }

    pub fn reset(&mut self) {
        self.peak = 0.0;
        self.hold_remaining = 0;
    }
}

fn decay_coefficient(seconds: f32, sample_rate: f32) -> f32 {
    if seconds <= 0.0 {
        0.0
    } else {
        libm::expf(-1.0 / (seconds * sample_rate))
    }
}

/// The ducking gain attached to one effect stage.
///
/// While the stage's input peak exceeds `threshold`, the gain ramps toward
/// `min(1, threshold / peak / ratio)` over the attack time; once the peak
/// falls back under threshold, it ramps back to unity over the release
/// time. After the gain has sat at unity for a full block it stops doing
/// per-sample ramp bookkeeping entirely until the input crosses threshold
/// again.
#[derive(Debug, Clone)]
pub struct SideChain {
    tracker: PeakTracker,
    gain: Param,
    threshold: f32,
    ratio: f32,
    attack_samples: u32,
    release_samples: u32,
    last_target: f32,
    unity_run: u32,
    sample_rate: f32,
}

impl SideChain {
    #[must_use]
    pub fn new(sample_rate: f32) -> Self {
        Self {
            tracker: PeakTracker::new(sample_rate, 0.01, 0.05),
            gain: Param::new(ParamScale::Linear, 0.0, 1.0, 1.0),
            threshold: 0.5,
            ratio: 2.0,
            attack_samples: (0.01 * sample_rate) as u32,
            release_samples: (0.1 * sample_rate) as u32,
            last_target: 1.0,
            unity_run: FAST_BYPASS_SAMPLES,
            sample_rate,
        }
    }

    /// Linear input level above which ducking engages.
    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold.max(1e-3);
    }

    /// Ducking depth divisor. Higher ratios push the gain further below
    /// `threshold / peak`.
    pub fn set_ratio(&mut self, ratio: f32) {
        self.ratio = ratio.max(1.0);
    }

    pub fn set_attack_seconds(&mut self, seconds: f32) {
        self.attack_samples = (seconds.max(0.0) * self.sample_rate) as u32;
    }

    pub fn set_release_seconds(&mut self, seconds: f32) {
        self.release_samples = (seconds.max(0.0) * self.sample_rate) as u32;
    }

    /// Current gain, `(0, 1]`.
    #[must_use]
    pub fn gain(&self) -> f32 {
        self.gain.value()
    }

    /// Feed one input sample, returning the gain to apply to the stage's
    /// wet contribution this sample.
    pub fn gain_for(&mut self, input: f32) -> f32 {
        let peak = self.tracker.update(input.abs());

        let target = if peak > self.threshold {
            (self.threshold / peak / self.ratio).min(1.0)
        } else {
            1.0
        };

        // Quiet input, gain parked at unity: skip the ramp machinery.
        if target >= 1.0 && self.unity_run >= FAST_BYPASS_SAMPLES {
            return 1.0;
        }

        if (target - self.last_target).abs() > 1e-4 {
            let duration = if target < self.last_target {
                self.attack_samples
            } else {
                self.release_samples
            };
            self.gain.schedule_linear_ramp(target, duration);
            self.last_target = target;
        }

        let gain = self.gain.advance(&ParamInputs::default());
        if gain >= 1.0 - 1e-6 && target >= 1.0 {
            self.unity_run = self.unity_run.saturating_add(1);
        } else {
            self.unity_run = 0;
        }
        gain
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        let attack_seconds = self.attack_samples as f32 / self.sample_rate;
        let release_seconds = self.release_samples as f32 / self.sample_rate;
        self.sample_rate = sample_rate;
        self.attack_samples = (attack_seconds * sample_rate) as u32;
        self.release_samples = (release_seconds * sample_rate) as u32;
        self.tracker = PeakTracker::new(sample_rate, 0.01, 0.05);
    }

    pub fn reset(&mut self) {
        self.tracker.reset();
        self.gain.schedule_value(1.0);
        self.last_target = 1.0;
        self.unity_run = FAST_BYPASS_SAMPLES;
    }
}
