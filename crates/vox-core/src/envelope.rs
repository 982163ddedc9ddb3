//! DAHDSR envelope generator.
//!
//! Delay-Attack-Hold-Decay-Sustain-Release, the shape every voice's amplitude
//! and modulation envelopes are built from. Each stage has its own shape
//! curve (linear through to strongly logarithmic/exponential) and the
//! envelope can be retargeted mid-stage without a click: a release triggered
//! during attack recomputes its curve from the envelope's current value, not
//! from zero.

use libm::powf;

/// Which DAHDSR stage an envelope is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Delay,
    Attack,
    Hold,
    Decay,
    Sustain,
    Release,
    /// Fully decayed after release; the envelope produces silence and the
    /// voice owning it is eligible for reclamation.
    Off,
}

/// One stage's shape: how the `[0, 1]` time-progress through the stage maps
/// onto the `[0, 1]` value-progress. `1.0` is linear; values above `1.0` bow
/// the curve toward a fast start and slow finish, values below `1.0` bow it
/// the other way.
fn shape(progress: f32, curvature: f32) -> f32 {
    if (curvature - 1.0).abs() < 1e-6 {
        progress
    } else {
        powf(progress, curvature)
    }
}

/// A read-only view of an envelope's output, cheap to pass around without
/// borrowing the generator itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeSnapshot {
    pub value: f32,
    pub stage: EnvelopeStage,
}

/// DAHDSR envelope generator, advanced one sample at a time.
#[derive(Debug, Clone)]
pub struct Envelope {
    sample_rate: f32,

    delay_samples: u32,
    attack_samples: u32,
    hold_samples: u32,
    decay_samples: u32,
    release_samples: u32,

    attack_shape: f32,
    decay_shape: f32,
    release_shape: f32,

    sustain_level: f32,

    stage: EnvelopeStage,
    stage_elapsed: u32,
    /// Value the current stage started from; lets a stage retargeted
    /// mid-flight (e.g. note-off during attack) curve from here instead of
    /// from the stage's nominal starting point.
    stage_start_value: f32,
    /// Release duration actually in effect for the current release cycle;
    /// normally equal to `release_samples`, but [`Envelope::release_fast`]
    /// caps it for one cycle without touching the configured release time.
    active_release_samples: u32,
    value: f32,
}

impl Envelope {
    #[must_use]
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            delay_samples: 0,
            attack_samples: seconds_to_samples(0.02, sample_rate),
            hold_samples: 0,
            decay_samples: seconds_to_samples(0.3, sample_rate),
            release_samples: seconds_to_samples(0.3, sample_rate),
            attack_shape: 1.0,
            decay_shape: 1.0,
            release_shape: 1.0,
            sustain_level: 0.7,
            stage: EnvelopeStage::Off,
            stage_elapsed: 0,
            stage_start_value: 0.0,
            active_release_samples: seconds_to_samples(0.3, sample_rate),
            value: 0.0,
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    pub fn set_delay(&mut self, seconds: f32) {
        self.delay_samples = seconds_to_samples(seconds, self.sample_rate);
    }

    pub fn set_attack(&mut self, seconds: f32, shape: f32) {
        self.attack_samples = seconds_to_samples(seconds, self.sample_rate);
        self.attack_shape = shape;
    }

    pub fn set_hold(&mut self, seconds: f32) {
        self.hold_samples = seconds_to_samples(seconds, self.sample_rate);
    }

    pub fn set_decay(&mut self, seconds: f32, shape: f32) {
        self.decay_samples = seconds_to_samples(seconds, self.sample_rate);
        self.decay_shape = shape;
    }

    pub fn set_sustain(&mut self, level: f32) {
        self.sustain_level = level.clamp(0.0, 1.0);
    }

    pub fn set_release(&mut self, seconds: f32, shape: f32) {
        self.release_samples = seconds_to_samples(seconds, self.sample_rate);
        self.release_shape = shape;
    }

    #[must_use]
    pub fn snapshot(&self) -> EnvelopeSnapshot {
        EnvelopeSnapshot {
            value: self.value,
            stage: self.stage,
        }
    }

    #[must_use]
    pub fn value(&self) -> f32 {
        self.value
    }

    #[must_use]
    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    #[must_use]
    pub fn is_off(&self) -> bool {
        self.stage == EnvelopeStage::Off
    }

    /// Begin a new cycle from the delay stage (or attack, if delay is zero).
    pub fn trigger(&mut self) {
        self.stage_start_value = self.value;
        self.enter(if self.delay_samples > 0 {
            EnvelopeStage::Delay
        } else {
            EnvelopeStage::Attack
        });
    }

    /// Move into release from whatever stage is currently active. Retargets
    /// from the envelope's current value rather than jumping to sustain
    /// first, so a release during attack or decay doesn't click.
    pub fn release(&mut self) {
        self.release_with(self.release_samples);
    }

    /// Like [`Envelope::release`], but caps this cycle's release time to at
    /// most `max_seconds` without changing the configured release time.
    /// Used to fade a stolen or cancelled voice out quickly instead of
    /// waiting out a long musical release.
    pub fn release_fast(&mut self, max_seconds: f32) {
        let cap = seconds_to_samples(max_seconds, self.sample_rate);
        self.release_with(self.release_samples.min(cap));
    }

    fn release_with(&mut self, release_samples: u32) {
        if self.stage != EnvelopeStage::Off {
            self.stage_start_value = self.value;
            self.active_release_samples = release_samples;
            self.enter(EnvelopeStage::Release);
        }
    }

    fn enter(&mut self, stage: EnvelopeStage) {
        self.stage = stage;
        self.stage_elapsed = 0;
    }

    /// A zero-sustain envelope is finished once its decay lands: there is
    /// nothing left to sustain or release, so it goes straight to `Off` and
    /// the owning voice becomes reclaimable without waiting for a note-off.
    fn after_decay_stage(&self) -> EnvelopeStage {
        if self.sustain_level <= 1e-6 {
            EnvelopeStage::Off
        } else {
            EnvelopeStage::Sustain
        }
    }

    /// Advance by one sample and return the new value.
    pub fn advance(&mut self) -> f32 {
        match self.stage {
            EnvelopeStage::Off => {}
            EnvelopeStage::Delay => {
                self.value = self.stage_start_value;
                self.stage_elapsed += 1;
                if self.stage_elapsed >= self.delay_samples {
                    self.stage_start_value = self.value;
                    self.enter(EnvelopeStage::Attack);
                }
            }
            EnvelopeStage::Attack => {
                if self.attack_samples == 0 {
                    self.value = 1.0;
                    self.stage_start_value = self.value;
                    self.enter(if self.hold_samples > 0 {
                        EnvelopeStage::Hold
                    } else {
                        EnvelopeStage::Decay
                    });
                } else {
                    self.stage_elapsed += 1;
                    let progress = self.stage_elapsed as f32 / self.attack_samples as f32;
                    let shaped = shape(progress.min(1.0), self.attack_shape);
                    self.value = self.stage_start_value + (1.0 - self.stage_start_value) * shaped;
                    if self.stage_elapsed >= self.attack_samples {
                        self.value = 1.0;
                        self.stage_start_value = self.value;
                        self.enter(if self.hold_samples > 0 {
                            EnvelopeStage::Hold
                        } else {
                            EnvelopeStage::Decay
                        });
                    }
                }
            }
            EnvelopeStage::Hold => {
                self.value = 1.0;
                self.stage_elapsed += 1;
                if self.stage_elapsed >= self.hold_samples {
                    self.stage_start_value = self.value;
                    self.enter(EnvelopeStage::Decay);
                }
            }
            EnvelopeStage::Decay => {
                if self.decay_samples == 0 {
                    self.value = self.sustain_level;
                    self.enter(self.after_decay_stage());
                } else {
                    self.stage_elapsed += 1;
                    let progress = self.stage_elapsed as f32 / self.decay_samples as f32;
                    let shaped = shape(progress.min(1.0), self.decay_shape);
                    self.value =
                        self.stage_start_value + (self.sustain_level - self.stage_start_value) * shaped;
                    if self.stage_elapsed >= self.decay_samples {
                        self.value = self.sustain_level;
                        self.enter(self.after_decay_stage());
                    }
                }
            }
            EnvelopeStage::Sustain => {
                self.value = self.sustain_level;
            }
            EnvelopeStage::Release => {
                if self.active_release_samples == 0 {
                    self.value = 0.0;
                    self.enter(EnvelopeStage::Off);
                } else {
                    self.stage_elapsed += 1;
                    let progress = self.stage_elapsed as f32 / self.active_release_samples as f32;
                    let shaped = shape(progress.min(1.0), self.release_shape);
                    self.value = self.stage_start_value * (1.0 - shaped);
                    if self.stage_elapsed >= self.active_release_samples {
                        self.value = 0.0;
                        self.enter(EnvelopeStage::Off);
                    }
                }
            }
        }
        self.value
    }
}

fn seconds_to_samples(seconds: f32, sample_rate: f32) -> u32 {
    (seconds.max(0.0) * sample_rate).round() as u32
}
