//! Smoothed, modulatable parameters with source-binding precedence.
//!
//! A [`Param`] holds a value in `[min, max]`, reachable either by scheduling
//! a local ramp (`schedule_value` / `schedule_linear_ramp` /
//! `schedule_curved_ramp`) or by binding it to a modulation source. When a
//! higher-precedence source is active it overrides the local schedule
//! entirely for that sample; the precedence order, highest first, is:
//!
//! ```text
//! envelope > lfo > macro > midi_controller > local schedule
//! ```
//!
//! Values are stored denormalized (in the param's own units); [`ParamScale`]
//! controls how a `[0, 1]` modulation ratio maps onto that range, so a
//! frequency param and a mix param can both be driven by the same `0..1`
//! envelope output.

use libm::{expf, logf, powf};

/// How a `[0, 1]` modulation ratio maps onto a param's `[min, max]` range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamScale {
    /// `value = min + ratio * (max - min)`
    Linear,
    /// `value = min * (max / min) ^ ratio` — equal ratios give equal pitch/
    /// gain-like perceptual steps. `min` must be `> 0`.
    Logarithmic,
}

impl ParamScale {
    /// Map a value in `[min, max]` to a ratio in `[0, 1]`.
    #[must_use]
    pub fn normalize(self, value: f32, min: f32, max: f32) -> f32 {
        match self {
            ParamScale::Linear => {
                if max <= min {
                    0.0
                } else {
                    ((value - min) / (max - min)).clamp(0.0, 1.0)
                }
            }
            ParamScale::Logarithmic => {
                if min <= 0.0 || max <= min {
                    0.0
                } else {
                    (logf(value.max(min) / min) / logf(max / min)).clamp(0.0, 1.0)
                }
            }
        }
    }

    /// Map a ratio in `[0, 1]` to a value in `[min, max]`.
    #[must_use]
    pub fn denormalize(self, ratio: f32, min: f32, max: f32) -> f32 {
        let ratio = ratio.clamp(0.0, 1.0);
        match self {
            ParamScale::Linear => min + ratio * (max - min),
            ParamScale::Logarithmic => {
                if min <= 0.0 {
                    min + ratio * (max - min)
                } else {
                    min * powf(max / min, ratio)
                }
            }
        }
    }
}

/// Which modulation source, if any, is currently driving a [`Param`]. Used
/// only for introspection/UI feedback — the actual precedence resolution
/// happens per-sample in [`Param::advance`] based on which `ParamInputs`
/// fields are `Some`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSource {
    /// No modulation source bound; the local schedule/ramp drives the value.
    Local,
    /// Driven by an envelope generator.
    Envelope,
    /// Driven by an LFO.
    Lfo,
    /// Driven by a macro controller.
    Macro,
    /// Driven by a raw MIDI CC.
    MidiController,
}

/// Per-sample modulation inputs a [`Param`] checks in precedence order.
/// Each field is a ratio in `[0, 1]`; `None` means that source isn't
/// currently bound or has nothing new to contribute this sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParamInputs {
    /// Envelope output ratio, highest precedence.
    pub envelope: Option<f32>,
    /// LFO output ratio.
    pub lfo: Option<f32>,
    /// Macro output ratio.
    pub macro_value: Option<f32>,
    /// Raw MIDI controller ratio, lowest-precedence modulation source.
    pub midi_controller: Option<f32>,
}

impl ParamInputs {
    /// Resolve which source wins this sample, by precedence.
    #[must_use]
    pub fn resolve(&self) -> Option<(ParamSource, f32)> {
        if let Some(r) = self.envelope {
            Some((ParamSource::Envelope, r))
        } else if let Some(r) = self.lfo {
            Some((ParamSource::Lfo, r))
        } else if let Some(r) = self.macro_value {
            Some((ParamSource::Macro, r))
        } else if let Some(r) = self.midi_controller {
            Some((ParamSource::MidiController, r))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Ramp {
    None,
    Linear {
        target: f32,
        increment: f32,
        remaining: u32,
    },
    Curved {
        start: f32,
        target: f32,
        total_samples: u32,
        remaining: u32,
        curvature: f32,
    },
}

/// A smoothed, modulatable parameter.
#[derive(Debug, Clone)]
pub struct Param {
    scale: ParamScale,
    min: f32,
    max: f32,
    value: f32,
    ramp: Ramp,
    change_index: u64,
    active_source: ParamSource,
}

impl Param {
    /// Create a param with the given scale, range, and initial value
    /// (clamped into `[min, max]`).
    #[must_use]
    pub fn new(scale: ParamScale, min: f32, max: f32, initial: f32) -> Self {
        Self {
            scale,
            min,
            max,
            value: initial.clamp(min, max),
            ramp: Ramp::None,
            change_index: 0,
            active_source: ParamSource::Local,
        }
    }

    /// Current denormalized value, as of the last `advance`.
    #[must_use]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Current value expressed as a `[0, 1]` ratio through this param's
    /// scale.
    #[must_use]
    pub fn ratio(&self) -> f32 {
        self.scale.normalize(self.value, self.min, self.max)
    }

    /// Which source last drove this param's value.
    #[must_use]
    pub fn active_source(&self) -> ParamSource {
        self.active_source
    }

    /// Increments every time `value` actually changes; lets downstream
    /// producers cheaply detect "did this param change since I last looked"
    /// without storing a copy of the value itself.
    #[must_use]
    pub fn change_index(&self) -> u64 {
        self.change_index
    }

    /// Cancel any in-flight local ramp, freezing at the current value.
    pub fn cancel_events(&mut self) {
        self.ramp = Ramp::None;
    }

    /// Jump immediately to a value, cancelling any ramp.
    pub fn schedule_value(&mut self, value: f32) {
        self.ramp = Ramp::None;
        self.set_value(value.clamp(self.min, self.max));
    }

    /// Jump immediately to the value a `[0, 1]` ratio maps to through this
    /// param's scale, cancelling any ramp. The entry point external callers
    /// (automation, control messages) use; out-of-range ratios clamp.
    pub fn set_ratio(&mut self, ratio: f32) {
        self.ramp = Ramp::None;
        let value = self.scale.denormalize(ratio, self.min, self.max);
        self.set_value(value);
    }

    /// Begin a linear ramp from the current value to `target` over
    /// `duration_samples`.
    pub fn schedule_linear_ramp(&mut self, target: f32, duration_samples: u32) {
        let target = target.clamp(self.min, self.max);
        if duration_samples == 0 {
            self.schedule_value(target);
            return;
        }
        let increment = (target - self.value) / duration_samples as f32;
        self.ramp = Ramp::Linear {
            target,
            increment,
            remaining: duration_samples,
        };
    }

    /// Begin a curved ramp from the current value to `target` over
    /// `duration_samples`. `curvature > 1.0` front-loads the change (fast
    /// start, slow approach); `curvature < 1.0` does the opposite;
    /// `curvature == 1.0` is equivalent to a linear ramp.
    pub fn schedule_curved_ramp(&mut self, target: f32, duration_samples: u32, curvature: f32) {
        let target = target.clamp(self.min, self.max);
        if duration_samples == 0 || curvature <= 0.0 {
            self.schedule_value(target);
            return;
        }
        self.ramp = Ramp::Curved {
            start: self.value,
            target,
            total_samples: duration_samples,
            remaining: duration_samples,
            curvature,
        };
    }

    /// True once any in-flight ramp has reached its target.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self.ramp, Ramp::None)
    }

    /// Advance by one sample, resolving modulation-source precedence over
    /// the local schedule, and return the new value.
    pub fn advance(&mut self, inputs: &ParamInputs) -> f32 {
        if let Some((source, ratio)) = inputs.resolve() {
            self.active_source = source;
            let value = self.scale.denormalize(ratio, self.min, self.max);
            self.set_value(value);
            return self.value;
        }

        self.active_source = ParamSource::Local;
        match self.ramp {
            Ramp::None => {}
            Ramp::Linear {
                target,
                increment,
                ref mut remaining,
            } => {
                let next = self.value + increment;
                *remaining -= 1;
                if *remaining == 0 {
                    self.ramp = Ramp::None;
                    self.set_value(target);
                } else {
                    self.set_value(next);
                }
            }
            Ramp::Curved {
                start,
                target,
                total_samples,
                ref mut remaining,
                curvature,
            } => {
                *remaining -= 1;
                let elapsed = total_samples - *remaining;
                let progress = elapsed as f32 / total_samples as f32;
                let shaped = curved_progress(progress, curvature);
                let next = start + (target - start) * shaped;
                if *remaining == 0 {
                    self.ramp = Ramp::None;
                    self.set_value(target);
                } else {
                    self.set_value(next);
                }
            }
        }
        self.value
    }

    /// Advance a whole block, writing the per-sample value into `out`.
    /// `inputs` supplies one `ParamInputs` per sample; if shorter than
    /// `out`, the remaining samples fall back to the local schedule.
    pub fn advance_block(&mut self, out: &mut [f32], inputs: &[ParamInputs]) {
        for (i, slot) in out.iter_mut().enumerate() {
            let empty = ParamInputs::default();
            let input = inputs.get(i).unwrap_or(&empty);
            *slot = self.advance(input);
        }
    }

    fn set_value(&mut self, value: f32) {
        let value = value.clamp(self.min, self.max);
        if value != self.value {
            self.change_index += 1;
        }
        self.value = value;
    }
}

/// Which active voice a polyphonic parameter's value should track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceStatus {
    /// The most recently triggered voice.
    Last,
    /// The longest-sounding voice.
    Oldest,
    /// The voice with the highest note number.
    Highest,
    /// The voice with the lowest note number.
    Lowest,
}

impl VoiceStatus {
    /// Pick the note satisfying this status among `(note, age)` pairs, where
    /// a larger `age` means a more recently triggered voice. `None` if no
    /// voice is active.
    #[must_use]
    pub fn select(self, notes: &[(u8, u64)]) -> Option<u8> {
        match self {
            VoiceStatus::Last => notes.iter().max_by_key(|(_, age)| *age).map(|&(n, _)| n),
            VoiceStatus::Oldest => notes.iter().min_by_key(|(_, age)| *age).map(|&(n, _)| n),
            VoiceStatus::Highest => notes.iter().max_by_key(|(n, _)| *n).map(|&(n, _)| n),
            VoiceStatus::Lowest => notes.iter().min_by_key(|(n, _)| *n).map(|&(n, _)| n),
        }
    }
}

/// A [`Param`] whose value tracks whichever active voice satisfies a
/// [`VoiceStatus`], re-reading only when the voice satisfying that status
/// actually changes (so a chord held steady doesn't keep re-triggering a
/// ramp every block just because the note set is re-evaluated).
#[derive(Debug, Clone)]
pub struct PolyphonicParam {
    param: Param,
    status: VoiceStatus,
    tracked_note: Option<u8>,
}

impl PolyphonicParam {
    #[must_use]
    pub fn new(param: Param, status: VoiceStatus) -> Self {
        Self {
            param,
            status,
            tracked_note: None,
        }
    }

    #[must_use]
    pub fn param(&self) -> &Param {
        &self.param
    }

    pub fn param_mut(&mut self) -> &mut Param {
        &mut self.param
    }

    /// Re-evaluate which note satisfies this param's [`VoiceStatus`] among
    /// the currently active `(note, age)` pairs. Returns `Some(note)` if the
    /// tracked note just changed (the caller should re-read that voice's
    /// source value and schedule it onto the inner `Param`), or `None` if
    /// the same note still satisfies the status.
    pub fn refresh(&mut self, active_notes: &[(u8, u64)]) -> Option<u8> {
        let selected = self.status.select(active_notes);
        if selected != self.tracked_note {
            self.tracked_note = selected;
            selected
        } else {
            None
        }
    }
}

/// A [`Param`] with one independent value per MIDI channel, for MPE
/// expression (per-note pitch bend, pressure, timbre) that must not bleed
/// across channels.
#[derive(Debug, Clone)]
pub struct MpeParam {
    channels: [Param; 16],
}

impl MpeParam {
    /// Build from a template param, cloned into all 16 channel slots.
    #[must_use]
    pub fn new(template: Param) -> Self {
        Self {
            channels: core::array::from_fn(|_| template.clone()),
        }
    }

    pub fn channel_mut(&mut self, channel: usize) -> &mut Param {
        &mut self.channels[channel % 16]
    }

    #[must_use]
    pub fn channel(&self, channel: usize) -> &Param {
        &self.channels[channel % 16]
    }
}

/// Map linear progress `[0, 1]` through an exponential-feeling curve.
/// `curvature == 1.0` is the identity (linear); values above and below bend
/// the early part of the ramp faster or slower, matching the same
/// exponential-approach family used by [`crate::envelope::Envelope`]'s stage
/// shaping.
fn curved_progress(progress: f32, curvature: f32) -> f32 {
    if (curvature - 1.0).abs() < 1e-6 {
        return progress;
    }
    let k = curvature.max(0.01);
    (1.0 - expf(-k * progress)) / (1.0 - expf(-k))
}
