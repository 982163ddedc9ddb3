//! ADAA waveshaping distortion, the `distortion`/`overdrive` chain stages.
//!
//! # Signal flow
//!
//! ```text
//! Input -> Drive (gain) -> ADAA waveshaper -> Tone EQ -> Mix -> soft limit
//! ```
//!
//! `overdrive` and `distortion` in the fixed effects chain are both
//! instances of this type with different default [`WaveShape`]/drive
//! presets, not separate effect types.

use vox_core::math::{
    asymmetric_clip, asymmetric_clip_ad, hard_clip, hard_clip_ad, soft_clip, soft_clip_ad,
    soft_limit, squeeze, squeeze_ad, tape_sat, tape_sat_ad, wet_dry_mix,
};
use vox_core::{Adaa1, Biquad, BiquadType, Effect, Param, ParamInputs, ParamScale};

/// Which waveshaping curve a [`Distortion`] applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveShape {
    SoftClip,
    HardClip,
    Asymmetric,
    TapeSaturation,
    /// Gentle contraction that stays strictly inside the identity line;
    /// the shape a delay feedback loop can iterate without ever diverging.
    Squeeze,
}

fn shaper(shape: WaveShape) -> fn(f32) -> f32 {
    match shape {
        WaveShape::SoftClip => soft_clip,
        WaveShape::HardClip => |x| hard_clip(x, 1.0),
        WaveShape::Asymmetric => asymmetric_clip,
        WaveShape::TapeSaturation => tape_sat,
        WaveShape::Squeeze => squeeze,
    }
}

fn antiderivative(shape: WaveShape) -> fn(f32) -> f32 {
    match shape {
        WaveShape::SoftClip => soft_clip_ad,
        WaveShape::HardClip => |x| hard_clip_ad(x, 1.0),
        WaveShape::Asymmetric => asymmetric_clip_ad,
        WaveShape::TapeSaturation => tape_sat_ad,
        WaveShape::Squeeze => squeeze_ad,
    }
}

/// Drive-gain into an ADAA waveshaper, followed by a tone EQ, wet/dry mix
/// and a final soft limiter safety net.
pub struct Distortion {
    waveshaper: Adaa1<fn(f32) -> f32, fn(f32) -> f32>,
    shape: WaveShape,
    /// Last driven sample fed to the waveshaper; re-seeds the ADAA state
    /// when the shape switches mid-stream.
    last_driven: f32,
    drive: Param,
    tone: Biquad,
    tone_gain_db: Param,
    mix: Param,
    sample_rate: f32,
}

impl Distortion {
    #[must_use]
    pub fn new(sample_rate: f32) -> Self {
        let shape = WaveShape::SoftClip;
        let mut distortion = Self {
            waveshaper: Adaa1::new(shaper(shape), antiderivative(shape)),
            shape,
            last_driven: 0.0,
            drive: Param::new(ParamScale::Linear, 0.0, 40.0, 12.0),
            tone: Biquad::new(),
            tone_gain_db: Param::new(ParamScale::Linear, -12.0, 12.0, 0.0),
            mix: Param::new(ParamScale::Linear, 0.0, 1.0, 1.0),
            sample_rate,
        };
        distortion.recompute_tone();
        distortion
    }

    pub fn set_waveshape(&mut self, shape: WaveShape) {
        if shape != self.shape {
            self.shape = shape;
            self.waveshaper = Adaa1::new(shaper(shape), antiderivative(shape));
            // Seed the new antiderivative at the held input so the first
            // sample after the switch doesn't difference across two
            // unrelated functions.
            self.waveshaper.reset_to(self.last_driven);
        }
    }

    pub fn set_drive_db(&mut self, db: f32) {
        self.drive.schedule_value(db);
    }

    pub fn set_tone_db(&mut self, db: f32) {
        self.tone_gain_db.schedule_value(db);
    }

    pub fn set_mix(&mut self, ratio: f32) {
        self.mix.schedule_value(ratio);
    }

    fn recompute_tone(&mut self) {
        self.tone.set_type(
            BiquadType::PeakingEq,
            1_000.0,
            0.707,
            self.tone_gain_db.value(),
            self.sample_rate,
        );
    }
}

impl Effect for Distortion {
    fn process(&mut self, input: f32) -> f32 {
        let no_mod = ParamInputs::default();
        self.drive.advance(&no_mod);
        let tone_before = self.tone_gain_db.value();
        self.tone_gain_db.advance(&no_mod);
        if self.tone_gain_db.value() != tone_before {
            self.recompute_tone();
        }
        self.mix.advance(&no_mod);

        let drive_gain = vox_core::math::db_to_linear(self.drive.value());
        let driven = input * drive_gain;
        self.last_driven = driven;
        let shaped = self.waveshaper.process(driven);
        let toned = self.tone.process(shaped);
        let wet = soft_limit(toned, 1.0);
        wet_dry_mix(input, wet, self.mix.value())
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recompute_tone();
    }

    fn reset(&mut self) {
        self.waveshaper.reset();
        self.last_driven = 0.0;
        self.tone.clear();
    }
}
