//! Property-based tests for the vox-effects chain: every effect stays
//! finite across its full parameter range for arbitrary finite input, and
//! the full fixed-order chain never blows up regardless of how its stages
//! are configured.

use proptest::prelude::*;
use vox_core::{BiquadType, Effect};
use vox_effects::{ChainFilter, Chorus, Distortion, Echo, EffectsChain, Reverb, ReverbTuning, SideChain, WaveShape};

const SR: f32 = 48000.0;

fn wave_shape_for(variant: usize) -> WaveShape {
    match variant % 5 {
        0 => WaveShape::SoftClip,
        1 => WaveShape::HardClip,
        2 => WaveShape::Asymmetric,
        3 => WaveShape::TapeSaturation,
        _ => WaveShape::Squeeze,
    }
}

fn reverb_tuning_for(variant: usize) -> ReverbTuning {
    match variant % 3 {
        0 => ReverbTuning::SmallRoom,
        1 => ReverbTuning::Plate,
        _ => ReverbTuning::Hall,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn chain_filter_is_stable(
        cutoff in 20.0f32..20000.0f32,
        resonance in 0.1f32..20.0f32,
        input in prop::collection::vec(-1.0f32..=1.0f32, 256),
    ) {
        let mut filter = ChainFilter::new(SR, BiquadType::LowPass);
        filter.set_cutoff(cutoff);
        filter.set_resonance(resonance);
        for &sample in &input {
            let out = filter.process(sample);
            prop_assert!(out.is_finite(), "filter (cutoff={cutoff}, resonance={resonance}) produced {out}");
        }
    }

    #[test]
    fn distortion_is_bounded_for_any_drive(
        variant in 0usize..5,
        drive_db in 0.0f32..40.0f32,
        input in prop::collection::vec(-2.0f32..=2.0f32, 256),
    ) {
        let mut distortion = Distortion::new(SR);
        distortion.set_waveshape(wave_shape_for(variant));
        distortion.set_drive_db(drive_db);
        for &sample in &input {
            let out = distortion.process(sample);
            prop_assert!(out.is_finite(), "distortion produced {out}");
            prop_assert!(out.abs() <= 2.0, "distortion let an out-of-range sample through: {out}");
        }
    }

    #[test]
    fn chorus_is_stable(
        rate_hz in 0.01f32..10.0f32,
        depth in 0.0f32..1.0f32,
        input in prop::collection::vec(-1.0f32..=1.0f32, 512),
    ) {
        let mut chorus = Chorus::new(SR);
        chorus.set_rate(rate_hz);
        chorus.set_depth(depth);
        for &sample in &input {
            let out = chorus.process(sample);
            prop_assert!(out.is_finite(), "chorus produced {out}");
        }
    }

    #[test]
    fn echo_is_stable_below_unity_feedback(
        delay_seconds in 0.001f32..1.5f32,
        feedback in 0.0f32..0.95f32,
        input in prop::collection::vec(-1.0f32..=1.0f32, 512),
    ) {
        let mut echo = Echo::new(SR);
        echo.set_delay_seconds(delay_seconds);
        echo.set_feedback(feedback);
        for &sample in &input {
            let out = echo.process(sample);
            prop_assert!(out.is_finite(), "echo produced {out}");
        }
    }

    #[test]
    fn reverb_is_stable(
        variant in 0usize..3,
        decay in 0.0f32..0.98f32,
        input in prop::collection::vec(-1.0f32..=1.0f32, 1024),
    ) {
        let mut reverb = Reverb::new(SR, reverb_tuning_for(variant));
        reverb.set_decay(decay);
        for &sample in &input {
            let out = reverb.process(sample);
            prop_assert!(out.is_finite(), "reverb produced {out}");
        }
    }

    /// The side-chain gain stays inside `(0, 1]` for any threshold/ratio
    /// configuration and any input — ducking can attenuate a stage's wet
    /// contribution but never invert or amplify it.
    #[test]
    fn sidechain_gain_stays_in_unit_range(
        threshold in 0.01f32..1.0f32,
        ratio in 1.0f32..20.0f32,
        input in prop::collection::vec(-2.0f32..=2.0f32, 512),
    ) {
        let mut sidechain = SideChain::new(SR);
        sidechain.set_threshold(threshold);
        sidechain.set_ratio(ratio);
        for &sample in &input {
            let gain = sidechain.gain_for(sample);
            prop_assert!(gain.is_finite() && gain > 0.0 && gain <= 1.0, "sidechain gain out of range: {gain}");
        }
    }

    /// The full fixed-order chain stays finite for any combination of the
    /// two gain stages and arbitrary input.
    #[test]
    fn effects_chain_is_stable(
        volume1 in 0.0f32..2.0f32,
        volume3 in 0.0f32..2.0f32,
        input in prop::collection::vec(-1.0f32..=1.0f32, 512),
    ) {
        let mut chain = EffectsChain::new(SR);
        chain.set_volume1(volume1);
        chain.set_volume3(volume3);
        for &sample in &input {
            let out = chain.process(sample);
            prop_assert!(out.is_finite(), "chain produced {out}");
        }
    }
}
