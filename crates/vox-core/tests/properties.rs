//! Property-based tests for the vox-core DSP primitives.
//!
//! Filter stability, parameter convergence, and delay line integrity,
//! exercised with proptest-generated randomized input.

use proptest::prelude::*;
use vox_core::{AllpassFilter, Biquad, BiquadType, CombFilter, InterpolatedDelay, Param, ParamInputs, ParamScale};

fn biquad_type_for(variant: usize) -> BiquadType {
    match variant % 4 {
        0 => BiquadType::LowPass,
        1 => BiquadType::HighPass,
        2 => BiquadType::BandPass,
        _ => BiquadType::Notch,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// For any valid cutoff (20-20000 Hz) and Q (0.1-10.0), Biquad filters
    /// produce finite output for 32 samples of random finite input.
    #[test]
    fn biquad_stability(
        freq in 20.0f32..20000.0f32,
        q in 0.1f32..10.0f32,
        variant in 0usize..4,
        input in prop::array::uniform32(-1.0f32..=1.0f32),
    ) {
        let mut biquad = Biquad::new();
        let filter_type = biquad_type_for(variant);
        biquad.set_type(filter_type, freq, q, 0.0, 48000.0);

        for &sample in &input {
            let out = biquad.process(sample);
            prop_assert!(
                out.is_finite(),
                "Biquad {:?} (freq={}, q={}) produced non-finite output {} for input {}",
                filter_type, freq, q, out, sample
            );
        }
    }

    /// Comb/allpass reverb diffusion primitives stay finite across the
    /// full feedback range for 256 samples of random finite input.
    #[test]
    fn comb_and_allpass_stability(
        feedback in 0.0f32..0.98f32,
        damping_hz in 200.0f32..20000.0f32,
        input in prop::collection::vec(-1.0f32..=1.0f32, 256),
    ) {
        let mut comb = CombFilter::new(480, 48000.0);
        comb.set_feedback(feedback);
        comb.set_damping_hz(damping_hz);
        let mut allpass = AllpassFilter::new(240);
        allpass.set_feedback(feedback);

        for &sample in &input {
            let comb_out = comb.process(sample);
            let allpass_out = allpass.process(sample);
            prop_assert!(comb_out.is_finite(), "comb (feedback={feedback}, damping={damping_hz}) produced {comb_out}");
            prop_assert!(allpass_out.is_finite(), "allpass (feedback={feedback}) produced {allpass_out}");
        }
    }

    /// A Param's linear ramp always reaches its clamped target exactly at
    /// the end of its scheduled duration, for any start/target/duration.
    #[test]
    fn param_linear_ramp_converges(
        initial in -100.0f32..100.0f32,
        target in -100.0f32..100.0f32,
        duration in 1u32..5000,
    ) {
        let mut param = Param::new(ParamScale::Linear, -1000.0, 1000.0, initial);
        param.schedule_linear_ramp(target, duration);
        let no_mod = ParamInputs::default();
        for _ in 0..duration {
            param.advance(&no_mod);
        }
        let diff = (param.value() - target).abs();
        prop_assert!(diff < 1e-2, "ramp from {initial} to {target} over {duration} samples settled at {}, diff {diff}", param.value());
        prop_assert!(param.is_settled(), "ramp should report settled once its duration elapses");
    }

    /// Write N random samples to InterpolatedDelay, read them back at integer
    /// delay N — they must match exactly (no interpolation at integer delays).
    #[test]
    fn delay_line_integrity(
        samples in prop::collection::vec(-1.0f32..=1.0f32, 1..=64),
    ) {
        let n = samples.len();
        let mut delay = InterpolatedDelay::new(n + 1);

        for &s in &samples {
            delay.write(s);
        }

        for (i, &expected) in samples.iter().rev().enumerate() {
            let got = delay.read(i as f32);
            prop_assert!(
                (got - expected).abs() < 1e-6,
                "Delay mismatch at delay={}: expected {}, got {}",
                i, expected, got
            );
        }
    }
}
