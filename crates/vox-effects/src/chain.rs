//! Fixed-order effects chain shared by every voice's output bus:
//!
//! ```text
//! filter1 -> filter2 -> volume1 -> overdrive -> distortion -> chorus ->
//!   echo -> reverb -> volume3 -> out
//! ```
//!
//! The order is not user-reorderable; `volume1`/`volume3` are bare gain
//! multiplies rather than their own effect types. The three time-based
//! stages (chorus, echo, reverb) each carry a [`SideChain`] watching the
//! stage's own input: when the dry signal feeding the stage runs hot the
//! stage's wet contribution ducks out of the way, and it ramps back to
//! unity once the input quiets down.

use vox_core::math::db_to_linear;
use vox_core::{BiquadType, Effect, Param, ParamInputs, ParamScale};
use vox_registry::ParamId;

use crate::chorus::Chorus;
use crate::compressor::SideChain;
use crate::delay::Echo;
use crate::distortion::{Distortion, WaveShape};
use crate::filter::ChainFilter;
use crate::reverb::{Reverb, ReverbTuning};

pub struct EffectsChain {
    filter1: ChainFilter,
    filter2: ChainFilter,
    volume1: Param,
    overdrive: Distortion,
    distortion: Distortion,
    chorus: Chorus,
    chorus_sidechain: SideChain,
    echo: Echo,
    echo_sidechain: SideChain,
    reverb: Reverb,
    reverb_sidechain: SideChain,
    volume3: Param,
}

impl EffectsChain {
    #[must_use]
    pub fn new(sample_rate: f32) -> Self {
        let mut overdrive = Distortion::new(sample_rate);
        overdrive.set_waveshape(WaveShape::SoftClip);
        overdrive.set_drive_db(6.0);
        overdrive.set_mix(0.5);

        let mut distortion = Distortion::new(sample_rate);
        distortion.set_waveshape(WaveShape::HardClip);
        distortion.set_drive_db(0.0);
        distortion.set_mix(0.0);

        Self {
            filter1: ChainFilter::new(sample_rate, BiquadType::LowPass),
            filter2: ChainFilter::new(sample_rate, BiquadType::HighPass),
            volume1: Param::new(ParamScale::Linear, 0.0, 2.0, 1.0),
            overdrive,
            distortion,
            chorus: Chorus::new(sample_rate),
            chorus_sidechain: SideChain::new(sample_rate),
            echo: Echo::new(sample_rate),
            echo_sidechain: SideChain::new(sample_rate),
            reverb: Reverb::new(sample_rate, ReverbTuning::Plate),
            reverb_sidechain: SideChain::new(sample_rate),
            volume3: Param::new(ParamScale::Linear, 0.0, 2.0, 1.0),
        }
    }

    pub fn filter1_mut(&mut self) -> &mut ChainFilter {
        &mut self.filter1
    }

    pub fn filter2_mut(&mut self) -> &mut ChainFilter {
        &mut self.filter2
    }

    pub fn set_volume1(&mut self, gain: f32) {
        self.volume1.schedule_value(gain);
    }

    pub fn overdrive_mut(&mut self) -> &mut Distortion {
        &mut self.overdrive
    }

    pub fn distortion_mut(&mut self) -> &mut Distortion {
        &mut self.distortion
    }

    pub fn chorus_mut(&mut self) -> &mut Chorus {
        &mut self.chorus
    }

    pub fn chorus_sidechain_mut(&mut self) -> &mut SideChain {
        &mut self.chorus_sidechain
    }

    pub fn echo_mut(&mut self) -> &mut Echo {
        &mut self.echo
    }

    pub fn echo_sidechain_mut(&mut self) -> &mut SideChain {
        &mut self.echo_sidechain
    }

    pub fn reverb_mut(&mut self) -> &mut Reverb {
        &mut self.reverb
    }

    pub fn reverb_sidechain_mut(&mut self) -> &mut SideChain {
        &mut self.reverb_sidechain
    }

    pub fn set_volume3(&mut self, gain: f32) {
        self.volume3.schedule_value(gain);
    }

    /// Set an automatable chain parameter by registry id and `[0, 1]`
    /// ratio, denormalized through the registry's range metadata. Returns
    /// whether the chain owns the id; voice/orchestrator ids are ignored
    /// here.
    pub fn set_param_ratio(&mut self, id: ParamId, ratio: f32) -> bool {
        let ratio = ratio.clamp(0.0, 1.0);
        match id {
            ParamId::Filter1Cutoff => self.filter1.set_cutoff(registry_value(id, ratio)),
            ParamId::Filter1Resonance => self.filter1.set_resonance(registry_value(id, ratio)),
            ParamId::Filter2Cutoff => self.filter2.set_cutoff(registry_value(id, ratio)),
            ParamId::Filter2Resonance => self.filter2.set_resonance(registry_value(id, ratio)),
            ParamId::Volume1Gain => self.volume1.set_ratio(ratio),
            ParamId::OverdriveLevel => self.overdrive.set_mix(ratio),
            ParamId::EffectDistortionLevel => self.distortion.set_mix(ratio),
            ParamId::ChorusRate => self.chorus.set_rate(registry_value(id, ratio)),
            ParamId::ChorusDepth => self.chorus.set_depth(ratio),
            ParamId::EchoDelayTime => self.echo.set_delay_seconds(registry_value(id, ratio)),
            ParamId::EchoFeedback => self.echo.set_feedback(registry_value(id, ratio)),
            ParamId::EchoDamping => {
                // Damping ratio to cutoff: 0 leaves the repeats bright,
                // 1 pulls the loop filter down to 200 Hz.
                self.echo.set_damping_hz(18_000.0 * libm::powf(200.0 / 18_000.0, ratio));
            }
            ParamId::ReverbDamping => self.reverb.set_damping(ratio),
            ParamId::ReverbMix => self.reverb.set_mix(ratio),
            ParamId::CompressorThreshold => {
                let threshold = db_to_linear(registry_value(id, ratio));
                self.chorus_sidechain.set_threshold(threshold);
                self.echo_sidechain.set_threshold(threshold);
                self.reverb_sidechain.set_threshold(threshold);
            }
            ParamId::CompressorRatio => {
                let compressor_ratio = registry_value(id, ratio);
                self.chorus_sidechain.set_ratio(compressor_ratio);
                self.echo_sidechain.set_ratio(compressor_ratio);
                self.reverb_sidechain.set_ratio(compressor_ratio);
            }
            ParamId::Volume3Gain => self.volume3.set_ratio(ratio),
            _ => return false,
        }
        true
    }
}

/// Denormalize a `[0, 1]` ratio through a registry entry's range, for
/// setters that take values in their own units.
fn registry_value(id: ParamId, ratio: f32) -> f32 {
    let meta = vox_registry::param_meta(id);
    let scale = match meta.scale {
        vox_registry::ParamScaleKind::Linear => ParamScale::Linear,
        vox_registry::ParamScaleKind::Logarithmic => ParamScale::Logarithmic,
    };
    scale.denormalize(ratio, meta.min, meta.max)
}

/// Run one sample through a stage with its wet contribution scaled by the
/// stage's side-chain gain: the stage still sees every input sample (its
/// delay lines keep filling), but what it *adds* to the dry path is ducked.
fn process_ducked(stage: &mut impl Effect, sidechain: &mut SideChain, input: f32) -> f32 {
    let gain = sidechain.gain_for(input);
    let processed = stage.process(input);
    input + gain * (processed - input)
}

impl Effect for EffectsChain {
    fn process(&mut self, input: f32) -> f32 {
        let no_mod = ParamInputs::default();
        let mut x = input;
        x = self.filter1.process(x);
        x = self.filter2.process(x);
        x *= self.volume1.advance(&no_mod);
        x = self.overdrive.process(x);
        x = self.distortion.process(x);
        x = process_ducked(&mut self.chorus, &mut self.chorus_sidechain, x);
        x = process_ducked(&mut self.echo, &mut self.echo_sidechain, x);
        x = process_ducked(&mut self.reverb, &mut self.reverb_sidechain, x);
        x *= self.volume3.advance(&no_mod);
        x
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.filter1.set_sample_rate(sample_rate);
        self.filter2.set_sample_rate(sample_rate);
        self.overdrive.set_sample_rate(sample_rate);
        self.distortion.set_sample_rate(sample_rate);
        self.chorus.set_sample_rate(sample_rate);
        self.chorus_sidechain.set_sample_rate(sample_rate);
        self.echo.set_sample_rate(sample_rate);
        self.echo_sidechain.set_sample_rate(sample_rate);
        self.reverb.set_sample_rate(sample_rate);
        self.reverb_sidechain.set_sample_rate(sample_rate);
    }

    fn reset(&mut self) {
        self.filter1.reset();
        self.filter2.reset();
        self.overdrive.reset();
        self.distortion.reset();
        self.chorus.reset();
        self.chorus_sidechain.reset();
        self.echo.reset();
        self.echo_sidechain.reset();
        self.reverb.reset();
        self.reverb_sidechain.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_in_produces_silence_out() {
        let mut chain = EffectsChain::new(48_000.0);
        chain.set_volume1(0.0);
        chain.set_volume3(1.0);
        for _ in 0..64 {
            assert_eq!(chain.process(0.0), 0.0);
        }
    }

    #[test]
    fn processes_a_steady_tone_without_blowing_up() {
        let mut chain = EffectsChain::new(48_000.0);
        for i in 0..2000 {
            let input = if i % 100 < 50 { 0.3 } else { -0.3 };
            let out = chain.process(input);
            assert!(out.is_finite());
            assert!(out.abs() < 4.0, "chain output grew unbounded: {out}");
        }
    }

    #[test]
    fn param_ratio_routing_reaches_the_chain_stages() {
        let mut chain = EffectsChain::new(48_000.0);
        assert!(chain.set_param_ratio(ParamId::Volume1Gain, 0.0));
        assert_eq!(chain.process(0.5), 0.0, "a zeroed volume1 should mute the chain");
        assert!(chain.set_param_ratio(ParamId::ReverbMix, 0.0));
        assert!(!chain.set_param_ratio(ParamId::FilterCutoff, 0.5), "voice-owned ids are not the chain's to handle");
    }

    #[test]
    fn a_hot_input_ducks_the_reverb_tail() {
        let mut loud = EffectsChain::new(48_000.0);
        let mut quiet = EffectsChain::new(48_000.0);
        loud.reverb_sidechain_mut().set_threshold(0.2);
        loud.reverb_sidechain_mut().set_attack_seconds(0.001);
        quiet.reverb_sidechain_mut().set_threshold(0.2);
        loud.reverb_mut().set_mix(1.0);
        quiet.reverb_mut().set_mix(1.0);

        // Drive the loud chain hard enough to cross the ducking threshold.
        for _ in 0..1000 {
            loud.process(0.9);
            quiet.process(0.05);
        }
        assert!(
            loud.reverb_sidechain_mut().gain() < quiet.reverb_sidechain_mut().gain(),
            "a hot input should duck the wet contribution harder than a quiet one"
        );
    }
}
