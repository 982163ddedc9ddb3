//! Dual-voice chorus, the `chorus` stage of the fixed effects chain.
//!
//! Two delay lines modulated by the same LFO in anti-phase, so the stereo
//! field widens instead of the pitch simply wobbling in place.

use vox_core::math::wet_dry_mix;
use vox_core::{Effect, InterpolatedDelay, Lfo, LfoOutputMode, LfoWaveform, Param, ParamInputs, ParamScale};

const BASE_DELAY_MS: f32 = 7.0;
const MAX_SWING_MS: f32 = 5.0;
const MAX_DELAY_MS: f32 = BASE_DELAY_MS + MAX_SWING_MS + 1.0;

/// Two voices, each a modulated delay line, summed with the dry signal.
pub struct Chorus {
    voice_a: InterpolatedDelay,
    voice_b: InterpolatedDelay,
    lfo: Lfo,
    rate: Param,
    depth: Param,
    mix: Param,
    sample_rate: f32,
}

impl Chorus {
    #[must_use]
    pub fn new(sample_rate: f32) -> Self {
        let mut lfo = Lfo::new(sample_rate, 1.0);
        lfo.set_waveform(LfoWaveform::Sine);
        lfo.set_output_mode(LfoOutputMode::Centered);
        Self {
            voice_a: InterpolatedDelay::from_time(sample_rate, MAX_DELAY_MS / 1000.0),
            voice_b: InterpolatedDelay::from_time(sample_rate, MAX_DELAY_MS / 1000.0),
            lfo,
            rate: Param::new(ParamScale::Logarithmic, 0.1, 10.0, 1.0),
            depth: Param::new(ParamScale::Linear, 0.0, 1.0, 0.5),
            mix: Param::new(ParamScale::Linear, 0.0, 1.0, 0.5),
            sample_rate,
        }
    }

    pub fn set_rate(&mut self, hz: f32) {
        self.rate.schedule_value(hz);
    }

    pub fn set_depth(&mut self, ratio: f32) {
        self.depth.schedule_value(ratio);
    }

    pub fn set_mix(&mut self, ratio: f32) {
        self.mix.schedule_value(ratio);
    }
}

impl Effect for Chorus {
    fn process(&mut self, input: f32) -> f32 {
        let no_mod = ParamInputs::default();
        self.rate.advance(&no_mod);
        self.depth.advance(&no_mod);
        self.mix.advance(&no_mod);
        self.lfo.set_frequency(self.rate.value());

        let swing_ms = MAX_SWING_MS * self.depth.value();
        let lfo_value = self.lfo.next();
        let delay_a_ms = BASE_DELAY_MS + swing_ms * lfo_value;
        let delay_b_ms = BASE_DELAY_MS - swing_ms * lfo_value;

        let delay_a_samples = delay_a_ms * 0.001 * self.sample_rate;
        let delay_b_samples = delay_b_ms * 0.001 * self.sample_rate;

        let a = self.voice_a.read_write(input, delay_a_samples);
        let b = self.voice_b.read_write(input, delay_b_samples);
        let wet = (a + b) * 0.5;

        wet_dry_mix(input, wet, self.mix.value())
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.lfo.set_sample_rate(sample_rate);
        self.voice_a = InterpolatedDelay::from_time(sample_rate, MAX_DELAY_MS / 1000.0);
        self.voice_b = InterpolatedDelay::from_time(sample_rate, MAX_DELAY_MS / 1000.0);
    }

    fn reset(&mut self) {
        self.voice_a.clear();
        self.voice_b.clear();
        self.lfo.reset();
    }
}
