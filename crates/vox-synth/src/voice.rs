//! A single polyphonic voice: a two-oscillator FM/AM pair (modulator
//! feeding a carrier), its own amplitude and modulation envelopes, filter,
//! waveshaper and wavefolder — the per-voice chain, rendered independently
//! of the shared effects chain every voice's output is later mixed into.
//!
//! The voice's modulatable params (filter cutoff, carrier amplitude) are
//! driven through [`ParamInputs`] built by a [`ModRouting`] each sample:
//! whichever enabled source wins the precedence resolution
//! (`envelope > lfo > macro > midi_controller`) overrides the param's local
//! schedule for that sample. The amplitude envelope itself stays a
//! multiplicative VCA on the output; the assignable envelope source is the
//! voice's second (modulation) envelope.

use vox_core::{
    Adaa1, Biquad, BiquadFilterSharedBuffers, BiquadType, CustomWaveform, Envelope, Lfo,
    LfoWaveform, NoteTuning, Param, ParamInputs, ParamScale, Wavetable, WavetableState,
};
use vox_core::math::{sine_fold, sine_fold_ad, soft_clip, soft_clip_ad};
use vox_registry::ParamId;

use crate::modulation::{ModRouting, ModulationFrame};

/// Fold amount below which the wavefolder stage is crossfaded back to its
/// dry input instead of running at full strength — keeps a fold knob sitting
/// near zero from clicking as it crosses into folding territory.
const FOLD_TRANSITION: f32 = 0.02;

/// Which shared wavetable a voice's oscillator reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveformKind {
    Sawtooth,
    Square,
    Triangle,
    /// Rendered from the owning voice's own [`CustomWaveform`] rather than a
    /// shared [`WavetableSet`] table.
    Custom,
}

impl WaveformKind {
    fn from_index(index: usize) -> Self {
        match index {
            0 => WaveformKind::Sawtooth,
            1 => WaveformKind::Square,
            2 => WaveformKind::Triangle,
            _ => WaveformKind::Custom,
        }
    }
}

/// Wavetables shared by every voice in a [`crate::Bus`], built once at
/// construction. Row selection per note still happens per-voice (it depends
/// on frequency), but the underlying harmonic tables are common.
pub struct WavetableSet {
    pub sawtooth: Wavetable,
    pub square: Wavetable,
    pub triangle: Wavetable,
}

impl WavetableSet {
    #[must_use]
    pub fn new() -> Self {
        let partials_by_row: [u32; 10] = [1, 2, 4, 8, 16, 32, 64, 128, 256, 512];
        Self {
            sawtooth: Wavetable::sawtooth(&partials_by_row),
            square: Wavetable::square(&partials_by_row),
            triangle: Wavetable::triangle(&partials_by_row),
        }
    }

    fn table_for(&self, kind: WaveformKind) -> &Wavetable {
        match kind {
            WaveformKind::Sawtooth => &self.sawtooth,
            WaveformKind::Square => &self.square,
            WaveformKind::Triangle => &self.triangle,
            // Custom waveforms render from a voice's own CustomWaveform;
            // callers branch on WaveformKind::Custom before reaching here.
            WaveformKind::Custom => &self.sawtooth,
        }
    }
}

impl Default for WavetableSet {
    fn default() -> Self {
        Self::new()
    }
}

/// One polyphonic voice. The modulator oscillator's output is fed as FM into
/// the carrier (classic two-operator FM), then the carrier is amplitude-
/// shaped by the voice's own envelope, filtered and waveshaped.
pub struct Voice {
    note: Option<u8>,
    channel: u8,
    velocity: f32,
    age: u64,
    /// Current sounding pitch as a MIDI note number, ramped toward `note` by
    /// [`Voice::glide_to`] rather than snapping instantly.
    glide_note: Param,
    note_off_seen: bool,

    /// Per-note analog-drift scalar in `[0.1, 1.0]`, redrawn on every
    /// note-on from this voice's own deterministic sequence. Scaled by
    /// `drift_amount` into a small pitch offset, so two voices playing the
    /// same patch never land on exactly the same frequency the way two
    /// oscillators of a real analog poly never would.
    inaccuracy: f32,
    drift_amount: Param,
    rng_state: u32,

    modulator_state: WavetableState,
    modulator_waveform: WaveformKind,
    modulator_amplitude: Param,
    modulator_ratio: Param,
    modulator_custom: CustomWaveform,

    carrier_state: WavetableState,
    carrier_waveform: WaveformKind,
    carrier_amplitude: Param,
    amplitude_mod: ModRouting,
    carrier_custom: CustomWaveform,

    filter: Biquad,
    filter_type: BiquadType,
    filter_cutoff: Param,
    filter_resonance: Param,
    cutoff_mod: ModRouting,

    envelope: Envelope,
    /// The assignable modulation envelope: the `envelope` source every
    /// [`ModRouting`] on this voice refers to. Triggered and released in
    /// lockstep with the amplitude envelope.
    mod_envelope: Envelope,

    lfo: Lfo,
    lfo_to_pitch: Param,

    waveshaper: Adaa1<fn(f32) -> f32, fn(f32) -> f32>,
    shaper_drive: Param,
    /// Dry/wet crossfade for the waveshaper stage; zero keeps the voice
    /// clean while the shaper's state stays warm underneath.
    shaper_mix: Param,

    /// Post-distortion wavefolder: `sin(x)` stays within a fixed `±1`
    /// extremum at any drive level, unlike a clipper, so the fold can be
    /// driven hard without the output ever needing a second safety clamp.
    folder: Adaa1<fn(f32) -> f32, fn(f32) -> f32>,
    fold_amount: Param,

    sample_rate: f32,
}

impl Voice {
    #[must_use]
    pub fn new(sample_rate: f32) -> Self {
        Self::with_seed(sample_rate, 0x9E37_79B9)
    }

    /// Build a voice with its own drift-sequence seed. Each voice in a pool
    /// gets a different seed so their note-on drift draws never line up.
    #[must_use]
    pub fn with_seed(sample_rate: f32, seed: u32) -> Self {
        Self {
            note: None,
            channel: 0,
            velocity: 0.0,
            age: 0,
            glide_note: Param::new(ParamScale::Linear, 0.0, 127.0, 69.0),
            note_off_seen: false,
            inaccuracy: 0.55,
            drift_amount: Param::new(ParamScale::Linear, 0.0, 1.0, 0.0),
            rng_state: if seed == 0 { 1 } else { seed },
            modulator_state: WavetableState::default(),
            modulator_waveform: WaveformKind::Sawtooth,
            modulator_amplitude: Param::new(ParamScale::Linear, 0.0, 1.0, 0.0),
            modulator_ratio: Param::new(ParamScale::Linear, 0.0, 16.0, 1.0),
            modulator_custom: CustomWaveform::new(),
            carrier_state: WavetableState::default(),
            carrier_waveform: WaveformKind::Sawtooth,
            carrier_amplitude: Param::new(ParamScale::Linear, 0.0, 1.0, 1.0),
            amplitude_mod: ModRouting::default(),
            carrier_custom: CustomWaveform::new(),
            filter: Biquad::new(),
            filter_type: BiquadType::LowPass,
            filter_cutoff: Param::new(ParamScale::Logarithmic, 20.0, sample_rate * 0.5, 12_000.0),
            filter_resonance: Param::new(ParamScale::Logarithmic, 0.1, 20.0, 0.707),
            cutoff_mod: ModRouting::default(),
            envelope: Envelope::new(sample_rate),
            mod_envelope: Envelope::new(sample_rate),
            lfo: Lfo::new(sample_rate, 5.0),
            lfo_to_pitch: Param::new(ParamScale::Linear, 0.0, 1.0, 0.0),
            waveshaper: Adaa1::new(soft_clip as fn(f32) -> f32, soft_clip_ad as fn(f32) -> f32),
            shaper_drive: Param::new(ParamScale::Linear, 1.0, 8.0, 1.0),
            shaper_mix: Param::new(ParamScale::Linear, 0.0, 1.0, 0.0),
            folder: Adaa1::new(sine_fold as fn(f32) -> f32, sine_fold_ad as fn(f32) -> f32),
            fold_amount: Param::new(ParamScale::Linear, 0.0, 1.0, 0.0),
            sample_rate,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.note.is_some() && !self.envelope.is_off()
    }

    #[must_use]
    pub fn note(&self) -> Option<u8> {
        self.note
    }

    /// MIDI channel the current note arrived on.
    #[must_use]
    pub fn channel(&self) -> u8 {
        self.channel
    }

    #[must_use]
    pub fn age(&self) -> u64 {
        self.age
    }

    pub fn set_modulator_waveform(&mut self, kind: WaveformKind) {
        self.modulator_waveform = kind;
    }

    pub fn set_carrier_waveform(&mut self, kind: WaveformKind) {
        self.carrier_waveform = kind;
    }

    /// Set one of the modulator's up-to-10 custom harmonic coefficients.
    /// Only has an audible effect once [`Voice::set_modulator_waveform`] is
    /// set to [`WaveformKind::Custom`].
    pub fn set_modulator_harmonic(&mut self, index: usize, amplitude: f32) {
        self.modulator_custom.set_harmonic(index, amplitude);
    }

    /// Set one of the carrier's up-to-10 custom harmonic coefficients. Only
    /// has an audible effect once [`Voice::set_carrier_waveform`] is set to
    /// [`WaveformKind::Custom`].
    pub fn set_carrier_harmonic(&mut self, index: usize, amplitude: f32) {
        self.carrier_custom.set_harmonic(index, amplitude);
    }

    pub fn set_modulator_amplitude(&mut self, ratio: f32) {
        self.modulator_amplitude.schedule_value(ratio);
    }

    pub fn set_modulator_ratio(&mut self, ratio: f32) {
        self.modulator_ratio.schedule_value(ratio);
    }

    pub fn set_filter_cutoff(&mut self, hz: f32) {
        self.filter_cutoff.schedule_value(hz);
    }

    pub fn set_filter_resonance(&mut self, q: f32) {
        self.filter_resonance.schedule_value(q);
    }

    pub fn set_fold_amount(&mut self, amount: f32) {
        self.fold_amount.schedule_value(amount);
    }

    /// How strongly the per-note drift scalar detunes this voice, `[0, 1]`.
    /// Zero (the default) disables drift entirely.
    pub fn set_drift_amount(&mut self, amount: f32) {
        self.drift_amount.schedule_value(amount);
    }

    /// Waveshaper drive, `[1, 8]`.
    pub fn set_shaper_drive(&mut self, drive: f32) {
        self.shaper_drive.schedule_value(drive);
    }

    /// Waveshaper dry/wet crossfade, `[0, 1]`. At zero the stage is a
    /// transparent bypass.
    pub fn set_shaper_mix(&mut self, ratio: f32) {
        self.shaper_mix.schedule_value(ratio);
    }

    /// Route modulation sources onto the filter cutoff.
    pub fn set_cutoff_routing(&mut self, routing: ModRouting) {
        self.cutoff_mod = routing;
    }

    /// Route modulation sources onto the carrier amplitude.
    pub fn set_amplitude_routing(&mut self, routing: ModRouting) {
        self.amplitude_mod = routing;
    }

    /// The voice's amplitude envelope, for patch programming.
    pub fn envelope_mut(&mut self) -> &mut Envelope {
        &mut self.envelope
    }

    /// The voice's assignable modulation envelope, for patch programming.
    pub fn mod_envelope_mut(&mut self) -> &mut Envelope {
        &mut self.mod_envelope
    }

    /// The drift scalar drawn at the last note-on, `[0.1, 1.0]`.
    #[must_use]
    pub fn inaccuracy(&self) -> f32 {
        self.inaccuracy
    }

    /// Current filter cutoff in Hz, as of the last rendered sample.
    #[must_use]
    pub fn filter_cutoff_hz(&self) -> f32 {
        self.filter_cutoff.value()
    }

    /// Set an automatable param by registry id and `[0, 1]` ratio. Returns
    /// whether this voice owns the id; ids owned by other components are
    /// ignored here.
    pub fn set_param_ratio(&mut self, id: ParamId, ratio: f32) -> bool {
        let ratio = ratio.clamp(0.0, 1.0);
        match id {
            ParamId::ModulatorAmplitude => self.modulator_amplitude.set_ratio(ratio),
            ParamId::ModulatorRatio => self.modulator_ratio.set_ratio(ratio),
            ParamId::ModulatorWaveform => {
                self.modulator_waveform = WaveformKind::from_index((ratio * 3.0).round() as usize);
            }
            ParamId::CarrierAmplitude => self.carrier_amplitude.set_ratio(ratio),
            ParamId::CarrierWaveform => {
                self.carrier_waveform = WaveformKind::from_index((ratio * 3.0).round() as usize);
            }
            ParamId::FilterCutoff => self.filter_cutoff.set_ratio(ratio),
            ParamId::FilterResonance => self.filter_resonance.set_ratio(ratio),
            ParamId::FilterType => {
                self.filter_type = match (ratio * 3.0).round() as usize {
                    0 => BiquadType::LowPass,
                    1 => BiquadType::HighPass,
                    2 => BiquadType::BandPass,
                    _ => BiquadType::Notch,
                };
            }
            ParamId::DistortionLevel => self.shaper_mix.set_ratio(ratio),
            ParamId::WavefolderFold => self.fold_amount.set_ratio(ratio),
            ParamId::Envelope1Attack => {
                let seconds = registry_value(ParamId::Envelope1Attack, ratio);
                self.envelope.set_attack(seconds, 1.0);
            }
            ParamId::Envelope1Decay => {
                let seconds = registry_value(ParamId::Envelope1Decay, ratio);
                self.envelope.set_decay(seconds, 1.0);
            }
            ParamId::Envelope1Sustain => self.envelope.set_sustain(ratio),
            ParamId::Envelope1Release => {
                let seconds = registry_value(ParamId::Envelope1Release, ratio);
                self.envelope.set_release(seconds, 1.0);
            }
            ParamId::Lfo1Frequency => {
                self.lfo.set_frequency(registry_value(ParamId::Lfo1Frequency, ratio));
            }
            ParamId::Lfo1Amount => self.lfo_to_pitch.set_ratio(ratio),
            ParamId::Lfo1Waveform => {
                self.lfo.set_waveform(match (ratio * 4.0).round() as usize {
                    0 => LfoWaveform::Sine,
                    1 => LfoWaveform::Triangle,
                    2 => LfoWaveform::Saw,
                    3 => LfoWaveform::Square,
                    _ => LfoWaveform::SampleAndHold,
                });
            }
            ParamId::VoiceDrift => self.drift_amount.set_ratio(ratio),
            _ => return false,
        }
        true
    }

    fn next_random(&mut self) -> f32 {
        let mut x = self.rng_state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng_state = x;
        (x as f32) / (u32::MAX as f32)
    }

    /// Draw the per-note drift scalar: a symmetric center-biased spread on
    /// `[0.1, 1.0]`. Shaping the uniform draw by `|v|^1.5` clusters draws
    /// near the nominal 0.55 the way component tolerances cluster near
    /// spec, and lands the standard deviation at `0.45/2 = 0.225`.
    fn draw_inaccuracy(&mut self) -> f32 {
        let v = 2.0 * self.next_random() - 1.0;
        let shaped = v.signum() * libm::powf(v.abs(), 1.5);
        0.55 + 0.45 * shaped
    }

    pub fn note_on(&mut self, channel: u8, note: u8, velocity: u8, age: u64) {
        self.note = Some(note);
        self.channel = channel;
        self.velocity = f32::from(velocity) / 127.0;
        self.age = age;
        self.note_off_seen = false;
        self.inaccuracy = self.draw_inaccuracy();
        self.glide_note.schedule_value(f32::from(note));
        self.modulator_state.reset();
        self.carrier_state.reset();
        self.envelope.trigger();
        self.mod_envelope.trigger();
    }

    /// Re-enter the envelopes' attack stage for a new note on an already-
    /// sounding voice, without resetting oscillator phase or velocity — the
    /// legato counterpart to [`Voice::note_on`]'s hard retrigger. Since
    /// [`Envelope::trigger`] retargets from its current value rather than
    /// snapping to zero, this doesn't click even mid-decay.
    pub fn retrigger(&mut self, channel: u8, note: u8, age: u64) {
        self.note = Some(note);
        self.channel = channel;
        self.age = age;
        self.note_off_seen = false;
        self.glide_note.schedule_value(f32::from(note));
        self.envelope.trigger();
        self.mod_envelope.trigger();
    }

    /// Change the sounding note without retriggering the envelopes, gliding
    /// the pitch there over `glide_samples` instead of snapping — portamento.
    pub fn glide_to(&mut self, channel: u8, note: u8, glide_samples: u32) {
        self.note = Some(note);
        self.channel = channel;
        self.glide_note.schedule_linear_ramp(f32::from(note), glide_samples.max(1));
    }

    pub fn note_off(&mut self) {
        self.note_off_seen = true;
        self.envelope.release();
        self.mod_envelope.release();
    }

    /// Force a quick, click-free fade-out regardless of the configured
    /// release time, capped at `max_seconds` — used to free a stolen voice
    /// fast rather than waiting out a long musical release.
    pub fn cancel_note_smoothly(&mut self, max_seconds: f32) {
        self.note_off_seen = true;
        self.envelope.release_fast(max_seconds);
        self.mod_envelope.release_fast(max_seconds);
    }

    /// True once a `note_off`/`cancel_note_smoothly` has arrived for the
    /// current note, i.e. the voice is releasing (or done releasing).
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.note_off_seen
    }

    /// True if this voice's envelope already reached silence on its own
    /// (e.g. a zero-sustain patch finishing its decay) before any
    /// `note_off`/`cancel_note_smoothly` call arrived for it.
    #[must_use]
    pub fn has_decayed_before_note_off(&self) -> bool {
        self.envelope.is_off() && !self.note_off_seen
    }

    /// Render one sample. `wavetables` is shared across every voice in the
    /// bus, `tuning` resolves the note to a frequency, `frame` carries this
    /// block's control-rate modulation sources, and `filter_coefficients`
    /// is the coefficient cache shared by every voice whose filter settings
    /// are identical and block-constant.
    pub fn render(
        &mut self,
        wavetables: &WavetableSet,
        tuning: &dyn NoteTuning,
        frame: &ModulationFrame,
        filter_coefficients: &mut BiquadFilterSharedBuffers,
    ) -> f32 {
        if self.note.is_none() {
            return 0.0;
        }
        let no_mod = ParamInputs::default();

        let amp_env = self.envelope.advance();
        let mod_env = self.mod_envelope.advance();
        let lfo_raw = self.lfo.next();
        let lfo_ratio = (lfo_raw + 1.0) * 0.5;

        self.modulator_amplitude.advance(&no_mod);
        self.modulator_ratio.advance(&no_mod);
        self.lfo_to_pitch.advance(&no_mod);
        self.shaper_drive.advance(&no_mod);
        self.shaper_mix.advance(&no_mod);
        self.fold_amount.advance(&no_mod);
        self.drift_amount.advance(&no_mod);
        let sounding_note = self.glide_note.advance(&no_mod);

        let amp_inputs = self.amplitude_mod.inputs(self.channel, mod_env, lfo_ratio, frame);
        let amplitude = self.carrier_amplitude.advance(&amp_inputs);

        let cutoff_inputs = self.cutoff_mod.inputs(self.channel, mod_env, lfo_ratio, frame);
        let cutoff_before = self.filter_cutoff.value();
        let resonance_before = self.filter_resonance.value();
        let cutoff = self.filter_cutoff.advance(&cutoff_inputs);
        let resonance = self.filter_resonance.advance(&no_mod);

        // Drift maps the [0.1, 1.0] scalar to roughly ±27 cents at full
        // amount, centered on the distribution's mean so a patch's average
        // pitch stays put.
        let drift_semitones = (self.inaccuracy - 0.55) * 0.6 * self.drift_amount.value();
        let bend_semitones = frame.pitch_bend_semitones(self.channel);
        let base_freq = tuning.frequency_of(sounding_note + bend_semitones + drift_semitones);
        let vibrato = lfo_raw * self.lfo_to_pitch.value();
        let carrier_freq = base_freq * (2.0_f32).powf(vibrato / 12.0);
        let modulator_freq = carrier_freq * self.modulator_ratio.value();

        let raw_modulator = if self.modulator_waveform == WaveformKind::Custom {
            self.modulator_custom.rebake_if_changed();
            self.modulator_custom
                .next(&mut self.modulator_state, modulator_freq, 0.0, 0.0, self.sample_rate)
        } else {
            let mod_table = wavetables.table_for(self.modulator_waveform);
            let mut modulator = vox_core::Oscillator::new(mod_table, self.sample_rate);
            modulator.set_state(self.modulator_state);
            let out = modulator.next(modulator_freq, 0.0, 0.0);
            self.modulator_state = modulator.state();
            out
        };
        let modulator_out = raw_modulator * self.modulator_amplitude.value();

        let fm_hz = modulator_out * carrier_freq;
        let raw_carrier = if self.carrier_waveform == WaveformKind::Custom {
            self.carrier_custom.rebake_if_changed();
            self.carrier_custom
                .next(&mut self.carrier_state, carrier_freq, fm_hz, 0.0, self.sample_rate)
        } else {
            let carrier_table = wavetables.table_for(self.carrier_waveform);
            let mut carrier = vox_core::Oscillator::new(carrier_table, self.sample_rate);
            carrier.set_state(self.carrier_state);
            let out = carrier.next(carrier_freq, fm_hz, 0.0);
            self.carrier_state = carrier.state();
            out
        };
        let carrier_out = raw_carrier * amplitude;

        // Filter coefficients: a settled, unmodulated filter shares the
        // coefficient cache with every other voice in the same state (the
        // first to render after a change computes, the rest reuse). A
        // modulated or ramping filter diverges per voice and computes its
        // own.
        let shareable = self.cutoff_mod.is_inactive()
            && self.filter_cutoff.is_settled()
            && self.filter_resonance.is_settled();
        if shareable {
            filter_coefficients.ensure(self.filter_type, cutoff, resonance, 0.0, self.sample_rate);
            filter_coefficients.apply_to(&mut self.filter);
        } else if cutoff != cutoff_before || resonance != resonance_before {
            self.filter.set_type(self.filter_type, cutoff, resonance, 0.0, self.sample_rate);
        }
        let filtered = self.filter.process(carrier_out);

        let driven = filtered * self.shaper_drive.value();
        let shaped_wet = self.waveshaper.process(driven) / self.shaper_drive.value();
        let mix = self.shaper_mix.value();
        let shaped = filtered + (shaped_wet - filtered) * mix;

        let fold_amt = self.fold_amount.value();
        let folded = if fold_amt <= 0.0 {
            shaped
        } else {
            let drive = 1.0 + fold_amt * 7.0;
            let folded_raw = self.folder.process(shaped * drive) / drive;
            if fold_amt < FOLD_TRANSITION {
                let blend = fold_amt / FOLD_TRANSITION;
                shaped * (1.0 - blend) + folded_raw * blend
            } else {
                folded_raw
            }
        };

        folded * amp_env * self.velocity
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.envelope.set_sample_rate(sample_rate);
        self.mod_envelope.set_sample_rate(sample_rate);
        self.lfo.set_sample_rate(sample_rate);
    }

    pub fn reset(&mut self) {
        self.note = None;
        self.note_off_seen = false;
        self.modulator_state.reset();
        self.carrier_state.reset();
        self.filter.clear();
        self.waveshaper.reset();
        self.folder.reset();
    }
}

/// Denormalize a `[0, 1]` ratio through a registry entry's range, for
/// targets (envelope times, LFO rate) that aren't backed by a [`Param`]
/// carrying its own scale.
fn registry_value(id: ParamId, ratio: f32) -> f32 {
    let meta = vox_registry::param_meta(id);
    let scale = match meta.scale {
        vox_registry::ParamScaleKind::Linear => ParamScale::Linear,
        vox_registry::ParamScaleKind::Logarithmic => ParamScale::Logarithmic,
    };
    scale.denormalize(ratio, meta.min, meta.max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modulation::ControllerRef;
    use vox_core::{EnvelopeStage, StandardTuning};

    fn render_env() -> (WavetableSet, StandardTuning, ModulationFrame, BiquadFilterSharedBuffers) {
        (
            WavetableSet::new(),
            StandardTuning::default(),
            ModulationFrame::default(),
            BiquadFilterSharedBuffers::default(),
        )
    }

    #[test]
    fn idle_voice_renders_silence() {
        let (wavetables, tuning, frame, mut coeffs) = render_env();
        let mut voice = Voice::new(48_000.0);
        assert_eq!(voice.render(&wavetables, &tuning, &frame, &mut coeffs), 0.0);
    }

    #[test]
    fn triggered_voice_eventually_produces_nonzero_output() {
        let (wavetables, tuning, frame, mut coeffs) = render_env();
        let mut voice = Voice::new(48_000.0);
        voice.set_carrier_waveform(WaveformKind::Sawtooth);
        voice.note_on(0, 69, 100, 0);

        let mut max_amplitude = 0.0_f32;
        for _ in 0..2000 {
            max_amplitude = max_amplitude.max(voice.render(&wavetables, &tuning, &frame, &mut coeffs).abs());
        }
        assert!(max_amplitude > 0.0);
    }

    #[test]
    fn release_eventually_silences_the_voice() {
        let (wavetables, tuning, frame, mut coeffs) = render_env();
        let mut voice = Voice::new(48_000.0);
        voice.note_on(0, 60, 100, 0);
        for _ in 0..100 {
            voice.render(&wavetables, &tuning, &frame, &mut coeffs);
        }
        voice.note_off();
        for _ in 0..48_000 {
            voice.render(&wavetables, &tuning, &frame, &mut coeffs);
        }
        assert!(!voice.is_active());
    }

    #[test]
    fn glide_to_moves_the_note_gradually_rather_than_instantly() {
        let (wavetables, tuning, frame, mut coeffs) = render_env();
        let mut voice = Voice::new(48_000.0);
        voice.note_on(0, 60, 100, 0);
        voice.render(&wavetables, &tuning, &frame, &mut coeffs);
        voice.glide_to(0, 72, 4800);
        assert_eq!(voice.note(), Some(72), "the target note is reported immediately");
        assert!(!voice.glide_note.is_settled(), "the pitch itself should still be ramping");
        for _ in 0..4800 {
            voice.render(&wavetables, &tuning, &frame, &mut coeffs);
        }
        assert!(voice.glide_note.is_settled());
        assert!((voice.glide_note.value() - 72.0).abs() < 1e-3);
    }

    #[test]
    fn retrigger_does_not_reset_oscillator_phase() {
        let (wavetables, tuning, frame, mut coeffs) = render_env();
        let mut voice = Voice::new(48_000.0);
        voice.note_on(0, 60, 100, 0);
        for _ in 0..50 {
            voice.render(&wavetables, &tuning, &frame, &mut coeffs);
        }
        let phase_before = voice.carrier_state.phase();
        voice.retrigger(0, 64, 1);
        assert_eq!(voice.carrier_state.phase(), phase_before, "retrigger must not reset phase the way note_on does");
        assert_eq!(voice.envelope.stage(), EnvelopeStage::Attack);
    }

    #[test]
    fn cancel_note_smoothly_decays_faster_than_a_long_configured_release() {
        let (wavetables, tuning, frame, mut coeffs) = render_env();
        let mut voice = Voice::new(48_000.0);
        voice.envelope.set_release(2.0, 1.0);
        voice.note_on(0, 60, 100, 0);
        voice.render(&wavetables, &tuning, &frame, &mut coeffs);
        voice.cancel_note_smoothly(0.01);
        for _ in 0..960 {
            voice.render(&wavetables, &tuning, &frame, &mut coeffs);
        }
        assert!(!voice.is_active(), "a 10ms cancel fade should be done well within 20ms");
    }

    #[test]
    fn custom_carrier_waveform_renders_nonzero_once_a_harmonic_is_set() {
        let (wavetables, tuning, frame, mut coeffs) = render_env();
        let mut voice = Voice::new(48_000.0);
        voice.set_carrier_waveform(WaveformKind::Custom);
        voice.set_carrier_harmonic(0, 1.0);
        voice.note_on(0, 60, 100, 0);

        let mut max_amplitude = 0.0_f32;
        for _ in 0..2000 {
            max_amplitude = max_amplitude.max(voice.render(&wavetables, &tuning, &frame, &mut coeffs).abs());
        }
        assert!(max_amplitude > 0.0);
    }

    #[test]
    fn silent_custom_carrier_waveform_stays_silent() {
        let (wavetables, tuning, frame, mut coeffs) = render_env();
        let mut voice = Voice::new(48_000.0);
        voice.set_carrier_waveform(WaveformKind::Custom);
        voice.note_on(0, 60, 100, 0);
        for _ in 0..200 {
            assert_eq!(voice.render(&wavetables, &tuning, &frame, &mut coeffs), 0.0, "no harmonics set yet, should render silence");
        }
    }

    #[test]
    fn zero_fold_amount_does_not_alter_output() {
        let (wavetables, tuning, frame, mut coeffs) = render_env();
        let mut plain = Voice::new(48_000.0);
        let mut folded = Voice::new(48_000.0);
        plain.note_on(0, 60, 100, 0);
        folded.note_on(0, 60, 100, 0);
        folded.set_fold_amount(0.0);
        for _ in 0..200 {
            let a = plain.render(&wavetables, &tuning, &frame, &mut coeffs);
            let b = folded.render(&wavetables, &tuning, &frame, &mut coeffs);
            assert!((a - b).abs() < 1e-6, "a default fold amount of zero must stay a transparent bypass");
        }
    }

    #[test]
    fn folded_output_stays_within_nominal_bounds() {
        let (wavetables, tuning, frame, mut coeffs) = render_env();
        let mut voice = Voice::new(48_000.0);
        voice.note_on(0, 60, 100, 0);
        voice.set_fold_amount(1.0);
        let mut max_amplitude = 0.0_f32;
        for _ in 0..2000 {
            max_amplitude = max_amplitude.max(voice.render(&wavetables, &tuning, &frame, &mut coeffs).abs());
        }
        assert!(
            max_amplitude <= 1.0,
            "sin-based folding at full drive should never exceed unity before envelope/velocity scaling: {max_amplitude}"
        );
    }

    #[test]
    fn crossing_the_fold_transition_does_not_click() {
        let (wavetables, tuning, frame, mut coeffs) = render_env();
        let mut voice = Voice::new(48_000.0);
        voice.note_on(0, 60, 100, 0);
        for _ in 0..500 {
            voice.render(&wavetables, &tuning, &frame, &mut coeffs);
        }
        voice.set_fold_amount(FOLD_TRANSITION - 0.001);
        for _ in 0..50 {
            voice.render(&wavetables, &tuning, &frame, &mut coeffs);
        }
        let before = voice.render(&wavetables, &tuning, &frame, &mut coeffs);
        voice.set_fold_amount(FOLD_TRANSITION + 0.001);
        let after = voice.render(&wavetables, &tuning, &frame, &mut coeffs);
        assert!(
            (after - before).abs() < 0.1,
            "crossing the fold transition should not produce an audible jump: before={before}, after={after}"
        );
    }

    #[test]
    fn drift_draws_stay_in_range_with_the_expected_spread() {
        let mut voice = Voice::new(48_000.0);
        let n = 10_000;
        let mut sum = 0.0_f64;
        let mut sum_sq = 0.0_f64;
        for i in 0..n {
            voice.note_on(0, 60, 100, i);
            let draw = f64::from(voice.inaccuracy());
            assert!((0.1..=1.0).contains(&draw), "draw out of range: {draw}");
            sum += draw;
            sum_sq += draw * draw;
        }
        let mean = sum / n as f64;
        let stdev = (sum_sq / n as f64 - mean * mean).sqrt();
        assert!((mean - 0.55).abs() < 0.015, "mean drifted to {mean}");
        assert!((stdev - 0.225).abs() < 0.01, "spread off: {stdev}");
    }

    #[test]
    fn different_seeds_give_different_drift_sequences() {
        let mut a = Voice::with_seed(48_000.0, 1);
        let mut b = Voice::with_seed(48_000.0, 2);
        a.note_on(0, 60, 100, 0);
        b.note_on(0, 60, 100, 0);
        assert_ne!(a.inaccuracy(), b.inaccuracy());
    }

    #[test]
    fn drift_only_detunes_when_an_amount_is_dialed_in() {
        let (wavetables, tuning, frame, mut coeffs) = render_env();
        let mut plain = Voice::with_seed(48_000.0, 7);
        let mut drifting = Voice::with_seed(48_000.0, 7);
        drifting.set_drift_amount(1.0);
        plain.note_on(0, 69, 100, 0);
        drifting.note_on(0, 69, 100, 0);

        let mut max_diff = 0.0_f32;
        for _ in 0..12_000 {
            let a = plain.render(&wavetables, &tuning, &frame, &mut coeffs);
            let b = drifting.render(&wavetables, &tuning, &frame, &mut coeffs);
            max_diff = max_diff.max((a - b).abs());
        }
        assert!(max_diff > 1e-3, "full drift should audibly detune identical voices");
    }

    #[test]
    fn pitch_bend_is_read_per_channel_from_the_frame() {
        let (wavetables, tuning, mut frame, mut coeffs) = render_env();
        frame.set_pitch_bend(2, 12.0);
        let mut bent = Voice::new(48_000.0);
        let mut straight = Voice::new(48_000.0);
        bent.note_on(2, 69, 100, 0);
        straight.note_on(0, 69, 100, 0);

        // The bend lives on channel 2, so only the voice playing on that
        // channel hears it; an octave up diverges the phases immediately.
        let mut diverged = false;
        for _ in 0..12_000 {
            let a = bent.render(&wavetables, &tuning, &frame, &mut coeffs);
            let b = straight.render(&wavetables, &tuning, &frame, &mut coeffs);
            if (a - b).abs() > 1e-3 {
                diverged = true;
            }
        }
        assert!(diverged);
    }

    #[test]
    fn envelope_routing_drives_the_cutoff_param_through_its_scale() {
        let (wavetables, tuning, frame, mut coeffs) = render_env();
        let mut voice = Voice::new(48_000.0);
        voice.mod_envelope.set_attack(0.05, 1.0);
        voice.set_cutoff_routing(ModRouting {
            envelope: true,
            ..ModRouting::default()
        });
        voice.note_on(0, 60, 100, 0);

        voice.render(&wavetables, &tuning, &frame, &mut coeffs);
        let early = voice.filter_cutoff.value();
        for _ in 0..2400 {
            voice.render(&wavetables, &tuning, &frame, &mut coeffs);
        }
        let late = voice.filter_cutoff.value();
        assert!(late > early * 2.0, "a rising envelope should sweep the cutoff up: {early} -> {late}");
    }

    #[test]
    fn macro_routing_overrides_the_local_cutoff_schedule() {
        let (wavetables, tuning, mut frame, mut coeffs) = render_env();
        frame.set_macro_value(0, 5, 0.0);
        let mut voice = Voice::new(48_000.0);
        voice.set_filter_cutoff(18_000.0);
        voice.set_cutoff_routing(ModRouting {
            macro_slot: Some(5),
            ..ModRouting::default()
        });
        voice.note_on(0, 60, 100, 0);
        voice.render(&wavetables, &tuning, &frame, &mut coeffs);
        assert!(
            (voice.filter_cutoff.value() - 20.0).abs() < 0.5,
            "a zero macro should pin the cutoff to its minimum regardless of the local schedule, got {}",
            voice.filter_cutoff.value()
        );
    }

    #[test]
    fn envelope_routing_outranks_a_bound_controller() {
        let (wavetables, tuning, mut frame, mut coeffs) = render_env();
        frame.set_controller(0, 74, 1.0);
        let mut voice = Voice::new(48_000.0);
        voice.mod_envelope.set_attack(1.0, 1.0);
        voice.set_cutoff_routing(ModRouting {
            envelope: true,
            controller: Some(ControllerRef::Cc(74)),
            ..ModRouting::default()
        });
        voice.note_on(0, 60, 100, 0);
        voice.render(&wavetables, &tuning, &frame, &mut coeffs);
        // The CC says "maximum", but the envelope (barely risen) wins the
        // precedence resolution, so the cutoff sits near the bottom.
        assert!(
            voice.filter_cutoff.value() < 100.0,
            "envelope must outrank the controller: {}",
            voice.filter_cutoff.value()
        );
    }

    #[test]
    fn lfo_routing_makes_the_amplitude_tremolo() {
        let (wavetables, tuning, frame, mut coeffs) = render_env();
        let mut voice = Voice::new(48_000.0);
        voice.set_amplitude_routing(ModRouting {
            lfo: true,
            ..ModRouting::default()
        });
        voice.note_on(0, 60, 100, 0);

        let mut min_amp = f32::MAX;
        let mut max_amp = f32::MIN;
        for _ in 0..48_000 {
            voice.render(&wavetables, &tuning, &frame, &mut coeffs);
            min_amp = min_amp.min(voice.carrier_amplitude.value());
            max_amp = max_amp.max(voice.carrier_amplitude.value());
        }
        assert!(max_amp - min_amp > 0.5, "an LFO-bound amplitude should sweep: {min_amp}..{max_amp}");
    }

    #[test]
    fn param_ratio_routing_reaches_the_owned_params() {
        let mut voice = Voice::new(48_000.0);
        assert!(voice.set_param_ratio(ParamId::FilterCutoff, 0.0));
        assert!((voice.filter_cutoff.value() - 20.0).abs() < 0.5);
        assert!(voice.set_param_ratio(ParamId::WavefolderFold, 1.0));
        assert!((voice.fold_amount.value() - 1.0).abs() < 1e-6);
        assert!(voice.set_param_ratio(ParamId::CarrierWaveform, 1.0 / 3.0));
        assert_eq!(voice.carrier_waveform, WaveformKind::Square);
        assert!(!voice.set_param_ratio(ParamId::ReverbMix, 0.5), "chain-owned ids are not this voice's to handle");
    }

    #[test]
    fn has_decayed_before_note_off_only_when_no_note_off_arrived() {
        let (wavetables, tuning, frame, mut coeffs) = render_env();
        let mut voice = Voice::new(48_000.0);
        voice.envelope.set_attack(0.0, 1.0);
        voice.envelope.set_sustain(0.0);
        voice.envelope.set_decay(0.01, 1.0);
        voice.note_on(0, 60, 100, 0);
        for _ in 0..960 {
            voice.render(&wavetables, &tuning, &frame, &mut coeffs);
        }
        assert!(voice.has_decayed_before_note_off());

        voice.note_off();
        assert!(!voice.has_decayed_before_note_off());
    }
}
