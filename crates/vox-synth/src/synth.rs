//! Polyphonic synth orchestrator: note on/off, sustain pedal, pitch wheel,
//! monophonic note-stack handling, the control-message surface
//! (`SetParam`/`AssignController`) and block rendering on top of a [`Bus`].
//!
//! The orchestrator owns every control-rate modulation source — the macro
//! bank, raw MIDI controller values, per-channel pitch bend, the
//! note follower — and publishes them to the voices through one
//! [`ModulationFrame`] per block. Control messages address parameters by
//! their stable [`ParamId`]; unknown or unrouted ids are ignored without
//! touching the dirty flag.

extern crate alloc;
use alloc::vec::Vec;

use vox_core::macro_param::MIDI_CHANNELS;
use vox_core::{Macro, MacroTransform, MpeParam, Param, ParamScale, PolyphonicParam, VoiceStatus};
use vox_registry::ParamId;

use crate::bus::Bus;
use crate::modulation::{ControllerRef, ModRouting, ModulationFrame, MACRO_COUNT};

/// A single queued control event.
#[derive(Debug, Clone, Copy)]
pub enum ControlEvent {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
    Sustain { down: bool },
    PitchBend { channel: u8, semitones: f32 },
    AllNotesOff,
    ControlChange { channel: u8, controller: u8, value: u8 },
    SetParam { param: ParamId, ratio: f32 },
    AssignController { param: ParamId, binding: ControllerBinding },
}

/// What an `AssignController` message binds a param to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerBinding {
    /// Clear any binding; the param returns to its local schedule.
    None,
    /// A raw MIDI CC, read per the voice's channel.
    MidiCc(u8),
    /// A macro controller's per-channel output.
    Macro(u8),
    /// The voice's modulation envelope.
    Envelope,
    /// The voice's LFO.
    Lfo,
    /// The note follower: the last/oldest/highest/lowest sounding note as a
    /// `[0, 1]` ratio.
    TrackedNote(VoiceStatus),
    /// Defer the binding: the next incoming CC wins.
    MidiLearn,
}

/// What drives a macro's input each block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroInput {
    /// A fixed value set by `SetParam` or the host.
    Manual(u8),
    /// A raw MIDI CC, per channel.
    Controller(u8),
    /// Another macro's output — chains are allowed, and a cyclic chain
    /// settles on last-published values instead of recursing.
    Macro(usize),
}

/// Polyphonic synth: a fixed-size voice [`Bus`] plus the note-stack,
/// sustain-pedal, pitch-wheel and control-message bookkeeping a MIDI-driven
/// instrument needs on top of it.
///
/// Sustain: notes released while the pedal is held keep sounding (voices
/// stay triggered) and are only actually released once the pedal lifts.
///
/// Monophonic mode plays everything on voice 0 and keeps the held notes in
/// press order: a new press legato-retriggers (or glides, when portamento
/// is dialed in) instead of allocating a voice, and releasing the sounding
/// note falls back to the most recent note still held rather than going
/// silent — classic mono-synth note-stack behavior.
pub struct Synth<const N: usize> {
    bus: Bus<N>,
    tuning: vox_core::StandardTuning,
    sustain_down: bool,
    held_for_sustain: Vec<(u8, u8)>,
    monophonic: bool,
    mono_stack: Vec<(u8, u8)>,
    portamento_samples: u32,
    sample_rate: f64,
    samples_since_gc: i64,
    samples_between_gc: i64,

    macros: [Macro; MACRO_COUNT],
    macro_inputs: [MacroInput; MACRO_COUNT],
    macro_transforms: [MacroTransform; MACRO_COUNT],
    cc_values: [[f32; 128]; MIDI_CHANNELS],
    pitch_bend: MpeParam,
    tracked_note: PolyphonicParam,
    awaiting_learn: Vec<ParamId>,
    frame: ModulationFrame,
    dirty: bool,
}

impl<const N: usize> Synth<N> {
    #[must_use]
    pub fn new(sample_rate: f64, samples_between_gc: i64) -> Self {
        Self {
            bus: Bus::new(sample_rate as f32),
            tuning: vox_core::StandardTuning::default(),
            sustain_down: false,
            held_for_sustain: Vec::new(),
            monophonic: false,
            mono_stack: Vec::new(),
            portamento_samples: 0,
            sample_rate,
            samples_since_gc: 0,
            samples_between_gc,
            macros: core::array::from_fn(|_| Macro::new()),
            macro_inputs: [MacroInput::Manual(0); MACRO_COUNT],
            macro_transforms: [MacroTransform::default(); MACRO_COUNT],
            cc_values: [[0.0; 128]; MIDI_CHANNELS],
            pitch_bend: MpeParam::new(Param::new(ParamScale::Linear, -24.0, 24.0, 0.0)),
            tracked_note: PolyphonicParam::new(
                Param::new(ParamScale::Linear, 0.0, 1.0, 0.0),
                VoiceStatus::Last,
            ),
            awaiting_learn: Vec::new(),
            frame: ModulationFrame::default(),
            dirty: false,
        }
    }

    pub fn set_tuning(&mut self, tuning: vox_core::StandardTuning) {
        self.tuning = tuning;
    }

    /// Switch between polyphonic and single-voice note handling. Entering
    /// mono mode silences everything first so no polyphonic tails linger
    /// behind the single sounding note.
    pub fn set_monophonic(&mut self, mono: bool) {
        if mono != self.monophonic {
            self.bus.all_notes_off();
            self.mono_stack.clear();
            self.monophonic = mono;
        }
    }

    /// Glide time between consecutive mono-mode notes. Zero retriggers
    /// instead of gliding.
    pub fn set_portamento_seconds(&mut self, seconds: f64) {
        self.portamento_samples = (seconds.max(0.0) * self.sample_rate) as u32;
    }

    /// What drives macro `slot`'s input each block.
    pub fn set_macro_input(&mut self, slot: usize, input: MacroInput) {
        self.macro_inputs[slot % MACRO_COUNT] = input;
    }

    /// Replace macro `slot`'s transform pipeline.
    pub fn set_macro_transform(&mut self, slot: usize, transform: MacroTransform) {
        let slot = slot % MACRO_COUNT;
        self.macro_transforms[slot] = transform;
        self.macros[slot].set_transform(transform);
    }

    /// True once a `SetParam`/`AssignController` message has changed engine
    /// state since the last [`Synth::clear_dirty_flag`]. Unknown or
    /// unrouted ids never set this.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty_flag(&mut self) {
        self.dirty = false;
    }

    pub fn bus_mut(&mut self) -> &mut Bus<N> {
        &mut self.bus
    }

    pub fn handle(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::NoteOn { channel, note, velocity } => {
                self.held_for_sustain.retain(|&held| held != (channel, note));
                if self.monophonic {
                    self.mono_note_on(channel, note, velocity);
                } else {
                    self.bus.note_on(channel, note, velocity);
                }
            }
            ControlEvent::NoteOff { channel, note } => {
                if self.sustain_down {
                    if !self.held_for_sustain.contains(&(channel, note)) {
                        self.held_for_sustain.push((channel, note));
                    }
                } else if self.monophonic {
                    self.mono_note_off(channel, note);
                } else {
                    self.bus.note_off(channel, note);
                }
            }
            ControlEvent::Sustain { down } => {
                self.sustain_down = down;
                if !down {
                    let released: Vec<(u8, u8)> = self.held_for_sustain.drain(..).collect();
                    for (channel, note) in released {
                        if self.monophonic {
                            self.mono_note_off(channel, note);
                        } else {
                            self.bus.note_off(channel, note);
                        }
                    }
                }
            }
            ControlEvent::PitchBend { channel, semitones } => {
                self.pitch_bend
                    .channel_mut(channel as usize)
                    .schedule_value(semitones);
            }
            ControlEvent::AllNotesOff => {
                self.mono_stack.clear();
                self.held_for_sustain.clear();
                self.bus.all_notes_off();
            }
            ControlEvent::ControlChange { channel, controller, value } => {
                if !self.awaiting_learn.is_empty() {
                    let learners: Vec<ParamId> = self.awaiting_learn.drain(..).collect();
                    for param in learners {
                        self.assign_controller(param, ControllerBinding::MidiCc(controller));
                    }
                }
                let ratio = f32::from(value.min(127)) / 127.0;
                self.cc_values[channel as usize % MIDI_CHANNELS][controller as usize % 128] = ratio;
            }
            ControlEvent::SetParam { param, ratio } => self.set_param(param, ratio),
            ControlEvent::AssignController { param, binding } => self.assign_controller(param, binding),
        }
    }

    /// Set an automatable parameter by registry id and `[0, 1]` ratio.
    /// Orchestrator-level ids (portamento, macros) are handled here;
    /// voice-level ids fan out to every voice. Unknown ids are ignored and
    /// leave the dirty flag untouched.
    pub fn set_param(&mut self, param: ParamId, ratio: f32) {
        let ratio = ratio.clamp(0.0, 1.0);
        let handled = match param {
            ParamId::Portamento => {
                let meta = vox_registry::param_meta(param);
                self.set_portamento_seconds(f64::from(meta.min + ratio * (meta.max - meta.min)));
                true
            }
            ParamId::Macro1Input => {
                self.macro_inputs[0] = MacroInput::Manual((ratio * 127.0).round() as u8);
                true
            }
            ParamId::Macro1Scale => {
                let meta = vox_registry::param_meta(param);
                self.macro_transforms[0].scale = meta.min + ratio * (meta.max - meta.min);
                self.macros[0].set_transform(self.macro_transforms[0]);
                true
            }
            ParamId::Macro1Distort => {
                let meta = vox_registry::param_meta(param);
                self.macro_transforms[0].distort = meta.min + ratio * (meta.max - meta.min);
                self.macros[0].set_transform(self.macro_transforms[0]);
                true
            }
            _ => {
                let mut any = false;
                for voice in self.bus.voices_mut() {
                    any |= voice.set_param_ratio(param, ratio);
                }
                any
            }
        };
        if handled {
            self.dirty = true;
        }
    }

    /// Bind a modulatable parameter to a controller source, or clear the
    /// binding. Only the modulatable voice params (filter cutoff, carrier
    /// amplitude) accept bindings; other ids are ignored.
    pub fn assign_controller(&mut self, param: ParamId, binding: ControllerBinding) {
        let routing = match binding {
            ControllerBinding::None => ModRouting::default(),
            ControllerBinding::MidiCc(cc) => ModRouting {
                controller: Some(ControllerRef::Cc(cc)),
                ..ModRouting::default()
            },
            ControllerBinding::Macro(slot) => ModRouting {
                macro_slot: Some(slot as usize % MACRO_COUNT),
                ..ModRouting::default()
            },
            ControllerBinding::Envelope => ModRouting {
                envelope: true,
                ..ModRouting::default()
            },
            ControllerBinding::Lfo => ModRouting {
                lfo: true,
                ..ModRouting::default()
            },
            ControllerBinding::TrackedNote(status) => {
                self.tracked_note =
                    PolyphonicParam::new(Param::new(ParamScale::Linear, 0.0, 1.0, 0.0), status);
                ModRouting {
                    controller: Some(ControllerRef::TrackedNote),
                    ..ModRouting::default()
                }
            }
            ControllerBinding::MidiLearn => {
                self.awaiting_learn.push(param);
                return;
            }
        };

        let applied = match param {
            ParamId::FilterCutoff => {
                for voice in self.bus.voices_mut() {
                    voice.set_cutoff_routing(routing);
                }
                true
            }
            ParamId::CarrierAmplitude => {
                for voice in self.bus.voices_mut() {
                    voice.set_amplitude_routing(routing);
                }
                true
            }
            _ => false,
        };
        if applied {
            self.dirty = true;
        }
    }

    fn mono_note_on(&mut self, channel: u8, note: u8, velocity: u8) {
        self.mono_stack.retain(|&held| held != (channel, note));
        self.mono_stack.push((channel, note));
        let portamento = self.portamento_samples;
        let voice = &mut self.bus.voices_mut()[0];
        if voice.is_active() {
            // Legato (previous note still held): glide when portamento is
            // dialed in. A note played over a releasing tail restarts the
            // envelope instead.
            if voice.is_released() || portamento == 0 {
                let age = voice.age();
                voice.retrigger(channel, note, age);
            } else {
                voice.glide_to(channel, note, portamento);
            }
        } else {
            self.bus.note_on(channel, note, velocity);
        }
    }

    fn mono_note_off(&mut self, channel: u8, note: u8) {
        self.mono_stack.retain(|&held| held != (channel, note));
        let portamento = self.portamento_samples;
        let fallback = self.mono_stack.last().copied();
        let voice = &mut self.bus.voices_mut()[0];
        if voice.note() != Some(note) || voice.channel() != channel {
            return;
        }
        // Releasing the sounding note falls back to the most recent note
        // still held, if any.
        match fallback {
            Some((prev_channel, prev_note)) if voice.is_active() => {
                if portamento > 0 {
                    voice.glide_to(prev_channel, prev_note, portamento);
                } else {
                    let age = voice.age();
                    voice.retrigger(prev_channel, prev_note, age);
                }
            }
            _ => voice.note_off(),
        }
    }

    /// Run every macro's transform for this block and snapshot all
    /// control-rate sources into the frame the voices read. A macro chained
    /// from another macro reads that macro's last published output, so a
    /// cyclic chain settles instead of recursing.
    fn refresh_frame(&mut self) {
        for slot in 0..MACRO_COUNT {
            for channel in 0..MIDI_CHANNELS {
                let input = match self.macro_inputs[slot] {
                    MacroInput::Manual(value) => f32::from(value) / 127.0,
                    MacroInput::Controller(cc) => self.cc_values[channel][cc as usize % 128],
                    MacroInput::Macro(upstream) => self.macros[upstream % MACRO_COUNT].output(channel),
                };
                self.macros[slot].update(channel, input);
            }
        }

        for channel in 0..MIDI_CHANNELS {
            for slot in 0..MACRO_COUNT {
                self.frame.macros[channel][slot] = self.macros[slot].output(channel);
            }
            self.frame.controllers[channel] = self.cc_values[channel];
            self.frame.pitch_bend[channel] = self.pitch_bend.channel(channel).value();
        }

        let mut pairs = [(0u8, 0u64); N];
        let mut count = 0;
        for voice in self.bus.voices() {
            if let Some(note) = voice.note() {
                pairs[count] = (note, voice.age());
                count += 1;
            }
        }
        if let Some(note) = self.tracked_note.refresh(&pairs[..count]) {
            self.tracked_note
                .param_mut()
                .schedule_value(f32::from(note) / 127.0);
        }
        self.frame.tracked_note = self.tracked_note.param().value();
    }

    /// Render `output.len()` samples into `output`, draining `events` at
    /// their scheduled sample offsets within the block. Control-rate
    /// sources (macros, controllers, pitch bend, the note follower) are
    /// snapshotted once at the top of the block; note events stay
    /// sample-accurate. Output is hard-clamped to `[-2.8, 2.8]` to keep a
    /// misconfigured filter or resonance setting from sending a
    /// host-killing burst downstream.
    pub fn generate_samples(&mut self, events: &[(usize, ControlEvent)], output: &mut [f32]) {
        self.refresh_frame();

        let mut event_index = 0;
        for (i, sample) in output.iter_mut().enumerate() {
            while event_index < events.len() && events[event_index].0 == i {
                self.handle(events[event_index].1);
                event_index += 1;
            }
            *sample = self.bus.render(&self.tuning, &self.frame).clamp(-2.8, 2.8);

            self.samples_since_gc += 1;
            if self.samples_since_gc >= self.samples_between_gc {
                self.bus.collect_garbage();
                self.samples_since_gc = 0;
            }
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.bus.set_sample_rate(sample_rate as f32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on(note: u8) -> ControlEvent {
        ControlEvent::NoteOn { channel: 0, note, velocity: 100 }
    }

    fn off(note: u8) -> ControlEvent {
        ControlEvent::NoteOff { channel: 0, note }
    }

    #[test]
    fn note_on_then_off_eventually_silences() {
        let mut synth: Synth<4> = Synth::new(48_000.0, 48_000);
        synth.handle(on(60));
        let mut buffer = [0.0_f32; 512];
        synth.generate_samples(&[], &mut buffer);
        synth.handle(off(60));
        let mut silence_check = [0.0_f32; 48_000];
        synth.generate_samples(&[], &mut silence_check);
        synth.bus_mut().collect_garbage();
        assert_eq!(synth.bus_mut().active_notes().count(), 0);
    }

    #[test]
    fn sustain_pedal_holds_a_released_note() {
        let mut synth: Synth<4> = Synth::new(48_000.0, 48_000);
        synth.handle(ControlEvent::Sustain { down: true });
        synth.handle(on(60));
        synth.handle(off(60));
        assert_eq!(synth.bus_mut().active_notes().count(), 1);

        synth.handle(ControlEvent::Sustain { down: false });
        assert_eq!(synth.bus_mut().active_notes().count(), 1, "lifting the pedal releases the envelope but doesn't reclaim the voice yet");

        let mut tail = [0.0_f32; 48_000];
        synth.generate_samples(&[], &mut tail);
        synth.bus_mut().collect_garbage();
        assert_eq!(synth.bus_mut().active_notes().count(), 0);
    }

    #[test]
    fn output_is_clamped_to_the_nominal_headroom() {
        let mut synth: Synth<16> = Synth::new(48_000.0, 48_000);
        for note in 48..64 {
            synth.handle(ControlEvent::NoteOn { channel: 0, note, velocity: 127 });
        }
        let mut buffer = [0.0_f32; 2048];
        synth.generate_samples(&[], &mut buffer);
        assert!(buffer.iter().all(|&s| (-2.8..=2.8).contains(&s)));
    }

    #[test]
    fn scheduled_events_fire_at_their_sample_offset() {
        let mut synth: Synth<4> = Synth::new(48_000.0, 48_000);
        let events = [(10, on(67))];
        let mut buffer = [0.0_f32; 20];
        synth.generate_samples(&events, &mut buffer);
        assert_eq!(synth.bus_mut().active_notes().count(), 1);
    }

    #[test]
    fn mono_mode_keeps_a_single_sounding_note() {
        let mut synth: Synth<4> = Synth::new(48_000.0, 48_000);
        synth.set_monophonic(true);
        synth.handle(on(60));
        synth.handle(on(64));
        synth.handle(on(67));
        let notes: Vec<u8> = synth.bus_mut().active_notes().collect();
        assert_eq!(notes, [67], "only the latest pressed note should sound");
    }

    #[test]
    fn mono_release_falls_back_to_the_previous_held_note() {
        let mut synth: Synth<4> = Synth::new(48_000.0, 48_000);
        synth.set_monophonic(true);
        synth.handle(on(60));
        synth.handle(on(67));
        synth.handle(off(67));
        let notes: Vec<u8> = synth.bus_mut().active_notes().collect();
        assert_eq!(notes, [60], "releasing the top of the stack should fall back to the held note");

        synth.handle(off(60));
        let mut tail = [0.0_f32; 48_000];
        synth.generate_samples(&[], &mut tail);
        synth.bus_mut().collect_garbage();
        assert_eq!(synth.bus_mut().active_notes().count(), 0);
    }

    #[test]
    fn mono_portamento_glides_instead_of_retriggering() {
        let mut synth: Synth<4> = Synth::new(48_000.0, 48_000);
        synth.set_monophonic(true);
        synth.set_portamento_seconds(0.05);
        synth.handle(on(57));
        let mut warmup = [0.0_f32; 128];
        synth.generate_samples(&[], &mut warmup);

        synth.handle(on(69));
        // After the glide duration the sounding pitch should have arrived.
        let mut glide = [0.0_f32; 2400];
        synth.generate_samples(&[], &mut glide);
        assert_eq!(synth.bus_mut().active_notes().next(), Some(69));
    }

    #[test]
    fn releasing_a_non_sounding_mono_note_does_not_cut_the_current_one() {
        let mut synth: Synth<4> = Synth::new(48_000.0, 48_000);
        synth.set_monophonic(true);
        synth.handle(on(60));
        synth.handle(on(64));
        synth.handle(off(60));
        let notes: Vec<u8> = synth.bus_mut().active_notes().collect();
        assert_eq!(notes, [64]);
    }

    #[test]
    fn all_notes_off_clears_every_stack() {
        let mut synth: Synth<4> = Synth::new(48_000.0, 48_000);
        synth.handle(ControlEvent::Sustain { down: true });
        synth.handle(on(60));
        synth.handle(off(60));
        synth.handle(ControlEvent::AllNotesOff);
        let mut tail = [0.0_f32; 48_000];
        synth.generate_samples(&[], &mut tail);
        synth.bus_mut().collect_garbage();
        assert_eq!(synth.bus_mut().active_notes().count(), 0);
    }

    #[test]
    fn block_size_does_not_change_the_rendered_samples() {
        let mut whole: Synth<8> = Synth::new(48_000.0, 48_000);
        let mut chunked: Synth<8> = Synth::new(48_000.0, 48_000);
        whole.handle(on(60));
        chunked.handle(on(60));

        let mut big = [0.0_f32; 1024];
        whole.generate_samples(&[], &mut big);

        let mut small = [0.0_f32; 1024];
        for chunk in small.chunks_mut(128) {
            chunked.generate_samples(&[], chunk);
        }
        assert_eq!(big, small, "host block sizing must not leak into the rendered signal");
    }

    #[test]
    fn set_param_reaches_every_voice_and_sets_the_dirty_flag() {
        let mut synth: Synth<4> = Synth::new(48_000.0, 48_000);
        assert!(!synth.is_dirty());
        synth.handle(ControlEvent::SetParam { param: ParamId::WavefolderFold, ratio: 1.0 });
        assert!(synth.is_dirty());
        synth.clear_dirty_flag();

        // An id this orchestrator doesn't route must not re-dirty.
        synth.handle(ControlEvent::SetParam { param: ParamId::ReverbMix, ratio: 0.5 });
        assert!(!synth.is_dirty());
    }

    #[test]
    fn cc_binding_drives_the_cutoff_from_the_wire() {
        let mut synth: Synth<2> = Synth::new(48_000.0, 48_000);
        synth.handle(ControlEvent::AssignController {
            param: ParamId::FilterCutoff,
            binding: ControllerBinding::MidiCc(74),
        });
        synth.handle(ControlEvent::ControlChange { channel: 0, controller: 74, value: 0 });
        synth.handle(on(60));
        let mut buffer = [0.0_f32; 64];
        synth.generate_samples(&[], &mut buffer);

        // CC 74 at zero pins the bound cutoff param to its minimum,
        // overriding the param's 12 kHz local default.
        let cutoff = synth.bus_mut().voices_mut()[0].filter_cutoff_hz();
        assert!((cutoff - 20.0).abs() < 0.5, "bound CC at zero should pin the cutoff to its floor, got {cutoff}");

        synth.handle(ControlEvent::ControlChange { channel: 0, controller: 74, value: 127 });
        synth.generate_samples(&[], &mut buffer);
        let cutoff = synth.bus_mut().voices_mut()[0].filter_cutoff_hz();
        assert!(cutoff > 10_000.0, "a full CC should sweep the cutoff to the top of its range, got {cutoff}");
    }

    #[test]
    fn midi_learn_binds_the_next_incoming_cc() {
        let mut synth: Synth<2> = Synth::new(48_000.0, 48_000);
        synth.handle(ControlEvent::AssignController {
            param: ParamId::FilterCutoff,
            binding: ControllerBinding::MidiLearn,
        });
        assert!(!synth.is_dirty(), "learning is pending, nothing bound yet");

        synth.handle(ControlEvent::ControlChange { channel: 0, controller: 21, value: 64 });
        assert!(synth.is_dirty(), "the first CC after a learn request completes the binding");
    }

    #[test]
    fn macro_chain_with_a_cycle_stays_bounded_and_settles() {
        let mut synth: Synth<2> = Synth::new(48_000.0, 48_000);
        synth.set_macro_input(0, MacroInput::Macro(1));
        synth.set_macro_input(1, MacroInput::Macro(0));
        // An amplifying cycle: without the clamp-and-last-published rule
        // this would grow without bound once any energy enters the loop.
        synth.set_macro_transform(0, MacroTransform { scale: 3.0, distort: 1.0, randomize: 0.0 });
        synth.set_macro_transform(1, MacroTransform { scale: 3.0, distort: 1.0, randomize: 0.0 });
        synth.macros[1].update(0, 0.2);

        let mut buffer = [0.0_f32; 64];
        for _ in 0..20 {
            synth.generate_samples(&[], &mut buffer);
            for channel in 0..16 {
                let a = synth.frame.macro_value(channel, 0);
                let b = synth.frame.macro_value(channel, 1);
                assert!((0.0..=1.0).contains(&a) && (0.0..=1.0).contains(&b), "cyclic macros left their range: {a}, {b}");
            }
        }
        let settled = synth.frame.macro_value(0, 0);
        synth.generate_samples(&[], &mut buffer);
        assert_eq!(synth.frame.macro_value(0, 0), settled, "the cycle must reach a fixed point instead of oscillating");
    }

    #[test]
    fn macro_bound_cutoff_follows_the_driving_cc() {
        let mut synth: Synth<2> = Synth::new(48_000.0, 48_000);
        synth.set_macro_input(3, MacroInput::Controller(1));
        synth.handle(ControlEvent::AssignController {
            param: ParamId::FilterCutoff,
            binding: ControllerBinding::Macro(3),
        });
        synth.handle(ControlEvent::ControlChange { channel: 0, controller: 1, value: 127 });
        synth.handle(on(60));
        let mut buffer = [0.0_f32; 64];
        synth.generate_samples(&[], &mut buffer);
        let frame_value = synth.frame.macro_value(0, 3);
        assert!((frame_value - 1.0).abs() < 1e-3, "a full CC through an identity macro should read 1.0, got {frame_value}");
    }

    #[test]
    fn tracked_note_follows_the_selected_voice_status() {
        let mut synth: Synth<4> = Synth::new(48_000.0, 48_000);
        synth.handle(ControlEvent::AssignController {
            param: ParamId::FilterCutoff,
            binding: ControllerBinding::TrackedNote(VoiceStatus::Highest),
        });
        synth.handle(on(60));
        synth.handle(on(72));
        let mut buffer = [0.0_f32; 64];
        synth.generate_samples(&[], &mut buffer);
        let expected = 72.0 / 127.0;
        assert!((synth.frame.tracked_note - expected).abs() < 1e-4, "the follower should report the highest note, got {}", synth.frame.tracked_note);

        synth.handle(off(72));
        let mut tail = [0.0_f32; 48_000];
        synth.generate_samples(&[], &mut tail);
        synth.bus_mut().collect_garbage();
        synth.generate_samples(&[], &mut buffer);
        let expected = 60.0 / 127.0;
        assert!((synth.frame.tracked_note - expected).abs() < 1e-4, "once 72 decays away the follower re-reads to 60");
    }

    #[test]
    fn pitch_bend_is_stored_per_channel() {
        let mut synth: Synth<4> = Synth::new(48_000.0, 48_000);
        synth.handle(ControlEvent::PitchBend { channel: 1, semitones: 2.0 });
        synth.handle(ControlEvent::PitchBend { channel: 2, semitones: -2.0 });
        let mut buffer = [0.0_f32; 16];
        synth.generate_samples(&[], &mut buffer);
        assert!((synth.frame.pitch_bend_semitones(1) - 2.0).abs() < 1e-6);
        assert!((synth.frame.pitch_bend_semitones(2) + 2.0).abs() < 1e-6);
        assert_eq!(synth.frame.pitch_bend_semitones(0), 0.0);
    }
}
