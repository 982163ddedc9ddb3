//! Integration tests for the vox-synth crate: voice stealing, bus summing
//! and synth-level sustain/note-stack behavior exercised end to end rather
//! than unit-by-unit.

use vox_core::{BiquadFilterSharedBuffers, NoteTuning, StandardTuning};
use vox_synth::{Bus, ControlEvent, ModulationFrame, Synth, Voice, WaveformKind, WavetableSet};

const SR: f32 = 48000.0;

/// Tuning stub that pins every note to one frequency, for tests that need
/// an exact pitch rather than a MIDI note number.
struct FixedHz(f32);

impl NoteTuning for FixedHz {
    fn frequency_of(&self, _note: f32) -> f32 {
        self.0
    }
}

#[test]
fn a_bare_sine_voice_tracks_the_analytic_sine() {
    // One voice, carrier = a custom waveform holding only its fundamental,
    // instant attack, full sustain, no modulator, no filter movement: the
    // output should be the textbook sine at the requested frequency.
    let sample_rate = 44_100.0_f32;
    let wavetables = WavetableSet::new();
    let tuning = FixedHz(100.0);
    let frame = ModulationFrame::default();
    let mut coefficients = BiquadFilterSharedBuffers::default();
    let mut voice = Voice::new(sample_rate);
    voice.set_carrier_waveform(WaveformKind::Custom);
    voice.set_carrier_harmonic(0, 1.0);
    voice.envelope_mut().set_attack(0.0, 1.0);
    voice.envelope_mut().set_decay(0.0, 1.0);
    voice.envelope_mut().set_sustain(1.0);
    voice.note_on(0, 60, 127, 0);

    for n in 0..640 {
        let rendered = voice.render(&wavetables, &tuning, &frame, &mut coefficients);
        let expected = libm::sinf(core::f32::consts::TAU * 100.0 * n as f32 / sample_rate);
        assert!(
            (rendered - expected).abs() < 0.01,
            "sample {n}: rendered {rendered}, expected {expected}"
        );
    }
}

#[test]
fn bus_of_two_voices_sums_a_dyad() {
    let mut bus: Bus<2> = Bus::new(SR);
    let tuning = StandardTuning::A440;
    let frame = ModulationFrame::default();
    bus.note_on(0, 60, 100);
    bus.note_on(0, 64, 100);

    let mut max_amplitude = 0.0_f32;
    for _ in 0..4000 {
        max_amplitude = max_amplitude.max(bus.render(&tuning, &frame).abs());
    }
    assert!(max_amplitude > 0.0, "a sounding dyad should produce nonzero output");
    assert_eq!(bus.active_notes().count(), 2);
}

#[test]
fn exhausted_polyphony_steals_the_oldest_note_not_the_newest() {
    let mut bus: Bus<2> = Bus::new(SR);
    bus.note_on(0, 60, 100);
    bus.note_on(0, 64, 100);
    bus.note_on(0, 67, 100);

    let notes: std::collections::HashSet<u8> = bus.active_notes().collect();
    assert!(!notes.contains(&60), "the oldest note should have been stolen");
    assert!(notes.contains(&64) && notes.contains(&67));
}

#[test]
fn each_voice_renders_its_own_waveform_independently() {
    let mut bus: Bus<4> = Bus::new(SR);
    for voice in bus.voices_mut() {
        voice.set_carrier_waveform(WaveformKind::Square);
    }
    let tuning = StandardTuning::A440;
    let frame = ModulationFrame::default();
    bus.note_on(0, 69, 127);
    let mut any_nonzero = false;
    for _ in 0..2000 {
        if bus.render(&tuning, &frame) != 0.0 {
            any_nonzero = true;
        }
    }
    assert!(any_nonzero);
}

#[test]
fn synth_generate_samples_produces_a_full_buffer() {
    let mut synth: Synth<8> = Synth::new(SR as f64, 48_000);
    synth.handle(ControlEvent::NoteOn { channel: 0, note: 60, velocity: 100 });
    synth.handle(ControlEvent::NoteOn { channel: 0, note: 64, velocity: 100 });
    synth.handle(ControlEvent::NoteOn { channel: 0, note: 67, velocity: 100 });

    let mut buffer = [0.0_f32; 8192];
    synth.generate_samples(&[], &mut buffer);
    assert!(buffer.iter().any(|&s| s != 0.0));
    assert!(buffer.iter().all(|s| s.is_finite()));
}

#[test]
fn sustain_pedal_defers_release_until_pedal_up() {
    let mut synth: Synth<4> = Synth::new(SR as f64, 48_000);
    let events = [
        (0, ControlEvent::Sustain { down: true }),
        (0, ControlEvent::NoteOn { channel: 0, note: 60, velocity: 100 }),
        (100, ControlEvent::NoteOff { channel: 0, note: 60 }),
    ];
    let mut buffer = [0.0_f32; 200];
    synth.generate_samples(&events, &mut buffer);
    assert_eq!(synth.bus_mut().active_notes().count(), 1, "note-off while sustained shouldn't release the voice yet");

    synth.handle(ControlEvent::Sustain { down: false });
    let mut tail = [0.0_f32; (SR * 1.0) as usize];
    synth.generate_samples(&[], &mut tail);
    synth.bus_mut().collect_garbage();
    assert_eq!(synth.bus_mut().active_notes().count(), 0, "lifting the pedal should let the voice fully release");
}
