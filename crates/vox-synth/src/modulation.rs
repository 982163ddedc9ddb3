//! Control-rate modulation routing between the orchestrator and its voices.
//!
//! The [`crate::Synth`] captures every control-rate source — macro outputs,
//! raw MIDI controllers, per-channel pitch bend, the tracked-note follower —
//! into one [`ModulationFrame`] at the top of each block. Voices carry a
//! [`ModRouting`] per modulatable param describing which of those sources
//! (plus their own envelope and LFO) feed it; the routing builds the
//! [`ParamInputs`] whose precedence resolver
//! (`envelope > lfo > macro > midi_controller > local schedule`) decides
//! the winner every sample.

use vox_core::macro_param::MIDI_CHANNELS;
use vox_core::ParamInputs;

/// Number of assignable macro controllers the orchestrator owns.
pub const MACRO_COUNT: usize = 30;

/// A control-rate value source a param routing can point at, beyond the
/// voice's own envelope/LFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerRef {
    /// A raw MIDI CC, read per the voice's channel.
    Cc(u8),
    /// The orchestrator's note follower (last/oldest/highest/lowest
    /// sounding note as a `[0, 1]` ratio).
    TrackedNote,
}

/// Snapshot of every control-rate modulation source, rebuilt by the
/// orchestrator once per block and read by voices while rendering it.
#[derive(Debug, Clone)]
pub struct ModulationFrame {
    pub(crate) macros: [[f32; MACRO_COUNT]; MIDI_CHANNELS],
    pub(crate) controllers: [[f32; 128]; MIDI_CHANNELS],
    pub(crate) pitch_bend: [f32; MIDI_CHANNELS],
    pub(crate) tracked_note: f32,
}

impl Default for ModulationFrame {
    fn default() -> Self {
        Self {
            macros: [[0.0; MACRO_COUNT]; MIDI_CHANNELS],
            controllers: [[0.0; 128]; MIDI_CHANNELS],
            pitch_bend: [0.0; MIDI_CHANNELS],
            tracked_note: 0.0,
        }
    }
}

impl ModulationFrame {
    /// Macro `slot`'s output for `channel`, `[0, 1]`.
    #[must_use]
    pub fn macro_value(&self, channel: u8, slot: usize) -> f32 {
        self.macros[channel as usize % MIDI_CHANNELS][slot % MACRO_COUNT]
    }

    /// Resolve a [`ControllerRef`] for `channel`, `[0, 1]`.
    #[must_use]
    pub fn controller_value(&self, channel: u8, source: ControllerRef) -> f32 {
        match source {
            ControllerRef::Cc(cc) => self.controllers[channel as usize % MIDI_CHANNELS][cc as usize % 128],
            ControllerRef::TrackedNote => self.tracked_note,
        }
    }

    /// Pitch-wheel offset for `channel`, in semitones.
    #[must_use]
    pub fn pitch_bend_semitones(&self, channel: u8) -> f32 {
        self.pitch_bend[channel as usize % MIDI_CHANNELS]
    }

    /// Write a macro output (for hosts or tests composing frames by hand).
    pub fn set_macro_value(&mut self, channel: u8, slot: usize, value: f32) {
        self.macros[channel as usize % MIDI_CHANNELS][slot % MACRO_COUNT] = value.clamp(0.0, 1.0);
    }

    /// Write a raw controller ratio.
    pub fn set_controller(&mut self, channel: u8, cc: u8, value: f32) {
        self.controllers[channel as usize % MIDI_CHANNELS][cc as usize % 128] = value.clamp(0.0, 1.0);
    }

    /// Write a channel's pitch-wheel offset in semitones.
    pub fn set_pitch_bend(&mut self, channel: u8, semitones: f32) {
        self.pitch_bend[channel as usize % MIDI_CHANNELS] = semitones;
    }

    /// Write the note-follower ratio.
    pub fn set_tracked_note(&mut self, ratio: f32) {
        self.tracked_note = ratio.clamp(0.0, 1.0);
    }
}

/// Which modulation sources feed one voice param. More than one may be
/// enabled at once; [`ParamInputs`]'s precedence resolver picks the winner,
/// and a routing with nothing enabled leaves the param on its local
/// schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModRouting {
    /// Feed the voice's modulation envelope.
    pub envelope: bool,
    /// Feed the voice's LFO (as a unipolar ratio).
    pub lfo: bool,
    /// Feed a macro controller's per-channel output.
    pub macro_slot: Option<usize>,
    /// Feed a raw MIDI controller or the note follower.
    pub controller: Option<ControllerRef>,
}

impl ModRouting {
    /// True when no source is enabled and the param runs on its local
    /// schedule alone.
    #[must_use]
    pub fn is_inactive(&self) -> bool {
        !self.envelope && !self.lfo && self.macro_slot.is_none() && self.controller.is_none()
    }

    /// Build the per-sample [`ParamInputs`] for a voice on `channel`, given
    /// the voice's current envelope and (unipolar) LFO values.
    #[must_use]
    pub fn inputs(&self, channel: u8, envelope: f32, lfo: f32, frame: &ModulationFrame) -> ParamInputs {
        ParamInputs {
            envelope: self.envelope.then_some(envelope),
            lfo: self.lfo.then_some(lfo),
            macro_value: self.macro_slot.map(|slot| frame.macro_value(channel, slot)),
            midi_controller: self.controller.map(|source| frame.controller_value(channel, source)),
        }
    }
}
