//! Voice bus: owns the wavetables and shared filter-coefficient cache used
//! by every voice, sums their rendered output and tracks which notes are
//! currently sounding.

use vox_core::{BiquadFilterSharedBuffers, NoteTuning};

use crate::modulation::ModulationFrame;
use crate::voice::{Voice, WavetableSet};

/// Fixed-size pool of voices sharing one [`WavetableSet`] and one
/// [`BiquadFilterSharedBuffers`] coefficient cache.
pub struct Bus<const N: usize> {
    wavetables: WavetableSet,
    /// Filter coefficients shared by every voice whose settings are
    /// identical and block-constant: the first voice to render after a
    /// settings change recomputes, the rest reuse.
    filter_coefficients: BiquadFilterSharedBuffers,
    voices: [Voice; N],
    next_age: u64,
}

impl<const N: usize> Bus<N> {
    #[must_use]
    pub fn new(sample_rate: f32) -> Self {
        Self {
            wavetables: WavetableSet::new(),
            filter_coefficients: BiquadFilterSharedBuffers::default(),
            voices: core::array::from_fn(|i| {
                Voice::with_seed(sample_rate, 0x9E37_79B9 ^ (i as u32).wrapping_mul(0x85EB_CA77))
            }),
            next_age: 0,
        }
    }

    #[must_use]
    pub fn voices(&self) -> &[Voice; N] {
        &self.voices
    }

    pub fn voices_mut(&mut self) -> &mut [Voice; N] {
        &mut self.voices
    }

    #[must_use]
    pub fn active_notes(&self) -> impl Iterator<Item = u8> + '_ {
        self.voices.iter().filter_map(Voice::note)
    }

    /// Currently sounding `(channel, note)` pairs, the shape a tuning
    /// collaborator consumes.
    #[must_use]
    pub fn active_channel_notes(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        self.voices
            .iter()
            .filter_map(|v| v.note().map(|note| (v.channel(), note)))
    }

    /// Find a free voice, or the oldest active one to steal, and trigger it.
    pub fn note_on(&mut self, channel: u8, note: u8, velocity: u8) {
        let age = self.next_age;
        self.next_age += 1;

        if let Some(voice) = self.voices.iter_mut().find(|v| !v.is_active()) {
            voice.note_on(channel, note, velocity, age);
            return;
        }

        if let Some(voice) = self
            .voices
            .iter_mut()
            .min_by_key(|v| v.age())
        {
            #[cfg(feature = "tracing")]
            tracing::debug!(stolen = ?voice.note(), note, "voice pool exhausted, stealing oldest");
            voice.note_on(channel, note, velocity, age);
        }
    }

    pub fn note_off(&mut self, channel: u8, note: u8) {
        for voice in self
            .voices
            .iter_mut()
            .filter(|v| v.note() == Some(note) && v.channel() == channel)
        {
            voice.note_off();
        }
    }

    pub fn all_notes_off(&mut self) {
        for voice in &mut self.voices {
            voice.note_off();
        }
    }

    /// Render and sum one sample from every active voice.
    pub fn render(&mut self, tuning: &dyn NoteTuning, frame: &ModulationFrame) -> f32 {
        let mut sum = 0.0;
        for voice in &mut self.voices {
            if voice.note().is_some() {
                sum += voice.render(&self.wavetables, tuning, frame, &mut self.filter_coefficients);
            }
        }
        sum
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        for voice in &mut self.voices {
            voice.set_sample_rate(sample_rate);
        }
    }

    /// Reclaim voices that have fully decayed, clearing their filter and
    /// oscillator state so the next allocation starts clean.
    pub fn collect_garbage(&mut self) {
        for voice in &mut self.voices {
            if voice.note().is_some() && !voice.is_active() {
                #[cfg(feature = "tracing")]
                tracing::trace!(note = ?voice.note(), "reclaiming decayed voice");
                voice.reset();
            }
        }
    }
}
