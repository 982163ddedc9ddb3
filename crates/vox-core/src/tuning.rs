//! Note-to-frequency tuning tables.
//!
//! [`NoteTuning`] is the seam between MIDI note numbers and the frequencies
//! an oscillator actually renders, so alternate tunings (microtonal tables,
//! MTS-ESP-style per-note overrides) can be plugged in without the rest of
//! the voice engine knowing about it. [`StandardTuning`] covers the common
//! 12-tone-equal-temperament cases at a few reference pitches.

use libm::powf;

/// Maps a MIDI note number (plus fractional cents from pitch bend / glide)
/// to a frequency in Hz.
pub trait NoteTuning {
    /// Frequency in Hz for `note` (may be fractional, e.g. `69.5` for a
    /// quarter-tone above A4).
    fn frequency_of(&self, note: f32) -> f32;
}

/// 12-tone equal temperament anchored at a configurable reference pitch for
/// MIDI note 69 (A4).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandardTuning {
    reference_hz: f32,
}

impl StandardTuning {
    /// Concert pitch: A4 = 440 Hz.
    pub const A440: Self = Self { reference_hz: 440.0 };
    /// Baroque-adjacent pitch: A4 = 415 Hz.
    pub const A415: Self = Self { reference_hz: 415.0 };
    /// Modern orchestral-sharp pitch: A4 = 442 Hz.
    pub const A442: Self = Self { reference_hz: 442.0 };

    /// Build a 12-TET tuning anchored at an arbitrary reference pitch for
    /// A4.
    #[must_use]
    pub fn with_reference(reference_hz: f32) -> Self {
        Self { reference_hz }
    }
}

impl Default for StandardTuning {
    fn default() -> Self {
        Self::A440
    }
}

impl NoteTuning for StandardTuning {
    fn frequency_of(&self, note: f32) -> f32 {
        let semitones_from_a4 = note - 69.0;
        self.reference_hz * powf(2.0, semitones_from_a4 / 12.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_is_reference_pitch() {
        let t = StandardTuning::A440;
        assert!((t.frequency_of(69.0) - 440.0).abs() < 1e-3);
    }

    #[test]
    fn octave_doubles_frequency() {
        let t = StandardTuning::A440;
        let a4 = t.frequency_of(69.0);
        let a5 = t.frequency_of(81.0);
        assert!((a5 - 2.0 * a4).abs() < 1e-2);
    }

    #[test]
    fn alternate_reference_shifts_everything() {
        let t = StandardTuning::A442;
        assert!((t.frequency_of(69.0) - 442.0).abs() < 1e-3);
    }
}
