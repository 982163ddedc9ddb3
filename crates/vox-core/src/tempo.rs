//! Musical-time conversions for tempo-synced modulation.
//!
//! A tempo-synced LFO or delay doesn't hold a frequency in Hz; it holds a
//! [`NoteDivision`] and asks the [`TempoManager`] what that division
//! currently means. When the host transport changes BPM, re-announcing it
//! through [`TempoManager::set_bpm`] is all that's needed — every synced
//! rate is derived, not stored.

/// Musical note length, as a fraction of a 4/4 bar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NoteDivision {
    Whole,
    Half,
    #[default]
    Quarter,
    Eighth,
    Sixteenth,
    DottedHalf,
    DottedQuarter,
    DottedEighth,
    TripletQuarter,
    TripletEighth,
}

impl NoteDivision {
    /// Length in beats (a quarter note is one beat).
    #[must_use]
    pub fn beats(self) -> f32 {
        match self {
            NoteDivision::Whole => 4.0,
            NoteDivision::Half => 2.0,
            NoteDivision::Quarter => 1.0,
            NoteDivision::Eighth => 0.5,
            NoteDivision::Sixteenth => 0.25,
            NoteDivision::DottedHalf => 3.0,
            NoteDivision::DottedQuarter => 1.5,
            NoteDivision::DottedEighth => 0.75,
            NoteDivision::TripletQuarter => 2.0 / 3.0,
            NoteDivision::TripletEighth => 1.0 / 3.0,
        }
    }

    /// Cycle rate in Hz at `bpm`: one cycle per division. At 120 BPM a
    /// quarter note is 2 Hz, an eighth 4 Hz.
    #[must_use]
    pub fn to_hz(self, bpm: f32) -> f32 {
        (bpm / 60.0) / self.beats()
    }
}

/// Holds the current tempo and sample rate, and converts note divisions to
/// concrete rates and lengths.
#[derive(Debug, Clone)]
pub struct TempoManager {
    bpm: f32,
    sample_rate: f32,
}

impl TempoManager {
    #[must_use]
    pub fn new(sample_rate: f32, bpm: f32) -> Self {
        Self {
            bpm: bpm.max(1.0),
            sample_rate,
        }
    }

    /// Announce a new tempo. Floored at 1 BPM so a host sending zero during
    /// transport setup can't produce infinite division lengths.
    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = bpm.max(1.0);
    }

    #[must_use]
    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    #[must_use]
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Rate in Hz for one cycle per `division` at the current tempo.
    #[must_use]
    pub fn division_to_hz(&self, division: NoteDivision) -> f32 {
        division.to_hz(self.bpm)
    }

    /// Length of `division` in samples at the current tempo and sample rate.
    #[must_use]
    pub fn division_to_samples(&self, division: NoteDivision) -> f32 {
        self.sample_rate / self.division_to_hz(division)
    }
}

impl Default for TempoManager {
    fn default() -> Self {
        Self::new(48_000.0, 120.0)
    }
}
