//! LFO: free-running or tempo-synced modulation source.
//!
//! Builds on the same phase-accumulator core used for sub-audio modulation
//! rates, with two additions: tempo sync (frequency tracks a
//! [`crate::TempoManager`] note division instead of a fixed Hz value) and a
//! centered/DC-offset output mode, since some destinations (an oscillator's
//! pitch) want a bipolar `[-1, 1]` swing while others (a filter cutoff
//! sweeping upward only) want a unipolar `[0, 1]` one.

use crate::tempo::{NoteDivision, TempoManager};
use core::f32::consts::PI;
use libm::{floorf, sinf};

/// LFO waveform type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LfoWaveform {
    #[default]
    Sine,
    Triangle,
    Saw,
    Square,
    SampleAndHold,
}

/// Whether the LFO's frequency is a fixed Hz value or tracks the host
/// transport's tempo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LfoRate {
    Free(f32),
    Synced(NoteDivision),
}

/// Whether [`Lfo::next`] returns a bipolar `[-1, 1]` swing or a unipolar
/// `[0, 1]` one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LfoOutputMode {
    Centered,
    DcOffset,
}

/// Low frequency oscillator, free-running or tempo-synced.
#[derive(Debug, Clone)]
pub struct Lfo {
    phase: f32,
    phase_inc: f32,
    sample_rate: f32,
    rate: LfoRate,
    waveform: LfoWaveform,
    output_mode: LfoOutputMode,
    sh_value: f32,
    prev_phase: f32,
    rng_state: u32,
}

impl Lfo {
    #[must_use]
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        let mut lfo = Self {
            phase: 0.0,
            phase_inc: 0.0,
            sample_rate,
            rate: LfoRate::Free(freq_hz),
            waveform: LfoWaveform::Sine,
            output_mode: LfoOutputMode::Centered,
            sh_value: 0.0,
            prev_phase: 0.0,
            rng_state: 0x9E37_79B9,
        };
        lfo.recompute_increment(None);
        lfo
    }

    fn recompute_increment(&mut self, tempo: Option<&TempoManager>) {
        let hz = match self.rate {
            LfoRate::Free(hz) => hz,
            LfoRate::Synced(division) => tempo.map_or(1.0, |t| t.division_to_hz(division)),
        };
        self.phase_inc = hz / self.sample_rate;
    }

    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.rate = LfoRate::Free(freq_hz);
        self.phase_inc = freq_hz / self.sample_rate;
    }

    pub fn set_synced(&mut self, division: NoteDivision, tempo: &TempoManager) {
        self.rate = LfoRate::Synced(division);
        self.recompute_increment(Some(tempo));
    }

    /// Recompute the phase increment against a transport's current tempo.
    /// No-op for a free-running rate. Call whenever the transport's BPM
    /// changes.
    pub fn sync_to(&mut self, tempo: &TempoManager) {
        if matches!(self.rate, LfoRate::Synced(_)) {
            self.recompute_increment(Some(tempo));
        }
    }

    #[must_use]
    pub fn frequency(&self) -> f32 {
        self.phase_inc * self.sample_rate
    }

    pub fn set_waveform(&mut self, waveform: LfoWaveform) {
        self.waveform = waveform;
    }

    #[must_use]
    pub fn waveform(&self) -> LfoWaveform {
        self.waveform
    }

    pub fn set_output_mode(&mut self, mode: LfoOutputMode) {
        self.output_mode = mode;
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.prev_phase = 0.0;
    }

    /// Sync phase to a specific value (0.0-1.0). Used to offset parallel
    /// LFOs from each other, e.g. stereo-widened chorus voices.
    pub fn set_phase(&mut self, phase: f32) {
        self.phase = phase.clamp(0.0, 1.0);
        self.prev_phase = self.phase;
    }

    #[must_use]
    pub fn phase(&self) -> f32 {
        self.phase
    }

    fn next_random(&mut self) -> f32 {
        self.rng_state ^= self.rng_state << 13;
        self.rng_state ^= self.rng_state >> 17;
        self.rng_state ^= self.rng_state << 5;
        (self.rng_state as f32 / u32::MAX as f32) * 2.0 - 1.0
    }

    /// Advance by one sample and return the raw bipolar waveform value,
    /// before `output_mode` is applied.
    fn raw_next(&mut self) -> f32 {
        let output = match self.waveform {
            LfoWaveform::Sine => sinf(self.phase * 2.0 * PI),
            LfoWaveform::Triangle => {
                if self.phase < 0.5 {
                    4.0 * self.phase - 1.0
                } else {
                    3.0 - 4.0 * self.phase
                }
            }
            LfoWaveform::Saw => 2.0 * self.phase - 1.0,
            LfoWaveform::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            LfoWaveform::SampleAndHold => {
                if self.phase < self.prev_phase {
                    self.sh_value = self.next_random();
                }
                self.sh_value
            }
        };

        self.prev_phase = self.phase;
        self.phase += self.phase_inc;
        if self.phase >= 1.0 {
            self.phase -= floorf(self.phase);
        }

        output
    }

    /// Advance by one sample and return the LFO's value, shaped by
    /// `output_mode`: `[-1, 1]` for [`LfoOutputMode::Centered`], `[0, 1]`
    /// for [`LfoOutputMode::DcOffset`].
    #[inline]
    pub fn next(&mut self) -> f32 {
        let raw = self.raw_next();
        match self.output_mode {
            LfoOutputMode::Centered => raw,
            LfoOutputMode::DcOffset => (raw + 1.0) * 0.5,
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        let hz = self.frequency();
        self.sample_rate = sample_rate;
        self.phase_inc = hz / sample_rate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_wraps_after_one_period() {
        let mut lfo = Lfo::new(44_100.0, 1.0);
        for _ in 0..44_100 {
            lfo.next();
        }
        let phase_error = lfo.phase.min((lfo.phase - 1.0).abs());
        assert!(phase_error < 0.01);
    }

    #[test]
    fn centered_output_stays_bipolar() {
        let mut lfo = Lfo::new(44_100.0, 5.0);
        for waveform in [
            LfoWaveform::Sine,
            LfoWaveform::Triangle,
            LfoWaveform::Saw,
            LfoWaveform::Square,
        ] {
            lfo.set_waveform(waveform);
            lfo.reset();
            for _ in 0..1000 {
                let v = lfo.next();
                assert!((-1.0..=1.0).contains(&v), "{waveform:?} out of range: {v}");
            }
        }
    }

    #[test]
    fn dc_offset_mode_stays_unipolar() {
        let mut lfo = Lfo::new(44_100.0, 5.0);
        lfo.set_output_mode(LfoOutputMode::DcOffset);
        for _ in 0..1000 {
            let v = lfo.next();
            assert!((0.0..=1.0).contains(&v), "unipolar value out of range: {v}");
        }
    }

    #[test]
    fn phase_offset_produces_opposite_sine() {
        let mut lfo1 = Lfo::new(44_100.0, 2.0);
        let mut lfo2 = Lfo::new(44_100.0, 2.0);
        lfo2.set_phase(0.5);
        let v1 = lfo1.next();
        let v2 = lfo2.next();
        assert!((v1 + v2).abs() < 0.01, "expected opposite values, got {v1} and {v2}");
    }

    #[test]
    fn synced_rate_tracks_tempo() {
        let tempo = TempoManager::new(48_000.0, 120.0);
        let mut lfo = Lfo::new(48_000.0, 1.0);
        lfo.set_synced(NoteDivision::Quarter, &tempo);
        assert!((lfo.frequency() - tempo.division_to_hz(NoteDivision::Quarter)).abs() < 1e-4);
    }

    #[test]
    fn free_rate_is_unaffected_by_sync_to() {
        let tempo = TempoManager::new(48_000.0, 200.0);
        let mut lfo = Lfo::new(48_000.0, 3.0);
        lfo.sync_to(&tempo);
        assert!((lfo.frequency() - 3.0).abs() < 1e-6);
    }
}
