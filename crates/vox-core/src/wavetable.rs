//! Band-limited wavetable oscillator.
//!
//! A [`Wavetable`] precomputes one table row per partial-count bracket: row
//! `k` sums harmonics `1..=partials(k)` of the base waveform so that no row
//! ever contains an aliased partial above Nyquist for the frequency range it
//! is used at. [`Oscillator`] picks a row from the requested fundamental
//! frequency and interpolates within it — linearly above half Nyquist, where
//! phase error is inaudible relative to the aliasing risk, and with a
//! smoother (Lagrange-style) interpolation below it, where the extra quality
//! is audible and affordable.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;
use libm::sinf;

const TABLE_LEN: usize = 2048;
const TWO_PI: f32 = core::f32::consts::TAU;

/// A precomputed bank of band-limited waveform tables, one row per partial
/// count bracket.
#[derive(Debug, Clone)]
pub struct Wavetable {
    rows: Vec<Vec<f32>>,
    max_partials_per_row: Vec<u32>,
}

impl Wavetable {
    /// Build a sawtooth wavetable bank. `row_partial_counts` lists the
    /// number of harmonics each row sums, in increasing order (e.g.
    /// `&[4, 16, 64, 256]`); row selection picks the highest-count row whose
    /// highest partial still stays under Nyquist for the oscillator's
    /// current frequency.
    #[must_use]
    pub fn sawtooth(row_partial_counts: &[u32]) -> Self {
        Self::from_harmonics(row_partial_counts, |k| 1.0 / k as f32, 1.0)
    }

    /// Build a square wavetable bank (odd harmonics only, `1/k` amplitude).
    #[must_use]
    pub fn square(row_partial_counts: &[u32]) -> Self {
        Self::from_harmonics(
            row_partial_counts,
            |k| if k % 2 == 1 { 1.0 / k as f32 } else { 0.0 },
            1.0,
        )
    }

    /// Build a triangle wavetable bank (odd harmonics, `1/k^2` amplitude,
    /// alternating sign).
    #[must_use]
    pub fn triangle(row_partial_counts: &[u32]) -> Self {
        Self::from_harmonics(
            row_partial_counts,
            |k| {
                if k % 2 == 1 {
                    let sign = if (k / 2) % 2 == 0 { 1.0 } else { -1.0 };
                    sign / (k * k) as f32
                } else {
                    0.0
                }
            },
            8.0 / (core::f32::consts::PI * core::f32::consts::PI),
        )
    }

    fn from_harmonics(row_partial_counts: &[u32], amplitude_of: impl Fn(u32) -> f32, normalize: f32) -> Self {
        let rows = row_partial_counts
            .iter()
            .map(|&partials| {
                let mut row = vec![0.0_f32; TABLE_LEN];
                for (i, sample) in row.iter_mut().enumerate() {
                    let phase = TWO_PI * i as f32 / TABLE_LEN as f32;
                    let mut sum = 0.0;
                    for k in 1..=partials {
                        sum += amplitude_of(k) * sinf(phase * k as f32);
                    }
                    *sample = sum * normalize;
                }
                row
            })
            .collect();
        Self {
            rows,
            max_partials_per_row: row_partial_counts.to_vec(),
        }
    }

    /// Select the table row for a fundamental frequency at the given sample
    /// rate: the highest-partial-count row whose top partial still stays
    /// below Nyquist.
    #[must_use]
    pub fn row_for_frequency(&self, frequency: f32, sample_rate: f32) -> usize {
        let nyquist = sample_rate * 0.5;
        if frequency <= 0.0 {
            return self.rows.len() - 1;
        }
        let max_safe_partials = (nyquist / frequency).floor() as u32;
        self.max_partials_per_row
            .iter()
            .rposition(|&p| p <= max_safe_partials)
            .unwrap_or(0)
    }

    fn sample_linear(&self, row: usize, phase: f32) -> f32 {
        let table = &self.rows[row];
        let pos = phase * TABLE_LEN as f32;
        let i0 = pos as usize % TABLE_LEN;
        let i1 = (i0 + 1) % TABLE_LEN;
        let frac = pos - pos.floor();
        table[i0] * (1.0 - frac) + table[i1] * frac
    }

    fn sample_cubic(&self, row: usize, phase: f32) -> f32 {
        let table = &self.rows[row];
        let pos = phase * TABLE_LEN as f32;
        let i1 = pos as usize % TABLE_LEN;
        let frac = pos - pos.floor();
        let i0 = (i1 + TABLE_LEN - 1) % TABLE_LEN;
        let i2 = (i1 + 1) % TABLE_LEN;
        let i3 = (i1 + 2) % TABLE_LEN;
        catmull_rom(table[i0], table[i1], table[i2], table[i3], frac)
    }
}

fn catmull_rom(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3)
}

/// Maximum number of harmonic coefficients a custom waveform may specify.
pub const MAX_CUSTOM_HARMONICS: usize = 10;

/// A single-row, owned wavetable baked from up to [`MAX_CUSTOM_HARMONICS`]
/// harmonic coefficients, for oscillators whose waveform isn't one of the
/// shared [`Wavetable`] banks. Unlike `Wavetable`, its table is a fixed-size
/// array rather than a `Vec` — re-baking happens on the render path (whenever
/// a coefficient changes), and a heap allocation there would break the
/// no-allocation contract the rest of the render graph depends on. A single
/// row is enough: ten partials never alias at any pitch in the audible
/// range, so there's no need for per-frequency row selection the way the
/// prebuilt banks need it.
#[derive(Debug, Clone)]
pub struct CustomWaveform {
    harmonics: [f32; MAX_CUSTOM_HARMONICS],
    change_index: u64,
    baked_index: u64,
    table: [f32; TABLE_LEN],
}

impl CustomWaveform {
    #[must_use]
    pub fn new() -> Self {
        let mut waveform = Self {
            harmonics: [0.0; MAX_CUSTOM_HARMONICS],
            change_index: 0,
            baked_index: u64::MAX,
            table: [0.0; TABLE_LEN],
        };
        waveform.bake();
        waveform.baked_index = waveform.change_index;
        waveform
    }

    /// Set one harmonic's amplitude (index `0` is the fundamental). Bumps
    /// the change index only when the value actually moves, so re-sending
    /// the same amplitude every block doesn't force a re-bake.
    pub fn set_harmonic(&mut self, index: usize, amplitude: f32) {
        if let Some(slot) = self.harmonics.get_mut(index) {
            if *slot != amplitude {
                *slot = amplitude;
                self.change_index += 1;
            }
        }
    }

    /// Re-bake the table if a harmonic changed since the last bake. Safe to
    /// call every sample: the change-index comparison makes repeated calls
    /// between edits free, so the bounded `O(10 × TABLE_LEN)` bake cost is
    /// amortized down to once per actual edit rather than once per call.
    /// Returns whether a bake actually happened.
    pub fn rebake_if_changed(&mut self) -> bool {
        if self.baked_index != self.change_index {
            self.bake();
            self.baked_index = self.change_index;
            true
        } else {
            false
        }
    }

    fn bake(&mut self) {
        for (i, sample) in self.table.iter_mut().enumerate() {
            let phase = TWO_PI * i as f32 / TABLE_LEN as f32;
            let mut sum = 0.0;
            for (k, &amplitude) in self.harmonics.iter().enumerate() {
                if amplitude != 0.0 {
                    sum += amplitude * sinf(phase * (k + 1) as f32);
                }
            }
            *sample = sum;
        }
    }

    fn sample_linear(&self, phase: f32) -> f32 {
        let pos = phase * TABLE_LEN as f32;
        let i0 = pos as usize % TABLE_LEN;
        let i1 = (i0 + 1) % TABLE_LEN;
        let frac = pos - pos.floor();
        self.table[i0] * (1.0 - frac) + self.table[i1] * frac
    }

    fn sample_cubic(&self, phase: f32) -> f32 {
        let pos = phase * TABLE_LEN as f32;
        let i1 = pos as usize % TABLE_LEN;
        let frac = pos - pos.floor();
        let i0 = (i1 + TABLE_LEN - 1) % TABLE_LEN;
        let i2 = (i1 + 1) % TABLE_LEN;
        let i3 = (i1 + 2) % TABLE_LEN;
        catmull_rom(self.table[i0], self.table[i1], self.table[i2], self.table[i3], frac)
    }

    /// Render one sample, advancing `state` in place. Mirrors
    /// [`Oscillator::next`]'s FM/PM inputs and interpolation switch so a
    /// voice can swap between a shared-bank oscillator and a custom one
    /// without changing its modulation wiring.
    pub fn next(
        &self,
        state: &mut WavetableState,
        frequency: f32,
        fm_hz: f32,
        pm_cycles: f32,
        sample_rate: f32,
    ) -> f32 {
        let effective_freq = frequency + fm_hz;
        let read_phase = (state.phase + pm_cycles).rem_euclid(1.0);
        let nyquist_half = sample_rate * 0.25;
        let sample = if effective_freq.abs() <= nyquist_half {
            self.sample_cubic(read_phase)
        } else {
            self.sample_linear(read_phase)
        };
        let increment = effective_freq / sample_rate;
        state.phase = (state.phase + increment).rem_euclid(1.0);
        sample
    }
}

impl Default for CustomWaveform {
    fn default() -> Self {
        Self::new()
    }
}

/// Runtime phase/interpolation state for an [`Oscillator`], kept separate
/// from the (shared, read-only) [`Wavetable`] bank itself so many voices can
/// share one table.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavetableState {
    phase: f32,
}

impl WavetableState {
    /// Reset phase to zero.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Current phase, `[0, 1)`.
    #[must_use]
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Jump to an explicit phase (used by hard sync).
    pub fn set_phase(&mut self, phase: f32) {
        self.phase = phase.rem_euclid(1.0);
    }
}

/// A wavetable oscillator: advances a phase accumulator, reading through a
/// shared [`Wavetable`] bank with frequency-modulation (through-zero,
/// additive to phase increment) and phase-modulation (instantaneous phase
/// offset) inputs.
#[derive(Debug, Clone)]
pub struct Oscillator<'a> {
    table: &'a Wavetable,
    state: WavetableState,
    sample_rate: f32,
}

impl<'a> Oscillator<'a> {
    /// Borrow a wavetable bank to render from.
    #[must_use]
    pub fn new(table: &'a Wavetable, sample_rate: f32) -> Self {
        Self {
            table,
            state: WavetableState::default(),
            sample_rate,
        }
    }

    /// Reset phase to zero.
    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Render one sample at `frequency`, with additive frequency modulation
    /// `fm_hz` and instantaneous phase modulation `pm_cycles`, expressed as
    /// a fraction of a full cycle (radians divided by `TAU`).
    pub fn next(&mut self, frequency: f32, fm_hz: f32, pm_cycles: f32) -> f32 {
        let effective_freq = frequency + fm_hz;
        let row = self.table.row_for_frequency(effective_freq.abs().max(1.0), self.sample_rate);

        let read_phase = (self.state.phase + pm_cycles).rem_euclid(1.0);
        let nyquist_half = self.sample_rate * 0.25;
        let sample = if effective_freq.abs() <= nyquist_half {
            self.table.sample_cubic(row, read_phase)
        } else {
            self.table.sample_linear(row, read_phase)
        };

        let increment = effective_freq / self.sample_rate;
        self.state.phase = (self.state.phase + increment).rem_euclid(1.0);
        sample
    }

    /// Current phase-accumulator state, for voices that need to persist or
    /// transplant it (e.g. hard sync, glide retrigger).
    #[must_use]
    pub fn state(&self) -> WavetableState {
        self.state
    }

    /// Overwrite the phase-accumulator state.
    pub fn set_state(&mut self, state: WavetableState) {
        self.state = state;
    }
}
