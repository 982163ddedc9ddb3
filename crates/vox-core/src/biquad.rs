//! Biquad (bi-quadratic) filter with per-type boundary policies.
//!
//! Implements the direct-form-I biquad with `a1`/`a2` stored pre-negated, so
//! the per-sample update is two additions instead of two subtractions:
//!
//! ```text
//! y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] + a1*y[n-1] + a2*y[n-2]
//! ```
//!
//! Coefficient computation uses the RBJ Audio EQ Cookbook formulas, but
//! guards the degenerate cases RBJ's formulas don't behave well at: a cutoff
//! at or beyond Nyquist, a cutoff at or below zero, and (for shelving/peaking
//! types) a `Q` of zero. Each filter type picks one of four boundary
//! policies for those cases, matching what a well-behaved analog prototype
//! would do there:
//!
//! - **no-op** — pass the signal through unchanged (low-pass above Nyquist,
//!   high-pass at or below zero)
//! - **silent** — output zero (low-pass at or below zero, high-pass above
//!   Nyquist, band-pass/notch at the boundary)
//! - **gain-only** — degenerate to a flat gain stage (shelving/peaking EQ
//!   when the corner frequency is out of range; the gain still applies)
//! - **normalized** — the standard RBJ formula, used everywhere else

use core::f32::consts::PI;
use libm::{cosf, powf, sinf};

/// Which frequency-response shape a [`Biquad`]'s coefficients implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiquadType {
    /// Low-pass: passes frequencies below cutoff.
    LowPass,
    /// High-pass: passes frequencies above cutoff.
    HighPass,
    /// Band-pass, constant 0 dB peak gain.
    BandPass,
    /// Notch (band-reject).
    Notch,
    /// All-pass (flat magnitude, phase shift around center frequency).
    AllPass,
    /// Peaking EQ: boost/cut around a center frequency.
    PeakingEq,
    /// Low shelf: boost/cut below a corner frequency.
    LowShelf,
    /// High shelf: boost/cut above a corner frequency.
    HighShelf,
}

/// Second-order IIR filter: coefficients plus the two-sample delay lines
/// needed to run them.
#[derive(Debug, Clone, Copy)]
pub struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    /// Passthrough biquad (`y[n] = x[n]`).
    #[must_use]
    pub fn new() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Compute and install coefficients for `filter_type` at `frequency`
    /// Hz / `q` / `gain_db` (ignored by non-shelving/peaking types) for
    /// `sample_rate`, applying the boundary policy for that type.
    pub fn set_type(&mut self, filter_type: BiquadType, frequency: f32, q: f32, gain_db: f32, sample_rate: f32) {
        let coeffs = compute_coefficients(filter_type, frequency, q, gain_db, sample_rate);
        self.b0 = coeffs.b0;
        self.b1 = coeffs.b1;
        self.b2 = coeffs.b2;
        self.a1 = -coeffs.a1;
        self.a2 = -coeffs.a2;
    }

    /// Install raw coefficients directly, normalizing by `a0` and negating
    /// `a1`/`a2` for the additive process loop.
    pub fn set_raw(&mut self, b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) {
        let inv_a0 = 1.0 / a0;
        self.b0 = b0 * inv_a0;
        self.b1 = b1 * inv_a0;
        self.b2 = b2 * inv_a0;
        self.a1 = -a1 * inv_a0;
        self.a2 = -a2 * inv_a0;
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2 + self.a1 * self.y1 + self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }

    /// Process a block in place.
    pub fn process_block(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Zero the delay lines without touching coefficients.
    pub fn clear(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    /// True when this biquad's coefficients are the identity passthrough
    /// (`b0 = 1`, everything else `0`) — the state kept by the no-op
    /// boundary policy.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.b0 == 1.0 && self.b1 == 0.0 && self.b2 == 0.0 && self.a1 == 0.0 && self.a2 == 0.0
    }
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new()
    }
}

struct RawCoefficients {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

const NOOP: RawCoefficients = RawCoefficients {
    b0: 1.0,
    b1: 0.0,
    b2: 0.0,
    a1: 0.0,
    a2: 0.0,
};
const SILENT: RawCoefficients = RawCoefficients {
    b0: 0.0,
    b1: 0.0,
    b2: 0.0,
    a1: 0.0,
    a2: 0.0,
};

fn gain_only(gain_db: f32) -> RawCoefficients {
    RawCoefficients {
        b0: crate::math::db_to_linear(gain_db),
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    }
}

/// Q below which the resonance-shaped types degenerate: a band-pass this
/// wide passes everything, a notch this wide rejects everything, a peaking
/// band this wide is a flat gain stage.
const MIN_Q: f32 = 0.001;

/// Peaking gain, in dB, small enough to treat as a flat response.
const FLAT_GAIN_DB: f32 = 0.01;

/// Compute this filter type's coefficients at the given frequency/Q/gain,
/// applying the type's boundary policy when `frequency` sits at or beyond
/// the edges of `(0, nyquist)`, when `q` collapses below [`MIN_Q`], or when
/// a peaking gain is too small to hear.
fn compute_coefficients(filter_type: BiquadType, frequency: f32, q: f32, gain_db: f32, sample_rate: f32) -> RawCoefficients {
    let nyquist = sample_rate * 0.5;

    if frequency <= 0.0 {
        return match filter_type {
            BiquadType::HighPass | BiquadType::Notch | BiquadType::AllPass => NOOP,
            BiquadType::LowPass | BiquadType::BandPass => SILENT,
            // A peaking band or low shelf cornered at zero shapes nothing;
            // a high shelf cornered at zero applies its gain everywhere.
            BiquadType::PeakingEq | BiquadType::LowShelf => NOOP,
            BiquadType::HighShelf => gain_only(gain_db),
        };
    }
    if frequency >= nyquist {
        return match filter_type {
            BiquadType::LowPass | BiquadType::Notch | BiquadType::AllPass => NOOP,
            BiquadType::HighPass | BiquadType::BandPass => SILENT,
            // The mirror image: a low shelf cornered past Nyquist covers the
            // whole band, a high shelf there shapes nothing.
            BiquadType::PeakingEq | BiquadType::HighShelf => NOOP,
            BiquadType::LowShelf => gain_only(gain_db),
        };
    }

    if filter_type == BiquadType::PeakingEq && gain_db.abs() < FLAT_GAIN_DB {
        return NOOP;
    }
    if q < MIN_Q {
        match filter_type {
            BiquadType::BandPass => return NOOP,
            BiquadType::Notch => return SILENT,
            BiquadType::PeakingEq => return gain_only(gain_db),
            _ => {}
        }
    }
    let q = q.max(MIN_Q);

    let omega = 2.0 * PI * frequency / sample_rate;
    let cos_omega = cosf(omega);
    let sin_omega = sinf(omega);
    let alpha = sin_omega / (2.0 * q);

    match filter_type {
        BiquadType::LowPass => normalize(
            (1.0 - cos_omega) / 2.0,
            1.0 - cos_omega,
            (1.0 - cos_omega) / 2.0,
            1.0 + alpha,
            -2.0 * cos_omega,
            1.0 - alpha,
        ),
        BiquadType::HighPass => normalize(
            (1.0 + cos_omega) / 2.0,
            -(1.0 + cos_omega),
            (1.0 + cos_omega) / 2.0,
            1.0 + alpha,
            -2.0 * cos_omega,
            1.0 - alpha,
        ),
        BiquadType::BandPass => normalize(alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos_omega, 1.0 - alpha),
        BiquadType::Notch => normalize(1.0, -2.0 * cos_omega, 1.0, 1.0 + alpha, -2.0 * cos_omega, 1.0 - alpha),
        BiquadType::AllPass => normalize(
            1.0 - alpha,
            -2.0 * cos_omega,
            1.0 + alpha,
            1.0 + alpha,
            -2.0 * cos_omega,
            1.0 - alpha,
        ),
        BiquadType::PeakingEq => {
            let a = powf(10.0, gain_db / 40.0);
            normalize(
                1.0 + alpha * a,
                -2.0 * cos_omega,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos_omega,
                1.0 - alpha / a,
            )
        }
        BiquadType::LowShelf => {
            let a = powf(10.0, gain_db / 40.0);
            let beta = 2.0 * libm::sqrtf(a) * alpha;
            normalize(
                a * ((a + 1.0) - (a - 1.0) * cos_omega + beta),
                2.0 * a * ((a - 1.0) - (a + 1.0) * cos_omega),
                a * ((a + 1.0) - (a - 1.0) * cos_omega - beta),
                (a + 1.0) + (a - 1.0) * cos_omega + beta,
                -2.0 * ((a - 1.0) + (a + 1.0) * cos_omega),
                (a + 1.0) + (a - 1.0) * cos_omega - beta,
            )
        }
        BiquadType::HighShelf => {
            let a = powf(10.0, gain_db / 40.0);
            let beta = 2.0 * libm::sqrtf(a) * alpha;
            normalize(
                a * ((a + 1.0) + (a - 1.0) * cos_omega + beta),
                -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_omega),
                a * ((a + 1.0) + (a - 1.0) * cos_omega - beta),
                (a + 1.0) - (a - 1.0) * cos_omega + beta,
                2.0 * ((a - 1.0) - (a + 1.0) * cos_omega),
                (a + 1.0) - (a - 1.0) * cos_omega - beta,
            )
        }
    }
}

fn normalize(b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) -> RawCoefficients {
    let inv_a0 = 1.0 / a0;
    RawCoefficients {
        b0: b0 * inv_a0,
        b1: b1 * inv_a0,
        b2: b2 * inv_a0,
        a1: a1 * inv_a0,
        a2: a2 * inv_a0,
    }
}

/// Coefficients shared by every filter whose settings are identical and
/// block-constant, computed once per change instead of once per filter.
/// The first filter to render after a settings change pays for the
/// recompute; everyone else reuses the cached tuple. Filters still keep
/// their own [`Biquad`] delay-line state; only the coefficient computation
/// is shared.
#[derive(Debug, Clone, Copy, Default)]
pub struct BiquadFilterSharedBuffers {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    key: Option<(BiquadType, f32, f32, f32, f32)>,
}

impl BiquadFilterSharedBuffers {
    /// Install coefficients for the given settings, recomputing only when
    /// they differ from the cached key. Returns whether a recompute
    /// actually happened.
    pub fn ensure(&mut self, filter_type: BiquadType, frequency: f32, q: f32, gain_db: f32, sample_rate: f32) -> bool {
        let key = (filter_type, frequency, q, gain_db, sample_rate);
        if self.key == Some(key) {
            return false;
        }
        let c = compute_coefficients(filter_type, frequency, q, gain_db, sample_rate);
        self.b0 = c.b0;
        self.b1 = c.b1;
        self.b2 = c.b2;
        self.a1 = -c.a1;
        self.a2 = -c.a2;
        self.key = Some(key);
        true
    }

    /// Apply the cached coefficients to a filter's own [`Biquad`] state,
    /// leaving its delay lines untouched. Call `ensure` first.
    pub fn apply_to(&self, biquad: &mut Biquad) {
        biquad.b0 = self.b0;
        biquad.b1 = self.b1;
        biquad.b2 = self.b2;
        biquad.a1 = self.a1;
        biquad.a2 = self.a2;
    }
}
