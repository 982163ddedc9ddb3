//! Waveshaping functions, their antiderivatives, and small gain helpers.
//!
//! Every shaping function here comes in a pair: `f` and `f_ad`, the first
//! antiderivative [`crate::adaa::Adaa1`] needs to run `f` anti-aliased.
//! Antiderivatives are defined up to a constant, which cancels in the ADAA
//! finite difference; the only hard requirement is that each `_ad` really
//! integrates its partner, which the tests check numerically.

use libm::{expf, logf, sinf, tanhf};

/// Convert decibels to linear gain (`0 dB -> 1.0`, `-6 dB -> ~0.5`).
#[inline]
#[must_use]
pub fn db_to_linear(db: f32) -> f32 {
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels. Input is floored at `1e-10` so silence
/// maps to a large negative number instead of `-inf`.
#[inline]
#[must_use]
pub fn linear_to_db(linear: f32) -> f32 {
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear.max(1e-10)) * FACTOR
}

/// `tanh` saturation. Approaches ±1 asymptotically, odd harmonics only.
#[inline]
#[must_use]
pub fn soft_clip(x: f32) -> f32 {
    tanhf(x)
}

/// Antiderivative of [`soft_clip`]: `ln(2·cosh(x))`, computed as
/// `|x| + ln(1 + exp(-2|x|))` so large inputs don't overflow `coshf`.
#[inline]
#[must_use]
pub fn soft_clip_ad(x: f32) -> f32 {
    let abs_x = x.abs();
    abs_x + logf(1.0 + expf(-2.0 * abs_x))
}

/// Clamp to `[-threshold, threshold]`. Flat tops, harsh odd harmonics.
#[inline]
#[must_use]
pub fn hard_clip(x: f32, threshold: f32) -> f32 {
    x.clamp(-threshold, threshold)
}

/// Antiderivative of [`hard_clip`]: quadratic inside the linear region,
/// linear outside it.
#[inline]
#[must_use]
pub fn hard_clip_ad(x: f32, threshold: f32) -> f32 {
    let abs_x = x.abs();
    if abs_x <= threshold {
        x * x * 0.5
    } else {
        threshold * abs_x - threshold * threshold * 0.5
    }
}

/// Saturation whose negative half clips harder than its positive half
/// (`tanh(x)` above zero, `0.8·tanh(1.5x)` below), adding even harmonics on
/// top of the odd ones a symmetric clipper produces.
#[inline]
#[must_use]
pub fn asymmetric_clip(x: f32) -> f32 {
    if x >= 0.0 {
        tanhf(x)
    } else {
        tanhf(x * 1.5) / 1.5 * 1.2
    }
}

/// Antiderivative of [`asymmetric_clip`]. The negative branch scales
/// [`soft_clip_ad`] by `0.8/1.5` per the chain rule; the `ln 2` term keeps
/// the two branches continuous at zero.
#[inline]
#[must_use]
pub fn asymmetric_clip_ad(x: f32) -> f32 {
    if x >= 0.0 {
        soft_clip_ad(x)
    } else {
        (8.0 / 15.0) * soft_clip_ad(1.5 * x) + core::f32::consts::LN_2 * 7.0 / 15.0
    }
}

/// Exponential-approach saturation with asymmetric time constants:
/// `1 - exp(-2x)` for positive input, `-1 + exp(1.8x)` for negative.
#[inline]
#[must_use]
pub fn tape_sat(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 - expf(-2.0 * x)
    } else {
        -1.0 + expf(1.8 * x)
    }
}

/// Antiderivative of [`tape_sat`]. The negative branch carries a
/// `0.5 - 1/1.8` offset so `F` is continuous at zero.
#[inline]
#[must_use]
pub fn tape_sat_ad(x: f32) -> f32 {
    if x >= 0.0 {
        x + expf(-2.0 * x) * 0.5
    } else {
        -x + expf(1.8 * x) / 1.8 + (0.5 - 1.0 / 1.8)
    }
}

/// Gentle squeeze `x / (1 + |x|)`, strictly below the `y = x` line for every
/// positive input (and strictly above `y = -x` for every negative one). That
/// strict-contraction property is what makes it safe inside a delay feedback
/// loop: each pass around the loop shrinks the signal, so iterated
/// application converges to zero no matter the loop gain the user dials in.
#[inline]
#[must_use]
pub fn squeeze(x: f32) -> f32 {
    x / (1.0 + x.abs())
}

/// Antiderivative of [`squeeze`]: `|x| - ln(1 + |x|)`, even because the
/// shaper is odd.
#[inline]
#[must_use]
pub fn squeeze_ad(x: f32) -> f32 {
    let abs_x = x.abs();
    abs_x - logf(1.0 + abs_x)
}

/// Sine wavefolder shaping function. Unlike a clipper, louder input adds
/// more folds instead of more flat-topping: `sin` never leaves its `±1`
/// extremum at any input magnitude.
#[inline]
#[must_use]
pub fn sine_fold(x: f32) -> f32 {
    sinf(x)
}

/// Antiderivative of [`sine_fold`]: `-cos(x)`.
#[inline]
#[must_use]
pub fn sine_fold_ad(x: f32) -> f32 {
    -libm::cosf(x)
}

/// Transparent safety limiter: identity below 90% of `ceiling`, `tanh`
/// compression of the excess above it. Output never exceeds `ceiling` in
/// magnitude.
#[inline]
#[must_use]
pub fn soft_limit(x: f32, ceiling: f32) -> f32 {
    let threshold = ceiling * 0.9;
    if x.abs() <= threshold {
        x
    } else {
        let headroom = ceiling - threshold;
        let excess = x.abs() - threshold;
        x.signum() * (threshold + headroom * tanhf(excess / headroom))
    }
}

/// Flush values in the subnormal range to zero. Subnormal floats stall the
/// FPU on most architectures; feedback loops that decay toward silence
/// (combs, delay lines) would otherwise sit in that range indefinitely.
#[allow(clippy::inline_always)]
#[inline(always)]
#[must_use]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// Crossfade between dry and wet: `dry + (wet - dry) * mix`.
#[inline]
#[must_use]
pub fn wet_dry_mix(dry: f32, wet: f32, mix: f32) -> f32 {
    dry + (wet - dry) * mix
}
