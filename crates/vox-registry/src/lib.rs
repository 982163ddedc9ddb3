//! Closed parameter-id space for the voxgraph synth.
//!
//! Every automatable parameter in the engine is named by a [`ParamId`]
//! variant rather than a dynamically registered index, so a MIDI CC binding
//! or a host's automation lane can refer to a parameter by a stable
//! identifier that survives across engine versions. [`PARAM_TABLE`] pairs
//! each id with a short stable name (3-5 characters, terse enough for wire
//! formats and MIDI-learn displays), its `(min, max, default)` range, and
//! whether it's mapped on a logarithmic scale.

#![cfg_attr(not(feature = "std"), no_std)]

/// A stable, closed identifier for every automatable parameter in the
/// engine. New parameters are appended at the end; existing discriminants
/// are never renumbered, so a saved automation binding stays valid across
/// versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
#[non_exhaustive]
pub enum ParamId {
    // --- Per-voice oscillator / filter / shaping chain ---
    ModulatorAmplitude = 0,
    ModulatorRatio,
    ModulatorWaveform,
    CarrierAmplitude,
    CarrierWaveform,
    FilterCutoff,
    FilterResonance,
    FilterType,
    DistortionLevel,
    WavefolderFold,

    // --- Envelope (DAHDSR) ---
    Envelope1Attack,
    Envelope1Decay,
    Envelope1Sustain,
    Envelope1Release,

    // --- LFO ---
    Lfo1Frequency,
    Lfo1Amount,
    Lfo1Waveform,

    // --- Macro ---
    Macro1Input,
    Macro1Scale,
    Macro1Distort,

    // --- Shared effects chain ---
    Filter1Cutoff,
    Filter1Resonance,
    Filter2Cutoff,
    Filter2Resonance,
    Volume1Gain,
    OverdriveLevel,
    EffectDistortionLevel,
    ChorusRate,
    ChorusDepth,
    EchoDelayTime,
    EchoFeedback,
    EchoDamping,
    ReverbDamping,
    ReverbMix,
    CompressorThreshold,
    CompressorRatio,
    Volume3Gain,

    // --- Performance ---
    Portamento,
    VoiceDrift,
}

/// Whether a [`ParamId`] maps its `[0, 1]` automation ratio onto its value
/// range linearly or logarithmically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamScaleKind {
    /// Linear interpolation between `min` and `max`.
    Linear,
    /// Logarithmic interpolation — equal automation steps feel like equal
    /// perceptual steps for frequency/gain-like ranges.
    Logarithmic,
}

/// Static metadata for one [`ParamId`]: its stable short name, value range,
/// default, and scale.
#[derive(Debug, Clone, Copy)]
pub struct ParamMeta {
    /// The id this metadata describes.
    pub id: ParamId,
    /// Stable 3-5 character name, used in wire formats and MIDI learn UIs.
    pub name: &'static str,
    /// Minimum value.
    pub min: f32,
    /// Maximum value.
    pub max: f32,
    /// Default value.
    pub default: f32,
    /// How a `[0, 1]` ratio maps onto `[min, max]`.
    pub scale: ParamScaleKind,
}

macro_rules! param_table {
    ($(($variant:ident, $name:literal, $min:expr, $max:expr, $default:expr, $scale:ident)),* $(,)?) => {
        /// The full parameter table, indexed in declaration order (which
        /// matches [`ParamId`] discriminant order).
        pub const PARAM_TABLE: &[ParamMeta] = &[
            $(ParamMeta {
                id: ParamId::$variant,
                name: $name,
                min: $min,
                max: $max,
                default: $default,
                scale: ParamScaleKind::$scale,
            }),*
        ];
    };
}

param_table! {
    (ModulatorAmplitude, "mamp", 0.0, 1.0, 1.0, Linear),
    (ModulatorRatio, "mrat", 0.0, 16.0, 1.0, Linear),
    (ModulatorWaveform, "mwav", 0.0, 3.0, 0.0, Linear),
    (CarrierAmplitude, "camp", 0.0, 1.0, 1.0, Linear),
    (CarrierWaveform, "cwav", 0.0, 3.0, 0.0, Linear),
    (FilterCutoff, "fcut", 20.0, 20000.0, 20000.0, Logarithmic),
    (FilterResonance, "fres", 0.1, 20.0, 0.707, Logarithmic),
    (FilterType, "ftyp", 0.0, 3.0, 0.0, Linear),
    (DistortionLevel, "dlvl", 0.0, 1.0, 0.0, Linear),
    (WavefolderFold, "wfld", 0.0, 1.0, 0.0, Linear),
    (Envelope1Attack, "e1at", 0.0, 10.0, 0.02, Linear),
    (Envelope1Decay, "e1dc", 0.0, 10.0, 0.3, Linear),
    (Envelope1Sustain, "e1su", 0.0, 1.0, 0.7, Linear),
    (Envelope1Release, "e1rl", 0.0, 10.0, 0.3, Linear),
    (Lfo1Frequency, "l1fr", 0.01, 40.0, 1.0, Logarithmic),
    (Lfo1Amount, "l1am", 0.0, 1.0, 0.0, Linear),
    (Lfo1Waveform, "l1wv", 0.0, 4.0, 0.0, Linear),
    (Macro1Input, "m1in", 0.0, 1.0, 0.0, Linear),
    (Macro1Scale, "m1sc", 0.0, 4.0, 1.0, Linear),
    (Macro1Distort, "m1ds", 0.1, 4.0, 1.0, Logarithmic),
    (Filter1Cutoff, "x1cu", 20.0, 20000.0, 20000.0, Logarithmic),
    (Filter1Resonance, "x1re", 0.1, 20.0, 0.707, Logarithmic),
    (Filter2Cutoff, "x2cu", 20.0, 20000.0, 20000.0, Logarithmic),
    (Filter2Resonance, "x2re", 0.1, 20.0, 0.707, Logarithmic),
    (Volume1Gain, "v1gn", 0.0, 2.0, 1.0, Linear),
    (OverdriveLevel, "ovdv", 0.0, 1.0, 0.0, Linear),
    (EffectDistortionLevel, "xdlv", 0.0, 1.0, 0.0, Linear),
    (ChorusRate, "chrt", 0.01, 10.0, 0.5, Logarithmic),
    (ChorusDepth, "chdp", 0.0, 1.0, 0.3, Linear),
    (EchoDelayTime, "edly", 0.001, 2.0, 0.3, Logarithmic),
    (EchoFeedback, "efbk", 0.0, 0.98, 0.3, Linear),
    (EchoDamping, "edmp", 0.0, 1.0, 0.5, Linear),
    (ReverbDamping, "rvdp", 0.0, 1.0, 0.5, Linear),
    (ReverbMix, "rvmx", 0.0, 1.0, 0.3, Linear),
    (CompressorThreshold, "cpth", -60.0, 0.0, -18.0, Linear),
    (CompressorRatio, "cprt", 1.0, 20.0, 4.0, Logarithmic),
    (Volume3Gain, "v3gn", 0.0, 2.0, 1.0, Linear),
    (Portamento, "port", 0.0, 2.0, 0.0, Linear),
    (VoiceDrift, "vdrf", 0.0, 1.0, 0.0, Linear),
}

/// Metadata for a [`ParamId`]. `ParamId` is declared in lockstep with
/// [`PARAM_TABLE`], so this is a direct index, not a search.
#[must_use]
pub fn param_meta(id: ParamId) -> &'static ParamMeta {
    &PARAM_TABLE[id as usize]
}

/// Stable short name for a parameter.
#[must_use]
pub fn param_name(id: ParamId) -> &'static str {
    param_meta(id).name
}

/// `(min, max, default)` for a parameter.
#[must_use]
pub fn param_range(id: ParamId) -> (f32, f32, f32) {
    let m = param_meta(id);
    (m.min, m.max, m.default)
}

/// Look up a [`ParamId`] by its stable short name. Linear scan over a table
/// of a few dozen entries; fine for the MIDI-learn / config-load rate this
/// runs at, and avoids pulling in a hash map for a table this small.
#[must_use]
pub fn param_id_by_name(name: &str) -> Option<ParamId> {
    PARAM_TABLE.iter().find(|m| m.name == name).map(|m| m.id)
}
