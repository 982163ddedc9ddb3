//! Engine construction config for the voxgraph synth.
//!
//! This is a construction-time concern, not a preset/patch system: it holds
//! exactly the handful of values the orchestrator needs before it can build
//! its first [`vox_synth::Synth`](../vox_synth/struct.Synth.html), loadable
//! from a small TOML file.
//!
//! ```rust,no_run
//! use vox_config::EngineConfig;
//!
//! let config = EngineConfig::load("engine.toml").unwrap();
//! ```

mod error;

pub use error::ConfigError;

use serde::Deserialize;
use std::path::Path;
use vox_core::tuning::StandardTuning;

/// Which standard 12-TET reference pitch to tune voices against.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TuningChoice {
    /// A4 = 440 Hz.
    A440,
    /// A4 = 415 Hz.
    A415,
    /// A4 = 442 Hz.
    A442,
}

impl Default for TuningChoice {
    fn default() -> Self {
        TuningChoice::A440
    }
}

impl TuningChoice {
    /// Resolve to the concrete tuning table.
    #[must_use]
    pub fn to_tuning(self) -> StandardTuning {
        match self {
            TuningChoice::A440 => StandardTuning::A440,
            TuningChoice::A415 => StandardTuning::A415,
            TuningChoice::A442 => StandardTuning::A442,
        }
    }
}

/// Construction-time configuration for the synth engine: sample rate, block
/// size, polyphony, tuning and voice-GC interval. Built once and handed to
/// the orchestrator; never mutated by the audio thread.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Host sample rate in Hz.
    pub sample_rate: f64,
    /// Samples rendered per `generate_samples` call.
    pub block_size: usize,
    /// Maximum simultaneously active voices.
    pub polyphony: usize,
    /// Reference tuning for note-to-frequency conversion.
    pub tuning: TuningChoice,
    /// How many rounds between sweeps that reclaim fully-decayed voices.
    pub samples_between_gc: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            block_size: 256,
            polyphony: 32,
            tuning: TuningChoice::default(),
            samples_between_gc: 48_000,
        }
    }
}

impl EngineConfig {
    /// Load and validate a config from a TOML file, falling back to
    /// [`EngineConfig::default`] for any field the file omits.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let config: EngineConfig = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config from an in-memory TOML string.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field is in a range the orchestrator can actually build
    /// from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate <= 0.0 {
            return Err(ConfigError::invalid_field("sample_rate", "must be > 0"));
        }
        if self.block_size == 0 {
            return Err(ConfigError::invalid_field("block_size", "must be > 0"));
        }
        if self.polyphony == 0 {
            return Err(ConfigError::invalid_field("polyphony", "must be > 0"));
        }
        if self.samples_between_gc <= 0 {
            return Err(ConfigError::invalid_field("samples_between_gc", "must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config = EngineConfig::from_toml_str("polyphony = 8\n").unwrap();
        assert_eq!(config.polyphony, 8);
        assert_eq!(config.sample_rate, EngineConfig::default().sample_rate);
    }

    #[test]
    fn rejects_zero_block_size() {
        let config = EngineConfig {
            block_size: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn tuning_choice_resolves() {
        assert_eq!(TuningChoice::A442.to_tuning(), StandardTuning::A442);
    }
}
