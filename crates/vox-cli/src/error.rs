//! Error type for the `voxgraph` binary.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to read sequence file '{path}': {source}")]
    ReadSequence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sequence TOML: {0}")]
    SequenceParse(#[from] toml::de::Error),

    #[error("sequence note {index} is out of MIDI range 0-127: {note}")]
    NoteOutOfRange { index: usize, note: i64 },

    #[error("unknown parameter name '{name}'; run `voxgraph params` for the full list")]
    UnknownParam { name: String },

    #[error(transparent)]
    Config(#[from] vox_config::ConfigError),

    #[error("failed to write WAV file '{path}': {source}")]
    WavWrite {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
}

pub type Result<T> = std::result::Result<T, CliError>;
