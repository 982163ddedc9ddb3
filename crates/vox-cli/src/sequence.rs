//! TOML note-sequence format for the `render` subcommand.
//!
//! ```toml
//! [[param]]
//! name = "rvmx"
//! ratio = 0.4
//!
//! [[note]]
//! time = 0.0
//! note = 60
//! velocity = 100
//! duration = 0.5
//! ```
//!
//! `[[param]]` entries address parameters by their stable registry name and
//! are applied once before rendering starts — the engine and the effects
//! chain each pick up the ids they own.

use std::path::Path;

use serde::Deserialize;
use vox_registry::ParamId;
use vox_synth::ControlEvent;

use crate::error::{CliError, Result};

#[derive(Debug, Deserialize)]
struct NoteEvent {
    time: f64,
    note: i64,
    #[serde(default = "default_velocity")]
    velocity: u8,
    #[serde(default)]
    channel: u8,
    duration: f64,
}

fn default_velocity() -> u8 {
    100
}

#[derive(Debug, Deserialize)]
struct ParamSetting {
    name: String,
    ratio: f32,
}

#[derive(Debug, Deserialize)]
struct SequenceFile {
    #[serde(rename = "note", default)]
    notes: Vec<NoteEvent>,
    #[serde(rename = "param", default)]
    params: Vec<ParamSetting>,
}

/// A parsed sequence: initial parameter settings plus sample-indexed note
/// events, sorted by sample offset.
#[derive(Debug)]
pub struct Sequence {
    pub params: Vec<(ParamId, f32)>,
    pub events: Vec<(usize, ControlEvent)>,
}

/// Load a sequence from a TOML file. `note_off` events are placed one
/// sample after their note's `note_on` when `duration` rounds to zero, so a
/// zero-length note still produces audible output. Unknown parameter names
/// are an error — a typo'd name silently doing nothing is the worst way to
/// debug a patch.
pub fn load(path: impl AsRef<Path>, sample_rate: f64) -> Result<Sequence> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| CliError::ReadSequence {
        path: path.to_path_buf(),
        source,
    })?;
    let file: SequenceFile = toml::from_str(&text)?;

    let mut params = Vec::with_capacity(file.params.len());
    for setting in &file.params {
        let id = vox_registry::param_id_by_name(&setting.name)
            .ok_or_else(|| CliError::UnknownParam { name: setting.name.clone() })?;
        params.push((id, setting.ratio.clamp(0.0, 1.0)));
    }

    let mut events = Vec::with_capacity(file.notes.len() * 2);
    for (index, event) in file.notes.iter().enumerate() {
        if !(0..=127).contains(&event.note) {
            return Err(CliError::NoteOutOfRange { index, note: event.note });
        }
        let note = event.note as u8;
        let channel = event.channel % 16;
        let on_sample = (event.time * sample_rate).round() as usize;
        let off_sample = ((event.time + event.duration) * sample_rate)
            .round()
            .max((on_sample + 1) as f64) as usize;

        events.push((on_sample, ControlEvent::NoteOn { channel, note, velocity: event.velocity }));
        events.push((off_sample, ControlEvent::NoteOff { channel, note }));
    }
    events.sort_by_key(|(sample, _)| *sample);
    Ok(Sequence { params, events })
}

/// Total length in samples needed to play a sequence plus a release tail.
#[must_use]
pub fn total_samples(events: &[(usize, ControlEvent)], tail_seconds: f64, sample_rate: f64) -> usize {
    let last = events.iter().map(|(sample, _)| *sample).max().unwrap_or(0);
    last + (tail_seconds * sample_rate).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_notes_into_sample_indexed_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seq.toml");
        std::fs::write(
            &path,
            r#"
            [[note]]
            time = 0.0
            note = 60
            velocity = 100
            duration = 0.5

            [[note]]
            time = 0.25
            note = 64
            duration = 0.25
            "#,
        )
        .unwrap();

        let sequence = load(&path, 1000.0).unwrap();
        assert_eq!(sequence.events.len(), 4);
        assert!(matches!(sequence.events[0].1, ControlEvent::NoteOn { note: 60, .. }));
        assert_eq!(sequence.events[0].0, 0);
    }

    #[test]
    fn resolves_param_settings_by_registry_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seq.toml");
        std::fs::write(
            &path,
            "[[param]]\nname = \"rvmx\"\nratio = 0.4\n\n[[param]]\nname = \"fcut\"\nratio = 0.9\n",
        )
        .unwrap();

        let sequence = load(&path, 48_000.0).unwrap();
        assert_eq!(sequence.params.len(), 2);
        assert_eq!(sequence.params[0].0, ParamId::ReverbMix);
        assert_eq!(sequence.params[1].0, ParamId::FilterCutoff);
    }

    #[test]
    fn rejects_an_unknown_param_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seq.toml");
        std::fs::write(&path, "[[param]]\nname = \"nope\"\nratio = 0.5\n").unwrap();

        let err = load(&path, 48_000.0).unwrap_err();
        assert!(matches!(err, CliError::UnknownParam { .. }));
    }

    #[test]
    fn rejects_out_of_range_notes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seq.toml");
        std::fs::write(&path, "[[note]]\ntime = 0.0\nnote = 200\nduration = 0.1\n").unwrap();

        let err = load(&path, 48_000.0).unwrap_err();
        assert!(matches!(err, CliError::NoteOutOfRange { .. }));
    }
}
