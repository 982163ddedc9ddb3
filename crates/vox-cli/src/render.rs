//! Renders a note sequence through a [`vox_synth::Synth`] and
//! [`vox_effects::EffectsChain`] into a 32-bit float WAV file.

use std::path::Path;

use vox_config::EngineConfig;
use vox_core::Effect;
use vox_effects::EffectsChain;
use vox_synth::{ControlEvent, Synth};

use crate::error::{CliError, Result};

/// Compile-time voice count. Runtime `polyphony` in [`EngineConfig`] is
/// clamped to this, since const generics can't take a runtime voice count.
const MAX_VOICES: usize = 32;

pub fn render_to_wav(
    config: &EngineConfig,
    sequence: &crate::sequence::Sequence,
    total_samples: usize,
    out_path: impl AsRef<Path>,
) -> Result<()> {
    if config.polyphony > MAX_VOICES {
        tracing::warn!(
            requested = config.polyphony,
            effective = MAX_VOICES,
            "polyphony clamped to the compiled-in voice count"
        );
    }

    let mut synth: Synth<MAX_VOICES> = Synth::new(config.sample_rate, config.samples_between_gc);
    synth.set_tuning(config.tuning.to_tuning());
    let mut chain = EffectsChain::new(config.sample_rate as f32);

    // Initial parameter settings: the engine and the chain each pick up
    // the registry ids they own.
    for &(id, ratio) in &sequence.params {
        synth.set_param(id, ratio);
        chain.set_param_ratio(id, ratio);
    }
    let events = &sequence.events;

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: config.sample_rate as u32,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let out_path = out_path.as_ref();
    let mut writer = hound::WavWriter::create(out_path, spec).map_err(|source| CliError::WavWrite {
        path: out_path.to_path_buf(),
        source,
    })?;

    let mut buffer = vec![0.0_f32; config.block_size];
    let mut rendered = 0;
    while rendered < total_samples {
        let block_len = buffer.len().min(total_samples - rendered);
        let block = &mut buffer[..block_len];

        let block_events: Vec<(usize, ControlEvent)> = events
            .iter()
            .filter(|(sample, _)| *sample >= rendered && *sample < rendered + block_len)
            .map(|(sample, event)| (sample - rendered, *event))
            .collect();

        synth.generate_samples(&block_events, block);
        for sample in block.iter_mut() {
            *sample = chain.process(*sample);
        }

        for &sample in block.iter() {
            writer.write_sample(sample).map_err(|source| CliError::WavWrite {
                path: out_path.to_path_buf(),
                source,
            })?;
        }
        rendered += block_len;
    }

    writer.finalize().map_err(|source| CliError::WavWrite {
        path: out_path.to_path_buf(),
        source,
    })?;
    Ok(())
}
