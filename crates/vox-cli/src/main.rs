//! `voxgraph` - WAV-rendering demo harness for the voxgraph synth engine.

mod error;
mod render;
mod sequence;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use vox_config::EngineConfig;

use error::Result;

#[derive(Parser)]
#[command(name = "voxgraph")]
#[command(author, version, about = "Voxgraph synth engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a TOML note sequence to a WAV file.
    Render(RenderArgs),

    /// List every automatable parameter and its value range.
    Params,
}

#[derive(clap::Args)]
struct RenderArgs {
    /// TOML file describing the note sequence; see `sequence` module docs.
    sequence: PathBuf,

    /// Output WAV path.
    #[arg(short, long, default_value = "out.wav")]
    out: PathBuf,

    /// Optional engine config TOML; defaults are used for anything unset.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Extra silence rendered after the last note-off, in seconds.
    #[arg(long, default_value_t = 1.5)]
    tail: f64,
}

fn main() -> Result<()> {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Render(args) => run_render(args),
        Commands::Params => {
            run_params();
            Ok(())
        }
    }
}

fn run_render(args: RenderArgs) -> Result<()> {
    let config = match args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let sequence = sequence::load(&args.sequence, config.sample_rate)?;
    let total_samples = sequence::total_samples(&sequence.events, args.tail, config.sample_rate);

    tracing::info!(
        events = sequence.events.len(),
        params = sequence.params.len(),
        total_samples,
        out = %args.out.display(),
        "rendering sequence"
    );
    render::render_to_wav(&config, &sequence, total_samples, &args.out)?;
    println!("wrote {}", args.out.display());
    Ok(())
}

fn run_params() {
    println!("{:<24} {:<6} {:>10} {:>10} {:>10}  scale", "parameter", "name", "min", "max", "default");
    for meta in vox_registry::PARAM_TABLE {
        let scale = match meta.scale {
            vox_registry::ParamScaleKind::Linear => "linear",
            vox_registry::ParamScaleKind::Logarithmic => "log",
        };
        println!(
            "{:<24} {:<6} {:>10.3} {:>10.3} {:>10.3}  {scale}",
            format!("{:?}", meta.id),
            meta.name,
            meta.min,
            meta.max,
            meta.default
        );
    }
}
