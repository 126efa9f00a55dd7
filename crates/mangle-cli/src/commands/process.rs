//! `mangle process` — apply an effect or a preset to a WAV file.

use crate::commands::parse_params;
use clap::Args;
use mangle_engine::EditorSession;
use mangle_io::{read_wav, write_wav};
use mangle_project::{apply_preset, load_presets};
use mangle_registry::EffectRegistry;
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input WAV file
    pub input: PathBuf,

    /// Output WAV file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Effect id to apply (see `mangle effects`)
    #[arg(long, conflicts_with = "preset")]
    pub effect: Option<String>,

    /// Preset file and name, e.g. `--preset chains.pspi:Crunchy`
    #[arg(long)]
    pub preset: Option<String>,

    /// Effect parameters as key=value pairs
    #[arg(short, long = "param")]
    pub params: Vec<String>,

    /// Selection start in seconds (whole file when omitted)
    #[arg(long)]
    pub start_sec: Option<f64>,

    /// Selection end in seconds
    #[arg(long)]
    pub end_sec: Option<f64>,

    /// Seed for randomized effects
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Output bit depth (16 or 32)
    #[arg(long, default_value_t = 16)]
    pub bits: u16,
}

/// Run the process command.
pub fn run(args: ProcessArgs) -> anyhow::Result<()> {
    let registry = Arc::new(EffectRegistry::new());
    let (audio, spec) = read_wav(&args.input)?;
    let sample_rate = spec.sample_rate;

    let mut session = EditorSession::new(Arc::clone(&registry));
    session.set_rng_seed(args.seed);
    session.load_initial_clip(audio, sample_rate, "input");

    let frames = session
        .current_audio()
        .map(|a| a.frames())
        .unwrap_or_default();
    let to_frame = |sec: f64| ((sec * f64::from(sample_rate)) as usize).min(frames);
    let selection = match (args.start_sec, args.end_sec) {
        (None, None) => None,
        (start, end) => Some((
            to_frame(start.unwrap_or(0.0)),
            to_frame(end.unwrap_or(frames as f64 / f64::from(sample_rate))),
        )),
    };

    match (&args.effect, &args.preset) {
        (Some(effect_id), None) => {
            let descriptor = registry
                .descriptor(effect_id)
                .ok_or_else(|| anyhow::anyhow!("unknown effect '{effect_id}'"))?;
            let params = parse_params(&args.params, descriptor.params)?;
            session.apply_effect(effect_id, params, selection)?;
        }
        (None, Some(spec)) => {
            let (file, name) = spec
                .split_once(':')
                .ok_or_else(|| anyhow::anyhow!("expected --preset FILE:NAME"))?;
            let presets = load_presets(file)?;
            let preset = presets
                .preset(name)
                .ok_or_else(|| anyhow::anyhow!("preset '{name}' not found in {file}"))?;
            apply_preset(&mut session, preset, selection)?;
        }
        _ => anyhow::bail!("specify exactly one of --effect or --preset"),
    }

    let rendered = session
        .current_audio()
        .ok_or_else(|| anyhow::anyhow!("nothing rendered"))?;
    write_wav(&args.output, rendered, args.bits)?;
    println!(
        "{} -> {} ({} frames, {} ops)",
        args.input.display(),
        args.output.display(),
        rendered.frames(),
        session.ops().len(),
    );
    Ok(())
}
