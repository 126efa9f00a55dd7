//! `mangle info` — WAV file metadata.

use clap::Args;
use mangle_io::read_wav;
use std::path::PathBuf;

/// Arguments for the info command.
#[derive(Args)]
pub struct InfoArgs {
    /// WAV file to inspect
    pub input: PathBuf,
}

/// Run the info command.
pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let (audio, spec) = read_wav(&args.input)?;
    println!("{}", args.input.display());
    println!("  sample rate : {} Hz", spec.sample_rate);
    println!("  channels    : {}", spec.channels);
    println!("  bit depth   : {}", spec.bits_per_sample);
    println!("  frames      : {}", audio.frames());
    println!("  duration    : {:.3} s", audio.duration_secs());
    println!("  peak        : {:.3}", audio.peak());
    println!("  rms         : {:.4}", audio.rms());
    Ok(())
}
