//! `mangle play` — stream a WAV file through the playback engine.

use clap::Args;
use mangle_io::{PlaybackEngine, PlaybackEvent, read_wav};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Arguments for the play command.
#[derive(Args)]
pub struct PlayArgs {
    /// WAV file to play
    pub input: PathBuf,

    /// Output device index (see `mangle devices`)
    #[arg(short, long)]
    pub device: Option<usize>,

    /// Master volume, 0.0–1.0
    #[arg(short, long, default_value_t = 0.8)]
    pub volume: f32,

    /// Loop a region: start seconds
    #[arg(long, requires = "loop_end")]
    pub loop_start: Option<f64>,

    /// Loop a region: end seconds
    #[arg(long, requires = "loop_start")]
    pub loop_end: Option<f64>,

    /// Mix a metronome into playback
    #[arg(long)]
    pub metronome: bool,

    /// Metronome tempo in BPM
    #[arg(long, default_value_t = 120.0)]
    pub bpm: f32,

    /// Metronome beats per bar
    #[arg(long, default_value_t = 4)]
    pub beats: u32,
}

/// Run the play command.
pub fn run(args: PlayArgs) -> anyhow::Result<()> {
    let (audio, spec) = read_wav(&args.input)?;
    let sample_rate = spec.sample_rate;
    let duration = audio.duration_secs();

    let mut engine = PlaybackEngine::new();
    engine.set_output_device(args.device);
    engine.set_volume(args.volume);
    engine.load(audio, sample_rate);

    if let (Some(start), Some(end)) = (args.loop_start, args.loop_end) {
        let to_frame = |sec: f64| (sec * f64::from(sample_rate)) as usize;
        engine.set_loop(Some(to_frame(start)), Some(to_frame(end)), true);
        println!("looping {start:.2}s – {end:.2}s");
    }

    if args.metronome {
        engine.set_metronome_bpm(args.bpm);
        engine.set_metronome_beats(args.beats);
        engine.set_metronome_enabled(true);
    }

    let running = Arc::new(AtomicBool::new(true));
    let running_ctrlc = Arc::clone(&running);
    ctrlc::set_handler(move || running_ctrlc.store(false, Ordering::SeqCst))?;

    println!("playing {} ({duration:.2}s) — Ctrl-C to stop", args.input.display());
    engine.play(None);

    while running.load(Ordering::SeqCst) {
        if engine.poll_events().contains(&PlaybackEvent::Finished) {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    engine.stop();
    Ok(())
}
