//! Mangle CLI - command-line interface for the glitch editor core.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mangle")]
#[command(author, version, about = "Glitch audio editor CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available effects and their parameters
    Effects(commands::effects::EffectsArgs),

    /// Display WAV file information
    Info(commands::info::InfoArgs),

    /// Apply an effect or a preset to a WAV file
    Process(commands::process::ProcessArgs),

    /// Play a WAV file with optional loop region and metronome
    Play(commands::play::PlayArgs),

    /// List audio output devices
    Devices(commands::devices::DevicesArgs),
}

fn main() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    tracing::debug!(command = ?std::mem::discriminant(&cli.command), "dispatching command");

    match cli.command {
        Commands::Effects(args) => commands::effects::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Process(args) => commands::process::run(args),
        Commands::Play(args) => commands::play::run(args),
        Commands::Devices(args) => commands::devices::run(args),
    }
}
