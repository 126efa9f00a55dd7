//! `mangle devices` — list audio output devices.

use clap::Args;
use mangle_io::list_output_devices;

/// Arguments for the devices command.
#[derive(Args)]
pub struct DevicesArgs {}

/// Run the devices command.
pub fn run(_args: DevicesArgs) -> anyhow::Result<()> {
    let devices = list_output_devices()?;
    if devices.is_empty() {
        println!("No output devices found.");
        return Ok(());
    }
    for (index, name) in devices {
        println!("[{index}] {name}");
    }
    Ok(())
}
