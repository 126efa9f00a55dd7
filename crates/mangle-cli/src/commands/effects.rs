//! `mangle effects` — list the registry.

use clap::Args;
use mangle_core::ParamKind;
use mangle_registry::{EffectRegistry, SECTIONS};

/// Arguments for the effects command.
#[derive(Args)]
pub struct EffectsArgs {
    /// Show parameter details for one effect
    #[arg(long)]
    pub effect: Option<String>,
}

/// Run the effects command.
pub fn run(args: EffectsArgs) -> anyhow::Result<()> {
    let registry = EffectRegistry::new();

    if let Some(id) = args.effect {
        let desc = registry
            .descriptor(&id)
            .ok_or_else(|| anyhow::anyhow!("unknown effect '{id}'"))?;
        println!("{} ({}) — {}", desc.name, desc.id, desc.description);
        println!("section: {}", desc.section.name());
        for param in desc.params {
            let kind = match param.kind {
                ParamKind::Choice(options) => format!("one of {options:?}"),
                ParamKind::Bool => "on/off".to_string(),
                ParamKind::Int => format!("{}..{} (int)", param.min, param.max),
                ParamKind::Float => format!("{}..{}", param.min, param.max),
            };
            println!(
                "  {:<14} {:<22} default {}{}{}",
                param.key,
                kind,
                param.default,
                param.unit.suffix(),
                if param.automatable { "  [automatable]" } else { "" },
            );
        }
        return Ok(());
    }

    for section in SECTIONS {
        println!("{}", section.name());
        for desc in registry.descriptors_in_section(section) {
            println!("  {:<14} {}", desc.id, desc.description);
        }
    }
    Ok(())
}
