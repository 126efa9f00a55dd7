//! CLI subcommands.

pub mod devices;
pub mod effects;
pub mod info;
pub mod play;
pub mod process;

use mangle_core::{ParamKind, ParamMap, ParamSpec};

/// Parse `key=value` pairs against an effect's parameter schema.
///
/// Values are matched to the declared kind: numbers for float/int, `on`/
/// `off`/`true`/`false` for toggles, option names for choices. Unknown keys
/// are rejected so typos fail loudly instead of silently using defaults.
pub fn parse_params(pairs: &[String], specs: &'static [ParamSpec]) -> anyhow::Result<ParamMap> {
    let mut params = ParamMap::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("expected key=value, got '{pair}'"))?;
        let spec = specs
            .iter()
            .find(|s| s.key == key)
            .ok_or_else(|| anyhow::anyhow!("unknown parameter '{key}'"))?;
        match spec.kind {
            ParamKind::Bool => {
                let flag = matches!(value, "1" | "on" | "true" | "yes");
                params.set_bool(key, flag);
            }
            ParamKind::Choice(options) => {
                if !options.contains(&value) {
                    anyhow::bail!(
                        "invalid value '{value}' for '{key}', expected one of {options:?}"
                    );
                }
                params.set_text(key, value);
            }
            _ => {
                let number: f32 = value
                    .parse()
                    .map_err(|_| anyhow::anyhow!("invalid number '{value}' for '{key}'"))?;
                params.set(key, number);
            }
        }
    }
    Ok(params)
}
