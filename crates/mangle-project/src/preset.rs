//! `.pspi` preset files — named effect chains as UTF-8 JSON.

use crate::{ProjectError, Result};
use mangle_core::ParamMap;
use mangle_engine::{EditorSession, OpId, Selection};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The `format` field every preset file must carry.
pub const PRESET_FORMAT: &str = "glitchmaker_presets";
/// Current preset file version.
pub const PRESET_VERSION: u32 = 1;

/// One effect step inside a preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetEffect {
    /// Registry id of the effect.
    pub name: String,
    /// Parameter values for the effect.
    #[serde(default)]
    pub params: ParamMap,
}

/// A named chain of effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    /// Preset name.
    pub name: String,
    /// One-line description.
    #[serde(default)]
    pub description: String,
    /// Tags for browsing.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Effects applied in order.
    #[serde(default)]
    pub effects: Vec<PresetEffect>,
    /// True for presets shipped with the app.
    #[serde(default)]
    pub builtin: bool,
}

/// A `.pspi` file: tags plus presets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetFile {
    /// Must equal [`PRESET_FORMAT`].
    pub format: String,
    /// File format version.
    pub version: u32,
    /// All known tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// The presets.
    #[serde(default)]
    pub presets: Vec<Preset>,
}

impl PresetFile {
    /// Empty preset file with the current format/version header.
    pub fn new() -> Self {
        Self {
            format: PRESET_FORMAT.to_string(),
            version: PRESET_VERSION,
            tags: Vec::new(),
            presets: Vec::new(),
        }
    }

    /// Look up a preset by name.
    pub fn preset(&self, name: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.name == name)
    }

    /// Presets carrying the given tag.
    pub fn presets_with_tag(&self, tag: &str) -> Vec<&Preset> {
        self.presets
            .iter()
            .filter(|p| p.tags.iter().any(|t| t == tag))
            .collect()
    }
}

impl Default for PresetFile {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and validate a `.pspi` file. A wrong `format` field is rejected with
/// a precise message; nothing else is touched.
pub fn load_presets(path: impl AsRef<Path>) -> Result<PresetFile> {
    let json = std::fs::read_to_string(path)?;
    let file: PresetFile = serde_json::from_str(&json)?;
    if file.format != PRESET_FORMAT {
        return Err(ProjectError::Schema {
            found: file.format,
            expected: PRESET_FORMAT,
        });
    }
    Ok(file)
}

/// Write a `.pspi` file.
pub fn save_presets(path: impl AsRef<Path>, presets: &PresetFile) -> Result<()> {
    let json = serde_json::to_string_pretty(presets)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Apply every effect of a preset to the session over one selection,
/// appending one ledger op per effect. Returns the new op ids.
pub fn apply_preset(
    session: &mut EditorSession,
    preset: &Preset,
    selection: Selection,
) -> mangle_engine::Result<Vec<OpId>> {
    let mut ids = Vec::with_capacity(preset.effects.len());
    for effect in &preset.effects {
        ids.push(session.apply_effect(&effect.name, effect.params.clone(), selection)?);
    }
    Ok(ids)
}
