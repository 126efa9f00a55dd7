//! Project and preset persistence for the mangle editor.
//!
//! - **`.gspi` projects** ([`save_project`] / [`load_project`]): a ZIP
//!   archive holding `project.json` (sample rate, clip table, the operation
//!   ledger without snapshots, and ops-only undo/redo stacks), one PCM_16
//!   WAV per clip, and the base audio capture. Loading re-renders from the
//!   ops list; structural snapshots are reconstructed on the first render.
//! - **`.pspi` presets** ([`load_presets`] / [`save_presets`]): UTF-8 JSON
//!   files of named effect chains. A wrong `format` field is rejected with a
//!   precise message and the current project is left untouched.

mod gspi;
mod preset;

pub use gspi::{PROJECT_VERSION, load_project, save_project};
pub use preset::{
    PRESET_FORMAT, PRESET_VERSION, Preset, PresetEffect, PresetFile, apply_preset,
    load_presets, save_presets,
};

use thiserror::Error;

/// Errors for project/preset persistence.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive error.
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WAV payload error.
    #[error("WAV error: {0}")]
    Wav(#[from] mangle_io::Error),

    /// A required archive entry is missing.
    #[error("missing archive entry: {0}")]
    MissingEntry(String),

    /// The file declares an unexpected format.
    #[error("unrecognized format '{found}', expected '{expected}'")]
    Schema {
        /// Format string found in the file.
        found: String,
        /// Format string this loader understands.
        expected: &'static str,
    },
}

/// Convenience result type for persistence operations.
pub type Result<T> = std::result::Result<T, ProjectError>;
