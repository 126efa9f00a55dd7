//! `.gspi` project archives.
//!
//! A project is a ZIP with:
//!
//! - `project.json` — version, sample rate, source path, clip table,
//!   `effect_ops` (the ledger, snapshots stripped), `has_base_audio`, and
//!   ops-only `undo_stack` / `redo_stack`
//! - `clip_###.wav` — one PCM_16 WAV per clip
//! - `base_audio.wav` — the base audio capture, when one exists

use crate::{ProjectError, Result};
use mangle_engine::{EditorSession, HistorySnapshot, OpId, Operation, Timeline};
use mangle_io::{read_wav_from, write_wav_pcm16_to};
use mangle_registry::EffectRegistry;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Format version written into new projects.
pub const PROJECT_VERSION: &str = "5.6";

#[derive(Debug, Serialize, Deserialize)]
struct ClipMeta {
    name: String,
    file: String,
    position: usize,
    color: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct HistoryMeta {
    desc: String,
    ops: Vec<Operation>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProjectMeta {
    version: String,
    sample_rate: u32,
    #[serde(default)]
    source_path: String,
    clips: Vec<ClipMeta>,
    #[serde(default)]
    effect_ops: Vec<Operation>,
    #[serde(default)]
    has_base_audio: bool,
    #[serde(default)]
    undo_stack: Vec<HistoryMeta>,
    #[serde(default)]
    redo_stack: Vec<HistoryMeta>,
}

/// Write a session to a `.gspi` archive.
pub fn save_project(
    path: impl AsRef<Path>,
    session: &EditorSession,
    source_path: &str,
) -> Result<()> {
    let file = File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut clip_meta = Vec::with_capacity(session.timeline.clips.len());
    for (i, clip) in session.timeline.clips.iter().enumerate() {
        let entry_name = format!("clip_{i:03}.wav");
        let bytes = write_wav_pcm16_to(&clip.audio)?;
        zip.start_file(&entry_name, options)?;
        zip.write_all(&bytes)?;
        clip_meta.push(ClipMeta {
            name: clip.name.clone(),
            file: entry_name,
            position: clip.position,
            color: clip.color.clone(),
        });
    }

    let has_base_audio = match session.base_audio() {
        Some(base) => {
            let bytes = write_wav_pcm16_to(base)?;
            zip.start_file("base_audio.wav", options)?;
            zip.write_all(&bytes)?;
            true
        }
        None => false,
    };

    let (ops, undo, redo, _) = session.history_parts();
    let meta = ProjectMeta {
        version: PROJECT_VERSION.to_string(),
        sample_rate: session.sample_rate(),
        source_path: source_path.to_string(),
        clips: clip_meta,
        effect_ops: ops.to_vec(),
        has_base_audio,
        undo_stack: history_meta(undo),
        redo_stack: history_meta(redo),
    };

    zip.start_file("project.json", options)?;
    let json = serde_json::to_vec_pretty(&meta)?;
    zip.write_all(&json)?;
    zip.finish()?;
    Ok(())
}

/// Undo/redo are persisted ops-only: audio state is re-rendered on demand.
fn history_meta(stack: &[HistorySnapshot]) -> Vec<HistoryMeta> {
    stack
        .iter()
        .map(|s| HistoryMeta {
            desc: s.desc.clone(),
            ops: s.ops.clone(),
        })
        .collect()
}

/// Load a `.gspi` archive into a fresh session. The ledger is replayed on
/// load; the last structural op's snapshot is reconstructed from the stored
/// clip state.
pub fn load_project(
    path: impl AsRef<Path>,
    registry: Arc<EffectRegistry>,
) -> Result<EditorSession> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;

    let meta: ProjectMeta = {
        let mut entry = archive
            .by_name("project.json")
            .map_err(|_| ProjectError::MissingEntry("project.json".into()))?;
        let mut json = String::new();
        entry.read_to_string(&mut json)?;
        serde_json::from_str(&json)?
    };

    let mut timeline = Timeline::new();
    timeline.sample_rate = meta.sample_rate;
    for clip in &meta.clips {
        let bytes = read_entry(&mut archive, &clip.file)?;
        let (audio, spec) = read_wav_from(std::io::Cursor::new(bytes))?;
        timeline.add_clip(
            audio,
            spec.sample_rate,
            clip.name.clone(),
            Some(clip.position),
            Some(clip.color.clone()),
        );
    }

    let base_audio = if meta.has_base_audio {
        match read_entry(&mut archive, "base_audio.wav") {
            Ok(bytes) => {
                let (mut audio, spec) = read_wav_from(std::io::Cursor::new(bytes))?;
                audio.set_sample_rate(spec.sample_rate);
                Some(audio)
            }
            Err(err) => {
                tracing::warn!(error = %err, "base audio entry unreadable, re-rendering");
                None
            }
        }
    } else {
        None
    };

    let undo = restore_history(meta.undo_stack);
    let redo = restore_history(meta.redo_stack);
    let next_op_id = next_op_id(&meta.effect_ops, &undo, &redo);

    Ok(EditorSession::from_loaded_parts(
        registry,
        timeline,
        base_audio,
        meta.effect_ops,
        undo,
        redo,
        next_op_id,
    ))
}

fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> Result<Vec<u8>> {
    let mut entry = archive
        .by_name(name)
        .map_err(|_| ProjectError::MissingEntry(name.to_string()))?;
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn restore_history(stack: Vec<HistoryMeta>) -> Vec<HistorySnapshot> {
    stack
        .into_iter()
        .map(|h| HistorySnapshot {
            desc: h.desc,
            ops: h.ops,
            base_audio: None,
            clips: Vec::new(),
        })
        .collect()
}

fn next_op_id(ops: &[Operation], undo: &[HistorySnapshot], redo: &[HistorySnapshot]) -> OpId {
    let ledger_max = ops.iter().map(|o| o.id).max().unwrap_or(0);
    let stack_max = undo
        .iter()
        .chain(redo.iter())
        .flat_map(|s| s.ops.iter().map(|o| o.id))
        .max()
        .unwrap_or(0);
    ledger_max.max(stack_max) + 1
}
