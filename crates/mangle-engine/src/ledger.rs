//! Operation ledger types.
//!
//! Every user action becomes an [`Operation`]: a *processing* op (effect or
//! automation, cheap to re-apply, no snapshot) or a *structural* op (timeline
//! reshaping, carrying a full [`StateSnapshot`] of the project immediately
//! after it was applied). The ledger plus the initial state fully determines
//! the rendered audio.
//!
//! Snapshots are immutable once captured and shared by `Arc` across the
//! ledger and the undo/redo stacks; they are never serialized — project load
//! reconstructs them on the first render.

use crate::automation::AutoLane;
use crate::timeline::{Clip, FadeParams, Timeline};
use mangle_core::{AudioBuffer, ParamMap};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Unique id for an operation within a session.
pub type OpId = u64;

/// The structural actions the ledger records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuralAction {
    /// Replace a selection with silence.
    CutSilence,
    /// Excise a selection and close the gap.
    CutSplice,
    /// Envelope fade at a clip start.
    FadeIn,
    /// Envelope fade at a clip end.
    FadeOut,
    /// A clip was added to the timeline.
    AddClip,
    /// A recording was appended.
    Record,
    /// A clip was removed.
    DeleteClip,
    /// A clip was split in two.
    Split,
    /// A clip was duplicated.
    Duplicate,
    /// Clips were reordered.
    Reorder,
}

/// What an operation does.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OpKind {
    /// A parametric effect over a selection.
    Effect {
        /// Registry id of the effect.
        effect_id: String,
        /// Parameter values.
        params: ParamMap,
    },
    /// An effect driven chunk-by-chunk with time-varying parameters.
    Automation {
        /// Registry id of the effect.
        effect_id: String,
        /// One lane per driven parameter.
        lanes: Vec<AutoLane>,
    },
    /// A timeline reshaping with a replayable post-state.
    Structural {
        /// Which structural action happened.
        action: StructuralAction,
        /// Full project state immediately after this op. Shared, immutable,
        /// not serialized — rebuilt on first render after a project load.
        #[serde(skip)]
        state_after: Option<Arc<StateSnapshot>>,
    },
}

/// One ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// Unique id within the session.
    pub id: OpId,
    /// Human-readable label.
    pub name: String,
    /// Wall-clock timestamp, display only.
    pub timestamp: String,
    /// Processing ops can be disabled; structural ops are always enabled.
    pub enabled: bool,
    /// Selection start in samples (0 when global).
    pub start: usize,
    /// Selection end in samples (buffer length when global).
    pub end: usize,
    /// True when the op covers the whole buffer.
    pub is_global: bool,
    /// The operation payload, flattened into the record (`type` tag).
    #[serde(flatten)]
    pub kind: OpKind,
}

impl Operation {
    /// True for timeline-reshaping ops that carry a snapshot.
    pub fn is_structural(&self) -> bool {
        matches!(self.kind, OpKind::Structural { .. })
    }

    /// True for effect/automation ops.
    pub fn is_processing(&self) -> bool {
        !self.is_structural()
    }

    /// The snapshot attached to a structural op.
    pub fn state_after(&self) -> Option<&Arc<StateSnapshot>> {
        match &self.kind {
            OpKind::Structural { state_after, .. } => state_after.as_ref(),
            _ => None,
        }
    }
}

/// Index of the last *enabled* structural op, or `None`.
///
/// Processing ops at or before this index are overridden (display-only
/// history): the structural snapshot already bakes them in. Ops after it are
/// live and replayed on every render.
pub fn last_structural_index(ops: &[Operation]) -> Option<usize> {
    ops.iter()
        .enumerate()
        .rev()
        .find(|(_, op)| op.enabled && op.is_structural())
        .map(|(i, _)| i)
}

/// Index of the last structural op regardless of enablement (structural ops
/// are never disabled in practice; kept for delete bookkeeping).
pub fn last_structural_index_any(ops: &[Operation]) -> Option<usize> {
    ops.iter().rposition(Operation::is_structural)
}

/// Frozen copy of one clip inside a [`StateSnapshot`].
#[derive(Debug, Clone)]
pub struct ClipState {
    /// Clip name.
    pub name: String,
    /// Clip audio.
    pub audio: AudioBuffer,
    /// Clip sample rate.
    pub sample_rate: u32,
    /// Timeline position in samples.
    pub position: usize,
    /// Display color.
    pub color: String,
    /// Fade-in parameters at capture time.
    pub fade_in: Option<FadeParams>,
    /// Fade-out parameters at capture time.
    pub fade_out: Option<FadeParams>,
    /// Pre-fade-in shadow audio.
    pub pre_fade_in: Option<AudioBuffer>,
    /// Pre-fade-out shadow audio.
    pub pre_fade_out: Option<AudioBuffer>,
}

impl ClipState {
    /// Capture a clip.
    pub fn capture(clip: &Clip) -> Self {
        Self {
            name: clip.name.clone(),
            audio: clip.audio.clone(),
            sample_rate: clip.sample_rate,
            position: clip.position,
            color: clip.color.clone(),
            fade_in: clip.fade_in.clone(),
            fade_out: clip.fade_out.clone(),
            pre_fade_in: clip.pre_fade_in.clone(),
            pre_fade_out: clip.pre_fade_out.clone(),
        }
    }

    /// Restore into a timeline, assigning a fresh clip id.
    pub fn restore_into(&self, timeline: &mut Timeline) {
        let id = timeline.add_clip(
            self.audio.clone(),
            self.sample_rate,
            self.name.clone(),
            Some(self.position),
            Some(self.color.clone()),
        );
        if let Some(clip) = timeline.clip_mut(id) {
            clip.fade_in = self.fade_in.clone();
            clip.fade_out = self.fade_out.clone();
            clip.pre_fade_in = self.pre_fade_in.clone();
            clip.pre_fade_out = self.pre_fade_out.clone();
        }
    }
}

/// Full project state right after a structural op: the rendered base audio
/// plus deep clip descriptors.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    /// Rendered timeline audio at capture time.
    pub base_audio: AudioBuffer,
    /// Clip descriptors at capture time.
    pub clips: Vec<ClipState>,
}

impl StateSnapshot {
    /// Capture the current project state.
    pub fn capture(base_audio: &AudioBuffer, timeline: &Timeline) -> Self {
        Self {
            base_audio: base_audio.clone(),
            clips: timeline.clips.iter().map(ClipState::capture).collect(),
        }
    }
}

/// One undo/redo record: the ledger plus project state before an action.
/// Structural snapshots inside the cloned ops stay shared by `Arc`.
#[derive(Debug, Clone)]
pub struct HistorySnapshot {
    /// What the action was, for display.
    pub desc: String,
    /// Ledger clone (snapshot `Arc`s shared, never mutated).
    pub ops: Vec<Operation>,
    /// Base audio at capture time.
    pub base_audio: Option<AudioBuffer>,
    /// Clip descriptors at capture time.
    pub clips: Vec<ClipState>,
}
