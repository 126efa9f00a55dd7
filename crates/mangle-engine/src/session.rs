//! Editor session — the operation ledger and render pipeline.
//!
//! The session owns the timeline, the ledger, and the current audio, and
//! enforces the editor's defining invariant: the rendered audio is always a
//! pure function of the initial audio plus the ledger. Undo/redo, toggling,
//! deleting, and reordering all resolve to replaying part of the ledger.
//!
//! Only one thread mutates a session (the control thread); the playback
//! engine receives immutable buffer clones.

use crate::automation::{AutoLane, DEFAULT_CHUNK_SIZE, apply_automation_multi};
use crate::error::{EngineError, Result};
use crate::ledger::{
    ClipState, HistorySnapshot, OpId, OpKind, Operation, StateSnapshot, StructuralAction,
    last_structural_index, last_structural_index_any,
};
use crate::timeline::{FadeParams, Timeline};
use mangle_core::{AudioBuffer, FadeSide, ParamMap, ProcessCtx, TailPolicy};
use mangle_registry::EffectRegistry;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;

/// Undo history depth.
const UNDO_LIMIT: usize = 20;

/// A sample selection, or the whole buffer.
pub type Selection = Option<(usize, usize)>;

/// The non-destructive editing session.
pub struct EditorSession {
    registry: Arc<EffectRegistry>,
    /// The clip timeline.
    pub timeline: Timeline,
    ops: Vec<Operation>,
    base_audio: Option<AudioBuffer>,
    current_audio: Option<AudioBuffer>,
    initial: Option<Arc<StateSnapshot>>,
    undo_stack: Vec<HistorySnapshot>,
    redo_stack: Vec<HistorySnapshot>,
    next_op_id: OpId,
    rng_seed: u64,
}

impl EditorSession {
    /// New empty session.
    pub fn new(registry: Arc<EffectRegistry>) -> Self {
        Self {
            registry,
            timeline: Timeline::new(),
            ops: Vec::new(),
            base_audio: None,
            current_audio: None,
            initial: None,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            next_op_id: 1,
            rng_seed: 0,
        }
    }

    /// Seed for the randomized effects. Renders with the same seed, ledger,
    /// and initial state are bit-identical.
    pub fn set_rng_seed(&mut self, seed: u64) {
        self.rng_seed = seed;
    }

    /// The effect registry backing this session.
    pub fn registry(&self) -> &EffectRegistry {
        &self.registry
    }

    /// The rendered audio, when a project is loaded.
    pub fn current_audio(&self) -> Option<&AudioBuffer> {
        self.current_audio.as_ref()
    }

    /// The base audio (timeline render before live processing ops).
    pub fn base_audio(&self) -> Option<&AudioBuffer> {
        self.base_audio.as_ref()
    }

    /// The ledger, oldest first.
    pub fn ops(&self) -> &[Operation] {
        &self.ops
    }

    /// Project sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.timeline.sample_rate
    }

    /// Index of the last enabled structural op; processing ops at or before
    /// it are overridden.
    pub fn last_structural(&self) -> Option<usize> {
        last_structural_index(&self.ops)
    }

    /// True when the processing op at `index` is overridden by a later
    /// structural snapshot (display-only history).
    pub fn is_overridden(&self, index: usize) -> bool {
        match self.last_structural() {
            Some(last) => index <= last && self.ops.get(index).is_some_and(Operation::is_processing),
            None => false,
        }
    }

    /// Undo stack depth.
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Redo stack depth.
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    // ── Project lifecycle ──

    /// Start a project from one clip. Captures the initial state replay
    /// starts from when no structural op exists.
    pub fn load_initial_clip(
        &mut self,
        audio: AudioBuffer,
        sample_rate: u32,
        name: impl Into<String>,
    ) -> u64 {
        self.timeline = Timeline::new();
        self.timeline.sample_rate = sample_rate;
        let id = self.timeline.add_clip(audio, sample_rate, name, None, None);
        let base = self.timeline.render();
        self.current_audio = Some(base.clone());
        self.initial = Some(Arc::new(StateSnapshot::capture(&base, &self.timeline)));
        self.base_audio = Some(base);
        self.ops.clear();
        self.undo_stack.clear();
        self.redo_stack.clear();
        id
    }

    /// Rebuild a session from loaded project parts. Missing structural
    /// snapshots are reconstructed on this first render: the loaded state is
    /// the state after the last structural op.
    pub fn from_loaded_parts(
        registry: Arc<EffectRegistry>,
        timeline: Timeline,
        base_audio: Option<AudioBuffer>,
        ops: Vec<Operation>,
        undo_stack: Vec<HistorySnapshot>,
        redo_stack: Vec<HistorySnapshot>,
        next_op_id: OpId,
    ) -> Self {
        let mut session = Self {
            registry,
            timeline,
            ops,
            base_audio,
            current_audio: None,
            initial: None,
            undo_stack,
            redo_stack,
            next_op_id,
            rng_seed: 0,
        };
        let base = match session.base_audio.clone() {
            Some(base) => base,
            None => session.timeline.render(),
        };
        session.initial = Some(Arc::new(StateSnapshot::capture(&base, &session.timeline)));
        session.base_audio = Some(base);

        // Reconstruct the last structural snapshot from the loaded state.
        if let Some(idx) = last_structural_index_any(&session.ops)
            && let Some(base) = session.base_audio.clone()
        {
            let snap = Arc::new(StateSnapshot::capture(&base, &session.timeline));
            if let OpKind::Structural { state_after, .. } = &mut session.ops[idx].kind
                && state_after.is_none()
            {
                *state_after = Some(snap);
            }
        }

        session.render_from_ops();
        session
    }

    // ── Processing ops ──

    fn resolve_selection(&self, selection: Selection) -> Result<(usize, usize, bool)> {
        let frames = self
            .current_audio
            .as_ref()
            .ok_or(EngineError::NoAudio)?
            .frames();
        match selection {
            None => Ok((0, frames, true)),
            Some((s, e)) => {
                let s = s.min(frames);
                let e = e.clamp(s, frames);
                if e - s < 1 {
                    return Err(EngineError::EmptySelection);
                }
                Ok((s, e, false))
            }
        }
    }

    fn next_op_id(&mut self) -> OpId {
        let id = self.next_op_id;
        self.next_op_id += 1;
        id
    }

    fn timestamp() -> String {
        chrono::Local::now().format("%d/%m %H:%M:%S").to_string()
    }

    fn op_rng(&self, op_id: OpId) -> StdRng {
        StdRng::seed_from_u64(self.rng_seed ^ op_id.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    /// Append an effect op and apply it to the current audio (fast path:
    /// only the new op runs).
    pub fn apply_effect(
        &mut self,
        effect_id: &str,
        params: ParamMap,
        selection: Selection,
    ) -> Result<OpId> {
        let descriptor = self
            .registry
            .descriptor(effect_id)
            .ok_or_else(|| EngineError::UnknownEffect(effect_id.to_string()))?;
        let (start, end, is_global) = self.resolve_selection(selection)?;

        self.push_undo(descriptor.name);
        let id = self.next_op_id();
        let op = Operation {
            id,
            name: descriptor.name.to_string(),
            timestamp: Self::timestamp(),
            enabled: true,
            start,
            end,
            is_global,
            kind: OpKind::Effect {
                effect_id: effect_id.to_string(),
                params,
            },
        };
        self.ops.push(op);
        self.apply_op_to_current(self.ops.len() - 1);
        self.sync_clips_from_audio();
        Ok(id)
    }

    /// Append an automation op and apply it.
    pub fn apply_automation(
        &mut self,
        effect_id: &str,
        lanes: Vec<AutoLane>,
        selection: Selection,
    ) -> Result<OpId> {
        let descriptor = self
            .registry
            .descriptor(effect_id)
            .ok_or_else(|| EngineError::UnknownEffect(effect_id.to_string()))?;
        let (start, end, is_global) = self.resolve_selection(selection)?;

        self.push_undo("Automation");
        let id = self.next_op_id();
        let op = Operation {
            id,
            name: format!("{} (auto)", descriptor.name),
            timestamp: Self::timestamp(),
            enabled: true,
            start,
            end,
            is_global,
            kind: OpKind::Automation {
                effect_id: effect_id.to_string(),
                lanes,
            },
        };
        self.ops.push(op);
        self.apply_op_to_current(self.ops.len() - 1);
        self.sync_clips_from_audio();
        Ok(id)
    }

    /// Apply the op at `index` onto `current_audio`. Failures are logged and
    /// leave the audio unchanged (the op stays in the ledger).
    fn apply_op_to_current(&mut self, index: usize) {
        let Some(op) = self.ops.get(index).cloned() else {
            return;
        };
        if !op.enabled {
            return;
        }
        let Some(current) = self.current_audio.clone() else {
            return;
        };
        let frames = current.frames();
        let (start, end) = if op.is_global {
            (0, frames)
        } else {
            let s = op.start.min(frames);
            (s, op.end.clamp(s, frames))
        };
        if end - start < 1 {
            return;
        }

        match &op.kind {
            OpKind::Effect { effect_id, params } => {
                let Some(effect) = self.registry.get(effect_id) else {
                    tracing::warn!(effect_id, "unknown effect in ledger, skipped");
                    return;
                };
                let segment = current.segment(start, end);
                let mut rng = self.op_rng(op.id);
                let mut ctx = ProcessCtx::new(self.timeline.sample_rate, &mut rng);
                match effect.process(&segment, params, &mut ctx) {
                    Ok(output) => {
                        let policy = effect.descriptor().tail;
                        self.current_audio =
                            Some(splice_output(&current, start, end, output, policy));
                    }
                    Err(err) => {
                        tracing::warn!(effect_id, error = %err, op = op.name, "effect failed on render");
                    }
                }
            }
            OpKind::Automation { effect_id, lanes } => {
                let Some(effect) = self.registry.get(effect_id) else {
                    tracing::warn!(effect_id, "unknown effect in automation op, skipped");
                    return;
                };
                let mut rng = self.op_rng(op.id);
                self.current_audio = Some(apply_automation_multi(
                    &current,
                    start,
                    end,
                    effect,
                    lanes,
                    self.timeline.sample_rate,
                    DEFAULT_CHUNK_SIZE,
                    &mut rng,
                ));
            }
            OpKind::Structural { .. } => {}
        }
    }

    // ── Ledger edits ──

    fn find_op(&self, id: OpId) -> Result<usize> {
        self.ops
            .iter()
            .position(|o| o.id == id)
            .ok_or(EngineError::OpNotFound(id))
    }

    /// Flip a processing op's enable flag and re-render. Structural ops are
    /// never toggleable.
    pub fn toggle_op(&mut self, id: OpId) -> Result<bool> {
        let idx = self.find_op(id)?;
        if self.ops[idx].is_structural() {
            return Err(EngineError::NotToggleable);
        }
        self.push_undo(format!("Toggle: {}", self.ops[idx].name));
        self.ops[idx].enabled = !self.ops[idx].enabled;
        let enabled = self.ops[idx].enabled;
        self.render_from_ops();
        Ok(enabled)
    }

    /// Delete an op.
    ///
    /// - A structural op with any ops after it is a data-loss hazard: the
    ///   `confirm` gate is asked with the op and the count of ops that will
    ///   be lost; on approval the ledger is truncated at the op.
    /// - A processing op before the last structural op is already overridden
    ///   and is simply removed, no re-render.
    /// - A live processing op is removed and the ledger replayed.
    pub fn delete_op(
        &mut self,
        id: OpId,
        confirm: &mut dyn FnMut(&Operation, usize) -> bool,
    ) -> Result<()> {
        let idx = self.find_op(id)?;
        let name = self.ops[idx].name.clone();

        if self.ops[idx].is_structural() {
            let ops_after = self.ops.len() - idx - 1;
            if ops_after > 0 && !confirm(&self.ops[idx], ops_after) {
                return Err(EngineError::ConfirmationDeclined);
            }
            self.push_undo(format!("Delete: {name}"));
            self.ops.truncate(idx);
        } else if last_structural_index_any(&self.ops).is_some_and(|last| idx < last) {
            self.push_undo(format!("Delete: {name}"));
            self.ops.remove(idx);
            return Ok(());
        } else {
            self.push_undo(format!("Delete: {name}"));
            self.ops.remove(idx);
        }
        self.render_from_ops();
        Ok(())
    }

    /// Clear the whole ledger after confirmation.
    pub fn clear_ops(&mut self, confirm: &mut dyn FnMut(usize) -> bool) -> Result<()> {
        if self.ops.is_empty() {
            return Ok(());
        }
        if !confirm(self.ops.len()) {
            return Err(EngineError::ConfirmationDeclined);
        }
        self.push_undo("Clear all history");
        self.ops.clear();
        self.render_from_ops();
        Ok(())
    }

    /// Move a processing op one slot up (`-1`) or down (`+1`). Refused when
    /// the op or its swap partner is structural.
    pub fn move_op(&mut self, id: OpId, direction: i32) -> Result<()> {
        let idx = self.find_op(id)?;
        if self.ops[idx].is_structural() {
            return Err(EngineError::MoveBlocked);
        }
        let new_idx = idx as i64 + i64::from(direction.signum());
        if new_idx < 0 || new_idx as usize >= self.ops.len() {
            return Err(EngineError::MoveBlocked);
        }
        let new_idx = new_idx as usize;
        if self.ops[new_idx].is_structural() {
            return Err(EngineError::MoveBlocked);
        }
        self.push_undo(format!("Move: {}", self.ops[idx].name));
        self.ops.swap(idx, new_idx);
        self.render_from_ops();
        Ok(())
    }

    // ── Replay ──

    /// The canonical replay: restore the most recent enabled structural
    /// snapshot (or the initial state), then apply every enabled processing
    /// op after it, then sync the clips to the result.
    pub fn render_from_ops(&mut self) {
        let last = self.last_structural();

        match last {
            Some(idx) => match self.ops[idx].state_after().cloned() {
                Some(snapshot) => self.restore_snapshot(&snapshot),
                None => {
                    // Corrupt or missing snapshot: fall back to the base we
                    // have rather than crash.
                    tracing::warn!(
                        op = self.ops[idx].name,
                        "structural snapshot missing, rendering from current base"
                    );
                    if self.base_audio.is_none() {
                        return;
                    }
                }
            },
            None => {
                if let Some(initial) = self.initial.clone() {
                    self.restore_snapshot(&initial);
                } else if self.base_audio.is_none() {
                    return;
                }
            }
        }

        self.current_audio = self.base_audio.clone();
        if self.current_audio.is_none() {
            return;
        }

        let first_live = last.map_or(0, |i| i + 1);
        for index in first_live..self.ops.len() {
            if !self.ops[index].enabled || self.ops[index].is_structural() {
                continue;
            }
            self.apply_op_to_current(index);
        }
        self.sync_clips_from_audio();
    }

    fn restore_snapshot(&mut self, snapshot: &StateSnapshot) {
        self.base_audio = Some(snapshot.base_audio.clone());
        let sample_rate = self.timeline.sample_rate;
        self.timeline.clear();
        self.timeline.sample_rate = sample_rate;
        for clip in &snapshot.clips {
            clip.restore_into(&mut self.timeline);
        }
    }

    /// Distribute the current audio back over the clips in proportion to
    /// their prior lengths; the last clip absorbs any remainder.
    fn sync_clips_from_audio(&mut self) {
        let Some(current) = self.current_audio.as_ref() else {
            return;
        };
        if self.timeline.clips.is_empty() {
            return;
        }
        let total = current.frames();
        if self.timeline.clips.len() == 1 {
            let clip = &mut self.timeline.clips[0];
            clip.audio = current.to_stereo();
            clip.position = 0;
            return;
        }
        let old_total: usize = self
            .timeline
            .clips
            .iter()
            .map(|c| c.duration_samples())
            .sum();
        if old_total == 0 {
            return;
        }
        let ratio = total as f64 / old_total as f64;
        let current = current.clone();
        let mut pos = 0usize;
        for clip in &mut self.timeline.clips {
            let mut new_len = (clip.duration_samples() as f64 * ratio) as usize;
            new_len = new_len.min(total - pos);
            if new_len > 0 {
                clip.audio = current.segment(pos, pos + new_len).to_stereo();
            }
            clip.position = pos;
            pos += new_len;
        }
        if pos < total
            && let Some(last) = self.timeline.clips.last_mut()
        {
            let extra = current.segment(pos, total).to_stereo();
            last.audio = AudioBuffer::concat(&[&last.audio, &extra], current.sample_rate());
        }
    }

    // ── Undo / redo ──

    fn push_undo(&mut self, desc: impl Into<String>) {
        let snapshot = HistorySnapshot {
            desc: desc.into(),
            ops: self.ops.clone(),
            base_audio: self.base_audio.clone(),
            clips: self.timeline.clips.iter().map(ClipState::capture).collect(),
        };
        self.undo_stack.push(snapshot);
        if self.undo_stack.len() > UNDO_LIMIT {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    fn capture_history(&self) -> HistorySnapshot {
        HistorySnapshot {
            desc: String::new(),
            ops: self.ops.clone(),
            base_audio: self.base_audio.clone(),
            clips: self.timeline.clips.iter().map(ClipState::capture).collect(),
        }
    }

    fn restore_history(&mut self, snapshot: HistorySnapshot) {
        self.ops = snapshot.ops;
        if snapshot.base_audio.is_some() {
            self.base_audio = snapshot.base_audio;
        }
        if !snapshot.clips.is_empty() {
            let sample_rate = self.timeline.sample_rate;
            self.timeline.clear();
            self.timeline.sample_rate = sample_rate;
            for clip in &snapshot.clips {
                clip.restore_into(&mut self.timeline);
            }
        }
        if !self.ops.is_empty() {
            self.render_from_ops();
        } else if self.base_audio.is_some() {
            self.current_audio = self.base_audio.clone();
        } else if !self.timeline.clips.is_empty() {
            let base = self.timeline.render();
            self.current_audio = Some(base.clone());
            self.base_audio = Some(base);
        } else {
            self.current_audio = None;
        }
    }

    /// Undo the most recent action.
    pub fn undo(&mut self) -> Result<()> {
        let snapshot = self.undo_stack.pop().ok_or(EngineError::NothingToUndo)?;
        self.redo_stack.push(self.capture_history());
        self.restore_history(snapshot);
        Ok(())
    }

    /// Redo the most recently undone action.
    pub fn redo(&mut self) -> Result<()> {
        let snapshot = self.redo_stack.pop().ok_or(EngineError::NothingToRedo)?;
        self.undo_stack.push(self.capture_history());
        self.restore_history(snapshot);
        Ok(())
    }

    // ── Structural ops ──

    fn rebuild_base(&mut self) {
        let base = self.timeline.render();
        self.current_audio = Some(base.clone());
        self.base_audio = Some(base);
    }

    fn add_structural_op(&mut self, action: StructuralAction, name: impl Into<String>) {
        let snapshot = self.base_audio.as_ref().map(|base| {
            Arc::new(StateSnapshot::capture(base, &self.timeline))
        });
        let id = self.next_op_id();
        let frames = self.current_audio.as_ref().map_or(0, AudioBuffer::frames);
        self.ops.push(Operation {
            id,
            name: name.into(),
            timestamp: Self::timestamp(),
            enabled: true,
            start: 0,
            end: frames,
            is_global: true,
            kind: OpKind::Structural {
                action,
                state_after: snapshot,
            },
        });
    }

    /// Add another clip to the timeline as a structural op. The first clip
    /// of a project goes through [`load_initial_clip`](Self::load_initial_clip).
    pub fn add_clip(
        &mut self,
        audio: AudioBuffer,
        sample_rate: u32,
        name: impl Into<String>,
    ) -> Result<u64> {
        if self.timeline.clips.is_empty() {
            return Ok(self.load_initial_clip(audio, sample_rate, name));
        }
        let name = name.into();
        self.push_undo(format!("Add clip: {name}"));
        let id = self.timeline.add_clip(audio, sample_rate, name.clone(), None, None);
        self.rebuild_base();
        self.add_structural_op(StructuralAction::AddClip, format!("Add: {name}"));
        Ok(id)
    }

    /// Append a recorded take as a new clip at the end of the timeline.
    pub fn append_recording(
        &mut self,
        audio: AudioBuffer,
        sample_rate: u32,
        name: impl Into<String>,
    ) -> Result<u64> {
        if self.timeline.clips.is_empty() {
            return Ok(self.load_initial_clip(audio, sample_rate, name));
        }
        let name = name.into();
        self.push_undo(format!("Record: {name}"));
        let id = self.timeline.add_clip(audio, sample_rate, name.clone(), None, None);
        self.rebuild_base();
        self.add_structural_op(StructuralAction::Record, format!("Record: {name}"));
        Ok(id)
    }

    /// Split a clip at an absolute sample position.
    pub fn split_clip(&mut self, clip_id: u64, position: usize) -> Result<(u64, u64)> {
        let name = self
            .timeline
            .clip(clip_id)
            .ok_or(EngineError::ClipNotFound(clip_id))?
            .name
            .clone();
        self.push_undo("Split");
        let halves = self.timeline.split_clip(clip_id, position)?;
        self.rebuild_base();
        self.add_structural_op(StructuralAction::Split, format!("Split ({name})"));
        Ok(halves)
    }

    /// Duplicate a clip after itself.
    pub fn duplicate_clip(&mut self, clip_id: u64) -> Result<u64> {
        let name = self
            .timeline
            .clip(clip_id)
            .ok_or(EngineError::ClipNotFound(clip_id))?
            .name
            .clone();
        self.push_undo("Duplicate");
        let dup = self.timeline.duplicate_clip(clip_id)?;
        self.rebuild_base();
        self.add_structural_op(StructuralAction::Duplicate, format!("Duplicate ({name})"));
        Ok(dup)
    }

    /// Delete a clip. Confirmation-gated; the last clip is protected.
    pub fn delete_clip(
        &mut self,
        clip_id: u64,
        confirm: &mut dyn FnMut(&str) -> bool,
    ) -> Result<()> {
        let name = self
            .timeline
            .clip(clip_id)
            .ok_or(EngineError::ClipNotFound(clip_id))?
            .name
            .clone();
        if self.timeline.clips.len() <= 1 {
            return Err(EngineError::LastClipProtected);
        }
        if !confirm(&name) {
            return Err(EngineError::ConfirmationDeclined);
        }
        self.push_undo("Delete clip");
        self.timeline.remove_clip(clip_id)?;
        self.rebuild_base();
        self.add_structural_op(StructuralAction::DeleteClip, format!("Delete: {name}"));
        Ok(())
    }

    /// Replace `[start, end)` with silence, preserving project length.
    pub fn cut_silence(&mut self, start: usize, end: usize) -> Result<()> {
        if self.current_audio.is_none() || self.timeline.clips.is_empty() {
            return Err(EngineError::NoAudio);
        }
        self.push_undo("Cut (silence)");
        self.timeline.cut_silence(start, end);
        self.rebuild_base();
        self.add_structural_op(StructuralAction::CutSilence, "Cut (silence)");
        Ok(())
    }

    /// Excise `[start, end)` and close the gap.
    pub fn cut_splice(&mut self, start: usize, end: usize) -> Result<()> {
        if self.current_audio.is_none() || self.timeline.clips.is_empty() {
            return Err(EngineError::NoAudio);
        }
        self.push_undo("Cut (splice)");
        self.timeline.cut_splice(start, end);
        self.rebuild_base();
        self.add_structural_op(StructuralAction::CutSplice, "Cut (splice)");
        Ok(())
    }

    /// Apply (or re-edit) a clip's envelope fade-in.
    pub fn fade_in(&mut self, clip_id: u64, params: FadeParams) -> Result<()> {
        self.apply_fade(clip_id, FadeSide::In, params)
    }

    /// Apply (or re-edit) a clip's envelope fade-out.
    pub fn fade_out(&mut self, clip_id: u64, params: FadeParams) -> Result<()> {
        self.apply_fade(clip_id, FadeSide::Out, params)
    }

    fn apply_fade(&mut self, clip_id: u64, side: FadeSide, params: FadeParams) -> Result<()> {
        let sample_rate = self.timeline.sample_rate;
        let name = self
            .timeline
            .clip(clip_id)
            .ok_or(EngineError::ClipNotFound(clip_id))?
            .name
            .clone();
        let (label, action) = match side {
            FadeSide::In => ("Fade In", StructuralAction::FadeIn),
            FadeSide::Out => ("Fade Out", StructuralAction::FadeOut),
        };
        self.push_undo(label);
        let clip = self
            .timeline
            .clip_mut(clip_id)
            .ok_or(EngineError::ClipNotFound(clip_id))?;
        clip.set_fade(side, params, sample_rate);
        self.rebuild_base();
        self.add_structural_op(action, format!("{label} ({name})"));
        Ok(())
    }

    /// Reorder clips to the given id order and close gaps.
    pub fn reorder_clips(&mut self, order: &[u64]) -> Result<()> {
        for id in order {
            if self.timeline.clip(*id).is_none() {
                return Err(EngineError::ClipNotFound(*id));
            }
        }
        self.push_undo("Reorder");
        for (rank, id) in order.iter().enumerate() {
            if let Some(clip) = self.timeline.clip_mut(*id) {
                clip.position = rank;
            }
        }
        self.timeline.reposition_clips();
        self.rebuild_base();
        self.add_structural_op(StructuralAction::Reorder, "Reorder");
        Ok(())
    }

    /// Parts needed to persist the session: `(ops, undo, redo, next_op_id)`.
    pub fn history_parts(&self) -> (&[Operation], &[HistorySnapshot], &[HistorySnapshot], OpId) {
        (
            &self.ops,
            &self.undo_stack,
            &self.redo_stack,
            self.next_op_id,
        )
    }
}

/// Splice an effect's output back into the full buffer.
///
/// Equal-length output replaces the selection. Longer output follows the
/// effect's tail policy: `Insert` pushes the following audio later, `MixOver`
/// lays the tail over it and extends only past the end. A length change from
/// a policy-`None` effect is a contract violation and is dropped.
fn splice_output(
    current: &AudioBuffer,
    start: usize,
    end: usize,
    output: AudioBuffer,
    policy: TailPolicy,
) -> AudioBuffer {
    let seg_len = end - start;
    let sample_rate = current.sample_rate();

    if output.frames() == seg_len {
        let before = current.segment(0, start);
        let after = current.segment(end, current.frames());
        return AudioBuffer::concat(&[&before, &output, &after], sample_rate);
    }

    match policy {
        TailPolicy::None => {
            tracing::warn!(
                expected = seg_len,
                got = output.frames(),
                "length-preserving effect changed length, output dropped"
            );
            current.clone()
        }
        TailPolicy::Insert => {
            let before = current.segment(0, start);
            let after = current.segment(end, current.frames());
            AudioBuffer::concat(&[&before, &output, &after], sample_rate)
        }
        TailPolicy::MixOver => {
            if output.frames() < seg_len {
                let before = current.segment(0, start);
                let after = current.segment(end, current.frames());
                return AudioBuffer::concat(&[&before, &output, &after], sample_rate);
            }
            let before = current.segment(0, start);
            let body = output.segment(0, seg_len);
            let tail = output.segment(seg_len, output.frames());
            let after = current.segment(end, current.frames());

            if tail.frames() <= after.frames() {
                let mut mixed_after = after;
                mixed_after.mix_add(&tail, 0);
                mixed_after.clamp_unit();
                AudioBuffer::concat(&[&before, &body, &mixed_after], sample_rate)
            } else {
                let overlap = tail.segment(0, after.frames());
                let extension = tail.segment(after.frames(), tail.frames());
                let mut mixed_after = after;
                mixed_after.mix_add(&overlap, 0);
                mixed_after.clamp_unit();
                AudioBuffer::concat(&[&before, &body, &mixed_after, &extension], sample_rate)
            }
        }
    }
}
