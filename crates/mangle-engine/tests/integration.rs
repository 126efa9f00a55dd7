//! End-to-end scenarios over the editing session.
//!
//! These follow the editor's core guarantees: renders are deterministic,
//! replay matches the fast path, structural snapshots override earlier
//! processing ops, and the timeline stays contiguous after every operation.

use mangle_core::{AudioBuffer, ParamMap};
use mangle_engine::{AutoLane, EditorSession, EngineError, FadeParams};
use mangle_registry::EffectRegistry;
use proptest::prelude::*;
use std::sync::Arc;

fn registry() -> Arc<EffectRegistry> {
    Arc::new(EffectRegistry::new())
}

fn sine_buffer(sr: u32, secs: f32, amp: f32) -> AudioBuffer {
    let n = (sr as f32 * secs) as usize;
    let mut data = Vec::with_capacity(n * 2);
    for i in 0..n {
        let s = amp * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sr as f32).sin();
        data.push(s);
        data.push(s);
    }
    AudioBuffer::new(data, 2, sr)
}

fn session_with_sine(secs: f32) -> EditorSession {
    let mut session = EditorSession::new(registry());
    session.load_initial_clip(sine_buffer(44100, secs, 0.5), 44100, "sine");
    session
}

fn gain(pct: f32) -> ParamMap {
    let mut params = ParamMap::new();
    params.set("gain_pct", pct);
    params
}

#[test]
fn render_is_deterministic_across_sessions() {
    let build = || {
        let mut session = session_with_sine(0.5);
        session.set_rng_seed(77);
        session.apply_effect("volume", gain(70.0), None).unwrap();
        session
            .apply_effect("granular", ParamMap::new(), Some((1000, 15000)))
            .unwrap();
        session.apply_effect("datamosh", ParamMap::new(), None).unwrap();
        session.render_from_ops();
        session.current_audio().unwrap().clone()
    };
    assert_eq!(build().samples(), build().samples());
}

#[test]
fn replay_equivalence_with_structural_restart() {
    let mut session = session_with_sine(1.0);
    session.set_rng_seed(5);
    session.apply_effect("volume", gain(60.0), None).unwrap();
    session.cut_silence(4410, 8820).unwrap();
    session
        .apply_effect("saturation", ParamMap::new(), Some((0, 20000)))
        .unwrap();
    session
        .apply_automation("volume", vec![AutoLane::ramp("gain_pct", 100.0, 0.0)], Some((0, 30000)))
        .unwrap();

    let fast = session.current_audio().unwrap().clone();
    session.render_from_ops();
    let replayed = session.current_audio().unwrap().clone();
    assert_eq!(fast.samples(), replayed.samples());
}

#[test]
fn disabled_ops_do_not_contribute() {
    let mut session = session_with_sine(0.5);
    let quiet = session.apply_effect("volume", gain(10.0), None).unwrap();
    session.toggle_op(quiet).unwrap();
    // With the only op disabled, the render equals the base audio.
    let rendered = session.current_audio().unwrap().clone();
    let base = session.base_audio().unwrap().clone();
    assert_eq!(rendered.samples(), base.samples());
}

#[test]
fn undo_restores_ledger_and_audio_exactly() {
    let mut session = session_with_sine(0.5);
    session.apply_effect("volume", gain(50.0), None).unwrap();
    let one_op_audio = session.current_audio().unwrap().clone();
    let one_op_ids: Vec<u64> = session.ops().iter().map(|o| o.id).collect();

    session.apply_effect("bitcrusher", ParamMap::new(), None).unwrap();
    session.undo().unwrap();

    assert_eq!(
        session.ops().iter().map(|o| o.id).collect::<Vec<_>>(),
        one_op_ids
    );
    assert_eq!(session.current_audio().unwrap().samples(), one_op_audio.samples());
}

#[test]
fn fade_non_stacking_through_session() {
    let fade = |ms: f64| FadeParams {
        duration_ms: ms,
        points: vec![(0.0, 0.0), (1.0, 1.0)],
        bends: vec![0.0],
    };

    // fade_in(P1) then fade_in(P2)…
    let mut twice = EditorSession::new(registry());
    twice.load_initial_clip(AudioBuffer::from_mono(vec![1.0; 44100], 44100), 44100, "a");
    let clip = twice.timeline.clips[0].id;
    twice.fade_in(clip, fade(500.0)).unwrap();
    twice.fade_in(clip, fade(100.0)).unwrap();

    // …equals fade_in(P2) once.
    let mut once = EditorSession::new(registry());
    once.load_initial_clip(AudioBuffer::from_mono(vec![1.0; 44100], 44100), 44100, "a");
    let clip2 = once.timeline.clips[0].id;
    once.fade_in(clip2, fade(100.0)).unwrap();

    assert_eq!(
        twice.timeline.clips[0].audio.samples(),
        once.timeline.clips[0].audio.samples()
    );
}

#[test]
fn structural_delete_truncates_descendants() {
    let mut session = session_with_sine(0.5);
    session.apply_effect("volume", gain(80.0), None).unwrap();
    session.cut_silence(100, 200).unwrap();
    session.apply_effect("volume", gain(120.0), None).unwrap();
    session.cut_splice(0, 50).unwrap();
    session.apply_effect("tremolo", ParamMap::new(), None).unwrap();
    assert_eq!(session.ops().len(), 5);

    // Delete the first structural op: everything after it goes too.
    let first_cut = session.ops()[1].id;
    session.delete_op(first_cut, &mut |_, lost| {
        assert_eq!(lost, 3);
        true
    })
    .unwrap();
    assert_eq!(session.ops().len(), 1);

    // The remaining effect op replays from the initial state.
    let peak = session.current_audio().unwrap().peak();
    assert!((peak - 0.4).abs() < 0.02, "peak {peak}");
}

#[test]
fn split_then_render_keeps_audio_identical() {
    let mut session = session_with_sine(0.5);
    let before = session.current_audio().unwrap().clone();
    let clip = session.timeline.clips[0].id;
    session.split_clip(clip, 10000).unwrap();
    let after = session.current_audio().unwrap().clone();
    assert_eq!(before.frames(), after.frames());
    // Sample data survives the split bit-for-bit
    assert_eq!(before.samples(), after.samples());
    assert_eq!(session.timeline.clips.len(), 2);
}

#[test]
fn duplicate_doubles_project_length() {
    let mut session = session_with_sine(0.5);
    let frames = session.current_audio().unwrap().frames();
    let clip = session.timeline.clips[0].id;
    session.duplicate_clip(clip).unwrap();
    assert_eq!(session.current_audio().unwrap().frames(), frames * 2);
}

#[test]
fn delete_clip_needs_confirmation() {
    let mut session = session_with_sine(0.2);
    let clip = session.timeline.clips[0].id;
    session.duplicate_clip(clip).unwrap();

    let declined = session.delete_clip(clip, &mut |_| false);
    assert!(matches!(declined, Err(EngineError::ConfirmationDeclined)));
    assert_eq!(session.timeline.clips.len(), 2);

    session.delete_clip(clip, &mut |name| {
        assert_eq!(name, "sine");
        true
    })
    .unwrap();
    assert_eq!(session.timeline.clips.len(), 1);
}

#[test]
fn recording_appends_structural_op() {
    let mut session = session_with_sine(0.2);
    let frames = session.current_audio().unwrap().frames();
    session
        .append_recording(sine_buffer(44100, 0.1, 0.3), 44100, "take 1")
        .unwrap();
    assert_eq!(session.timeline.clips.len(), 2);
    assert!(session.ops().last().unwrap().is_structural());
    assert!(session.current_audio().unwrap().frames() > frames);
}

#[test]
fn last_clip_cannot_be_deleted() {
    let mut session = session_with_sine(0.2);
    let clip = session.timeline.clips[0].id;
    assert!(matches!(
        session.delete_clip(clip, &mut |_| true),
        Err(EngineError::LastClipProtected)
    ));
}

#[test]
fn reorder_swaps_material() {
    let mut session = EditorSession::new(registry());
    session.load_initial_clip(AudioBuffer::from_mono(vec![0.25; 1000], 44100), 44100, "a");
    session
        .add_clip(AudioBuffer::from_mono(vec![0.5; 500], 44100), 44100, "b")
        .unwrap();
    let a = session.timeline.clips[0].id;
    let b = session.timeline.clips[1].id;

    session.reorder_clips(&[b, a]).unwrap();
    let out = session.current_audio().unwrap();
    assert!((out.sample(0, 0) - 0.5).abs() < 1e-6);
    assert!((out.sample(600, 0) - 0.25).abs() < 1e-6);
    assert_eq!(out.frames(), 1500);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Timeline contiguity: after any cut, adjacent clips always satisfy
    /// B.position = A.position + len(A).
    #[test]
    fn timeline_stays_contiguous(
        cut_start in 0usize..20000,
        cut_len in 1usize..20000,
        splice in any::<bool>(),
    ) {
        let mut session = session_with_sine(1.0);
        let result = if splice {
            session.cut_splice(cut_start, cut_start + cut_len)
        } else {
            session.cut_silence(cut_start, cut_start + cut_len)
        };
        prop_assert!(result.is_ok());

        let clips = &session.timeline.clips;
        for pair in clips.windows(2) {
            prop_assert_eq!(
                pair[1].position,
                pair[0].position + pair[0].duration_samples(),
                "gap between clips"
            );
        }
        prop_assert_eq!(clips[0].position, 0);

        if !splice {
            // cut to silence preserves total length
            prop_assert_eq!(session.timeline.total_duration_samples(), 44100);
        }
    }
}
