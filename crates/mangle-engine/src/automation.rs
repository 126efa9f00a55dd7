//! Automation engine — chunked effect application with time-varying
//! parameters.
//!
//! An automation op carries one lane per driven parameter. The engine walks
//! the selection in fixed-size chunks; at each chunk it samples every
//! automated lane's curve at the chunk's normalized position, interpolates
//! the parameter value between its default and target, clamps it to the
//! parameter's declared range, and re-invokes the effect on that chunk.
//!
//! Per-chunk failures are absorbed: the failing chunk passes through
//! untouched with a warning, so an unstable effect can be automated without
//! taking down the render.

use mangle_core::{AudioBuffer, Effect, ParamMap, ProcessCtx, interpolate_curve};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Default chunk size in frames.
pub const DEFAULT_CHUNK_SIZE: usize = 2048;

/// How one parameter is driven across the selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LaneMode {
    /// Fixed value for the whole selection.
    Constant {
        /// The value.
        value: f32,
    },
    /// Value ramped along a curve between two endpoints.
    Automated {
        /// Value at curve y = 0.
        default_val: f32,
        /// Value at curve y = 1.
        target_val: f32,
        /// Curve control points over normalized x.
        curve_points: Vec<(f32, f32)>,
        /// Per-segment bend coefficients (kept for curve editing; chunk
        /// ramping uses the piecewise-linear simplification).
        #[serde(default)]
        curve_bends: Vec<f32>,
    },
}

/// One automated parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoLane {
    /// Parameter key on the target effect.
    pub key: String,
    /// Drive mode.
    #[serde(flatten)]
    pub mode: LaneMode,
}

impl AutoLane {
    /// Constant lane.
    pub fn constant(key: impl Into<String>, value: f32) -> Self {
        Self {
            key: key.into(),
            mode: LaneMode::Constant { value },
        }
    }

    /// Linearly automated lane from `default_val` to `target_val`.
    pub fn ramp(key: impl Into<String>, default_val: f32, target_val: f32) -> Self {
        Self {
            key: key.into(),
            mode: LaneMode::Automated {
                default_val,
                target_val,
                curve_points: vec![(0.0, 0.0), (1.0, 1.0)],
                curve_bends: vec![0.0],
            },
        }
    }

    /// Value at normalized position `nx`, clamped to the effect's declared
    /// range for this key when the effect knows it.
    fn value_at(&self, nx: f32, effect: &dyn Effect) -> f32 {
        let raw = match &self.mode {
            LaneMode::Constant { value } => *value,
            LaneMode::Automated {
                default_val,
                target_val,
                curve_points,
                ..
            } => {
                let ny = interpolate_curve(curve_points, nx);
                default_val + ny * (target_val - default_val)
            }
        };
        match effect.descriptor().param(&self.key) {
            Some(spec) => spec.clamp(raw),
            None => raw,
        }
    }
}

/// Apply `effect` over `audio[start..end)` chunk by chunk with the given
/// lanes. Returns a fresh buffer; the selection length never changes (chunk
/// outputs of the wrong length are dropped with a warning).
pub fn apply_automation_multi(
    audio: &AudioBuffer,
    start: usize,
    end: usize,
    effect: &dyn Effect,
    lanes: &[AutoLane],
    sample_rate: u32,
    chunk_size: usize,
    rng: &mut StdRng,
) -> AudioBuffer {
    let mut result = audio.clone();
    let frames = result.frames();
    let start = start.min(frames);
    let end = end.clamp(start, frames);
    let region_len = end - start;
    if region_len < 1 {
        return result;
    }
    let chunk_size = chunk_size.max(1);
    let channels = result.channels();

    let mut pos = start;
    while pos < end {
        let chunk_end = (pos + chunk_size).min(end);
        let nx = (pos - start) as f32 / region_len as f32;

        let mut params = ParamMap::new();
        for lane in lanes {
            params.set(lane.key.clone(), lane.value_at(nx, effect));
        }

        let segment = result.segment(pos, chunk_end);
        let seg_len = segment.frames();
        let mut ctx = ProcessCtx::new(sample_rate, rng);
        match effect.process(&segment, &params, &mut ctx) {
            Ok(processed) if processed.frames() == seg_len => {
                let dst = &mut result.samples_mut()[pos * channels..chunk_end * channels];
                dst.copy_from_slice(&processed.samples()[..seg_len * channels]);
            }
            Ok(processed) => {
                tracing::warn!(
                    effect = effect.descriptor().id,
                    pos,
                    expected = seg_len,
                    got = processed.frames(),
                    "automation chunk length mismatch, dropped"
                );
            }
            Err(err) => {
                tracing::warn!(
                    effect = effect.descriptor().id,
                    pos,
                    error = %err,
                    "automation chunk failed, passing through"
                );
            }
        }
        pos = chunk_end;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use mangle_registry::EffectRegistry;
    use rand::SeedableRng;

    fn sine(frames: usize, amp: f32) -> AudioBuffer {
        AudioBuffer::from_mono(
            (0..frames)
                .map(|i| amp * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin())
                .collect(),
            44100,
        )
    }

    #[test]
    fn test_gain_ramp_rises() {
        let registry = EffectRegistry::new();
        let effect = registry.get("volume").unwrap();
        let input = sine(44100, 0.5);
        let lanes = vec![AutoLane::ramp("gain_pct", 0.0, 100.0)];
        let mut rng = StdRng::seed_from_u64(1);
        let out =
            apply_automation_multi(&input, 0, 44100, effect, &lanes, 44100, DEFAULT_CHUNK_SIZE, &mut rng);
        assert_eq!(out.frames(), input.frames());

        // Linear 0→100% gain ramp: the first 100 ms must be far quieter than
        // the last 100 ms.
        let head = out.segment(0, 4410).rms();
        let tail = out.segment(44100 - 4410, 44100).rms();
        assert!(head < tail * 0.1, "head {head}, tail {tail}");
    }

    #[test]
    fn test_constant_lane() {
        let registry = EffectRegistry::new();
        let effect = registry.get("volume").unwrap();
        let input = sine(8192, 0.5);
        let lanes = vec![AutoLane::constant("gain_pct", 50.0)];
        let mut rng = StdRng::seed_from_u64(1);
        let out = apply_automation_multi(&input, 0, 8192, effect, &lanes, 44100, 2048, &mut rng);
        assert!((out.peak() - 0.25).abs() < 0.01);
    }

    #[test]
    fn test_out_of_range_value_clamped() {
        let registry = EffectRegistry::new();
        let effect = registry.get("volume").unwrap();
        let input = sine(4096, 0.5);
        // target 5000% is beyond the declared 0–1000 range
        let lanes = vec![AutoLane::ramp("gain_pct", 5000.0, 5000.0)];
        let mut rng = StdRng::seed_from_u64(1);
        let out = apply_automation_multi(&input, 0, 4096, effect, &lanes, 44100, 1024, &mut rng);
        assert!(out.peak() <= 1.0 + 1e-6);
    }

    #[test]
    fn test_untouched_outside_selection() {
        let registry = EffectRegistry::new();
        let effect = registry.get("volume").unwrap();
        let input = sine(8192, 0.5);
        let lanes = vec![AutoLane::constant("gain_pct", 0.0)];
        let mut rng = StdRng::seed_from_u64(1);
        let out = apply_automation_multi(&input, 2048, 4096, effect, &lanes, 44100, 1024, &mut rng);
        assert_eq!(out.sample(100, 0), input.sample(100, 0));
        assert_eq!(out.segment(2048, 4096).peak(), 0.0);
        assert_eq!(out.sample(5000, 0), input.sample(5000, 0));
    }

    #[test]
    fn test_degenerate_region() {
        let registry = EffectRegistry::new();
        let effect = registry.get("volume").unwrap();
        let input = sine(1024, 0.5);
        let mut rng = StdRng::seed_from_u64(1);
        let out = apply_automation_multi(&input, 512, 512, effect, &[], 44100, 2048, &mut rng);
        assert_eq!(out.samples(), input.samples());
    }

    #[test]
    fn test_lane_serde_shape() {
        let lane = AutoLane::ramp("gain_pct", 0.0, 100.0);
        let json = serde_json::to_string(&lane).unwrap();
        assert!(json.contains("\"mode\":\"automated\""));
        assert!(json.contains("curve_points"));
        let back: AutoLane = serde_json::from_str(&json).unwrap();
        assert_eq!(back, lane);
    }
}
