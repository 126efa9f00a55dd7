//! OTT — aggressive upward + downward compression.
//!
//! A simplified over-the-top compressor: a windowed envelope follower drives
//! gain toward a fixed target level from both directions, so quiet material
//! is pulled up and loud material squashed down. `depth` blends between the
//! dry signal and the fully flattened one.

use mangle_core::{
    AudioBuffer, Effect, EffectDescriptor, EffectError, EffectSection, ParamMap, ParamSpec,
    ParamUnit, ProcessCtx, TailPolicy,
};

const DEPTH: ParamSpec =
    ParamSpec::float("depth", "Depth", 0.0, 1.0, 0.5, 0.01, ParamUnit::None).automatable();

/// Envelope target the compressor pulls toward.
const TARGET_LEVEL: f32 = 0.5;
/// Envelope smoothing window in milliseconds.
const WINDOW_MS: f32 = 20.0;
/// Gain bounds for the upward stage.
const MAX_BOOST: f32 = 8.0;

static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    id: "ott",
    name: "OTT",
    short_name: "OTT",
    description: "Upward + downward compression flattener",
    section: EffectSection::SpaceTexture,
    tail: TailPolicy::None,
    params: &[DEPTH],
};

/// Two-way compression toward a fixed loudness target.
pub struct Ott;

impl Effect for Ott {
    fn descriptor(&self) -> &'static EffectDescriptor {
        &DESCRIPTOR
    }

    fn process(
        &self,
        input: &AudioBuffer,
        params: &ParamMap,
        ctx: &mut ProcessCtx<'_>,
    ) -> Result<AudioBuffer, EffectError> {
        let n = input.frames();
        if n == 0 {
            return Ok(input.clone());
        }
        let depth = params.float(&DEPTH);
        let window = ((WINDOW_MS / 1000.0) * ctx.sample_rate as f32) as usize;
        let window = window.max(16);
        let coeff = 1.0 - (-1.0 / window as f32).exp();

        let mut planes: Vec<Vec<f32>> = Vec::with_capacity(input.channels());
        for c in 0..input.channels() {
            let dry = input.channel(c);
            let mut envelope = 0.0f32;
            let mut plane = Vec::with_capacity(n);
            for &s in &dry {
                envelope += coeff * (s.abs() - envelope);
                let gain = if envelope > 1e-4 {
                    (TARGET_LEVEL / envelope).min(MAX_BOOST)
                } else {
                    1.0
                };
                let flattened = s * gain;
                plane.push(s * (1.0 - depth) + flattened * depth);
            }
            planes.push(plane);
        }
        let mut out = AudioBuffer::from_planar(&planes, input.sample_rate());
        out.clamp_unit();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{assert_contract, sine};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_contract() {
        let input = sine(44100, 0.3);
        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = ProcessCtx::new(44100, &mut rng);
        let out = Ott.process(&input, &ParamMap::new(), &mut ctx).unwrap();
        assert_contract(&out, &input, "ott");
        assert_eq!(out.frames(), input.frames());
    }

    #[test]
    fn test_quiet_signal_boosted() {
        let quiet: Vec<f32> = (0..8820)
            .map(|i| 0.05 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin())
            .collect();
        let input = AudioBuffer::from_mono(quiet, 44100);
        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = ProcessCtx::new(44100, &mut rng);
        let mut params = ParamMap::new();
        params.set("depth", 1.0);
        let out = Ott.process(&input, &params, &mut ctx).unwrap();
        // Skip the attack transient, compare steady-state RMS
        let tail_in = input.segment(4410, 8820).rms();
        let tail_out = out.segment(4410, 8820).rms();
        assert!(tail_out > tail_in * 2.0, "in {tail_in}, out {tail_out}");
    }

    #[test]
    fn test_zero_depth_is_identity() {
        let input = sine(44100, 0.1);
        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = ProcessCtx::new(44100, &mut rng);
        let mut params = ParamMap::new();
        params.set("depth", 0.0);
        let out = Ott.process(&input, &params, &mut ctx).unwrap();
        let mid = input.frames() / 2;
        assert!((out.sample(mid, 0) - input.sample(mid, 0)).abs() < 1e-6);
    }
}
