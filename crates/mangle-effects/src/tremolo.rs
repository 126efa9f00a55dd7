//! Tremolo — periodic amplitude modulation with four LFO shapes.

use mangle_core::{
    AudioBuffer, Effect, EffectDescriptor, EffectError, EffectSection, ParamMap, ParamSpec,
    ParamUnit, ProcessCtx, TailPolicy,
};
use std::f64::consts::PI;

const RATE_HZ: ParamSpec =
    ParamSpec::float("rate_hz", "Rate", 0.5, 30.0, 5.0, 0.5, ParamUnit::Hertz).automatable();
const DEPTH: ParamSpec =
    ParamSpec::float("depth", "Depth", 0.0, 1.0, 0.7, 0.01, ParamUnit::None).automatable();
const SHAPE: ParamSpec =
    ParamSpec::choice("shape", "Shape", &["sine", "square", "triangle", "saw"], 0);

static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    id: "tremolo",
    name: "Tremolo",
    short_name: "TREM",
    description: "Rhythmic volume wobble with selectable waveform",
    section: EffectSection::Modulation,
    tail: TailPolicy::None,
    params: &[RATE_HZ, DEPTH, SHAPE],
};

/// Amplitude modulation by a unipolar LFO.
pub struct Tremolo;

impl Effect for Tremolo {
    fn descriptor(&self) -> &'static EffectDescriptor {
        &DESCRIPTOR
    }

    fn process(
        &self,
        input: &AudioBuffer,
        params: &ParamMap,
        ctx: &mut ProcessCtx<'_>,
    ) -> Result<AudioBuffer, EffectError> {
        let sr = f64::from(ctx.sample_rate);
        let rate = f64::from(params.float(&RATE_HZ));
        let depth = params.float(&DEPTH);
        let shape = params.choice(&SHAPE);
        let mut out = input.clone();

        let frames = out.frames();
        for i in 0..frames {
            let t = i as f64 / sr;
            let lfo = match shape {
                "square" => {
                    if (2.0 * PI * rate * t).sin() >= 0.0 {
                        1.0
                    } else {
                        0.0
                    }
                }
                "triangle" => {
                    let x = rate * t;
                    2.0 * (2.0 * (x - (x + 0.5).floor())).abs()
                }
                "saw" => (rate * t).fract(),
                _ => 0.5 * (1.0 + (2.0 * PI * rate * t).sin()),
            } as f32;
            let envelope = 1.0 - depth * (1.0 - lfo);
            for c in 0..out.channels() {
                let v = out.sample(i, c) * envelope;
                out.set_sample(i, c, v);
            }
        }
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
    fn test_all_shapes_contract() {
        for shape in ["sine", "square", "triangle", "saw"] {
            let input = sine(44100, 0.2);
            let mut rng = StdRng::seed_from_u64(1);
            let mut ctx = ProcessCtx::new(44100, &mut rng);
            let mut params = ParamMap::new();
            params.set_text("shape", shape);
            let out = Tremolo.process(&input, &params, &mut ctx).unwrap();
            assert_contract(&out, &input, shape);
            assert_eq!(out.frames(), input.frames());
        }
    }

    #[test]
    fn test_zero_depth_is_identity() {
        let input = sine(44100, 0.1);
        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = ProcessCtx::new(44100, &mut rng);
        let mut params = ParamMap::new();
        params.set("depth", 0.0);
        let out = Tremolo.process(&input, &params, &mut ctx).unwrap();
        let mid = input.frames() / 2;
        assert!((out.sample(mid, 0) - input.sample(mid, 0)).abs() < 1e-6);
    }

    #[test]
    fn test_full_depth_reduces_rms() {
        let input = sine(44100, 0.5);
        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = ProcessCtx::new(44100, &mut rng);
        let mut params = ParamMap::new();
        params.set("depth", 1.0);
        let out = Tremolo.process(&input, &params, &mut ctx).unwrap();
        assert!(out.rms() < input.rms() * 0.85);
    }
}
