//! Bitcrusher — quantize to `2^bits` levels and sample-and-hold.

use mangle_core::{
    AudioBuffer, Effect, EffectDescriptor, EffectError, EffectSection, ParamMap, ParamSpec,
    ProcessCtx, TailPolicy,
};

const BIT_DEPTH: ParamSpec = ParamSpec::int("bit_depth", "Bit Depth", 1, 16, 8).automatable();
const DOWNSAMPLE: ParamSpec = ParamSpec::int("downsample", "Downsample", 1, 64, 4).automatable();

static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    id: "bitcrusher",
    name: "Bitcrusher",
    short_name: "CRSH",
    description: "Bit-depth reduction and sample-rate crushing",
    section: EffectSection::Distortion,
    tail: TailPolicy::None,
    params: &[BIT_DEPTH, DOWNSAMPLE],
};

/// Lo-fi quantizer: `2^bit_depth` levels plus every-Nth sample hold.
pub struct Bitcrusher;

impl Effect for Bitcrusher {
    fn descriptor(&self) -> &'static EffectDescriptor {
        &DESCRIPTOR
    }

    fn process(
        &self,
        input: &AudioBuffer,
        params: &ParamMap,
        _ctx: &mut ProcessCtx<'_>,
    ) -> Result<AudioBuffer, EffectError> {
        let bit_depth = params.int(&BIT_DEPTH) as u32;
        let downsample = params.int(&DOWNSAMPLE) as usize;
        let mut out = input.clone();

        // Quantization
        let levels = 2.0f32.powi(bit_depth as i32);
        for s in out.samples_mut() {
            *s = (*s * levels).round() / levels;
        }

        // Sample & hold: hold the first sample of each group of `downsample`.
        if downsample > 1 {
            let frames = out.frames();
            for c in 0..out.channels() {
                let mut held = 0.0;
                for i in 0..frames {
                    if i % downsample == 0 {
                        held = out.sample(i, c);
                    } else {
                        out.set_sample(i, c, held);
                    }
                }
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
    fn test_quantization_levels() {
        let input = sine(44100, 0.1);
        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = ProcessCtx::new(44100, &mut rng);
        let mut params = ParamMap::new();
        params.set("bit_depth", 3.0);
        params.set("downsample", 1.0);
        let out = Bitcrusher.process(&input, &params, &mut ctx).unwrap();
        assert_contract(&out, &input, "bitcrusher");
        // 3 bits → every sample is a multiple of 1/8
        for &s in out.samples().iter().step_by(97) {
            let scaled = s * 8.0;
            assert!((scaled - scaled.round()).abs() < 1e-4, "sample {s} off-grid");
        }
    }

    #[test]
    fn test_sample_hold_repeats() {
        let input = sine(44100, 0.05);
        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = ProcessCtx::new(44100, &mut rng);
        let mut params = ParamMap::new();
        params.set("bit_depth", 16.0);
        params.set("downsample", 8.0);
        let out = Bitcrusher.process(&input, &params, &mut ctx).unwrap();
        for group in (0..out.frames() - 8).step_by(8) {
            let first = out.sample(group, 0);
            for k in 1..8 {
                assert_eq!(out.sample(group + k, 0), first);
            }
        }
    }
}
