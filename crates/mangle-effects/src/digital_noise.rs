//! Digital noise — bit reduction, sample-and-hold aliasing, noise injection.

use mangle_core::{
    AudioBuffer, Effect, EffectDescriptor, EffectError, EffectSection, ParamMap, ParamSpec,
    ParamUnit, ProcessCtx, TailPolicy, micro_fade,
};
use rand::Rng;

const BIT_REDUCTION: ParamSpec =
    ParamSpec::float("bit_reduction", "Bit Reduction", 0.0, 1.0, 0.5, 0.01, ParamUnit::None);
const NOISE_AMOUNT: ParamSpec =
    ParamSpec::float("noise_amount", "Noise", 0.0, 1.0, 0.3, 0.01, ParamUnit::None);
const SAMPLE_HOLD: ParamSpec = ParamSpec::int("sample_hold", "Sample Hold", 1, 64, 1);

static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    id: "digital_noise",
    name: "Digital Noise",
    short_name: "DNSE",
    description: "Broken-digital texture: crushed bits and noise artifacts",
    section: EffectSection::SpaceTexture,
    tail: TailPolicy::None,
    params: &[BIT_REDUCTION, NOISE_AMOUNT, SAMPLE_HOLD],
};

/// Lo-fi digital corruption.
pub struct DigitalNoise;

impl Effect for DigitalNoise {
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
        if n < 2 {
            return Ok(input.clone());
        }
        let bit_reduction = params.float(&BIT_REDUCTION);
        let noise_amount = params.float(&NOISE_AMOUNT);
        let sample_hold = params.int(&SAMPLE_HOLD) as usize;
        let mut out = input.clone();

        // 1. Bit-depth reduction: map 0..1 to 256..4 quantization levels
        if bit_reduction > 0.01 {
            let levels = ((256.0 * (1.0 - bit_reduction * 0.95)) as i32).max(4) as f32;
            for s in out.samples_mut() {
                *s = (*s * levels).round() / levels;
            }
        }

        // 2. Sample-and-hold aliasing
        if sample_hold > 1 {
            let sh = sample_hold.clamp(2, 64);
            for c in 0..out.channels() {
                let mut i = 0;
                while i + sh < n {
                    let held = out.sample(i, c);
                    for k in 1..sh {
                        out.set_sample(i + k, c, held);
                    }
                    i += sh;
                }
            }
        }

        // 3. Noise injection
        if noise_amount > 0.01 {
            let noise_amp = noise_amount * 0.08;
            let channels = out.channels();
            for i in 0..n {
                for c in 0..channels {
                    let noise = ctx.rng.gen_range(-noise_amp..noise_amp);
                    let v = out.sample(i, c) + noise;
                    out.set_sample(i, c, v);
                }
            }
        }

        let mut out = micro_fade(&out, 64);
        out.clamp_unit();
        Ok(out)
    }
}
