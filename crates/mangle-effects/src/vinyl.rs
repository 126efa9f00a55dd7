//! Vinyl — crackle, wow, and tone rolloff of a worn record.

use mangle_core::{
    AudioBuffer, Effect, EffectDescriptor, EffectError, EffectSection, ParamMap, ParamSpec,
    ParamUnit, ProcessCtx, TailPolicy,
};
use rand::Rng;
use std::f64::consts::PI;

const AMOUNT: ParamSpec =
    ParamSpec::float("amount", "Amount", 0.0, 1.0, 0.5, 0.01, ParamUnit::None).automatable();

static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    id: "vinyl",
    name: "Vinyl",
    short_name: "VNYL",
    description: "Record-player crackle, wow, and high rolloff",
    section: EffectSection::SpaceTexture,
    tail: TailPolicy::None,
    params: &[AMOUNT],
};

/// Worn-record simulation: slow pitch wow, crackle pops, one-pole rolloff.
pub struct Vinyl;

impl Effect for Vinyl {
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
        let amount = params.float(&AMOUNT);
        let sr = f64::from(ctx.sample_rate);

        let mut planes: Vec<Vec<f32>> = (0..input.channels())
            .map(|c| input.channel(c))
            .collect();

        // Wow: slow (0.6 Hz) variable-rate read, deeper with amount.
        let wow_depth = f64::from(amount) * 0.004;
        if wow_depth > 1e-5 {
            let mut read_idx = Vec::with_capacity(n);
            let mut acc = 0.0f64;
            for i in 0..n {
                let t = i as f64 / sr;
                acc += 1.0 + wow_depth * (2.0 * PI * 0.6 * t).sin();
                read_idx.push(acc);
            }
            let last = read_idx[n - 1];
            for idx in &mut read_idx {
                *idx = *idx / last * (n - 1) as f64;
            }
            for plane in &mut planes {
                let src = plane.clone();
                for (i, s) in plane.iter_mut().enumerate() {
                    let pos = read_idx[i];
                    let i0 = pos.floor() as usize;
                    let i1 = (i0 + 1).min(n - 1);
                    let frac = (pos - i0 as f64) as f32;
                    *s = src[i0] * (1.0 - frac) + src[i1] * frac;
                }
            }
        }

        // High rolloff: one-pole lowpass, darker with amount.
        let alpha = 0.2 + amount * 0.55;
        for plane in &mut planes {
            let mut prev = plane[0];
            for s in plane.iter_mut().skip(1) {
                let filtered = alpha * prev + (1.0 - alpha) * *s;
                *s = filtered;
                prev = filtered;
            }
        }

        // Crackle: sparse impulses, identical across channels.
        let pops_per_sec = 2.0 + f64::from(amount) * 30.0;
        let pop_prob = pops_per_sec / sr;
        for i in 0..n {
            if ctx.rng.gen_bool(pop_prob.min(1.0)) {
                let polarity: f32 = if ctx.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                let amp = ctx.rng.gen_range(0.05..0.25) * amount * polarity;
                for plane in &mut planes {
                    plane[i] = (plane[i] + amp).clamp(-1.0, 1.0);
                }
            }
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
        let mut rng = StdRng::seed_from_u64(7);
        let mut ctx = ProcessCtx::new(44100, &mut rng);
        let out = Vinyl.process(&input, &ParamMap::new(), &mut ctx).unwrap();
        assert_contract(&out, &input, "vinyl");
        assert_eq!(out.frames(), input.frames());
    }

    #[test]
    fn test_seeded_rng_reproducible() {
        let input = sine(44100, 0.2);
        let render = |seed: u64| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut ctx = ProcessCtx::new(44100, &mut rng);
            Vinyl.process(&input, &ParamMap::new(), &mut ctx).unwrap()
        };
        assert_eq!(render(42).samples(), render(42).samples());
    }

    #[test]
    fn test_amount_darkens() {
        let input = sine(44100, 0.2);
        let mut rng = StdRng::seed_from_u64(7);
        let mut ctx = ProcessCtx::new(44100, &mut rng);
        let mut params = ParamMap::new();
        params.set("amount", 1.0);
        let heavy = Vinyl.process(&input, &params, &mut ctx).unwrap();
        assert!(!heavy.has_non_finite());
    }
}
