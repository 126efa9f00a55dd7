//! Datamosh — corrupt the selection as if it were raw data.
//!
//! The audio equivalent of video datamoshing: blocks are swapped, repeated,
//! zeroed, or replaced with noise.

use mangle_core::{
    AudioBuffer, Effect, EffectDescriptor, EffectError, EffectSection, ParamMap, ParamSpec,
    ParamUnit, ProcessCtx, TailPolicy,
};
use rand::Rng;

const BLOCK_SIZE: ParamSpec = ParamSpec::int("block_size", "Block Size", 64, 4096, 512);
const CHAOS: ParamSpec =
    ParamSpec::float("chaos", "Chaos", 0.0, 1.0, 0.5, 0.01, ParamUnit::None);
const MODE: ParamSpec =
    ParamSpec::choice("mode", "Mode", &["swap", "repeat", "zero", "noise"], 0);

static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    id: "datamosh",
    name: "Datamosh",
    short_name: "MOSH",
    description: "Raw-data corruption: swap, repeat, zero, or noise blocks",
    section: EffectSection::Glitch,
    tail: TailPolicy::None,
    params: &[BLOCK_SIZE, CHAOS, MODE],
};

/// Block-level corruption of the selection.
pub struct Datamosh;

impl Effect for Datamosh {
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
        let block = params.int(&BLOCK_SIZE) as usize;
        let chaos = params.float(&CHAOS);
        let mode = params.choice(&MODE);

        let n_blocks = (n / block).max(1);
        let n_affected = ((n_blocks as f32 * chaos) as usize).max(1);
        let channels = input.channels();
        let mut out = input.clone();

        let block_range = |idx: usize| {
            let s = idx * block;
            (s, (s + block).min(n))
        };

        match mode {
            "repeat" => {
                let src_idx = ctx.rng.gen_range(0..n_blocks);
                let (src_s, src_e) = block_range(src_idx);
                let src_block = out.segment(src_s, src_e);
                for _ in 0..n_affected {
                    let dst_idx = ctx.rng.gen_range(0..n_blocks);
                    let dst_s = dst_idx * block;
                    let dst_e = (dst_s + src_block.frames()).min(n);
                    for (k, frame) in (dst_s..dst_e).enumerate() {
                        for c in 0..channels {
                            out.set_sample(frame, c, src_block.sample(k, c));
                        }
                    }
                }
            }
            "zero" => {
                for _ in 0..n_affected {
                    let (s, e) = block_range(ctx.rng.gen_range(0..n_blocks));
                    for frame in s..e {
                        for c in 0..channels {
                            out.set_sample(frame, c, 0.0);
                        }
                    }
                }
            }
            "noise" => {
                for _ in 0..n_affected {
                    let (s, e) = block_range(ctx.rng.gen_range(0..n_blocks));
                    for frame in s..e {
                        for c in 0..channels {
                            out.set_sample(frame, c, ctx.rng.gen_range(-0.5f32..0.5));
                        }
                    }
                }
            }
            // "swap"
            _ => {
                for _ in 0..n_affected {
                    let (s1, e1) = block_range(ctx.rng.gen_range(0..n_blocks));
                    let (s2, e2) = block_range(ctx.rng.gen_range(0..n_blocks));
                    let len = (e1 - s1).min(e2 - s2);
                    for k in 0..len {
                        for c in 0..channels {
                            let a = out.sample(s1 + k, c);
                            let b = out.sample(s2 + k, c);
                            out.set_sample(s1 + k, c, b);
                            out.set_sample(s2 + k, c, a);
                        }
                    }
                }
            }
        }
        out.clamp_unit();
        Ok(out)
    }
}
