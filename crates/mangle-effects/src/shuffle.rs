//! Shuffle — slice the selection and reorder the slices at random.

use mangle_core::{
    AudioBuffer, Effect, EffectDescriptor, EffectError, EffectSection, ParamMap, ParamSpec,
    ProcessCtx, TailPolicy, micro_fade,
};
use rand::seq::SliceRandom;

const NUM_SLICES: ParamSpec = ParamSpec::int("num_slices", "Slices", 2, 64, 8);

static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    id: "shuffle",
    name: "Shuffle",
    short_name: "SHUF",
    description: "Chop the selection into slices and scramble their order",
    section: EffectSection::Glitch,
    tail: TailPolicy::None,
    params: &[NUM_SLICES],
};

/// Rhythmic reordering of equal slices.
pub struct Shuffle;

impl Effect for Shuffle {
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
        let slices = params.int(&NUM_SLICES) as usize;
        let slice_frames = (n / slices).max(64);

        let mut chunks: Vec<AudioBuffer> = Vec::with_capacity(slices);
        for i in 0..slices {
            let s = i * slice_frames;
            if s >= n {
                break;
            }
            let e = (s + slice_frames).min(n);
            let chunk = input.segment(s, e);
            chunks.push(micro_fade(&chunk, 16.min(chunk.frames() / 4)));
        }
        if chunks.is_empty() {
            return Ok(input.clone());
        }

        chunks.shuffle(ctx.rng);

        let refs: Vec<&AudioBuffer> = chunks.iter().collect();
        let mut out = AudioBuffer::concat(&refs, input.sample_rate());

        // Back to the selection length
        if out.frames() > n {
            out = out.segment(0, n);
        } else if out.frames() < n {
            let pad = AudioBuffer::zeroed(n - out.frames(), out.channels(), input.sample_rate());
            out = AudioBuffer::concat(&[&out, &pad], input.sample_rate());
        }
        out.clamp_unit();
        Ok(out)
    }
}
