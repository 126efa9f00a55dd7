//! Buffer freeze — loop a short grain from the start of the selection.

use mangle_core::{
    AudioBuffer, Effect, EffectDescriptor, EffectError, EffectSection, ParamMap, ParamSpec,
    ParamUnit, ProcessCtx, TailPolicy, micro_fade,
};

const BUFFER_MS: ParamSpec =
    ParamSpec::float("buffer_ms", "Buffer", 10.0, 500.0, 80.0, 5.0, ParamUnit::Milliseconds);

static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    id: "buffer_freeze",
    name: "Buffer Freeze",
    short_name: "FRZ",
    description: "Freeze a grain and loop it across the selection",
    section: EffectSection::Glitch,
    tail: TailPolicy::None,
    params: &[BUFFER_MS],
};

/// Static drone built from the first grain of the selection.
pub struct BufferFreeze;

impl Effect for BufferFreeze {
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
        let buffer_ms = params.float(&BUFFER_MS);
        let grain_len = ((buffer_ms * ctx.sample_rate as f32 / 1000.0) as usize)
            .max(64)
            .min(n);
        let grain = micro_fade(&input.segment(0, grain_len), 32.min(grain_len / 4));

        let reps = n / grain_len + 1;
        let parts: Vec<&AudioBuffer> = std::iter::repeat_n(&grain, reps).collect();
        let mut out = AudioBuffer::concat(&parts, input.sample_rate());
        out = out.segment(0, n);
        out.clamp_unit();
        Ok(out)
    }
}
