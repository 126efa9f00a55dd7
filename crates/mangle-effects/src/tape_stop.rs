//! Tape stop — progressive slowdown like a cassette deck losing power.
//!
//! The tail of the selection is sliced into 64 chunks; chunk `i` plays at
//! speed `max(0.05, 1 − 0.95·i/64)` with an amplitude decay toward 0.2, then
//! the whole thing is truncated or zero-padded back to the selection length.

use mangle_core::{
    AudioBuffer, Effect, EffectDescriptor, EffectError, EffectSection, ParamMap, ParamSpec,
    ParamUnit, ProcessCtx, TailPolicy,
};

const DURATION_MS: ParamSpec =
    ParamSpec::float("duration_ms", "Duration", 100.0, 5000.0, 1500.0, 50.0, ParamUnit::Milliseconds);

const N_CHUNKS: usize = 64;

static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    id: "tape_stop",
    name: "Tape Stop",
    short_name: "TAPE",
    description: "Progressive slowdown to a stop, pitch falling with speed",
    section: EffectSection::PitchTime,
    tail: TailPolicy::None,
    params: &[DURATION_MS],
};

/// Cassette-stop slowdown over the end of the selection.
pub struct TapeStop;

impl Effect for TapeStop {
    fn descriptor(&self) -> &'static EffectDescriptor {
        &DESCRIPTOR
    }

    fn process(
        &self,
        input: &AudioBuffer,
        params: &ParamMap,
        ctx: &mut ProcessCtx<'_>,
    ) -> Result<AudioBuffer, EffectError> {
        let frames = input.frames();
        if frames == 0 {
            return Ok(input.clone());
        }

        let duration_ms = params.float(&DURATION_MS);
        let requested = (duration_ms / 1000.0 * ctx.sample_rate as f32) as usize;
        let effect_len = requested.clamp(256.min(frames), frames);
        let clean_len = frames - effect_len;

        let clean = input.segment(0, clean_len);
        let effect_part = input.segment(clean_len, frames);

        let chunk_size = (effect_part.frames() / N_CHUNKS).max(1);
        let mut pieces: Vec<AudioBuffer> = Vec::with_capacity(N_CHUNKS);
        for i in 0..N_CHUNKS {
            let s = i * chunk_size;
            if s >= effect_part.frames() {
                break;
            }
            let e = (s + chunk_size).min(effect_part.frames());
            let chunk = effect_part.segment(s, e);

            let speed = (1.0 - (i as f32 / N_CHUNKS as f32) * 0.95).max(0.05);
            let new_len = ((chunk.frames() as f32) / speed).max(4.0) as usize;
            let mut stretched = chunk.resampled(new_len);

            let volume = (1.0 - (i as f32 / N_CHUNKS as f32) * 0.8).max(0.0);
            stretched.scale(volume);
            pieces.push(stretched);
        }

        let slowed = if pieces.is_empty() {
            effect_part
        } else {
            let refs: Vec<&AudioBuffer> = pieces.iter().collect();
            AudioBuffer::concat(&refs, input.sample_rate())
        };

        // Back to the original selection length: truncate or zero-pad.
        let mut combined = AudioBuffer::concat(&[&clean, &slowed], input.sample_rate());
        if combined.frames() > frames {
            combined = combined.segment(0, frames);
        } else if combined.frames() < frames {
            let pad = AudioBuffer::zeroed(
                frames - combined.frames(),
                combined.channels(),
                input.sample_rate(),
            );
            combined = AudioBuffer::concat(&[&combined, &pad], input.sample_rate());
        }
        combined.clamp_unit();
        Ok(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{assert_contract, sine};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_length_preserved() {
        let input = sine(44100, 0.5);
        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = ProcessCtx::new(44100, &mut rng);
        let out = TapeStop.process(&input, &ParamMap::new(), &mut ctx).unwrap();
        assert_contract(&out, &input, "tape_stop");
        assert_eq!(out.frames(), input.frames());
    }

    #[test]
    fn test_tail_quieter_than_head() {
        let input = sine(44100, 1.0);
        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = ProcessCtx::new(44100, &mut rng);
        let mut params = ParamMap::new();
        params.set("duration_ms", 900.0);
        let out = TapeStop.process(&input, &params, &mut ctx).unwrap();
        let head = out.segment(0, 4410).rms();
        let tail = out.segment(out.frames() - 4410, out.frames()).rms();
        assert!(tail < head, "tail {tail} should be quieter than head {head}");
    }
}
