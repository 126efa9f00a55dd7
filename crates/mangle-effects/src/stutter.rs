//! Stutter — repeat the selection for the classic glitchcore stammer.

use mangle_core::{
    AudioBuffer, Effect, EffectDescriptor, EffectError, EffectSection, ParamMap, ParamSpec,
    ParamUnit, ProcessCtx, TailPolicy, micro_fade,
};

const REPEATS: ParamSpec = ParamSpec::int("repeats", "Repeats", 1, 64, 4).automatable();
const DECAY: ParamSpec =
    ParamSpec::float("decay", "Decay", 0.0, 1.0, 0.0, 0.05, ParamUnit::None);
const STUTTER_MODE: ParamSpec =
    ParamSpec::choice("stutter_mode", "Mode", &["normal", "halving", "reverse_alt"], 0);

static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    id: "stutter",
    name: "Stutter",
    short_name: "STUT",
    description: "Repeat the selection; constant, halving, or alternating reverse",
    section: EffectSection::Glitch,
    tail: TailPolicy::Insert,
    params: &[REPEATS, DECAY, STUTTER_MODE],
};

/// Selection repeater with per-repeat decay and three layouts.
///
/// With `repeats = 1` the selection comes back once, unreversed, in every
/// mode.
pub struct Stutter;

impl Effect for Stutter {
    fn descriptor(&self) -> &'static EffectDescriptor {
        &DESCRIPTOR
    }

    fn process(
        &self,
        input: &AudioBuffer,
        params: &ParamMap,
        _ctx: &mut ProcessCtx<'_>,
    ) -> Result<AudioBuffer, EffectError> {
        if input.is_empty() {
            return Ok(input.clone());
        }
        let repeats = params.int(&REPEATS) as usize;
        let decay = params.float(&DECAY);
        let mode = params.choice(&STUTTER_MODE);

        let segment = micro_fade(input, 64.min(input.frames() / 4));
        let mut parts: Vec<AudioBuffer> = Vec::with_capacity(repeats);

        for i in 0..repeats {
            let mut part = match mode {
                "halving" => {
                    let length = (segment.frames() >> i).max(64.min(segment.frames()));
                    segment.segment(0, length)
                }
                "reverse_alt" => {
                    if i % 2 == 0 {
                        segment.clone()
                    } else {
                        segment.reversed()
                    }
                }
                _ => segment.clone(),
            };
            if decay > 0.0 {
                part.scale((1.0 - decay).powi(i as i32));
            }
            parts.push(micro_fade(&part, 32.min(part.frames() / 4)));
        }

        let refs: Vec<&AudioBuffer> = parts.iter().collect();
        let mut out = AudioBuffer::concat(&refs, input.sample_rate());
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

    fn run(mode: &str, repeats: f32, decay: f32) -> (AudioBuffer, AudioBuffer) {
        let input = sine(44100, 0.1);
        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = ProcessCtx::new(44100, &mut rng);
        let mut params = ParamMap::new();
        params.set_text("stutter_mode", mode);
        params.set("repeats", repeats);
        params.set("decay", decay);
        let out = Stutter.process(&input, &params, &mut ctx).unwrap();
        (input, out)
    }

    #[test]
    fn test_normal_multiplies_length() {
        let (input, out) = run("normal", 4.0, 0.0);
        assert_contract(&out, &input, "stutter");
        assert_eq!(out.frames(), input.frames() * 4);
    }

    #[test]
    fn test_halving_shrinks_each_repeat() {
        let (input, out) = run("halving", 3.0, 0.0);
        let n = input.frames();
        assert_eq!(out.frames(), n + n / 2 + n / 4);
    }

    #[test]
    fn test_reverse_alt_alternates() {
        let (input, out) = run("reverse_alt", 2.0, 0.0);
        assert_eq!(out.frames(), input.frames() * 2);
        let n = input.frames();
        // Second repeat middle mirrors the first repeat middle
        let a = out.sample(n / 2, 0);
        let b = out.sample(n + (n - 1 - n / 2), 0);
        assert!((a - b).abs() < 1e-5);
    }

    #[test]
    fn test_single_repeat_unreversed() {
        let (input, out) = run("reverse_alt", 1.0, 0.0);
        assert_eq!(out.frames(), input.frames());
        let mid = input.frames() / 2;
        assert!((out.sample(mid, 0) - input.sample(mid, 0)).abs() < 1e-5);
    }

    #[test]
    fn test_decay_attenuates_repeats() {
        let (input, out) = run("normal", 3.0, 0.5);
        let n = input.frames();
        let first = out.segment(0, n).rms();
        let third = out.segment(2 * n, 3 * n).rms();
        assert!(third < first * 0.3, "first {first}, third {third}");
    }
}
