//! Reverse — flip the selection, with an anti-click fade at the seam.

use mangle_core::{
    AudioBuffer, Effect, EffectDescriptor, EffectError, EffectSection, ParamMap, ProcessCtx,
    TailPolicy, micro_fade,
};

static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    id: "reverse",
    name: "Reverse",
    short_name: "REV",
    description: "Play the selection backwards",
    section: EffectSection::Basics,
    tail: TailPolicy::None,
    params: &[],
};

/// Frame-order reversal of the selection.
pub struct Reverse;

impl Effect for Reverse {
    fn descriptor(&self) -> &'static EffectDescriptor {
        &DESCRIPTOR
    }

    fn process(
        &self,
        input: &AudioBuffer,
        _params: &ParamMap,
        _ctx: &mut ProcessCtx<'_>,
    ) -> Result<AudioBuffer, EffectError> {
        let reversed = input.reversed();
        let fade = 64.min(input.frames() / 4);
        Ok(micro_fade(&reversed, fade))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::sine;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_reverse_flips_order() {
        let input = AudioBuffer::from_mono((0..1000).map(|i| i as f32 / 1000.0).collect(), 44100);
        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = ProcessCtx::new(44100, &mut rng);
        let out = Reverse.process(&input, &ParamMap::new(), &mut ctx).unwrap();
        assert_eq!(out.frames(), input.frames());
        // Middle (outside the micro fades) mirrors the input
        assert!((out.sample(500, 0) - input.sample(499, 0)).abs() < 1e-6);
    }

    #[test]
    fn test_double_reverse_round_trips_middle() {
        let input = sine(44100, 0.1);
        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = ProcessCtx::new(44100, &mut rng);
        let once = Reverse.process(&input, &ParamMap::new(), &mut ctx).unwrap();
        let twice = Reverse.process(&once, &ParamMap::new(), &mut ctx).unwrap();
        let mid = input.frames() / 2;
        assert!((twice.sample(mid, 0) - input.sample(mid, 0)).abs() < 1e-6);
    }
}
