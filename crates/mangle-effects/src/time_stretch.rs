//! Time stretch — lengthen or compress the selection by resampling.

use mangle_core::{
    AudioBuffer, Effect, EffectDescriptor, EffectError, EffectSection, ParamMap, ParamSpec,
    ParamUnit, ProcessCtx, TailPolicy, micro_fade,
};

const FACTOR: ParamSpec =
    ParamSpec::float("factor", "Factor", 0.1, 8.0, 1.0, 0.05, ParamUnit::None);

static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    id: "time_stretch",
    name: "Time Stretch",
    short_name: "STRCH",
    description: "Stretch or compress the selection in time",
    section: EffectSection::PitchTime,
    tail: TailPolicy::Insert,
    params: &[FACTOR],
};

/// Resampling time stretch; pitch follows the speed change.
pub struct TimeStretch;

impl Effect for TimeStretch {
    fn descriptor(&self) -> &'static EffectDescriptor {
        &DESCRIPTOR
    }

    fn process(
        &self,
        input: &AudioBuffer,
        params: &ParamMap,
        _ctx: &mut ProcessCtx<'_>,
    ) -> Result<AudioBuffer, EffectError> {
        let factor = params.float(&FACTOR);
        if input.is_empty() {
            return Ok(input.clone());
        }
        let new_len = ((input.frames() as f64) * f64::from(factor)).max(64.0) as usize;
        let stretched = input.resampled(new_len);
        let mut out = micro_fade(&stretched, 64);
        out.clamp_unit();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::sine;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_double_length() {
        let input = sine(44100, 0.1);
        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = ProcessCtx::new(44100, &mut rng);
        let mut params = ParamMap::new();
        params.set("factor", 2.0);
        let out = TimeStretch.process(&input, &params, &mut ctx).unwrap();
        assert_eq!(out.frames(), input.frames() * 2);
    }

    #[test]
    fn test_unity_factor_keeps_length() {
        let input = sine(44100, 0.1);
        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = ProcessCtx::new(44100, &mut rng);
        let out = TimeStretch.process(&input, &ParamMap::new(), &mut ctx).unwrap();
        assert_eq!(out.frames(), input.frames());
    }

    #[test]
    fn test_floor_at_64_frames() {
        let input = sine(44100, 0.01);
        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = ProcessCtx::new(44100, &mut rng);
        let mut params = ParamMap::new();
        params.set("factor", 0.1);
        let out = TimeStretch.process(&input, &params, &mut ctx).unwrap();
        assert!(out.frames() >= 64);
    }
}
