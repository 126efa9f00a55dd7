//! Pan — constant-power stereo placement with an optional mono fold-down.

use mangle_core::{
    AudioBuffer, Effect, EffectDescriptor, EffectError, EffectSection, ParamMap, ParamSpec,
    ParamUnit, ProcessCtx, TailPolicy,
};

const PAN: ParamSpec =
    ParamSpec::float("pan", "Pan", -1.0, 1.0, 0.0, 0.01, ParamUnit::None).automatable();
const MONO: ParamSpec = ParamSpec::toggle("mono", "Mono", false);

static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    id: "pan",
    name: "Pan",
    short_name: "PAN",
    description: "Constant-power pan with optional mono fold-down",
    section: EffectSection::Basics,
    tail: TailPolicy::None,
    params: &[PAN, MONO],
};

/// Stereo balance. Mono input is panned between two equal channels only when
/// the buffer is already stereo; mono buffers keep their channel count.
pub struct Pan;

impl Effect for Pan {
    fn descriptor(&self) -> &'static EffectDescriptor {
        &DESCRIPTOR
    }

    fn process(
        &self,
        input: &AudioBuffer,
        params: &ParamMap,
        _ctx: &mut ProcessCtx<'_>,
    ) -> Result<AudioBuffer, EffectError> {
        let pan = params.float(&PAN);
        let mono = params.flag(&MONO);

        let mut out = if mono {
            input.to_mono().with_channels(input.channels())
        } else {
            input.clone()
        };

        if out.channels() == 2 {
            // Constant-power pan law: equal loudness at center.
            let angle = (pan + 1.0) * std::f32::consts::FRAC_PI_4;
            let left_gain = angle.cos() * std::f32::consts::SQRT_2;
            let right_gain = angle.sin() * std::f32::consts::SQRT_2;
            for i in 0..out.frames() {
                let l = out.sample(i, 0) * left_gain;
                let r = out.sample(i, 1) * right_gain;
                out.set_sample(i, 0, l);
                out.set_sample(i, 1, r);
            }
        }
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
    fn test_hard_left_silences_right() {
        let input = sine(44100, 0.05);
        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = ProcessCtx::new(44100, &mut rng);
        let mut params = ParamMap::new();
        params.set("pan", -1.0);
        let out = Pan.process(&input, &params, &mut ctx).unwrap();
        let right_peak = out.channel(1).iter().fold(0.0f32, |a, s| a.max(s.abs()));
        assert!(right_peak < 1e-6, "right peak {right_peak}");
        let left_peak = out.channel(0).iter().fold(0.0f32, |a, s| a.max(s.abs()));
        assert!(left_peak > 0.4);
    }

    #[test]
    fn test_center_is_neutral() {
        let input = sine(44100, 0.05);
        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = ProcessCtx::new(44100, &mut rng);
        let out = Pan.process(&input, &ParamMap::new(), &mut ctx).unwrap();
        assert!((out.sample(100, 0) - input.sample(100, 0)).abs() < 1e-5);
    }

    #[test]
    fn test_mono_folds_channels() {
        let input = sine(44100, 0.05);
        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = ProcessCtx::new(44100, &mut rng);
        let mut params = ParamMap::new();
        params.set_bool("mono", true);
        let out = Pan.process(&input, &params, &mut ctx).unwrap();
        assert_eq!(out.channels(), 2);
        for i in (0..out.frames()).step_by(1000) {
            assert!((out.sample(i, 0) - out.sample(i, 1)).abs() < 1e-6);
        }
    }
}
