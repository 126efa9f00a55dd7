//! Pitch shift — resample-based pitch change.
//!
//! Two modes: the corrected mode resamples then stretches back so the
//! duration is preserved, and the `simple` mode keeps the resampled length
//! for the classic chipmunk/slowdown glitch (the selection then grows or
//! shrinks on the timeline).

use mangle_core::{
    AudioBuffer, Effect, EffectDescriptor, EffectError, EffectSection, ParamMap, ParamSpec,
    ParamUnit, ProcessCtx, TailPolicy, micro_fade,
};

const SEMITONES: ParamSpec =
    ParamSpec::float("semitones", "Semitones", -24.0, 24.0, 0.0, 0.5, ParamUnit::Semitones)
        .automatable();
const SIMPLE: ParamSpec = ParamSpec::toggle("simple", "Simple (length change)", false);

static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    id: "pitch_shift",
    name: "Pitch Shift",
    short_name: "PTCH",
    description: "Resampling pitch shift, duration-corrected or raw",
    section: EffectSection::PitchTime,
    tail: TailPolicy::Insert,
    params: &[SEMITONES, SIMPLE],
};

/// Resampling pitch shift.
pub struct PitchShift;

impl Effect for PitchShift {
    fn descriptor(&self) -> &'static EffectDescriptor {
        &DESCRIPTOR
    }

    fn process(
        &self,
        input: &AudioBuffer,
        params: &ParamMap,
        _ctx: &mut ProcessCtx<'_>,
    ) -> Result<AudioBuffer, EffectError> {
        let semitones = params.float(&SEMITONES);
        let simple = params.flag(&SIMPLE);
        let frames = input.frames();
        if frames == 0 {
            return Ok(input.clone());
        }

        let factor = 2.0f64.powf(f64::from(semitones) / 12.0);
        let new_len = ((frames as f64) / factor) as usize;
        if new_len < 2 {
            return Ok(input.clone());
        }

        let shifted = input.resampled(new_len);
        let result = if simple {
            shifted
        } else {
            shifted.resampled(frames)
        };
        let mut out = micro_fade(&result, 64);
        out.clamp_unit();
        Ok(out)
    }
}
