//! Volume / gain — adjust loudness from 0% to 1000%.

use mangle_core::{
    AudioBuffer, Effect, EffectDescriptor, EffectError, EffectSection, ParamMap, ParamSpec,
    ParamUnit, ProcessCtx, TailPolicy,
};

const GAIN_PCT: ParamSpec =
    ParamSpec::float("gain_pct", "Gain", 0.0, 1000.0, 100.0, 1.0, ParamUnit::Percent)
        .automatable();

static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    id: "volume",
    name: "Volume",
    short_name: "VOL",
    description: "Gain adjustment with hard clip at unity",
    section: EffectSection::Basics,
    tail: TailPolicy::None,
    params: &[GAIN_PCT],
};

/// Gain scaling of the selection, clipped to [-1, 1].
pub struct Volume;

impl Effect for Volume {
    fn descriptor(&self) -> &'static EffectDescriptor {
        &DESCRIPTOR
    }

    fn process(
        &self,
        input: &AudioBuffer,
        params: &ParamMap,
        _ctx: &mut ProcessCtx<'_>,
    ) -> Result<AudioBuffer, EffectError> {
        let gain = params.float(&GAIN_PCT) / 100.0;
        let mut out = input.clone();
        out.scale(gain);
        out.clamp_unit();
        Ok(out)
    }
}
