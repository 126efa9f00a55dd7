//! Ring modulator — multiply by a carrier sine for metallic sidebands.

use mangle_core::{
    AudioBuffer, Effect, EffectDescriptor, EffectError, EffectSection, ParamMap, ParamSpec,
    ParamUnit, ProcessCtx, TailPolicy,
};
use std::f64::consts::PI;

const FREQUENCY: ParamSpec =
    ParamSpec::float("frequency", "Frequency", 20.0, 5000.0, 440.0, 1.0, ParamUnit::Hertz)
        .automatable();
const MIX: ParamSpec =
    ParamSpec::float("mix", "Mix", 0.0, 1.0, 0.5, 0.01, ParamUnit::None).automatable();

static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    id: "ring_mod",
    name: "Ring Mod",
    short_name: "RING",
    description: "Carrier multiplication for bell-like sidebands",
    section: EffectSection::Modulation,
    tail: TailPolicy::None,
    params: &[FREQUENCY, MIX],
};

/// Classic ring modulation against a sine carrier.
pub struct RingMod;

impl Effect for RingMod {
    fn descriptor(&self) -> &'static EffectDescriptor {
        &DESCRIPTOR
    }

    fn process(
        &self,
        input: &AudioBuffer,
        params: &ParamMap,
        ctx: &mut ProcessCtx<'_>,
    ) -> Result<AudioBuffer, EffectError> {
        let sr = f64::from(ctx.sample_rate);
        let freq = f64::from(params.float(&FREQUENCY));
        let mix = params.float(&MIX);
        let mut out = input.clone();

        let frames = out.frames();
        for i in 0..frames {
            let carrier = (2.0 * PI * freq * (i as f64 / sr)).sin() as f32;
            for c in 0..out.channels() {
                let dry = out.sample(i, c);
                out.set_sample(i, c, dry * (1.0 - mix) + dry * carrier * mix);
            }
        }
        out.clamp_unit();
        Ok(out)
    }
}
