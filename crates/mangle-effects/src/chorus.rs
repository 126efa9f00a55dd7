//! Chorus — modulated-delay voice doubling.

use mangle_core::{
    AudioBuffer, Effect, EffectDescriptor, EffectError, EffectSection, ParamMap, ParamSpec,
    ParamUnit, ProcessCtx, TailPolicy,
};
use std::f64::consts::PI;

const DEPTH_MS: ParamSpec =
    ParamSpec::float("depth_ms", "Depth", 0.1, 20.0, 5.0, 0.1, ParamUnit::Milliseconds)
        .automatable();
const RATE_HZ: ParamSpec =
    ParamSpec::float("rate_hz", "Rate", 0.1, 10.0, 1.5, 0.1, ParamUnit::Hertz).automatable();
const VOICES: ParamSpec = ParamSpec::int("voices", "Voices", 1, 8, 2);
const MIX: ParamSpec =
    ParamSpec::float("mix", "Mix", 0.0, 1.0, 0.5, 0.01, ParamUnit::None).automatable();

static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    id: "chorus",
    name: "Chorus",
    short_name: "CHOR",
    description: "Multi-voice modulated delay thickening",
    section: EffectSection::Modulation,
    tail: TailPolicy::None,
    params: &[DEPTH_MS, RATE_HZ, VOICES, MIX],
};

/// Voice-doubling chorus: each voice reads the signal through an
/// LFO-modulated delay, phases spread evenly across voices.
pub struct Chorus;

impl Effect for Chorus {
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
        let sr = f64::from(ctx.sample_rate);
        let depth_samples = f64::from(params.float(&DEPTH_MS)) * sr / 1000.0;
        let rate = f64::from(params.float(&RATE_HZ));
        let voices = params.int(&VOICES) as usize;
        let mix = params.float(&MIX);

        let mut planes: Vec<Vec<f32>> = Vec::with_capacity(input.channels());
        for c in 0..input.channels() {
            let dry = input.channel(c);
            let mut wet = dry.clone();
            for v in 0..voices {
                let phase = 2.0 * PI * v as f64 / voices.max(1) as f64;
                for i in 0..n {
                    let t = i as f64 / sr;
                    let delay =
                        (depth_samples * (1.0 + (2.0 * PI * rate * t + phase).sin()) / 2.0) as usize;
                    let idx = i.saturating_sub(delay);
                    wet[i] += dry[idx];
                }
            }
            let norm = 1.0 / (1 + voices) as f32;
            let plane: Vec<f32> = dry
                .iter()
                .zip(wet.iter())
                .map(|(&d, &w)| d * (1.0 - mix) + w * norm * mix)
                .collect();
            planes.push(plane);
        }
        let mut out = AudioBuffer::from_planar(&planes, input.sample_rate());
        out.clamp_unit();
        Ok(out)
    }
}
