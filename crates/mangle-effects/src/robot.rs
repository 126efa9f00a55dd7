//! Robot — micro-grain resynthesis with monotone carrier and metallic ring.

use mangle_core::{
    AudioBuffer, Effect, EffectDescriptor, EffectError, EffectSection, ParamMap, ParamSpec,
    ParamUnit, ProcessCtx, TailPolicy, hann_window, micro_fade,
};
use std::f64::consts::PI;

const GRAIN_MS: ParamSpec =
    ParamSpec::float("grain_ms", "Grain", 3.0, 30.0, 8.0, 0.5, ParamUnit::Milliseconds);
const ROBOT_AMOUNT: ParamSpec =
    ParamSpec::float("robot_amount", "Amount", 0.0, 1.0, 0.7, 0.01, ParamUnit::None);
const METALLIC: ParamSpec =
    ParamSpec::float("metallic", "Metallic", 0.0, 1.0, 0.4, 0.01, ParamUnit::None);
const MONOTONE: ParamSpec =
    ParamSpec::float("monotone", "Monotone", 0.0, 1.0, 0.0, 0.01, ParamUnit::None);
const PITCH_HZ: ParamSpec =
    ParamSpec::float("pitch_hz", "Pitch", 50.0, 500.0, 150.0, 1.0, ParamUnit::Hertz);

static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    id: "robot",
    name: "Robot",
    short_name: "ROBO",
    description: "Granular robotic voice with metallic resonance",
    section: EffectSection::SpaceTexture,
    tail: TailPolicy::None,
    params: &[GRAIN_MS, ROBOT_AMOUNT, METALLIC, MONOTONE, PITCH_HZ],
};

/// Robotic voice processing via windowed grain resynthesis.
pub struct Robot;

impl Effect for Robot {
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
        if n < 64 {
            return Ok(input.clone());
        }
        let sr = f64::from(ctx.sample_rate);
        let grain_ms = params.float(&GRAIN_MS);
        let amount = params.float(&ROBOT_AMOUNT);
        let metallic = params.float(&METALLIC);
        let monotone = params.float(&MONOTONE);
        let pitch_hz = f64::from(params.float(&PITCH_HZ));

        let grain_size = ((f64::from(grain_ms) / 1000.0 * sr) as usize).clamp(16, n);
        let hop = (grain_size / 2).max(1);
        let window = hann_window(grain_size);

        let mut planes: Vec<Vec<f32>> = Vec::with_capacity(input.channels());
        for c in 0..input.channels() {
            let dry = input.channel(c);

            // 1. Micro-grain overlap-add resynthesis
            let mut output = vec![0.0f32; n];
            let mut weight = vec![0.0f32; n];
            let mut i = 0;
            while i + grain_size < n {
                for (k, &w) in window.iter().enumerate() {
                    output[i + k] += dry[i + k] * w;
                    weight[i + k] += w;
                }
                i += hop;
            }
            let mut wet: Vec<f32> = output
                .iter()
                .zip(weight.iter())
                .map(|(&o, &w)| o / w.max(1e-8))
                .collect();

            // 2. Monotone pitch flattening: smoothed envelope on a fixed carrier
            if monotone > 0.1 {
                let kernel = ((sr * 0.005) as usize).max(1);
                let mut env = vec![0.0f32; n];
                let mut acc = 0.0f32;
                for (k, &s) in wet.iter().enumerate() {
                    acc += s.abs();
                    if k >= kernel {
                        acc -= wet[k - kernel].abs();
                    }
                    env[k] = acc / kernel as f32;
                }
                for (k, s) in wet.iter_mut().enumerate() {
                    let carrier = (2.0 * PI * pitch_hz * (k as f64 / sr)).sin() as f32;
                    *s = *s * (1.0 - monotone) + env[k] * carrier * monotone;
                }
            }

            // 3. Metallic ring modulation with harmonically related partials
            if metallic > 0.01 {
                for (k, s) in wet.iter_mut().enumerate() {
                    let t = k as f64 / sr;
                    let ring = (0.5 * (2.0 * PI * 180.0 * t).sin()
                        + 0.3 * (2.0 * PI * 320.0 * t).sin()
                        + 0.2 * (2.0 * PI * 520.0 * t).sin()) as f32;
                    *s = *s * (1.0 - metallic) + *s * ring * metallic;
                }
            }

            // Dry/wet blend
            let plane: Vec<f32> = dry
                .iter()
                .zip(wet.iter())
                .map(|(&d, &w)| d * (1.0 - amount) + w * amount)
                .collect();
            planes.push(plane);
        }

        let mut out = micro_fade(&AudioBuffer::from_planar(&planes, input.sample_rate()), 128);
        out.clamp_unit();
        Ok(out)
    }
}
