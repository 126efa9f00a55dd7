//! Wave ondulée — sinusoidal pitch and volume wobble.

use mangle_core::{
    AudioBuffer, Effect, EffectDescriptor, EffectError, EffectSection, ParamMap, ParamSpec,
    ParamUnit, ProcessCtx, TailPolicy, micro_fade,
};
use std::f64::consts::PI;

const SPEED: ParamSpec =
    ParamSpec::float("speed", "Speed", 0.1, 15.0, 3.0, 0.1, ParamUnit::Hertz).automatable();
const PITCH_DEPTH: ParamSpec =
    ParamSpec::float("pitch_depth", "Pitch Depth", 0.0, 1.0, 0.4, 0.01, ParamUnit::None);
const VOL_DEPTH: ParamSpec =
    ParamSpec::float("vol_depth", "Volume Depth", 0.0, 1.0, 0.3, 0.01, ParamUnit::None);
const STEREO_OFFSET: ParamSpec = ParamSpec::toggle("stereo_offset", "Stereo Offset", true);

static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    id: "wave_ondulee",
    name: "Wave Ondulée",
    short_name: "WAVE",
    description: "LFO-driven pitch and volume undulation",
    section: EffectSection::PitchTime,
    tail: TailPolicy::None,
    params: &[SPEED, PITCH_DEPTH, VOL_DEPTH, STEREO_OFFSET],
};

/// Sinusoidal pitch/volume modulation with an optional stereo phase offset.
pub struct WaveOndulee;

impl Effect for WaveOndulee {
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
        if n < 2 {
            return Ok(input.clone());
        }
        let sr = f64::from(ctx.sample_rate);
        let speed = f64::from(params.float(&SPEED));
        let pitch_depth = params.float(&PITCH_DEPTH);
        let vol_depth = params.float(&VOL_DEPTH);
        let stereo_offset = params.flag(&STEREO_OFFSET);
        let is_stereo = input.channels() >= 2;

        let mut planes: Vec<Vec<f32>> = (0..input.channels())
            .map(|c| input.channel(c))
            .collect();

        // Volume modulation, with the right channel phase-shifted when asked.
        for (c, plane) in planes.iter_mut().enumerate() {
            let phase = if is_stereo && stereo_offset && c == 1 {
                PI * 0.4
            } else {
                0.0
            };
            for (i, s) in plane.iter_mut().enumerate() {
                let t = i as f64 / sr;
                let wave = (2.0 * PI * speed * t + phase).sin() as f32;
                let env = 1.0 - vol_depth * 0.5 * (1.0 + wave);
                *s *= env;
            }
        }

        // Pitch modulation via variable-rate read of a cumulative index.
        if pitch_depth > 0.01 {
            let max_shift = f64::from(pitch_depth) * 0.15;
            let mut read_idx = Vec::with_capacity(n);
            let mut acc = 0.0f64;
            for i in 0..n {
                let t = i as f64 / sr;
                acc += 1.0 + max_shift * (2.0 * PI * speed * 0.5 * t).sin();
                read_idx.push(acc);
            }
            let last = read_idx[n - 1];
            for idx in &mut read_idx {
                *idx = *idx / last * (n - 1) as f64;
            }
            for plane in &mut planes {
                let src = plane.clone();
                for (i, s) in plane.iter_mut().enumerate() {
                    let pos = read_idx[i];
                    let i0 = pos.floor() as usize;
                    let i1 = (i0 + 1).min(n - 1);
                    let frac = (pos - i0 as f64) as f32;
                    *s = src[i0] * (1.0 - frac) + src[i1] * frac;
                }
            }
        }

        let mut out = micro_fade(
            &AudioBuffer::from_planar(&planes, input.sample_rate()),
            64,
        );
        out.clamp_unit();
        Ok(out)
    }
}
