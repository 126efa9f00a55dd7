//! Distortion — waveshaping with four algorithms and a one-pole tone stage.

use mangle_core::{
    AudioBuffer, Effect, EffectDescriptor, EffectError, EffectSection, ParamMap, ParamSpec,
    ParamUnit, ProcessCtx, TailPolicy,
};

const MODE: ParamSpec =
    ParamSpec::choice("mode", "Mode", &["tube", "fuzz", "digital", "scream"], 0);
const DRIVE: ParamSpec =
    ParamSpec::float("drive", "Drive", 0.5, 20.0, 5.0, 0.1, ParamUnit::None).automatable();
const TONE: ParamSpec =
    ParamSpec::float("tone", "Tone", 0.0, 1.0, 0.5, 0.01, ParamUnit::None).automatable();

static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    id: "distortion",
    name: "Distortion",
    short_name: "DIST",
    description: "Tube, fuzz, digital, or scream waveshaping",
    section: EffectSection::Distortion,
    tail: TailPolicy::None,
    params: &[MODE, DRIVE, TONE],
};

/// Multi-algorithm waveshaping distortion.
pub struct Distortion;

impl Effect for Distortion {
    fn descriptor(&self) -> &'static EffectDescriptor {
        &DESCRIPTOR
    }

    fn process(
        &self,
        input: &AudioBuffer,
        params: &ParamMap,
        _ctx: &mut ProcessCtx<'_>,
    ) -> Result<AudioBuffer, EffectError> {
        let drive = params.float(&DRIVE);
        let tone = params.float(&TONE);
        let mode = params.choice(&MODE);
        let mut out = input.clone();

        for s in out.samples_mut() {
            let x = f64::from(*s) * f64::from(drive);
            let shaped = match mode {
                "fuzz" => (x * 2.0).tanh() * (x + 0.001).signum(),
                "digital" => {
                    let clipped = x.clamp(-1.0, 1.0);
                    let steps = (16.0 / f64::from(drive)).max(2.0).floor();
                    (clipped * steps).round() / steps
                }
                "scream" => {
                    let t = (x * 3.0).tanh();
                    t.signum() * t.abs().powf(0.3)
                }
                // "tube"
                _ => x.signum() * (1.0 - (-x.abs()).exp()),
            };
            *s = shaped as f32;
        }

        // Tone: simple one-pole lowpass, per channel.
        if tone < 0.95 {
            let alpha = tone * 0.99;
            let channels = out.channels();
            let frames = out.frames();
            for c in 0..channels {
                let mut prev = out.sample(0, c);
                for i in 1..frames {
                    let cur = out.sample(i, c);
                    let filtered = alpha * prev + (1.0 - alpha) * cur;
                    out.set_sample(i, c, filtered);
                    prev = filtered;
                }
            }
        }
        out.clamp_unit();
        Ok(out)
    }
}
