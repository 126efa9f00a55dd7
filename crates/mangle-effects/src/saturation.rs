//! Saturation — hard clip, soft clip, and overdrive in one effect.

use mangle_core::{
    AudioBuffer, Effect, EffectDescriptor, EffectError, EffectSection, ParamMap, ParamSpec,
    ParamUnit, ProcessCtx, TailPolicy,
};

const MODE: ParamSpec = ParamSpec::choice("type", "Type", &["hard", "soft", "overdrive"], 1);
const DRIVE: ParamSpec =
    ParamSpec::float("drive", "Drive", 0.5, 20.0, 3.0, 0.1, ParamUnit::None).automatable();
const TONE: ParamSpec =
    ParamSpec::float("tone", "Tone", 0.0, 1.0, 0.5, 0.01, ParamUnit::None);

static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    id: "saturation",
    name: "Saturation",
    short_name: "SAT",
    description: "Hard clip, warm tanh, or asymmetric overdrive",
    section: EffectSection::Distortion,
    tail: TailPolicy::None,
    params: &[MODE, DRIVE, TONE],
};

/// Unified saturation with three curves.
pub struct Saturation;

impl Effect for Saturation {
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
        let mut out = input.clone();

        match params.choice(&MODE) {
            "hard" => {
                let threshold = (1.0 / drive).max(0.05);
                for s in out.samples_mut() {
                    *s = s.clamp(-threshold, threshold) / threshold;
                }
            }
            "overdrive" => {
                // Asymmetric soft clip, then a moving-average tone stage.
                for s in out.samples_mut() {
                    let driven = *s * drive;
                    *s = if driven >= 0.0 {
                        driven.tanh()
                    } else {
                        (driven * 0.8).tanh() * 1.2
                    };
                }
                if tone < 0.5 {
                    let kernel = ((1.0 - tone) * 8.0) as usize + 1;
                    smooth_channels(&mut out, kernel);
                }
            }
            _ => {
                for s in out.samples_mut() {
                    *s = (*s * drive).tanh();
                }
            }
        }
        out.clamp_unit();
        Ok(out)
    }
}

/// Moving-average lowpass per channel (centered window).
fn smooth_channels(buf: &mut AudioBuffer, kernel: usize) {
    if kernel <= 1 {
        return;
    }
    let frames = buf.frames();
    let half = kernel / 2;
    for c in 0..buf.channels() {
        let src = buf.channel(c);
        for i in 0..frames {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(frames);
            let sum: f32 = src[lo..hi].iter().sum();
            buf.set_sample(i, c, sum / (hi - lo) as f32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{assert_contract, sine};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn run(mode: &str, drive: f32) -> (AudioBuffer, AudioBuffer) {
        let input = sine(44100, 0.1);
        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = ProcessCtx::new(44100, &mut rng);
        let mut params = ParamMap::new();
        params.set_text("type", mode);
        params.set("drive", drive);
        let out = Saturation.process(&input, &params, &mut ctx).unwrap();
        (input, out)
    }

    #[test]
    fn test_soft_saturates_toward_unity() {
        let (input, out) = run("soft", 10.0);
        assert_contract(&out, &input, "saturation/soft");
        assert!(out.peak() > 0.95);
    }

    #[test]
    fn test_hard_normalizes_to_threshold() {
        let (input, out) = run("hard", 5.0);
        assert_contract(&out, &input, "saturation/hard");
        assert!((out.peak() - 1.0).abs() < 0.05);
    }

    #[test]
    fn test_overdrive_bounded() {
        let (input, out) = run("overdrive", 20.0);
        assert_contract(&out, &input, "saturation/overdrive");
    }

    #[test]
    fn test_low_drive_nearly_linear() {
        let (input, out) = run("soft", 0.5);
        // tanh(x*0.5) ≈ x*0.5 for small x
        let mid = input.frames() / 2;
        let expected = (input.sample(mid, 0) * 0.5).tanh();
        assert!((out.sample(mid, 0) - expected).abs() < 1e-6);
    }
}
