//! Delay — feedback echo whose tail reaches past the selection.
//!
//! The effect returns the selection plus an echo tail. The render pipeline
//! mixes that tail *over* whatever follows the selection on the timeline
//! (descriptor tail policy [`TailPolicy::MixOver`]) and only lengthens the
//! project when the tail outruns the remaining audio, so echoes blend into
//! the music instead of pushing it away.

use mangle_core::{
    AudioBuffer, Effect, EffectDescriptor, EffectError, EffectSection, ParamMap, ParamSpec,
    ParamUnit, ProcessCtx, TailPolicy,
};

const DELAY_MS: ParamSpec =
    ParamSpec::float("delay_ms", "Delay", 10.0, 2000.0, 300.0, 10.0, ParamUnit::Milliseconds)
        .automatable();
const FEEDBACK: ParamSpec =
    ParamSpec::float("feedback", "Feedback", 0.0, 0.95, 0.4, 0.05, ParamUnit::None).automatable();
const MIX: ParamSpec =
    ParamSpec::float("mix", "Mix", 0.0, 1.0, 0.5, 0.01, ParamUnit::None).automatable();

/// Echoes quieter than this are considered silent (-60 dBFS).
const TAIL_THRESHOLD: f32 = 0.001;
/// Hard cap on the number of echoes regardless of feedback.
const MAX_ECHOES: usize = 30;

static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    id: "delay",
    name: "Delay",
    short_name: "DLY",
    description: "Feedback echo, tail mixed over the following audio",
    section: EffectSection::SpaceTexture,
    tail: TailPolicy::MixOver,
    params: &[DELAY_MS, FEEDBACK, MIX],
};

/// Feedback delay over the selection.
pub struct Delay;

impl Effect for Delay {
    fn descriptor(&self) -> &'static EffectDescriptor {
        &DESCRIPTOR
    }

    fn process(
        &self,
        input: &AudioBuffer,
        params: &ParamMap,
        ctx: &mut ProcessCtx<'_>,
    ) -> Result<AudioBuffer, EffectError> {
        let seg_len = input.frames();
        if seg_len == 0 {
            return Ok(input.clone());
        }
        let sr = ctx.sample_rate as f32;
        let delay_samples = ((params.float(&DELAY_MS) * sr / 1000.0) as usize).max(1);
        let feedback = params.float(&FEEDBACK);
        let mix = params.float(&MIX);

        // Echoes audible above 1%: ceil(ln 0.01 / ln feedback), capped.
        let n_echoes = ((0.01f32.ln() / feedback.max(0.01).ln()).ceil() as usize).min(MAX_ECHOES);
        let tail_samples = n_echoes * delay_samples;
        let echo_len = seg_len + tail_samples;
        let channels = input.channels();

        // Dry signal followed by attenuated copies at each echo offset.
        let mut echo_buf = AudioBuffer::zeroed(echo_len, channels, input.sample_rate());
        echo_buf.samples_mut()[..seg_len * channels].copy_from_slice(input.samples());
        for i in 1..=n_echoes {
            let gain = feedback.powi(i as i32);
            if gain < 0.01 {
                break;
            }
            let offset = i * delay_samples;
            let mut copy = input.clone();
            copy.scale(gain);
            echo_buf.mix_add(&copy, offset);
        }

        // Wet/dry blend: dry exists only over the selection span.
        let mut wet = echo_buf;
        for frame in 0..echo_len {
            for c in 0..channels {
                let dry = if frame < seg_len {
                    input.sample(frame, c)
                } else {
                    0.0
                };
                let echoed = wet.sample(frame, c);
                wet.set_sample(frame, c, dry * (1.0 - mix) + echoed * mix);
            }
        }

        // Trim trailing silence below -60 dBFS, keeping a 0.25 s margin.
        let mut last_loud = None;
        for frame in (0..echo_len).rev() {
            let loud = (0..channels).any(|c| wet.sample(frame, c).abs() > TAIL_THRESHOLD);
            if loud {
                last_loud = Some(frame);
                break;
            }
        }
        let trim_end = match last_loud {
            Some(frame) => (frame + ctx.sample_rate as usize / 4).min(echo_len),
            None => seg_len,
        };
        let mut out = wet.segment(0, trim_end.max(seg_len));
        out.clamp_unit();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Impulse train over the whole selection.
    fn impulses(sr: u32, secs: f32) -> AudioBuffer {
        let n = (sr as f32 * secs) as usize;
        let mut data = vec![0.0f32; n];
        for i in (0..n).step_by(1000) {
            data[i] = 1.0;
        }
        AudioBuffer::from_mono(data, sr)
    }

    #[test]
    fn test_tail_length_matches_echo_count() {
        let sr = 44100;
        let input = impulses(sr, 0.2);
        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = ProcessCtx::new(sr, &mut rng);
        let mut params = ParamMap::new();
        params.set("delay_ms", 300.0);
        params.set("feedback", 0.6);
        params.set("mix", 0.5);
        let out = Delay.process(&input, &params, &mut ctx).unwrap();

        // ceil(ln 0.01 / ln 0.6) = 10 echoes
        let delay_samples = (300.0 * sr as f32 / 1000.0) as usize;
        let expected = input.frames() + 10 * delay_samples;
        assert_eq!(out.frames(), expected);
        assert!(!out.has_non_finite());
        assert!(out.peak() <= 1.0 + 1e-6);
    }

    #[test]
    fn test_last_echo_amplitude() {
        let sr = 44100;
        let n = 4410;
        let mut data = vec![0.0f32; n];
        data[0] = 1.0;
        let input = AudioBuffer::from_mono(data, sr);

        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = ProcessCtx::new(sr, &mut rng);
        let mut params = ParamMap::new();
        params.set("delay_ms", 300.0);
        params.set("feedback", 0.6);
        params.set("mix", 0.5);
        let out = Delay.process(&input, &params, &mut ctx).unwrap();

        let delay_samples = (300.0 * sr as f32 / 1000.0) as usize;
        let last_echo = out.sample(10 * delay_samples, 0);
        let expected = 0.6f32.powi(10) * 0.5;
        assert!(
            (last_echo - expected).abs() < 1e-4,
            "last echo {last_echo}, expected {expected}"
        );
    }

    #[test]
    fn test_zero_feedback_single_echo() {
        let sr = 44100;
        let input = impulses(sr, 0.1);
        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = ProcessCtx::new(sr, &mut rng);
        let mut params = ParamMap::new();
        params.set("feedback", 0.0);
        let out = Delay.process(&input, &params, &mut ctx).unwrap();
        // feedback floor 0.01 yields a single echo slot, but gain 0.01^1 is
        // at the break threshold — the output never shrinks below the input.
        assert!(out.frames() >= input.frames());
    }

    #[test]
    fn test_dry_selection_portion_blended() {
        let sr = 44100;
        let n = 2000;
        let mut data = vec![0.0f32; n];
        data[100] = 0.8;
        let input = AudioBuffer::from_mono(data, sr);

        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = ProcessCtx::new(sr, &mut rng);
        let mut params = ParamMap::new();
        params.set("delay_ms", 10.0);
        params.set("feedback", 0.5);
        params.set("mix", 0.5);
        let out = Delay.process(&input, &params, &mut ctx).unwrap();
        // Dry impulse at its original position, at (1-mix)+mix weight = 1.0×dry
        // only when echoes don't land there; first echo is 441 frames later.
        assert!((out.sample(100, 0) - 0.8).abs() < 1e-4);
    }
}
