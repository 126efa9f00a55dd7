//! Phaser — cascaded first-order allpass filters swept by an LFO.
//!
//! The classic topology:
//!
//! ```text
//! input ──(+ fb)──▶ AP1 → AP2 → … → APn ──▶ output
//!          ↑                                  │
//!          └──────── feedback × gain ─────────┘
//! ```
//!
//! Processing is sample-by-sample because of the feedback path. Stereo uses
//! a 90° LFO phase offset between channels.

use mangle_core::{
    AudioBuffer, Effect, EffectDescriptor, EffectError, EffectSection, ParamMap, ParamSpec,
    ParamUnit, ProcessCtx, TailPolicy,
};
use std::f64::consts::PI;

const RATE_HZ: ParamSpec =
    ParamSpec::float("rate_hz", "Rate", 0.05, 5.0, 0.5, 0.05, ParamUnit::Hertz).automatable();
const DEPTH: ParamSpec =
    ParamSpec::float("depth", "Depth", 0.0, 1.0, 0.7, 0.01, ParamUnit::None).automatable();
const STAGES: ParamSpec = ParamSpec::int("stages", "Stages", 1, 12, 4);
const FEEDBACK: ParamSpec =
    ParamSpec::float("feedback", "Feedback", 0.0, 0.95, 0.0, 0.05, ParamUnit::None);
const MIX: ParamSpec =
    ParamSpec::float("mix", "Mix", 0.0, 1.0, 0.7, 0.01, ParamUnit::None).automatable();

const MAX_STAGES: usize = 12;

static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    id: "phaser",
    name: "Phaser",
    short_name: "PHAS",
    description: "Multi-stage allpass phaser with LFO and feedback",
    section: EffectSection::Modulation,
    tail: TailPolicy::None,
    params: &[RATE_HZ, DEPTH, STAGES, FEEDBACK, MIX],
};

/// LFO-swept allpass cascade with feedback.
pub struct Phaser;

impl Effect for Phaser {
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
        let rate = f64::from(params.float(&RATE_HZ));
        let depth = f64::from(params.float(&DEPTH));
        let stages = (params.int(&STAGES) as usize).clamp(1, MAX_STAGES);
        let feedback = f64::from(params.float(&FEEDBACK));
        let mix = params.float(&MIX);

        // Sweep range: 100 Hz up to 4 kHz, kept clear of Nyquist.
        let min_freq = 100.0f64;
        let max_freq = 4000.0f64.min(sr / 2.0 - 200.0);

        let mut planes: Vec<Vec<f32>> = Vec::with_capacity(input.channels());
        for c in 0..input.channels() {
            let dry = input.channel(c);
            // 90° LFO phase offset on the second channel
            let phase_offset = c as f64 * (PI * 0.5);

            let mut ap_state = [0.0f64; MAX_STAGES];
            let mut fb_sample = 0.0f64;
            let mut wet = vec![0.0f32; n];

            for i in 0..n {
                let t = i as f64 / sr;
                let lfo = 0.5 * (1.0 + (2.0 * PI * rate * t + phase_offset).sin());
                let freq = (min_freq + (max_freq - min_freq) * depth * lfo)
                    .clamp(20.0, sr / 2.0 - 100.0);
                let tan_w = (PI * freq / sr).tan();
                let a = (tan_w - 1.0) / (tan_w + 1.0);

                let inp = f64::from(dry[i]) + fb_sample * feedback;

                // First-order allpass cascade, state form:
                // y[n] = a*x[n] + state;  state' = x[n] - a*y[n]
                let mut sample = inp;
                for stage in ap_state.iter_mut().take(stages) {
                    let ap_out = a * sample + *stage;
                    *stage = sample - a * ap_out;
                    sample = ap_out;
                }

                fb_sample = sample;
                wet[i] = sample as f32;
            }

            let plane: Vec<f32> = dry
                .iter()
                .zip(wet.iter())
                .map(|(&d, &w)| d * (1.0 - mix) + w * mix)
                .collect();
            planes.push(plane);
        }
        let mut out = AudioBuffer::from_planar(&planes, input.sample_rate());
        out.clamp_unit();
        Ok(out)
    }
}
