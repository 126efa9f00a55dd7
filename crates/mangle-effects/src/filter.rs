//! Resonant filter — lowpass, highpass, or bandpass biquad per channel.

use mangle_core::{
    AudioBuffer, Biquad, Effect, EffectDescriptor, EffectError, EffectSection, ParamMap,
    ParamSpec, ParamUnit, ProcessCtx, TailPolicy, bandpass_coefficients, highpass_coefficients,
    lowpass_coefficients,
};

const FILTER_TYPE: ParamSpec =
    ParamSpec::choice("filter_type", "Type", &["lowpass", "highpass", "bandpass"], 0);
const CUTOFF_HZ: ParamSpec =
    ParamSpec::float("cutoff_hz", "Cutoff", 20.0, 20000.0, 1000.0, 10.0, ParamUnit::Hertz)
        .automatable();
const RESONANCE: ParamSpec =
    ParamSpec::float("resonance", "Resonance", 0.1, 20.0, 1.0, 0.1, ParamUnit::None)
        .automatable();

static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    id: "filter",
    name: "Filter",
    short_name: "FILT",
    description: "Resonant biquad filter (lowpass, highpass, bandpass)",
    section: EffectSection::Basics,
    tail: TailPolicy::None,
    params: &[FILTER_TYPE, CUTOFF_HZ, RESONANCE],
};

/// Resonant biquad filter applied channel by channel.
pub struct Filter;

impl Effect for Filter {
    fn descriptor(&self) -> &'static EffectDescriptor {
        &DESCRIPTOR
    }

    fn process(
        &self,
        input: &AudioBuffer,
        params: &ParamMap,
        ctx: &mut ProcessCtx<'_>,
    ) -> Result<AudioBuffer, EffectError> {
        let sr = ctx.sample_rate as f32;
        // Keep the cutoff below Nyquist so the coefficients stay stable.
        let cutoff = params.float(&CUTOFF_HZ).min(sr * 0.45);
        let q = params.float(&RESONANCE);
        let coeffs = match params.choice(&FILTER_TYPE) {
            "highpass" => highpass_coefficients(cutoff, q, sr),
            "bandpass" => bandpass_coefficients(cutoff, q, sr),
            _ => lowpass_coefficients(cutoff, q, sr),
        };

        let mut planes = Vec::with_capacity(input.channels());
        for c in 0..input.channels() {
            let mut biquad = Biquad::new();
            biquad.set_coefficients(coeffs.0, coeffs.1, coeffs.2, coeffs.3, coeffs.4, coeffs.5);
            let plane: Vec<f32> = input
                .channel(c)
                .into_iter()
                .map(|s| biquad.process(s))
                .collect();
            planes.push(plane);
        }
        let mut out = AudioBuffer::from_planar(&planes, input.sample_rate());
        out.clamp_unit();
        Ok(out)
    }
}
