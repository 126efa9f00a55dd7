//! The effect seam.
//!
//! Every effect in the editor is a pure transformation of a selection: it
//! receives the selected frames as an [`AudioBuffer`], a [`ParamMap`], and a
//! [`ProcessCtx`], and returns a fresh buffer. Effects never mutate their
//! input and never touch global state — randomized effects draw from the
//! context RNG so a seeded render is bit-reproducible.
//!
//! Effects are discovered through a compile-time registry (see the registry
//! crate); each one exposes a static [`EffectDescriptor`] naming its id,
//! display grouping, tail behavior, and parameter schema.

use crate::buffer::AudioBuffer;
use crate::param::{ParamMap, ParamSpec};
use rand::rngs::StdRng;
use thiserror::Error;

/// Display grouping for effects. Has no semantic consequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectSection {
    /// Gain, filter, pan, reverse.
    Basics,
    /// Pitch shift, time stretch, tape stop, autotune, wave ondulée.
    PitchTime,
    /// Saturation, distortion, bitcrusher.
    Distortion,
    /// Chorus, phaser, tremolo, ring mod.
    Modulation,
    /// Delay, vinyl, OTT, robot, digital noise.
    SpaceTexture,
    /// Stutter, granular, shuffle, buffer freeze, datamosh.
    Glitch,
}

impl EffectSection {
    /// Human-readable section name.
    pub const fn name(&self) -> &'static str {
        match self {
            EffectSection::Basics => "Basics",
            EffectSection::PitchTime => "Pitch & Time",
            EffectSection::Distortion => "Distortion",
            EffectSection::Modulation => "Modulation",
            EffectSection::SpaceTexture => "Space & Texture",
            EffectSection::Glitch => "Glitch",
        }
    }
}

/// What the render pipeline does when an effect returns a buffer whose
/// length differs from the selection it was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailPolicy {
    /// Output must match the selection length; mismatches are dropped.
    None,
    /// Output replaces the selection, shifting everything after it.
    Insert,
    /// Output up to the selection length replaces the selection; the excess
    /// is mixed over the audio that follows and only extends the buffer if
    /// it outruns it.
    MixOver,
}

/// Static metadata for one effect.
#[derive(Debug, Clone, Copy)]
pub struct EffectDescriptor {
    /// Stable identifier (lowercase, no spaces).
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Short display name for compact UI.
    pub short_name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Display section.
    pub section: EffectSection,
    /// Length-change handling.
    pub tail: TailPolicy,
    /// Parameter schema.
    pub params: &'static [ParamSpec],
}

impl EffectDescriptor {
    /// Look up a parameter spec by key.
    pub fn param(&self, key: &str) -> Option<&'static ParamSpec> {
        self.params.iter().find(|p| p.key == key)
    }

    /// Parameters the automation engine may drive.
    pub fn automatable_params(&self) -> impl Iterator<Item = &'static ParamSpec> {
        self.params.iter().filter(|p| p.automatable)
    }
}

/// Per-render context handed to effects.
pub struct ProcessCtx<'a> {
    /// Project sample rate in Hz.
    pub sample_rate: u32,
    /// Seedable RNG for randomized effects.
    pub rng: &'a mut StdRng,
}

impl<'a> ProcessCtx<'a> {
    /// Build a context.
    pub fn new(sample_rate: u32, rng: &'a mut StdRng) -> Self {
        Self { sample_rate, rng }
    }
}

/// Errors an effect can surface.
///
/// These are rare by design — effects degrade gracefully (a too-short
/// selection comes back unchanged) — but the automation engine needs a typed
/// failure to absorb per chunk.
#[derive(Debug, Error)]
pub enum EffectError {
    /// A parameter value could not be used even after clamping.
    #[error("invalid parameter '{key}': {reason}")]
    InvalidParam {
        /// Parameter key.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
    /// The effect produced a buffer that violates its contract.
    #[error("effect produced invalid output: {0}")]
    InvalidOutput(&'static str),
}

/// A parametric buffer effect.
///
/// Implementations must uphold the processing contract:
///
/// - never mutate `input`; always return a fresh buffer
/// - output contains no NaN or infinity and is clamped to [-1, 1]
/// - output length equals input length unless the descriptor declares a
///   tail policy other than [`TailPolicy::None`]
/// - channel count is preserved
pub trait Effect: Send + Sync {
    /// Static metadata: id, section, tail policy, parameter schema.
    fn descriptor(&self) -> &'static EffectDescriptor;

    /// Render the selection into a fresh buffer.
    fn process(
        &self,
        input: &AudioBuffer,
        params: &ParamMap,
        ctx: &mut ProcessCtx<'_>,
    ) -> Result<AudioBuffer, EffectError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::ParamUnit;
    use rand::SeedableRng;

    const GAIN: ParamSpec =
        ParamSpec::float("gain_pct", "Gain", 0.0, 1000.0, 100.0, 1.0, ParamUnit::Percent)
            .automatable();

    static TEST_DESC: EffectDescriptor = EffectDescriptor {
        id: "test_gain",
        name: "Test Gain",
        short_name: "GAIN",
        description: "scales the selection",
        section: EffectSection::Basics,
        tail: TailPolicy::None,
        params: &[GAIN],
    };

    struct TestGain;

    impl Effect for TestGain {
        fn descriptor(&self) -> &'static EffectDescriptor {
            &TEST_DESC
        }

        fn process(
            &self,
            input: &AudioBuffer,
            params: &ParamMap,
            _ctx: &mut ProcessCtx<'_>,
        ) -> Result<AudioBuffer, EffectError> {
            let mut out = input.clone();
            out.scale(params.float(&GAIN) / 100.0);
            out.clamp_unit();
            Ok(out)
        }
    }

    #[test]
    fn test_effect_trait_object() {
        let fx: Box<dyn Effect> = Box::new(TestGain);
        let mut rng = StdRng::seed_from_u64(0);
        let mut ctx = ProcessCtx::new(44100, &mut rng);
        let input = AudioBuffer::from_mono(vec![0.5; 8], 44100);
        let mut params = ParamMap::new();
        params.set("gain_pct", 50.0);
        let out = fx.process(&input, &params, &mut ctx).unwrap();
        assert!((out.sample(0, 0) - 0.25).abs() < 1e-6);
        // Input untouched
        assert_eq!(input.sample(0, 0), 0.5);
    }

    #[test]
    fn test_descriptor_param_lookup() {
        assert!(TEST_DESC.param("gain_pct").is_some());
        assert!(TEST_DESC.param("nope").is_none());
        assert_eq!(TEST_DESC.automatable_params().count(), 1);
    }
}
