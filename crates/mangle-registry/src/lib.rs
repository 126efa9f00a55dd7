//! Effect registry for mangle audio effects.
//!
//! A compile-time table of every built-in effect, replacing the dynamic
//! module scanning a plugin system would do. The registry resolves effect
//! ids to [`Effect`] implementations, lists effects by display section, and
//! exposes each effect's parameter schema for UIs and the automation engine.
//!
//! # Example
//!
//! ```rust
//! use mangle_registry::EffectRegistry;
//!
//! let registry = EffectRegistry::new();
//! for desc in registry.all_descriptors() {
//!     println!("{}: {}", desc.id, desc.description);
//! }
//! assert!(registry.get("delay").is_some());
//! ```

use mangle_core::{Effect, EffectDescriptor, EffectSection, ParamSpec};
use mangle_effects::{
    Autotune, Bitcrusher, BufferFreeze, Chorus, Datamosh, Delay, DigitalNoise, Distortion,
    Filter, Granular, Ott, Pan, Phaser, PitchShift, Reverse, RingMod, Robot, Saturation,
    Shuffle, Stutter, TapeStop, TimeStretch, Tremolo, Vinyl, Volume, WaveOndulee,
};

/// All display sections in their canonical order.
pub const SECTIONS: [EffectSection; 6] = [
    EffectSection::Basics,
    EffectSection::PitchTime,
    EffectSection::Distortion,
    EffectSection::Modulation,
    EffectSection::SpaceTexture,
    EffectSection::Glitch,
];

/// Registry of all built-in effects.
pub struct EffectRegistry {
    entries: Vec<Box<dyn Effect>>,
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectRegistry {
    /// Build the registry with every built-in effect registered.
    pub fn new() -> Self {
        let entries: Vec<Box<dyn Effect>> = vec![
            // Basics
            Box::new(Volume),
            Box::new(Filter),
            Box::new(Pan),
            Box::new(Reverse),
            // Pitch & Time
            Box::new(PitchShift),
            Box::new(TimeStretch),
            Box::new(TapeStop),
            Box::new(WaveOndulee),
            Box::new(Autotune),
            // Distortion
            Box::new(Saturation),
            Box::new(Distortion),
            Box::new(Bitcrusher),
            // Modulation
            Box::new(Chorus),
            Box::new(Phaser),
            Box::new(Tremolo),
            Box::new(RingMod),
            // Space & Texture
            Box::new(Delay),
            Box::new(Vinyl),
            Box::new(Ott),
            Box::new(Robot),
            Box::new(DigitalNoise),
            // Glitch
            Box::new(Stutter),
            Box::new(Granular),
            Box::new(Shuffle),
            Box::new(BufferFreeze),
            Box::new(Datamosh),
        ];
        Self { entries }
    }

    /// Resolve an effect by id.
    pub fn get(&self, id: &str) -> Option<&dyn Effect> {
        self.entries
            .iter()
            .find(|e| e.descriptor().id == id)
            .map(|e| &**e)
    }

    /// Descriptor lookup by id.
    pub fn descriptor(&self, id: &str) -> Option<&'static EffectDescriptor> {
        self.get(id).map(Effect::descriptor)
    }

    /// Descriptors for every registered effect, registration order.
    pub fn all_descriptors(&self) -> Vec<&'static EffectDescriptor> {
        self.entries.iter().map(|e| e.descriptor()).collect()
    }

    /// Descriptors for one display section.
    pub fn descriptors_in_section(&self, section: EffectSection) -> Vec<&'static EffectDescriptor> {
        self.entries
            .iter()
            .map(|e| e.descriptor())
            .filter(|d| d.section == section)
            .collect()
    }

    /// Parameters of `effect_id` the automation engine may drive.
    pub fn automatable_params(&self, effect_id: &str) -> Vec<&'static ParamSpec> {
        self.descriptor(effect_id)
            .map(|d| d.automatable_params().collect())
            .unwrap_or_default()
    }

    /// Number of registered effects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no effects are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mangle_core::{AudioBuffer, ParamMap, ProcessCtx, TailPolicy};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_registry_has_full_roster() {
        let registry = EffectRegistry::new();
        assert_eq!(registry.len(), 26);
        for id in [
            "volume", "filter", "pan", "reverse", "pitch_shift", "time_stretch", "tape_stop",
            "wave_ondulee", "autotune", "saturation", "distortion", "bitcrusher", "chorus",
            "phaser", "tremolo", "ring_mod", "delay", "vinyl", "ott", "robot", "digital_noise",
            "stutter", "granular", "shuffle", "buffer_freeze", "datamosh",
        ] {
            assert!(registry.get(id).is_some(), "missing effect: {id}");
        }
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_descriptor_ids_match_registration() {
        let registry = EffectRegistry::new();
        for desc in registry.all_descriptors() {
            assert_eq!(registry.descriptor(desc.id).unwrap().id, desc.id);
            assert!(!desc.short_name.is_empty(), "{} missing short name", desc.id);
        }
    }

    #[test]
    fn test_every_section_populated() {
        let registry = EffectRegistry::new();
        for section in SECTIONS {
            assert!(
                !registry.descriptors_in_section(section).is_empty(),
                "empty section {:?}",
                section
            );
        }
    }

    #[test]
    fn test_tail_extending_set() {
        let registry = EffectRegistry::new();
        assert_eq!(registry.descriptor("delay").unwrap().tail, TailPolicy::MixOver);
        assert_eq!(registry.descriptor("stutter").unwrap().tail, TailPolicy::Insert);
        assert_eq!(registry.descriptor("time_stretch").unwrap().tail, TailPolicy::Insert);
        assert_eq!(registry.descriptor("pitch_shift").unwrap().tail, TailPolicy::Insert);
        assert_eq!(registry.descriptor("volume").unwrap().tail, TailPolicy::None);
    }

    #[test]
    fn test_automatable_params_table() {
        let registry = EffectRegistry::new();
        let volume = registry.automatable_params("volume");
        assert_eq!(volume.len(), 1);
        assert_eq!(volume[0].key, "gain_pct");

        let keys: Vec<&str> = registry
            .automatable_params("delay")
            .iter()
            .map(|p| p.key)
            .collect();
        assert_eq!(keys, vec!["delay_ms", "feedback", "mix"]);

        assert!(registry.automatable_params("reverse").is_empty());
        assert!(registry.automatable_params("unknown").is_empty());
    }

    /// Every registered effect processes a stereo sine within contract:
    /// finite, bounded, channel-preserving output.
    #[test]
    fn test_all_effects_process_within_contract() {
        let registry = EffectRegistry::new();
        let n = 44100 / 2;
        let mut data = Vec::with_capacity(n * 2);
        for i in 0..n {
            let s = 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin();
            data.push(s);
            data.push(s * 0.8);
        }
        let input = AudioBuffer::new(data, 2, 44100);

        for desc in registry.all_descriptors() {
            let effect = registry.get(desc.id).unwrap();
            let mut rng = StdRng::seed_from_u64(99);
            let mut ctx = ProcessCtx::new(44100, &mut rng);
            let out = effect
                .process(&input, &ParamMap::new(), &mut ctx)
                .unwrap_or_else(|e| panic!("{} failed: {e}", desc.id));
            assert!(!out.has_non_finite(), "{}: non-finite output", desc.id);
            assert!(out.peak() <= 1.05, "{}: peak {}", desc.id, out.peak());
            assert_eq!(out.channels(), input.channels(), "{}: channels", desc.id);
            if desc.tail == TailPolicy::None {
                assert_eq!(out.frames(), input.frames(), "{}: length change", desc.id);
            }
        }
    }
}
