//! Mangle Effects - the glitch effect library
//!
//! Twenty-six parametric buffer effects, each a pure transformation of a
//! selection implementing [`mangle_core::Effect`]. Effects are grouped into
//! six display sections (Basics, Pitch & Time, Distortion, Modulation,
//! Space & Texture, Glitch); the grouping has no semantic consequence.
//!
//! ## Contracts
//!
//! Every effect here upholds the kernel contract:
//!
//! - input buffers are never mutated
//! - output is fresh f32 audio clamped to [-1, 1], free of NaN/∞
//! - output length equals input length unless the descriptor declares a
//!   tail policy (delay mixes its echo tail over what follows; stutter,
//!   time stretch, and simple pitch shift insert material)
//! - channel count is preserved
//!
//! Randomized effects (datamosh, granular, shuffle, digital noise, vinyl)
//! draw exclusively from the [`ProcessCtx`](mangle_core::ProcessCtx) RNG so
//! seeded renders are reproducible.

pub mod autotune;
pub mod bitcrusher;
pub mod buffer_freeze;
pub mod chorus;
pub mod datamosh;
pub mod delay;
pub mod digital_noise;
pub mod distortion;
pub mod filter;
pub mod granular;
pub mod ott;
pub mod pan;
pub mod phaser;
pub mod pitch_shift;
pub mod reverse;
pub mod ring_mod;
pub mod robot;
pub mod saturation;
pub mod shuffle;
pub mod stutter;
pub mod tape_stop;
pub mod time_stretch;
pub mod tremolo;
pub mod vinyl;
pub mod volume;
pub mod wave_ondulee;

pub use autotune::Autotune;
pub use bitcrusher::Bitcrusher;
pub use buffer_freeze::BufferFreeze;
pub use chorus::Chorus;
pub use datamosh::Datamosh;
pub use delay::Delay;
pub use digital_noise::DigitalNoise;
pub use distortion::Distortion;
pub use filter::Filter;
pub use granular::Granular;
pub use ott::Ott;
pub use pan::Pan;
pub use phaser::Phaser;
pub use pitch_shift::PitchShift;
pub use reverse::Reverse;
pub use ring_mod::RingMod;
pub use robot::Robot;
pub use saturation::Saturation;
pub use shuffle::Shuffle;
pub use stutter::Stutter;
pub use tape_stop::TapeStop;
pub use time_stretch::TimeStretch;
pub use tremolo::Tremolo;
pub use vinyl::Vinyl;
pub use volume::Volume;
pub use wave_ondulee::WaveOndulee;
