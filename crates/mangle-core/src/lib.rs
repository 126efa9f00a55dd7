//! Mangle Core - buffer, envelope, and parameter primitives
//!
//! This crate provides the foundational types shared by the rest of the
//! editor:
//!
//! - [`AudioBuffer`] - Interleaved f32 audio with channel count and sample rate
//! - [`Envelope`] - Piecewise quadratic Bézier curve for fades and automation
//! - [`ParamSpec`] / [`ParamMap`] - Declared parameter schemas and value bags
//! - [`Effect`] - The seam every buffer effect implements
//! - [`Biquad`] - Second-order IIR filter with RBJ cookbook coefficients
//!
//! # Design Principles
//!
//! - **Buffers are values**: effects and the render pipeline never mutate a
//!   buffer they were handed; they produce fresh ones.
//! - **Declared ranges**: every effect parameter has a [`ParamSpec`] with
//!   min/max/default/step so callers can clamp and UIs can render controls.
//! - **Seedable chaos**: randomized effects draw from the RNG in
//!   [`ProcessCtx`], never from a global source, so renders are replayable.

pub mod biquad;
pub mod buffer;
pub mod dsp;
pub mod effect;
pub mod envelope;
pub mod param;

pub use biquad::{
    Biquad, bandpass_coefficients, highpass_coefficients, lowpass_coefficients,
};
pub use buffer::AudioBuffer;
pub use dsp::{db_to_linear, hann_window, linear_to_db, micro_fade, normalize_peak};
pub use effect::{
    Effect, EffectDescriptor, EffectError, EffectSection, ProcessCtx, TailPolicy,
};
pub use envelope::{Envelope, FadeSide, apply_envelope_fade, interpolate_curve};
pub use param::{ParamKind, ParamMap, ParamSpec, ParamUnit, ParamValue};
