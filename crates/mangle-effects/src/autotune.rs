//! Autotune — pitch correction toward the nearest scale note.
//!
//! Windowed autocorrelation pitch detection (FFT-based, parabolic peak
//! interpolation), snap to the chosen key/scale, per-frame pitch shift by
//! resampling, Hann overlap-add reconstruction normalized by the accumulated
//! window weight.

use mangle_core::{
    AudioBuffer, Effect, EffectDescriptor, EffectError, EffectSection, ParamMap, ParamSpec,
    ParamUnit, ProcessCtx, TailPolicy, hann_window,
};
use rustfft::FftPlanner;
use rustfft::num_complex::Complex;

const SPEED: ParamSpec =
    ParamSpec::float("speed", "Speed", 0.0, 1.0, 0.8, 0.05, ParamUnit::None);
const KEY: ParamSpec = ParamSpec::choice(
    "key",
    "Key",
    &["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"],
    0,
);
const SCALE: ParamSpec = ParamSpec::choice(
    "scale",
    "Scale",
    &["chromatic", "major", "minor", "pentatonic", "blues", "dorian", "mixolydian"],
    0,
);
const MIX: ParamSpec =
    ParamSpec::float("mix", "Mix", 0.0, 1.0, 1.0, 0.01, ParamUnit::None);

const WIN_SIZE: usize = 2048;
const FMIN: f32 = 80.0;
const FMAX: f32 = 800.0;
const PEAK_THRESHOLD: f32 = 0.3;

static DESCRIPTOR: EffectDescriptor = EffectDescriptor {
    id: "autotune",
    name: "Autotune",
    short_name: "TUNE",
    description: "Pitch correction to the nearest note of a key and scale",
    section: EffectSection::PitchTime,
    tail: TailPolicy::None,
    params: &[SPEED, KEY, SCALE, MIX],
};

fn scale_intervals(scale: &str) -> &'static [i32] {
    match scale {
        "major" => &[0, 2, 4, 5, 7, 9, 11],
        "minor" => &[0, 2, 3, 5, 7, 8, 10],
        "pentatonic" => &[0, 2, 4, 7, 9],
        "blues" => &[0, 3, 5, 6, 7, 10],
        "dorian" => &[0, 2, 3, 5, 7, 9, 10],
        "mixolydian" => &[0, 2, 4, 5, 7, 9, 10],
        _ => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
    }
}

fn freq_to_midi(f: f32) -> f32 {
    if f <= 0.0 {
        return 0.0;
    }
    69.0 + 12.0 * (f / 440.0).log2()
}

/// Snap a MIDI note to the nearest note of the scale in the given key,
/// choosing the closest octave.
fn snap_to_scale(midi: f32, key_offset: i32, intervals: &[i32]) -> f32 {
    let rounded = midi.round() as i32;
    let note_class = rounded.rem_euclid(12);
    let relative = (note_class - key_offset).rem_euclid(12);
    let best = intervals
        .iter()
        .copied()
        .min_by_key(|&s| {
            let d = (relative - s).abs();
            d.min(12 - d)
        })
        .unwrap_or(0);
    let target_class = (best + key_offset).rem_euclid(12);
    let octave = rounded.div_euclid(12);
    let mut target = (octave * 12 + target_class) as f32;
    if (target - midi).abs() > (target + 12.0 - midi).abs() {
        target += 12.0;
    } else if (target - midi).abs() > (target - 12.0 - midi).abs() {
        target -= 12.0;
    }
    target
}

/// Autocorrelation pitch detection over one windowed frame.
fn detect_pitch(frame: &[f32], sr: f32, planner: &mut FftPlanner<f32>) -> f32 {
    let n = frame.len();
    if n < 64 {
        return 0.0;
    }
    let mean = frame.iter().sum::<f32>() / n as f32;
    let peak = frame.iter().fold(0.0f32, |a, s| a.max((s - mean).abs()));
    if peak < 1e-5 {
        return 0.0;
    }

    // Autocorrelation via FFT: |X|^2 inverse-transformed.
    let fft_size = (2 * n - 1).next_power_of_two();
    let mut buf: Vec<Complex<f32>> = frame
        .iter()
        .map(|&s| Complex::new(s - mean, 0.0))
        .chain(std::iter::repeat_n(Complex::new(0.0, 0.0), fft_size - n))
        .collect();
    let fft = planner.plan_fft_forward(fft_size);
    fft.process(&mut buf);
    for v in &mut buf {
        *v = Complex::new(v.norm_sqr(), 0.0);
    }
    let ifft = planner.plan_fft_inverse(fft_size);
    ifft.process(&mut buf);

    let acf0 = buf[0].re;
    if acf0 <= 1e-12 {
        return 0.0;
    }
    let acf: Vec<f32> = buf[..n].iter().map(|c| c.re / acf0).collect();

    let min_lag = ((sr / FMAX) as usize).max(2);
    let max_lag = ((sr / FMIN) as usize).min(n - 1);
    if min_lag >= max_lag {
        return 0.0;
    }
    let search = &acf[min_lag..max_lag];
    let (peak_idx, &peak_val) = match search
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
    {
        Some(p) => p,
        None => return 0.0,
    };
    if peak_val < PEAK_THRESHOLD {
        return 0.0;
    }
    let mut lag = (peak_idx + min_lag) as f32;

    // Parabolic interpolation around the peak
    if peak_idx > 0 && peak_idx < search.len() - 1 {
        let a = search[peak_idx - 1];
        let b = search[peak_idx];
        let c = search[peak_idx + 1];
        let denom = 2.0 * (2.0 * b - a - c);
        if denom.abs() > 1e-10 {
            lag += (a - c) / denom;
        }
    }
    if lag <= 0.0 {
        return 0.0;
    }
    sr / lag
}

fn resample_linear(frame: &[f32], new_len: usize) -> Vec<f32> {
    let n = frame.len();
    if n == 0 || new_len == 0 {
        return vec![0.0; new_len];
    }
    let step = (n - 1) as f64 / (new_len.max(2) - 1) as f64;
    (0..new_len)
        .map(|i| {
            let pos = i as f64 * step;
            let i0 = pos.floor() as usize;
            let i1 = (i0 + 1).min(n - 1);
            let frac = (pos - i0 as f64) as f32;
            frame[i0] + (frame[i1] - frame[i0]) * frac
        })
        .collect()
}

/// Frame-wise pitch correction.
pub struct Autotune;

impl Effect for Autotune {
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
        if n < 512 {
            return Ok(input.clone());
        }
        let sr = ctx.sample_rate as f32;
        let speed = params.float(&SPEED);
        let mix = params.float(&MIX);
        let key = params.choice(&KEY);
        let key_offset = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"]
            .iter()
            .position(|k| *k == key)
            .unwrap_or(0) as i32;
        let intervals = scale_intervals(params.choice(&SCALE));

        let mono: Vec<f32> = input.to_mono().samples().to_vec();
        let hop = WIN_SIZE / 4;
        let window = hann_window(WIN_SIZE);
        let mut output = vec![0.0f32; n];
        let mut weight = vec![0.0f32; n];
        let mut planner = FftPlanner::new();

        let mut i = 0;
        while i + WIN_SIZE < n {
            let frame: Vec<f32> = (0..WIN_SIZE).map(|k| mono[i + k] * window[k]).collect();
            let freq = detect_pitch(&frame, sr, &mut planner);

            let shifted_frame;
            let source: &[f32] = if !(60.0..=1000.0).contains(&freq) {
                // No pitch detected — pass the frame through
                &frame
            } else {
                let midi = freq_to_midi(freq);
                let target = snap_to_scale(midi, key_offset, intervals);
                let shift_semitones = (target - midi) * speed;
                if shift_semitones.abs() < 0.05 {
                    &frame
                } else {
                    let factor = 2.0f32.powf(shift_semitones / 12.0);
                    let new_len = ((WIN_SIZE as f32 / factor) as usize).max(2);
                    let shrunk = resample_linear(&frame, new_len);
                    shifted_frame = resample_linear(&shrunk, WIN_SIZE);
                    &shifted_frame
                }
            };

            // Overlap-add. Shifted frames get windowed a second time so the
            // reconstruction stays smooth at frame boundaries.
            if std::ptr::eq(source.as_ptr(), frame.as_ptr()) {
                for k in 0..WIN_SIZE {
                    output[i + k] += frame[k];
                    weight[i + k] += window[k];
                }
            } else {
                for k in 0..WIN_SIZE {
                    output[i + k] += source[k] * window[k];
                    weight[i + k] += window[k];
                }
            }
            i += hop;
        }

        for (o, w) in output.iter_mut().zip(weight.iter()) {
            *o /= w.max(1e-8);
        }

        // Re-apply to the original channels: the mono correction ratio is
        // applied per channel so stereo images survive.
        let mut out = input.clone();
        if input.channels() == 1 {
            for (k, s) in out.samples_mut().iter_mut().enumerate() {
                *s = mono[k] * (1.0 - mix) + output[k] * mix;
            }
        } else {
            for k in 0..n {
                let ratio = if mono[k].abs() > 1e-6 {
                    (output[k] / (mono[k] + 1e-8)).clamp(-3.0, 3.0)
                } else {
                    1.0
                };
                for c in 0..out.channels() {
                    let v = out.sample(k, c) * (1.0 - mix + mix * ratio);
                    out.set_sample(k, c, v);
                }
            }
        }
        out.clamp_unit();
        Ok(out)
    }
}
