//! Interleaved audio buffer.
//!
//! [`AudioBuffer`] is the unit of currency between the timeline, the effect
//! kernel, and the playback engine: a finite sequence of f32 frames with a
//! channel count (1 or 2) and a sample rate. Buffers are immutable once
//! handed to the render pipeline — every transformation produces a new one.

/// Interleaved f32 audio: `frames × channels`, plus a sample rate.
///
/// Stereo data is stored `[L, R, L, R, ...]`, matching what cpal and hound
/// exchange, so no conversion happens at the device or file boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    data: Vec<f32>,
    channels: usize,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Wrap interleaved samples. `data.len()` must be a multiple of
    /// `channels`; trailing partial frames are dropped.
    pub fn new(mut data: Vec<f32>, channels: usize, sample_rate: u32) -> Self {
        let channels = channels.max(1);
        let rem = data.len() % channels;
        if rem != 0 {
            data.truncate(data.len() - rem);
        }
        Self {
            data,
            channels,
            sample_rate,
        }
    }

    /// Mono buffer from a sample vector.
    pub fn from_mono(data: Vec<f32>, sample_rate: u32) -> Self {
        Self::new(data, 1, sample_rate)
    }

    /// Stereo buffer from separate left/right channels (truncated to the
    /// shorter one).
    pub fn from_planar_stereo(left: &[f32], right: &[f32], sample_rate: u32) -> Self {
        let frames = left.len().min(right.len());
        let mut data = Vec::with_capacity(frames * 2);
        for i in 0..frames {
            data.push(left[i]);
            data.push(right[i]);
        }
        Self::new(data, 2, sample_rate)
    }

    /// All-zero buffer of the given shape.
    pub fn zeroed(frames: usize, channels: usize, sample_rate: u32) -> Self {
        Self::new(vec![0.0; frames * channels.max(1)], channels, sample_rate)
    }

    /// Number of frames (samples per channel).
    #[inline]
    pub fn frames(&self) -> usize {
        self.data.len() / self.channels
    }

    /// True when the buffer holds no frames.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Channel count (1 = mono, 2 = stereo).
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Sample rate in Hz.
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Override the sample rate tag without touching samples.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Raw interleaved samples.
    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.data
    }

    /// Mutable raw interleaved samples.
    #[inline]
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Sample at `(frame, channel)`. Out-of-range reads return 0.
    #[inline]
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        self.data
            .get(frame * self.channels + channel)
            .copied()
            .unwrap_or(0.0)
    }

    /// Set the sample at `(frame, channel)`; out-of-range writes are ignored.
    #[inline]
    pub fn set_sample(&mut self, frame: usize, channel: usize, value: f32) {
        let idx = frame * self.channels + channel;
        if let Some(slot) = self.data.get_mut(idx) {
            *slot = value;
        }
    }

    /// Copy of the frame range `[start, end)`, clamped to the buffer.
    pub fn segment(&self, start: usize, end: usize) -> AudioBuffer {
        let frames = self.frames();
        let start = start.min(frames);
        let end = end.clamp(start, frames);
        AudioBuffer::new(
            self.data[start * self.channels..end * self.channels].to_vec(),
            self.channels,
            self.sample_rate,
        )
    }

    /// Concatenate buffers front to back. Channel counts are unified to the
    /// widest input; empty inputs are skipped.
    pub fn concat(parts: &[&AudioBuffer], sample_rate: u32) -> AudioBuffer {
        let channels = parts
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| p.channels)
            .max()
            .unwrap_or(1);
        let total: usize = parts.iter().map(|p| p.frames()).sum();
        let mut out = AudioBuffer::zeroed(total, channels, sample_rate);
        let mut at = 0;
        for part in parts {
            if part.is_empty() {
                continue;
            }
            let part = if part.channels == channels {
                (*part).clone()
            } else {
                part.with_channels(channels)
            };
            out.data[at * channels..(at + part.frames()) * channels]
                .copy_from_slice(&part.data);
            at += part.frames();
        }
        out
    }

    /// Mix-add `other` into this buffer starting at `at_frame`. Frames past
    /// the end of `self` are ignored; channel counts are coerced per frame.
    pub fn mix_add(&mut self, other: &AudioBuffer, at_frame: usize) {
        let frames = self.frames();
        let n = other.frames().min(frames.saturating_sub(at_frame));
        for i in 0..n {
            for c in 0..self.channels {
                let src = other.sample(i, c.min(other.channels - 1));
                let idx = (at_frame + i) * self.channels + c;
                self.data[idx] += src;
            }
        }
    }

    /// Stereo coercion: mono is duplicated to both channels, wider layouts
    /// are truncated to the first two channels.
    pub fn to_stereo(&self) -> AudioBuffer {
        self.with_channels(2)
    }

    /// Mono mixdown (channel average).
    pub fn to_mono(&self) -> AudioBuffer {
        if self.channels == 1 {
            return self.clone();
        }
        let frames = self.frames();
        let mut data = Vec::with_capacity(frames);
        for i in 0..frames {
            let mut acc = 0.0;
            for c in 0..self.channels {
                acc += self.data[i * self.channels + c];
            }
            data.push(acc / self.channels as f32);
        }
        AudioBuffer::new(data, 1, self.sample_rate)
    }

    /// Copy with the given channel count (duplicate mono up, truncate down).
    pub fn with_channels(&self, channels: usize) -> AudioBuffer {
        let channels = channels.max(1);
        if channels == self.channels {
            return self.clone();
        }
        let frames = self.frames();
        let mut data = Vec::with_capacity(frames * channels);
        for i in 0..frames {
            for c in 0..channels {
                data.push(self.sample(i, c.min(self.channels - 1)));
            }
        }
        AudioBuffer::new(data, channels, self.sample_rate)
    }

    /// One channel as a planar vector.
    pub fn channel(&self, channel: usize) -> Vec<f32> {
        let frames = self.frames();
        let mut out = Vec::with_capacity(frames);
        for i in 0..frames {
            out.push(self.sample(i, channel));
        }
        out
    }

    /// Rebuild from planar channel data (all channels must share a length).
    pub fn from_planar(channels: &[Vec<f32>], sample_rate: u32) -> AudioBuffer {
        let ch = channels.len().max(1);
        let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
        let mut data = Vec::with_capacity(frames * ch);
        for i in 0..frames {
            for plane in channels {
                data.push(plane[i]);
            }
        }
        AudioBuffer::new(data, ch, sample_rate)
    }

    /// Reversed copy (frame order flipped, channels kept together).
    pub fn reversed(&self) -> AudioBuffer {
        let frames = self.frames();
        let mut data = Vec::with_capacity(self.data.len());
        for i in (0..frames).rev() {
            data.extend_from_slice(&self.data[i * self.channels..(i + 1) * self.channels]);
        }
        AudioBuffer::new(data, self.channels, self.sample_rate)
    }

    /// Resample to `new_frames` frames by linear interpolation, preserving
    /// channel count. The sample-rate tag is unchanged; callers doing rate
    /// conversion retag afterwards.
    pub fn resampled(&self, new_frames: usize) -> AudioBuffer {
        let frames = self.frames();
        if new_frames == 0 || frames == 0 {
            return AudioBuffer::zeroed(new_frames, self.channels, self.sample_rate);
        }
        if new_frames == frames {
            return self.clone();
        }
        let mut out = AudioBuffer::zeroed(new_frames, self.channels, self.sample_rate);
        let step = (frames - 1) as f64 / (new_frames.max(2) - 1) as f64;
        for i in 0..new_frames {
            let pos = i as f64 * step;
            let i0 = pos.floor() as usize;
            let i1 = (i0 + 1).min(frames - 1);
            let frac = (pos - i0 as f64) as f32;
            for c in 0..self.channels {
                let a = self.sample(i0, c);
                let b = self.sample(i1, c);
                out.set_sample(i, c, a + (b - a) * frac);
            }
        }
        out
    }

    /// Peak absolute sample value.
    pub fn peak(&self) -> f32 {
        self.data.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    /// Root-mean-square level over all samples.
    pub fn rms(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.data.iter().map(|s| s * s).sum();
        (sum / self.data.len() as f32).sqrt()
    }

    /// Clamp every sample to [-1, 1] in place.
    pub fn clamp_unit(&mut self) {
        for s in &mut self.data {
            *s = s.clamp(-1.0, 1.0);
        }
    }

    /// Scale every sample in place.
    pub fn scale(&mut self, gain: f32) {
        for s in &mut self.data {
            *s *= gain;
        }
    }

    /// True when any sample is NaN or infinite.
    pub fn has_non_finite(&self) -> bool {
        self.data.iter().any(|s| !s.is_finite())
    }
}
