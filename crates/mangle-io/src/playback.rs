//! Real-time playback engine.
//!
//! Owns one cpal output stream at the project sample rate (blocksize 256,
//! f32) and streams the current rendered buffer. The audio callback reads
//! only lock-free state: atomics for transport and loop, an [`arc_swap`]
//! slot for the buffer and the metronome snapshot, and a bounded event
//! channel back to the control thread. Buffer replacement is an atomic
//! pointer swap, so a running playback never observes a half-applied
//! operation.

use crate::metronome::Metronome;
use crate::{Error, Result};
use arc_swap::ArcSwap;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, StreamConfig};
use crossbeam_channel::{Receiver, Sender, bounded};
use mangle_core::AudioBuffer;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

/// Sentinel for "unset" positions (loop points, selection end).
const UNSET: usize = usize::MAX;

/// Preferred callback length in frames.
const BLOCK_SIZE: u32 = 256;

/// Events emitted from the audio thread, drained by the control thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// Playback reached the end of the buffer (or the selection end) and
    /// stopped.
    Finished,
}

/// Name and index of an output device.
pub fn list_output_devices() -> Result<Vec<(usize, String)>> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| Error::Stream(e.to_string()))?;
    Ok(devices
        .enumerate()
        .filter_map(|(i, d)| d.name().ok().map(|n| (i, n)))
        .collect())
}

/// State shared with the audio callback. Everything here is lock-free.
struct Shared {
    audio: ArcSwap<AudioBuffer>,
    metronome: ArcSwap<Metronome>,
    position: AtomicUsize,
    playing: AtomicBool,
    paused: AtomicBool,
    volume: AtomicU32,
    loop_start: AtomicUsize,
    loop_end: AtomicUsize,
    looping: AtomicBool,
    stop_at: AtomicUsize,
    events: Sender<PlaybackEvent>,
}

impl Shared {
    fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Relaxed))
    }

    /// Fill one callback buffer. Never allocates, never blocks, never
    /// panics: every anomaly degrades to silence.
    fn fill(&self, out: &mut [f32], channels: usize) {
        out.fill(0.0);
        if channels == 0 || !self.playing.load(Ordering::Acquire) {
            return;
        }
        let audio = self.audio.load();
        let total = audio.frames();
        if total == 0 {
            return;
        }
        let frames = out.len() / channels;
        let pos = self.position.load(Ordering::Acquire);
        let end = (pos + frames).min(total);
        let valid = end.saturating_sub(pos);

        if valid == 0 {
            // End of buffer
            if self.looping.load(Ordering::Relaxed) {
                let start = self.loop_start.load(Ordering::Relaxed);
                self.position
                    .store(if start == UNSET { 0 } else { start }, Ordering::Release);
            } else {
                self.playing.store(false, Ordering::Release);
                let _ = self.events.try_send(PlaybackEvent::Finished);
            }
            return;
        }

        let volume = self.volume();
        let src_channels = audio.channels();
        for i in 0..valid {
            for c in 0..channels {
                let s = audio.sample(pos + i, c.min(src_channels - 1));
                out[i * channels + c] = s * volume;
            }
        }

        self.metronome.load().mix_into(out, channels, pos, frames);

        let mut new_pos = end;

        // Selection end
        let stop_at = self.stop_at.load(Ordering::Relaxed);
        if stop_at != UNSET && new_pos >= stop_at {
            if self.looping.load(Ordering::Relaxed) {
                let start = self.loop_start.load(Ordering::Relaxed);
                new_pos = if start == UNSET { 0 } else { start };
            } else {
                self.playing.store(false, Ordering::Release);
                let _ = self.events.try_send(PlaybackEvent::Finished);
            }
        }

        // Loop region wrap
        if self.looping.load(Ordering::Relaxed) {
            let loop_end = self.loop_end.load(Ordering::Relaxed);
            if loop_end != UNSET && new_pos >= loop_end {
                let start = self.loop_start.load(Ordering::Relaxed);
                new_pos = if start == UNSET { 0 } else { start };
            }
        }

        self.position.store(new_pos, Ordering::Release);
    }
}

/// Low-latency playback of the rendered project buffer.
pub struct PlaybackEngine {
    shared: Arc<Shared>,
    events_rx: Receiver<PlaybackEvent>,
    stream: Option<cpal::Stream>,
    stream_sample_rate: u32,
    stream_channels: usize,
    output_device: Option<usize>,
}

impl PlaybackEngine {
    /// Engine with no stream; the stream opens on the first [`load`](Self::load).
    pub fn new() -> Self {
        let (events, events_rx) = bounded(16);
        let shared = Arc::new(Shared {
            audio: ArcSwap::from_pointee(AudioBuffer::zeroed(0, 2, 44100)),
            metronome: ArcSwap::from_pointee(Metronome::new(44100)),
            position: AtomicUsize::new(0),
            playing: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            volume: AtomicU32::new(0.8f32.to_bits()),
            loop_start: AtomicUsize::new(UNSET),
            loop_end: AtomicUsize::new(UNSET),
            looping: AtomicBool::new(false),
            stop_at: AtomicUsize::new(UNSET),
            events,
        });
        Self {
            shared,
            events_rx,
            stream: None,
            stream_sample_rate: 0,
            stream_channels: 0,
            output_device: None,
        }
    }

    /// Swap in a freshly rendered buffer. Resets the transport and rebuilds
    /// the stream when the sample rate or channel count changed.
    pub fn load(&mut self, audio: AudioBuffer, sample_rate: u32) {
        let channels = audio.channels();
        let mut audio = audio;
        audio.set_sample_rate(sample_rate);

        let mut metronome = (**self.shared.metronome.load()).clone();
        metronome.set_sample_rate(sample_rate);
        self.shared.metronome.store(Arc::new(metronome));

        self.shared.audio.store(Arc::new(audio));
        self.shared.position.store(0, Ordering::Release);
        self.shared.playing.store(false, Ordering::Release);
        self.shared.paused.store(false, Ordering::Release);
        self.shared.stop_at.store(UNSET, Ordering::Release);

        if sample_rate != self.stream_sample_rate
            || channels != self.stream_channels
            || self.stream.is_none()
        {
            self.ensure_stream(sample_rate, channels);
        }
    }

    /// Replace only the audio contents (same rate/channels), e.g. after a
    /// re-render during playback. Position, volume, and loop survive.
    pub fn swap_audio(&mut self, audio: AudioBuffer) {
        self.shared.audio.store(Arc::new(audio));
    }

    fn ensure_stream(&mut self, sample_rate: u32, channels: usize) {
        self.stream = None;
        self.stream_sample_rate = 0;
        self.stream_channels = 0;
        if sample_rate == 0 {
            return;
        }

        let host = cpal::default_host();
        let device = match self.output_device {
            Some(idx) => match host.output_devices().ok().and_then(|mut d| d.nth(idx)) {
                Some(d) => Some(d),
                None => {
                    tracing::warn!(index = idx, "output device not found, using default");
                    host.default_output_device()
                }
            },
            None => host.default_output_device(),
        };
        let Some(device) = device else {
            tracing::warn!("no output device available, playback disabled");
            return;
        };

        let config = StreamConfig {
            channels: channels.max(1) as u16,
            sample_rate,
            buffer_size: BufferSize::Fixed(BLOCK_SIZE),
        };

        let shared = Arc::clone(&self.shared);
        let stream = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                shared.fill(data, channels.max(1));
            },
            |err| tracing::warn!(error = %err, "output stream error"),
            None,
        );
        match stream {
            Ok(stream) => {
                if let Err(err) = stream.play() {
                    tracing::warn!(error = %err, "failed to start stream");
                    return;
                }
                self.stream = Some(stream);
                self.stream_sample_rate = sample_rate;
                self.stream_channels = channels;
            }
            Err(err) => {
                // Stay stream-less; the next play() attempts a fresh open.
                tracing::warn!(error = %err, "failed to open output stream");
            }
        }
    }

    /// Start playing, optionally from a position.
    pub fn play(&mut self, start_pos: Option<usize>) {
        if self.shared.audio.load().is_empty() {
            return;
        }
        if let Some(pos) = start_pos {
            self.seek(pos);
        }
        self.shared.stop_at.store(UNSET, Ordering::Release);
        self.shared.playing.store(true, Ordering::Release);
        self.shared.paused.store(false, Ordering::Release);
        if self.stream.is_none() {
            let audio = self.shared.audio.load();
            let (sr, ch) = (audio.sample_rate(), audio.channels());
            self.ensure_stream(sr, ch);
        }
    }

    /// Play only `[start, end)`, stopping at the end (or looping it when a
    /// loop is active).
    pub fn play_selection(&mut self, start: usize, end: usize) {
        if self.shared.audio.load().is_empty() || end <= start {
            return;
        }
        self.seek(start);
        self.shared.stop_at.store(end, Ordering::Release);
        self.shared.playing.store(true, Ordering::Release);
        self.shared.paused.store(false, Ordering::Release);
        if self.stream.is_none() {
            let audio = self.shared.audio.load();
            let (sr, ch) = (audio.sample_rate(), audio.channels());
            self.ensure_stream(sr, ch);
        }
    }

    /// Pause, keeping the position.
    pub fn pause(&mut self) {
        self.shared.playing.store(false, Ordering::Release);
        self.shared.paused.store(true, Ordering::Release);
    }

    /// Resume after a pause.
    pub fn resume(&mut self) {
        if self.shared.paused.load(Ordering::Acquire) {
            self.shared.playing.store(true, Ordering::Release);
            self.shared.paused.store(false, Ordering::Release);
        }
    }

    /// Stop and rewind to 0.
    pub fn stop(&mut self) {
        self.shared.playing.store(false, Ordering::Release);
        self.shared.paused.store(false, Ordering::Release);
        self.shared.position.store(0, Ordering::Release);
    }

    /// Move the read position, clamped to the buffer.
    pub fn seek(&mut self, pos: usize) {
        let frames = self.shared.audio.load().frames();
        let clamped = pos.min(frames.saturating_sub(1));
        self.shared.position.store(clamped, Ordering::Release);
    }

    /// Current read position in frames.
    pub fn position(&self) -> usize {
        self.shared.position.load(Ordering::Acquire)
    }

    /// Whether the transport is rolling.
    pub fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::Acquire)
    }

    /// Whether the transport is paused (stopped with position kept).
    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::Acquire)
    }

    /// Master volume in [0, 1].
    pub fn set_volume(&mut self, volume: f32) {
        self.shared
            .volume
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Release);
    }

    /// Current master volume.
    pub fn volume(&self) -> f32 {
        self.shared.volume()
    }

    /// Configure the loop region.
    pub fn set_loop(&mut self, start: Option<usize>, end: Option<usize>, looping: bool) {
        self.shared
            .loop_start
            .store(start.unwrap_or(UNSET), Ordering::Release);
        self.shared
            .loop_end
            .store(end.unwrap_or(UNSET), Ordering::Release);
        self.shared.looping.store(looping, Ordering::Release);
    }

    /// Select the output device by index; the stream is rebuilt and the
    /// transport state survives.
    pub fn set_output_device(&mut self, index: Option<usize>) {
        self.output_device = index;
        if !self.shared.audio.load().is_empty() {
            let audio = self.shared.audio.load();
            let (sr, ch) = (audio.sample_rate(), audio.channels());
            self.ensure_stream(sr, ch);
        }
    }

    /// Release the device (e.g. while a preview dialog owns it).
    pub fn suspend_stream(&mut self) {
        self.shared.playing.store(false, Ordering::Release);
        self.stream = None;
        self.stream_sample_rate = 0;
        self.stream_channels = 0;
    }

    /// Re-open the stream after [`suspend_stream`](Self::suspend_stream).
    pub fn resume_stream(&mut self) {
        if self.stream.is_none() && !self.shared.audio.load().is_empty() {
            let audio = self.shared.audio.load();
            let (sr, ch) = (audio.sample_rate(), audio.channels());
            self.ensure_stream(sr, ch);
        }
    }

    /// Drain pending events from the audio thread.
    pub fn poll_events(&self) -> Vec<PlaybackEvent> {
        self.events_rx.try_iter().collect()
    }

    // ── Metronome control ──

    fn update_metronome(&self, f: impl FnOnce(&mut Metronome)) {
        let mut m = (**self.shared.metronome.load()).clone();
        f(&mut m);
        self.shared.metronome.store(Arc::new(m));
    }

    /// Enable or disable the metronome.
    pub fn set_metronome_enabled(&mut self, enabled: bool) {
        self.update_metronome(|m| m.enabled = enabled);
    }

    /// Set the metronome tempo.
    pub fn set_metronome_bpm(&mut self, bpm: f32) {
        self.update_metronome(|m| m.set_bpm(bpm));
    }

    /// Set the metronome click volume.
    pub fn set_metronome_volume(&mut self, volume: f32) {
        self.update_metronome(|m| m.set_volume(volume));
    }

    /// Set the metronome beats per bar.
    pub fn set_metronome_beats(&mut self, beats: u32) {
        self.update_metronome(|m| m.set_beats_per_bar(beats));
    }
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared_with(audio: AudioBuffer) -> (Arc<Shared>, Receiver<PlaybackEvent>) {
        let (events, rx) = bounded(16);
        let shared = Arc::new(Shared {
            audio: ArcSwap::from_pointee(audio),
            metronome: ArcSwap::from_pointee(Metronome::new(44100)),
            position: AtomicUsize::new(0),
            playing: AtomicBool::new(true),
            paused: AtomicBool::new(false),
            volume: AtomicU32::new(1.0f32.to_bits()),
            loop_start: AtomicUsize::new(UNSET),
            loop_end: AtomicUsize::new(UNSET),
            looping: AtomicBool::new(false),
            stop_at: AtomicUsize::new(UNSET),
            events,
        });
        (shared, rx)
    }

    #[test]
    fn test_callback_copies_with_volume() {
        let audio = AudioBuffer::from_mono(vec![0.5; 1024], 44100);
        let (shared, _rx) = shared_with(audio);
        shared.volume.store(0.5f32.to_bits(), Ordering::Release);

        let mut out = vec![0.0f32; 256];
        shared.fill(&mut out, 1);
        assert!(out.iter().all(|&s| (s - 0.25).abs() < 1e-6));
        assert_eq!(shared.position.load(Ordering::Acquire), 256);
    }

    #[test]
    fn test_callback_channel_coercion() {
        // Mono source into a stereo stream: both channels carry the signal
        let audio = AudioBuffer::from_mono(vec![0.5; 512], 44100);
        let (shared, _rx) = shared_with(audio);
        let mut out = vec![0.0f32; 256 * 2];
        shared.fill(&mut out, 2);
        assert_eq!(out[0], out[1]);
        assert!((out[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_callback_pads_partial_block() {
        let audio = AudioBuffer::from_mono(vec![0.5; 100], 44100);
        let (shared, rx) = shared_with(audio);
        let mut out = vec![1.0f32; 256];
        shared.fill(&mut out, 1);
        // 100 valid frames, the rest zero-padded
        assert!((out[99] - 0.5).abs() < 1e-6);
        assert_eq!(out[100], 0.0);
        assert_eq!(shared.position.load(Ordering::Acquire), 100);

        // Next callback hits EOF: silence + Finished + stopped
        let mut out = vec![1.0f32; 256];
        shared.fill(&mut out, 1);
        assert!(out.iter().all(|&s| s == 0.0));
        assert!(!shared.playing.load(Ordering::Acquire));
        assert_eq!(rx.try_recv().unwrap(), PlaybackEvent::Finished);
    }

    #[test]
    fn test_callback_loop_wraps() {
        let audio = AudioBuffer::from_mono((0..1000).map(|i| i as f32 / 1000.0).collect(), 44100);
        let (shared, rx) = shared_with(audio);
        shared.looping.store(true, Ordering::Release);
        shared.loop_start.store(100, Ordering::Release);
        shared.loop_end.store(500, Ordering::Release);
        shared.position.store(400, Ordering::Release);

        let mut out = vec![0.0f32; 256];
        shared.fill(&mut out, 1);
        // 400 + 256 >= 500 → wrapped to loop start
        assert_eq!(shared.position.load(Ordering::Acquire), 100);
        assert!(shared.playing.load(Ordering::Acquire));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_callback_eof_loops_to_start() {
        let audio = AudioBuffer::from_mono(vec![0.1; 100], 44100);
        let (shared, _rx) = shared_with(audio);
        shared.looping.store(true, Ordering::Release);
        shared.loop_start.store(0, Ordering::Release);
        shared.position.store(100, Ordering::Release);

        let mut out = vec![0.0f32; 64];
        shared.fill(&mut out, 1);
        assert_eq!(shared.position.load(Ordering::Acquire), 0);
        assert!(shared.playing.load(Ordering::Acquire));
    }

    #[test]
    fn test_callback_selection_stop() {
        let audio = AudioBuffer::from_mono(vec![0.5; 2048], 44100);
        let (shared, rx) = shared_with(audio);
        shared.stop_at.store(200, Ordering::Release);

        let mut out = vec![0.0f32; 256];
        shared.fill(&mut out, 1);
        assert!(!shared.playing.load(Ordering::Acquire));
        assert_eq!(rx.try_recv().unwrap(), PlaybackEvent::Finished);
    }

    #[test]
    fn test_callback_silent_when_stopped() {
        let audio = AudioBuffer::from_mono(vec![0.5; 1024], 44100);
        let (shared, _rx) = shared_with(audio);
        shared.playing.store(false, Ordering::Release);
        let mut out = vec![1.0f32; 128];
        shared.fill(&mut out, 1);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_metronome_mixed_into_callback() {
        let audio = AudioBuffer::from_mono(vec![0.0; 44100], 44100);
        let (shared, _rx) = shared_with(audio);
        let mut metronome = Metronome::new(44100);
        metronome.enabled = true;
        metronome.set_volume(1.0);
        shared.metronome.store(Arc::new(metronome));

        let mut out = vec![0.0f32; 256];
        shared.fill(&mut out, 1);
        assert!(out.iter().any(|&s| s.abs() > 0.1), "no click mixed at beat 0");
    }

    #[test]
    fn test_engine_transport_state() {
        // No audio loaded: play is a no-op
        let mut engine = PlaybackEngine::new();
        engine.play(None);
        assert!(!engine.is_playing());

        engine.set_volume(2.0);
        assert_eq!(engine.volume(), 1.0);
        engine.set_volume(0.25);
        assert_eq!(engine.volume(), 0.25);
    }
}
