//! Metronome — click synthesis and sample-accurate mixing.
//!
//! Two short click buffers are pre-synthesized (an accent at 1.5 kHz and a
//! normal click at 1.0 kHz, each a sine burst with exponential decay) and
//! mixed into the playback callback at exact beat positions. A click that a
//! callback boundary interrupts continues seamlessly in the next callback.

/// Synthesize one click: a sine burst with `exp(-300 t)` decay.
fn make_click(sample_rate: u32, freq: f32, dur_ms: f32, vol: f32) -> Vec<f32> {
    let n = (sample_rate as f32 * dur_ms / 1000.0) as usize;
    (0..n)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * freq * t).sin() * (-t * 300.0).exp() * vol
        })
        .collect()
}

/// Click generator synchronized to the playback position.
///
/// The struct is cheap to clone; the playback engine publishes a fresh copy
/// through its lock-free slot whenever a parameter changes, so the audio
/// callback only ever reads an immutable snapshot.
#[derive(Debug, Clone)]
pub struct Metronome {
    /// Whether clicks are mixed at all.
    pub enabled: bool,
    bpm: f32,
    volume: f32,
    beats_per_bar: u32,
    sample_rate: u32,
    click: Vec<f32>,
    accent: Vec<f32>,
}

impl Default for Metronome {
    fn default() -> Self {
        Self::new(44100)
    }
}

impl Metronome {
    /// New metronome at the given sample rate, disabled, 120 BPM, 4/4.
    pub fn new(sample_rate: u32) -> Self {
        let mut m = Self {
            enabled: false,
            bpm: 120.0,
            volume: 0.5,
            beats_per_bar: 4,
            sample_rate,
            click: Vec::new(),
            accent: Vec::new(),
        };
        m.rebuild();
        m
    }

    fn rebuild(&mut self) {
        self.click = make_click(self.sample_rate, 1000.0, 15.0, self.volume);
        self.accent = make_click(self.sample_rate, 1500.0, 18.0, self.volume * 1.3);
    }

    /// Tempo in BPM, clamped to 20–300.
    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = bpm.clamp(20.0, 300.0);
    }

    /// Current tempo.
    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    /// Click volume (0–1); rebuilds the click buffers.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.rebuild();
    }

    /// Beats per bar, clamped to 1–12. Beat 1 gets the accent click.
    pub fn set_beats_per_bar(&mut self, beats: u32) {
        self.beats_per_bar = beats.clamp(1, 12);
    }

    /// Update the sample rate, regenerating clicks if it changed.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        if sample_rate != self.sample_rate {
            self.sample_rate = sample_rate;
            self.rebuild();
        }
    }

    /// Samples between beats at the current tempo.
    pub fn samples_per_beat(&self) -> usize {
        if self.bpm <= 0.0 {
            return 0;
        }
        (self.sample_rate as f32 * 60.0 / self.bpm) as usize
    }

    /// Mix clicks into an interleaved output buffer.
    ///
    /// `position` is the playback position of the first output frame and
    /// `frames` the callback length. Every beat whose sample index falls in
    /// `[position, position + frames)` contributes a click into the first
    /// two (or fewer) channels; a click cut off by the previous callback is
    /// continued from its interrupted offset.
    pub fn mix_into(&self, out: &mut [f32], channels: usize, position: usize, frames: usize) {
        if !self.enabled || self.bpm <= 0.0 {
            return;
        }
        let spb = self.samples_per_beat();
        if spb == 0 {
            return;
        }
        let mix_channels = channels.min(2);
        let max_click = self.click.len().max(self.accent.len());

        // Tail of a click that started in an earlier callback
        let beat_phase = position % spb;
        if beat_phase > 0 && beat_phase < max_click {
            let beat_number = (position / spb) as u32 % self.beats_per_bar;
            let click = if beat_number == 0 {
                &self.accent
            } else {
                &self.click
            };
            if beat_phase < click.len() {
                let tail = &click[beat_phase..];
                let n = tail.len().min(frames);
                for (i, &s) in tail.iter().take(n).enumerate() {
                    for c in 0..mix_channels {
                        out[i * channels + c] += s;
                    }
                }
            }
        }

        // Beats starting inside this callback
        let first_beat = if position % spb == 0 {
            position
        } else {
            (position / spb + 1) * spb
        };
        let mut beat = first_beat;
        while beat < position + frames {
            let offset = beat - position;
            let beat_number = (beat / spb) as u32 % self.beats_per_bar;
            let click = if beat_number == 0 {
                &self.accent
            } else {
                &self.click
            };
            let n = click.len().min(frames - offset);
            for (i, &s) in click.iter().take(n).enumerate() {
                for c in 0..mix_channels {
                    out[(offset + i) * channels + c] += s;
                }
            }
            beat += spb;
        }
    }
}
