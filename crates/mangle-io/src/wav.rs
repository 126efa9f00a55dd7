//! WAV file reading and writing.

use crate::Result;
use hound::{SampleFormat, WavReader, WavWriter};
use mangle_core::AudioBuffer;
use std::io::{Read, Seek, Write};
use std::path::Path;

/// WAV file specification.
#[derive(Debug, Clone, Copy)]
pub struct WavSpec {
    /// Number of audio channels (1 = mono, 2 = stereo).
    pub channels: u16,
    /// Sample rate in Hz (e.g., 44100, 48000).
    pub sample_rate: u32,
    /// Bit depth per sample (16 = PCM_16, 32 = IEEE float).
    pub bits_per_sample: u16,
}

impl Default for WavSpec {
    fn default() -> Self {
        Self {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 16,
        }
    }
}

impl From<WavSpec> for hound::WavSpec {
    fn from(spec: WavSpec) -> Self {
        hound::WavSpec {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            sample_format: if spec.bits_per_sample == 32 {
                SampleFormat::Float
            } else {
                SampleFormat::Int
            },
        }
    }
}

/// Read a WAV file into an [`AudioBuffer`].
///
/// Mono and stereo layouts are kept; files with more than two channels are
/// truncated to the first two. Integer samples are normalized to f32.
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<(AudioBuffer, WavSpec)> {
    let reader = WavReader::open(path)?;
    decode(reader)
}

/// Read a WAV stream (e.g. a project archive entry) into an [`AudioBuffer`].
pub fn read_wav_from<R: Read>(reader: R) -> Result<(AudioBuffer, WavSpec)> {
    let reader = WavReader::new(reader)?;
    decode(reader)
}

fn decode<R: Read>(reader: WavReader<R>) -> Result<(AudioBuffer, WavSpec)> {
    let hspec = reader.spec();
    let spec = WavSpec {
        channels: hspec.channels,
        sample_rate: hspec.sample_rate,
        bits_per_sample: hspec.bits_per_sample,
    };
    let channels = hspec.channels as usize;

    let samples: Vec<f32> = match hspec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max_val = (1i64 << (hspec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    let buffer = if channels <= 2 {
        AudioBuffer::new(samples, channels, hspec.sample_rate)
    } else {
        // Keep the first two channels only
        let frames = samples.len() / channels;
        let mut data = Vec::with_capacity(frames * 2);
        for frame in samples.chunks(channels) {
            data.push(frame[0]);
            data.push(frame.get(1).copied().unwrap_or(frame[0]));
        }
        AudioBuffer::new(data, 2, hspec.sample_rate)
    };
    Ok((buffer, spec))
}

/// Write an [`AudioBuffer`] to a WAV file at the given bit depth.
pub fn write_wav<P: AsRef<Path>>(path: P, audio: &AudioBuffer, bits_per_sample: u16) -> Result<()> {
    let spec = WavSpec {
        channels: audio.channels() as u16,
        sample_rate: audio.sample_rate(),
        bits_per_sample,
    };
    let writer = WavWriter::create(path, spec.into())?;
    encode(writer, audio, bits_per_sample)
}

/// Write an [`AudioBuffer`] to any seekable writer.
pub fn write_wav_to<W: Write + Seek>(
    writer: W,
    audio: &AudioBuffer,
    bits_per_sample: u16,
) -> Result<()> {
    let spec = WavSpec {
        channels: audio.channels() as u16,
        sample_rate: audio.sample_rate(),
        bits_per_sample,
    };
    let writer = WavWriter::new(writer, spec.into())?;
    encode(writer, audio, bits_per_sample)
}

/// Write PCM_16 WAV bytes into memory — the project archive format.
pub fn write_wav_pcm16_to(audio: &AudioBuffer) -> Result<Vec<u8>> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    write_wav_to(&mut cursor, audio, 16)?;
    Ok(cursor.into_inner())
}

fn encode<W: Write + Seek>(
    mut writer: WavWriter<W>,
    audio: &AudioBuffer,
    bits_per_sample: u16,
) -> Result<()> {
    if bits_per_sample == 32 {
        for &sample in audio.samples() {
            writer.write_sample(sample)?;
        }
    } else {
        let max_val = (1i64 << (bits_per_sample - 1)) as f32;
        for &sample in audio.samples() {
            let int_sample = (sample * max_val).clamp(-max_val, max_val - 1.0) as i32;
            writer.write_sample(int_sample)?;
        }
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn stereo_sine(n: usize) -> AudioBuffer {
        let mut data = Vec::with_capacity(n * 2);
        for i in 0..n {
            let s = 0.8 * (i as f32 / 50.0).sin();
            data.push(s);
            data.push(-s);
        }
        AudioBuffer::new(data, 2, 48000)
    }

    #[test]
    fn test_roundtrip_f32() {
        let audio = stereo_sine(1000);
        let file = NamedTempFile::new().unwrap();
        write_wav(file.path(), &audio, 32).unwrap();

        let (loaded, spec) = read_wav(file.path()).unwrap();
        assert_eq!(spec.sample_rate, 48000);
        assert_eq!(loaded.channels(), 2);
        assert_eq!(loaded.frames(), 1000);
        for (a, b) in audio.samples().iter().zip(loaded.samples()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_roundtrip_pcm16() {
        let audio = stereo_sine(500);
        let file = NamedTempFile::new().unwrap();
        write_wav(file.path(), &audio, 16).unwrap();

        let (loaded, spec) = read_wav(file.path()).unwrap();
        assert_eq!(spec.bits_per_sample, 16);
        for (a, b) in audio.samples().iter().zip(loaded.samples()) {
            assert!((a - b).abs() < 0.001);
        }
    }

    #[test]
    fn test_in_memory_roundtrip() {
        let audio = stereo_sine(256);
        let bytes = write_wav_pcm16_to(&audio).unwrap();
        let (loaded, spec) = read_wav_from(std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(spec.channels, 2);
        assert_eq!(loaded.frames(), 256);
    }

    #[test]
    fn test_mono_kept_mono() {
        let mono = AudioBuffer::from_mono(vec![0.1; 100], 44100);
        let file = NamedTempFile::new().unwrap();
        write_wav(file.path(), &mono, 16).unwrap();
        let (loaded, _) = read_wav(file.path()).unwrap();
        assert_eq!(loaded.channels(), 1);
    }
}
