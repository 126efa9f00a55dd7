//! Audio I/O layer for the mangle editor.
//!
//! This crate provides:
//!
//! - **WAV file I/O**: [`read_wav`] / [`write_wav`] plus in-memory variants
//!   used by the project archive
//! - **Real-time playback**: [`PlaybackEngine`], a cpal output stream that
//!   streams the rendered buffer with loop/selection support
//! - **Metronome**: [`Metronome`], sample-accurate clicks mixed into the
//!   playback callback
//!
//! ## Threading
//!
//! The playback engine's audio callback runs on the OS audio thread. It
//! never allocates, locks, or panics; its only shared state is a handful of
//! atomics, the lock-free buffer slot, and a bounded event queue drained by
//! the control thread.

mod metronome;
mod playback;
mod wav;

pub use metronome::Metronome;
pub use playback::{PlaybackEngine, PlaybackEvent, list_output_devices};
pub use wav::{
    WavSpec, read_wav, read_wav_from, write_wav, write_wav_pcm16_to, write_wav_to,
};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio stream setup or runtime error.
    #[error("audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("no audio device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("device not found: index {0}")]
    DeviceNotFound(usize),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
