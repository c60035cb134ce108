//! Real-time sound cue bridge for ponder.
//!
//! The producer decides *which* sound should be playing and *when* it
//! started; the audio callback renders it on its own deadline. The two sides
//! only share a handful of atomics:
//!
//! - **Parameters**: [`AudioParams`], three last-write-wins words (sound id
//!   plus the start time packed into two `f32` bit patterns)
//! - **Clock**: [`AudioClock`], frames rendered so far, so the producer can
//!   stamp a cue with the current audio position
//! - **Synthesis**: [`SynthesisUnit`] renders interleaved 16-bit stereo into a
//!   preallocated buffer; [`SampleBank`] is the clip-playback implementation
//! - **Bridge**: [`AudioBridge`] runs inside the host callback, converts to
//!   `f32` and falls back to silence whenever it cannot render
//! - **Output**: [`AudioBackend`] / [`CpalBackend`] open the device stream
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ponder_audio::{AudioBridge, AudioParams, AudioClock, SampleBank, SoundBank, SoundId};
//! use std::sync::Arc;
//!
//! let params = Arc::new(AudioParams::new());
//! let clock = Arc::new(AudioClock::new());
//! let bank = SoundBank::synthesized(48_000);
//! let mut bridge = AudioBridge::new(params.clone(), clock.clone())
//!     .with_unit(Box::new(SampleBank::new(bank)));
//!
//! // Producer side, once per frame:
//! params.publish(SoundId::Move, clock.position());
//!
//! // Audio callback:
//! bridge.process_interleaved(&mut device_buffer, 2);
//! ```

pub mod backend;
pub mod bank;
pub mod bridge;
pub mod cpal_backend;
pub mod params;
pub mod synthesis;

pub use backend::{
    AudioBackend, AudioDevice, BackendStreamConfig, ErrorCallback, OutputCallback, StreamHandle,
};
pub use bank::{Clip, SoundBank};
pub use bridge::AudioBridge;
pub use cpal_backend::{CpalBackend, list_output_devices};
pub use params::{
    AudioClock, AudioParams, ParamSnapshot, SoundId, pack_started_time, unpack_started_time,
};
pub use synthesis::{MAX_FILL_FRAMES, SampleBank, SynthesisUnit};

/// Error types for audio operations.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// WAV file read error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// A sound file uses a sample format the bank cannot play.
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio output device available on the system.
    #[error("No audio device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio operations.
pub type Result<T> = std::result::Result<T, AudioError>;
