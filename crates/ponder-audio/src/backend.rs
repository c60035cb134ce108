//! Pluggable audio output abstraction.
//!
//! [`AudioBackend`] keeps platform audio APIs out of the application: the CLI
//! asks a backend for an output stream around a boxed callback and holds on
//! to the returned [`StreamHandle`] for as long as sound should play.
//!
//! ```text
//!  ponder run ──▶ AudioBackend ──▶ CpalBackend ──▶ ALSA / CoreAudio / WASAPI
//!                     │
//!                     └─ OutputCallback = AudioBridge::process_interleaved
//! ```

use crate::Result;

/// Configuration for building an output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendStreamConfig {
    /// Requested sample rate in Hz.
    pub sample_rate: u32,
    /// Preferred buffer size in frames.
    pub buffer_size: u32,
    /// Number of output channels.
    pub channels: u16,
    /// Optional device name filter (system default if `None`).
    pub device_name: Option<String>,
}

impl Default for BackendStreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            buffer_size: 512,
            channels: 2,
            device_name: None,
        }
    }
}

/// Output device information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    /// Human-readable device name.
    pub name: String,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
    /// Whether this is the system default output.
    pub is_default: bool,
}

/// Type-erased stream handle. The stream plays while this exists.
pub struct StreamHandle {
    _inner: Box<dyn Send>,
}

impl StreamHandle {
    /// Keep `stream` alive until the handle is dropped.
    pub fn new<T: Send + 'static>(stream: T) -> Self {
        Self {
            _inner: Box::new(stream),
        }
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle").finish_non_exhaustive()
    }
}

/// Audio output callback: fill an interleaved `f32` buffer.
///
/// Runs on the real-time audio thread. Must not allocate, lock or block.
pub type OutputCallback = Box<dyn FnMut(&mut [f32]) + Send>;

/// Called with a message when the stream reports an error.
pub type ErrorCallback = Box<dyn FnMut(&str) + Send>;

/// An audio output backend.
///
/// Object-safe so the backend can be chosen at runtime.
pub trait AudioBackend: Send {
    /// Backend name, e.g. `"cpal"`.
    fn name(&self) -> &str;

    /// List output devices.
    fn list_output_devices(&self) -> Result<Vec<AudioDevice>>;

    /// Build and start an output stream.
    fn build_output_stream(
        &self,
        config: &BackendStreamConfig,
        callback: OutputCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle>;
}
