//! The synthesis-unit contract and the clip-playback implementation.

use crate::Result;
use crate::bank::SoundBank;
use crate::params::{SoundId, unpack_started_time};

/// Largest number of frames a single `fill` call renders.
///
/// 9600 stereo frames of 16-bit samples is 38 400 bytes, a fifth of a second
/// at 48 kHz. Hosts asking for more are served in chunks.
pub const MAX_FILL_FRAMES: usize = 9600;

/// Renders interleaved 16-bit stereo on the audio thread.
///
/// `fill` is called from a real-time callback: implementations must not
/// allocate, lock or block. Everything they need is set up in
/// `initialize`.
pub trait SynthesisUnit: Send {
    /// One-time setup (buffer allocation, clip preparation).
    fn initialize(&mut self) -> Result<()>;

    /// Render `frame_count` frames (clamped to [`MAX_FILL_FRAMES`]).
    ///
    /// `clock_position` is the audio clock in sample frames at the first
    /// rendered frame. The returned slice holds `2 * frame_count` samples,
    /// left/right interleaved, and stays valid until the next call.
    fn fill(
        &mut self,
        sound: u32,
        started_time_0: f32,
        started_time_1: f32,
        clock_position: f64,
        frame_count: usize,
    ) -> &[i16];
}

/// Plays one clip from a [`SoundBank`], starting at the published start time.
///
/// Both channels carry the same sample. Frames before the start or after the
/// end of the clip are silent, as are unknown sound ids.
#[derive(Debug)]
pub struct SampleBank {
    bank: SoundBank,
    buffer: Vec<i16>,
}

impl SampleBank {
    /// Wrap a bank. The render buffer is allocated by `initialize`.
    pub fn new(bank: SoundBank) -> Self {
        Self {
            bank,
            buffer: Vec::new(),
        }
    }

    /// The clips being played.
    pub fn bank(&self) -> &SoundBank {
        &self.bank
    }
}

impl SynthesisUnit for SampleBank {
    fn initialize(&mut self) -> Result<()> {
        self.buffer = vec![0; MAX_FILL_FRAMES * 2];
        Ok(())
    }

    fn fill(
        &mut self,
        sound: u32,
        started_time_0: f32,
        started_time_1: f32,
        clock_position: f64,
        frame_count: usize,
    ) -> &[i16] {
        let frames = frame_count.min(MAX_FILL_FRAMES).min(self.buffer.len() / 2);
        let out = &mut self.buffer[..frames * 2];

        let Some(clip) = self.bank.clip(SoundId::from_raw(sound)) else {
            out.fill(0);
            return out;
        };

        let started_at = unpack_started_time(started_time_0, started_time_1);
        let mut offset = clock_position.floor() as i64 - started_at as i64;
        for frame in out.chunks_exact_mut(2) {
            let sample = clip.sample_at(offset);
            frame[0] = sample;
            frame[1] = sample;
            offset += 1;
        }
        out
    }
}
