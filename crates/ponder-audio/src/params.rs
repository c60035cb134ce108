//! Parameters shared between the producer and the audio callback.
//!
//! The producer writes once per frame, the audio thread reads once per
//! callback. Each word is an independent atomic: a reader may see a new
//! sound id next to an old start time for one callback. That tear lasts at
//! most one buffer and is accepted in exchange for never locking.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Sound cue identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum SoundId {
    /// Nothing playing.
    #[default]
    None = 0,
    /// A piece moved.
    Move = 1,
    /// A piece was captured.
    Capture = 2,
    /// A king is in check.
    Check = 3,
    /// The game ended in a draw.
    Draw = 4,
    /// The player won.
    Win = 5,
    /// The player lost.
    Lose = 6,
}

impl SoundId {
    /// Every sound that has a clip, in id order.
    pub const PLAYABLE: [SoundId; 6] = [
        SoundId::Move,
        SoundId::Capture,
        SoundId::Check,
        SoundId::Draw,
        SoundId::Win,
        SoundId::Lose,
    ];

    /// Map a raw id to a sound. Unknown ids are [`SoundId::None`].
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            1 => SoundId::Move,
            2 => SoundId::Capture,
            3 => SoundId::Check,
            4 => SoundId::Draw,
            5 => SoundId::Win,
            6 => SoundId::Lose,
            _ => SoundId::None,
        }
    }

    /// Raw id.
    pub const fn raw(self) -> u32 {
        self as u32
    }

    /// Lowercase name.
    pub const fn name(self) -> &'static str {
        match self {
            SoundId::None => "none",
            SoundId::Move => "move",
            SoundId::Capture => "capture",
            SoundId::Check => "check",
            SoundId::Draw => "draw",
            SoundId::Win => "win",
            SoundId::Lose => "lose",
        }
    }

    /// File name the clip is loaded from, if the sound has one.
    pub fn file_name(self) -> Option<String> {
        match self {
            SoundId::None => None,
            other => Some(format!("{}.wav", other.name())),
        }
    }
}

impl std::fmt::Display for SoundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Split a sample position into two `f32` words.
///
/// The position is converted to `f64` and its 64-bit pattern is cut into low
/// and high halves, each reinterpreted as an `f32`. Exact for every position
/// below 2^53.
pub fn pack_started_time(started_at: u64) -> (f32, f32) {
    let bits = (started_at as f64).to_bits();
    (
        f32::from_bits(bits as u32),
        f32::from_bits((bits >> 32) as u32),
    )
}

/// Inverse of [`pack_started_time`].
pub fn unpack_started_time(low: f32, high: f32) -> u64 {
    let bits = (u64::from(high.to_bits()) << 32) | u64::from(low.to_bits());
    f64::from_bits(bits) as u64
}

/// One consistent-enough read of [`AudioParams`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParamSnapshot {
    /// Raw sound id.
    pub sound: u32,
    /// Low word of the packed start time.
    pub started_time_0: f32,
    /// High word of the packed start time.
    pub started_time_1: f32,
}

impl ParamSnapshot {
    /// The sound, with unknown ids mapped to [`SoundId::None`].
    pub fn sound_id(&self) -> SoundId {
        SoundId::from_raw(self.sound)
    }

    /// Unpacked start position in sample frames.
    pub fn started_at(&self) -> u64 {
        unpack_started_time(self.started_time_0, self.started_time_1)
    }
}

/// Sound parameters, producer → audio thread.
///
/// Stored as raw bits so no float canonicalization can alter the packed
/// start time on its way through.
#[derive(Debug, Default)]
pub struct AudioParams {
    sound: AtomicU32,
    started_time_0: AtomicU32,
    started_time_1: AtomicU32,
}

impl AudioParams {
    /// All-zero parameters: no sound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish the current cue (producer thread).
    #[inline]
    pub fn publish(&self, sound: SoundId, started_at: u64) {
        self.publish_raw(sound.raw(), started_at);
    }

    /// Publish a raw sound id. Ids the synthesis unit does not know play
    /// silence.
    #[inline]
    pub fn publish_raw(&self, sound: u32, started_at: u64) {
        let (low, high) = pack_started_time(started_at);
        self.started_time_0.store(low.to_bits(), Ordering::Release);
        self.started_time_1.store(high.to_bits(), Ordering::Release);
        self.sound.store(sound, Ordering::Release);
    }

    /// Read the current cue (audio thread).
    #[inline]
    pub fn snapshot(&self) -> ParamSnapshot {
        ParamSnapshot {
            sound: self.sound.load(Ordering::Acquire),
            started_time_0: f32::from_bits(self.started_time_0.load(Ordering::Acquire)),
            started_time_1: f32::from_bits(self.started_time_1.load(Ordering::Acquire)),
        }
    }
}

/// Frames rendered by the audio callback since the stream started.
#[derive(Debug, Default)]
pub struct AudioClock {
    frames: AtomicU64,
}

impl AudioClock {
    /// A clock at position zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current position in sample frames.
    #[inline]
    pub fn position(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    /// Advance by `frames` (audio thread).
    #[inline]
    pub fn advance(&self, frames: u64) {
        self.frames.fetch_add(frames, Ordering::AcqRel);
    }

    /// Position converted to seconds at `sample_rate`.
    pub fn seconds(&self, sample_rate: u32) -> f64 {
        if sample_rate == 0 {
            return 0.0;
        }
        self.position() as f64 / f64::from(sample_rate)
    }
}
