//! Sound clips: procedurally synthesized or loaded from WAV files.

use crate::params::SoundId;
use crate::{AudioError, Result};
use hound::{SampleFormat, WavReader};
use std::f32::consts::PI;
use std::path::Path;

/// A mono 16-bit clip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clip {
    samples: Vec<i16>,
    sample_rate: u32,
}

impl Clip {
    /// Wrap raw samples recorded at `sample_rate`.
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// The samples.
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Sample rate the clip was recorded at.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length in frames.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the clip is silent (no frames).
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }

    /// Sample at `index`, silence outside the clip.
    #[inline]
    pub fn sample_at(&self, index: i64) -> i16 {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.samples.get(i))
            .copied()
            .unwrap_or(0)
    }
}

/// One clip per playable [`SoundId`].
#[derive(Debug, Clone, Default)]
pub struct SoundBank {
    clips: [Clip; SoundId::PLAYABLE.len()],
}

/// A note in a synthesized cue: frequency in Hz, length in milliseconds.
type Note = (f32, f32);

fn recipe(sound: SoundId) -> &'static [Note] {
    match sound {
        SoundId::None => &[],
        SoundId::Move => &[(660.0, 60.0)],
        SoundId::Capture => &[(440.0, 40.0), (330.0, 90.0)],
        SoundId::Check => &[(880.0, 80.0), (880.0, 80.0)],
        SoundId::Draw => &[(440.0, 150.0), (440.0, 150.0)],
        SoundId::Win => &[(523.25, 120.0), (659.25, 120.0), (783.99, 260.0)],
        SoundId::Lose => &[(392.0, 150.0), (329.63, 150.0), (261.63, 320.0)],
    }
}

/// Render notes back to back as decaying sines.
///
/// Each note restarts the phase and decays exponentially to about 1% of its
/// peak over its length.
fn render_notes(notes: &[Note], sample_rate: u32) -> Vec<i16> {
    const PEAK: f32 = 0.5 * i16::MAX as f32;
    let rate = sample_rate as f32;
    let mut out = Vec::new();

    for &(freq, ms) in notes {
        let len = (ms * rate / 1000.0).round() as usize;
        let phase_inc = freq / rate;
        // exp(-len / tau) = 0.01
        let decay = (-(100f32.ln()) / len.max(1) as f32).exp();

        let mut phase = 0.0f32;
        let mut level = 1.0f32;
        out.reserve(len);
        for _ in 0..len {
            out.push(((2.0 * PI * phase).sin() * level * PEAK) as i16);
            phase += phase_inc;
            if phase >= 1.0 {
                phase -= 1.0;
            }
            level *= decay;
        }
    }
    out
}

impl SoundBank {
    /// A bank with every sound silent.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A bank of built-in tones rendered at `sample_rate`.
    pub fn synthesized(sample_rate: u32) -> Self {
        let mut bank = Self::empty();
        for sound in SoundId::PLAYABLE {
            bank.set(sound, Clip::new(render_notes(recipe(sound), sample_rate), sample_rate));
        }
        bank
    }

    /// Load `move.wav`, `capture.wav`, ... from `dir` for playback at
    /// `sample_rate`.
    ///
    /// Missing files leave that sound silent. Files that exist but cannot be
    /// read, are not 16-bit integer PCM, or were recorded at another rate are
    /// an error. Clips are played one sample per output frame.
    pub fn load_dir(dir: impl AsRef<Path>, sample_rate: u32) -> Result<Self> {
        let dir = dir.as_ref();
        let mut bank = Self::empty();

        for sound in SoundId::PLAYABLE {
            let Some(file_name) = sound.file_name() else {
                continue;
            };
            let path = dir.join(file_name);
            if !path.is_file() {
                tracing::debug!(sound = %sound, path = %path.display(), "sound file missing; silent");
                continue;
            }
            let clip = read_clip(&path, sample_rate)?;
            tracing::debug!(sound = %sound, frames = clip.len(), "loaded sound");
            bank.set(sound, clip);
        }
        Ok(bank)
    }

    /// Replace the clip for `sound`. Ignored for [`SoundId::None`].
    pub fn set(&mut self, sound: SoundId, clip: Clip) {
        if let Some(slot) = Self::slot(sound) {
            self.clips[slot] = clip;
        }
    }

    /// The clip for `sound`, if it has one.
    pub fn clip(&self, sound: SoundId) -> Option<&Clip> {
        Self::slot(sound).map(|slot| &self.clips[slot])
    }

    /// Iterate over every playable sound and its clip.
    pub fn iter(&self) -> impl Iterator<Item = (SoundId, &Clip)> {
        SoundId::PLAYABLE.into_iter().zip(self.clips.iter())
    }

    fn slot(sound: SoundId) -> Option<usize> {
        (sound.raw() as usize).checked_sub(1)
    }
}

/// Read a 16-bit PCM WAV file, mixing multi-channel audio down to mono.
fn read_clip(path: &Path, sample_rate: u32) -> Result<Clip> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(AudioError::UnsupportedFormat(format!(
            "{}: {:?} {}-bit (expected 16-bit integer PCM)",
            path.display(),
            spec.sample_format,
            spec.bits_per_sample
        )));
    }

    if spec.sample_rate != sample_rate {
        return Err(AudioError::UnsupportedFormat(format!(
            "{}: recorded at {} Hz (expected {} Hz)",
            path.display(),
            spec.sample_rate,
            sample_rate
        )));
    }

    let channels = usize::from(spec.channels.max(1));
    let samples = reader
        .into_samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mono = if channels > 1 {
        samples
            .chunks(channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
                (sum / frame.len() as i32) as i16
            })
            .collect()
    } else {
        samples
    };

    Ok(Clip::new(mono, spec.sample_rate))
}
