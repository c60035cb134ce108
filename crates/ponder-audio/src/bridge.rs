//! Audio-callback side of the sound bridge.
//!
//! [`AudioBridge`] lives on the audio thread. Each callback it snapshots
//! [`AudioParams`], asks the synthesis unit for samples at the current
//! [`AudioClock`] position, converts them to `f32` and advances the clock.
//! Anything that prevents rendering (no unit, failed initialization, a
//! channel layout it does not support) produces silence instead.

use crate::params::{AudioClock, AudioParams};
use crate::synthesis::{MAX_FILL_FRAMES, SynthesisUnit};
use std::sync::Arc;

const SCALE: f32 = 1.0 / 32768.0;

/// Renders sound cues inside the host audio callback.
pub struct AudioBridge {
    unit: Option<Box<dyn SynthesisUnit>>,
    params: Arc<AudioParams>,
    clock: Arc<AudioClock>,
    silence: Vec<i16>,
}

impl AudioBridge {
    /// A bridge with no synthesis unit: renders silence until one is
    /// attached.
    pub fn new(params: Arc<AudioParams>, clock: Arc<AudioClock>) -> Self {
        Self {
            unit: None,
            params,
            clock,
            silence: vec![0; MAX_FILL_FRAMES * 2],
        }
    }

    /// Attach and initialize a synthesis unit.
    ///
    /// If initialization fails the failure is logged and the bridge keeps
    /// rendering silence.
    pub fn with_unit(mut self, mut unit: Box<dyn SynthesisUnit>) -> Self {
        match unit.initialize() {
            Ok(()) => self.unit = Some(unit),
            Err(err) => tracing::error!(error = %err, "synthesis unit failed to initialize; audio muted"),
        }
        self
    }

    /// Whether a unit is attached and initialized.
    pub fn is_initialized(&self) -> bool {
        self.unit.is_some()
    }

    /// Shared parameter set.
    pub fn params(&self) -> &Arc<AudioParams> {
        &self.params
    }

    /// Shared clock.
    pub fn clock(&self) -> &Arc<AudioClock> {
        &self.clock
    }

    /// Render up to [`MAX_FILL_FRAMES`] frames at the current clock
    /// position without advancing the clock.
    ///
    /// Returns interleaved stereo; all zeros when no unit is initialized.
    pub fn fill(&mut self, frame_count: usize) -> &[i16] {
        let frames = frame_count.min(MAX_FILL_FRAMES);
        match self.unit.as_mut() {
            Some(unit) => {
                let snap = self.params.snapshot();
                unit.fill(
                    snap.sound,
                    snap.started_time_0,
                    snap.started_time_1,
                    self.clock.position() as f64,
                    frames,
                )
            }
            None => &self.silence[..frames * 2],
        }
    }

    /// Host callback with one buffer per channel.
    ///
    /// Renders only for exactly two channels; any other layout is zero
    /// filled. `min(len)` frames are rendered and the clock advances by the
    /// first channel's length either way.
    pub fn process(&mut self, outputs: &mut [&mut [f32]]) {
        let advance = outputs.first().map_or(0, |ch| ch.len());

        if let [left, right] = outputs
            && self.unit.is_some()
        {
            let frames = left.len().min(right.len());
            let mut done = 0;
            while done < frames {
                let chunk = (frames - done).min(MAX_FILL_FRAMES);
                let samples = self.fill(chunk);
                for (i, frame) in samples.chunks_exact(2).enumerate() {
                    left[done + i] = f32::from(frame[0]) * SCALE;
                    right[done + i] = f32::from(frame[1]) * SCALE;
                }
                self.clock.advance(chunk as u64);
                done += chunk;
            }
            left[frames..].fill(0.0);
            right[frames..].fill(0.0);
            self.clock.advance((advance - frames) as u64);
            return;
        }

        for channel in outputs.iter_mut() {
            channel.fill(0.0);
        }
        self.clock.advance(advance as u64);
    }

    /// Host callback with an interleaved device buffer.
    ///
    /// Stereo devices get left/right, mono devices the average of both, and
    /// any channel past the second is zeroed.
    pub fn process_interleaved(&mut self, data: &mut [f32], channels: usize) {
        if channels == 0 {
            return;
        }
        let frames = data.len() / channels;
        if self.unit.is_none() {
            data.fill(0.0);
            self.clock.advance(frames as u64);
            return;
        }

        let mut done = 0;
        while done < frames {
            let chunk = (frames - done).min(MAX_FILL_FRAMES);
            let samples = self.fill(chunk);
            let out = &mut data[done * channels..(done + chunk) * channels];
            for (frame, pair) in out.chunks_exact_mut(channels).zip(samples.chunks_exact(2)) {
                let left = f32::from(pair[0]) * SCALE;
                let right = f32::from(pair[1]) * SCALE;
                if channels == 1 {
                    frame[0] = 0.5 * (left + right);
                } else {
                    frame[0] = left;
                    frame[1] = right;
                    frame[2..].fill(0.0);
                }
            }
            self.clock.advance(chunk as u64);
            done += chunk;
        }
        data[frames * channels..].fill(0.0);
    }
}

impl std::fmt::Debug for AudioBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioBridge")
            .field("initialized", &self.is_initialized())
            .field("params", &self.params)
            .field("clock", &self.clock)
            .finish()
    }
}
