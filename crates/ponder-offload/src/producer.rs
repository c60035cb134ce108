//! Producer-side request issuing and response delivery.
//!
//! The producer owns the interactive state. Once per frame it drains any
//! responses the worker sent, lets its engine advance, and posts a fresh
//! request whenever the engine's request region changed. Issuing a newer
//! request is the only way to cancel an older one.

use crate::ChannelError;
use crate::channel::ProducerLink;
use crate::message::Message;
use ponder_core::{ResponseRecord, Side, UnitRegions};

/// Identifier of an issued request. Strictly increasing, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    /// Raw sequence number.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-frame input handed to the host engine.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameInput {
    /// Frame counter since start.
    pub frame: u64,
    /// Producer clock in milliseconds.
    pub now_ms: f64,
    /// Audio clock position in sample frames.
    pub audio_position: u64,
}

/// Sound the host engine currently wants played.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoundState {
    /// Raw sound identifier (0 = none).
    pub sound: u32,
    /// Audio sample position the sound started at.
    pub started_at: u64,
}

/// The producer-side engine: owns the regions and the interactive state.
pub trait HostEngine: UnitRegions {
    /// Advance one frame. Returns `true` when the request region changed
    /// and a search should be issued.
    fn step(&mut self, input: &FrameInput) -> bool;

    /// Sound to publish to the audio context this frame.
    fn sound_state(&self) -> SoundState;
}

/// What happened during one [`ProducerCoordinator::frame`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Responses copied into the producer region before stepping.
    pub responses: usize,
    /// Request issued after stepping, if the engine asked for one.
    pub request: Option<RequestId>,
    /// The engine's sound state after stepping.
    pub sound: SoundState,
}

/// Drives the producer half of the offload protocol.
///
/// There is no acknowledgement, retry or timeout: a request that never gets
/// an answer looks exactly like one that is still being searched.
#[derive(Debug)]
pub struct ProducerCoordinator<U> {
    engine: U,
    link: ProducerLink,
    next_id: u64,
    last_request: Option<RequestId>,
    responses_applied: u64,
    link_lost: bool,
}

impl<U: UnitRegions> ProducerCoordinator<U> {
    /// Wrap the producer-side engine and its link to the worker.
    pub fn new(engine: U, link: ProducerLink) -> Self {
        Self {
            engine,
            link,
            next_id: 0,
            last_request: None,
            responses_applied: 0,
            link_lost: false,
        }
    }

    /// The producer-side engine.
    pub fn engine(&self) -> &U {
        &self.engine
    }

    /// Mutable access to the producer-side engine.
    pub fn engine_mut(&mut self) -> &mut U {
        &mut self.engine
    }

    /// Number of requests issued so far.
    pub fn requests_issued(&self) -> u64 {
        self.next_id
    }

    /// Number of responses copied into the producer region so far.
    pub fn responses_applied(&self) -> u64 {
        self.responses_applied
    }

    /// The most recently issued request, the only one that may still be live.
    pub fn last_request(&self) -> Option<RequestId> {
        self.last_request
    }

    /// Post the compute-unit image to the worker.
    pub fn send_init(&mut self, image: Vec<u8>) {
        tracing::debug!(image_bytes = image.len(), "sending init to worker");
        let sent = self.link.send(Message::Init(image));
        self.note_send(sent.is_ok());
    }

    /// Snapshot the request region and post it as a new request.
    ///
    /// The id is assigned even when the worker is gone, so ids stay strictly
    /// increasing across the coordinator's lifetime.
    pub fn on_engine_requests_search(&mut self) -> RequestId {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        self.last_request = Some(id);

        let record = self.engine.request_region().read_record();
        let sent = self.link.send(Message::Request(record));
        self.note_send(sent.is_ok());
        tracing::trace!(%id, "search requested");
        id
    }

    /// Copy a response verbatim into the producer response region.
    pub fn on_worker_response(&mut self, record: &ResponseRecord) {
        self.engine
            .response_region_mut(Side::Producer)
            .write_record(record);
        self.responses_applied += 1;
    }

    /// Apply every response waiting on the link, in arrival order.
    ///
    /// Never blocks. Returns how many responses were applied.
    pub fn poll_responses(&mut self) -> usize {
        let mut applied = 0;
        loop {
            match self.link.try_recv() {
                Ok(Some(Message::Response(record))) => {
                    self.on_worker_response(&record);
                    applied += 1;
                }
                Ok(Some(other)) => {
                    let err = ChannelError::Unexpected(other.kind());
                    tracing::warn!(error = %err, "ignoring message from worker");
                }
                Ok(None) => break,
                Err(_) => {
                    self.note_send(false);
                    break;
                }
            }
        }
        applied
    }

    fn note_send(&mut self, ok: bool) {
        if !ok && !self.link_lost {
            self.link_lost = true;
            tracing::warn!("worker link disconnected; searches will go unanswered");
        }
    }
}

impl<U: HostEngine> ProducerCoordinator<U> {
    /// Run one producer frame: deliver responses, step the engine, then
    /// issue a request if the engine changed its request region.
    pub fn frame(&mut self, input: &FrameInput) -> FrameReport {
        let responses = self.poll_responses();
        let changed = self.engine.step(input);
        let request = changed.then(|| self.on_engine_requests_search());

        FrameReport {
            responses,
            request,
            sound: self.engine.sound_state(),
        }
    }
}
