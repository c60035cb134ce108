//! A scripted host engine for `ponder run`.
//!
//! Stands in for the interactive game: every `move_interval` frames the
//! "player" moves, which rewrites the board and asks the worker for a reply.
//! Replies arriving in the producer response region count as engine moves.
//! Each move also cues a sound stamped with the current audio position.

use ponder_audio::SoundId;
use ponder_core::{Region, RequestRegion, ResponseRecord, ResponseRegion, Side, UnitRegions};
use ponder_offload::reference::{BOARD_SIZE, WANTS_MOVE_OFFSET};
use ponder_offload::{FrameInput, HostEngine, SoundState};

/// Every this many engine moves, the reply is announced as a check.
const CHECK_EVERY: u64 = 4;

pub struct DemoEngine {
    request: RequestRegion,
    responses: [ResponseRegion; 2],
    move_interval: u64,
    last_reply: ResponseRecord,
    player_moves: u64,
    engine_moves: u64,
    sound: SoundState,
}

impl DemoEngine {
    pub fn new(move_interval: u64) -> Self {
        Self {
            request: Region::new(),
            responses: [Region::new(), Region::new()],
            move_interval: move_interval.max(1),
            last_reply: ResponseRecord::default(),
            player_moves: 0,
            engine_moves: 0,
            sound: SoundState::default(),
        }
    }

    pub fn player_moves(&self) -> u64 {
        self.player_moves
    }

    pub fn engine_moves(&self) -> u64 {
        self.engine_moves
    }

    fn cue(&mut self, sound: SoundId, input: &FrameInput) {
        self.sound = SoundState {
            sound: sound.raw(),
            started_at: input.audio_position,
        };
    }

    /// Apply a reply from the worker if one arrived since the last frame.
    fn take_reply(&mut self, input: &FrameInput) {
        let reply = self.responses[Side::Producer as usize].read_record();
        if reply == self.last_reply {
            return;
        }
        self.last_reply = reply;
        self.engine_moves += 1;

        let sound = if self.engine_moves % CHECK_EVERY == 0 {
            SoundId::Check
        } else {
            SoundId::Capture
        };
        self.cue(sound, input);
    }

    fn player_move(&mut self, input: &FrameInput) {
        self.player_moves += 1;
        let bytes = self.request.as_bytes_mut();
        bytes[..8].copy_from_slice(&self.player_moves.to_le_bytes());
        bytes[8..16].copy_from_slice(&input.frame.to_le_bytes());
        bytes[16..BOARD_SIZE].fill((self.player_moves % 251) as u8);
        bytes[WANTS_MOVE_OFFSET..WANTS_MOVE_OFFSET + 4].copy_from_slice(&1u32.to_le_bytes());
        self.cue(SoundId::Move, input);
    }
}

impl UnitRegions for DemoEngine {
    fn request_region(&self) -> &RequestRegion {
        &self.request
    }

    fn request_region_mut(&mut self) -> &mut RequestRegion {
        &mut self.request
    }

    fn response_region(&self, side: Side) -> &ResponseRegion {
        &self.responses[side as usize]
    }

    fn response_region_mut(&mut self, side: Side) -> &mut ResponseRegion {
        &mut self.responses[side as usize]
    }
}

impl HostEngine for DemoEngine {
    fn step(&mut self, input: &FrameInput) -> bool {
        self.take_reply(input);
        if input.frame % self.move_interval != 0 {
            return false;
        }
        self.player_move(input);
        true
    }

    fn sound_state(&self) -> SoundState {
        self.sound
    }
}
