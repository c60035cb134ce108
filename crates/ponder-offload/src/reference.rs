//! Reference compute unit.
//!
//! [`BudgetUnit`] honors the unit contract without searching anything: it
//! "thinks" for a fixed wall-clock budget and then answers with the request
//! board echoed back. It exists so the offload machinery can be exercised end
//! to end without a chess engine.
//!
//! Request layout (56 bytes):
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0      | 48   | board |
//! | 48     | 4    | wants-move flag, little-endian `u32` |
//! | 52     | 4    | padding |
//!
//! Response layout (64 bytes): the 48 board bytes, then a 16-byte move block
//! whose first byte is the unit's search counter.

use ponder_core::{
    ComputeUnit, Region, RequestRegion, ResponseRegion, SharedSink, Side, UnitError, UnitFactory,
    UnitRegions,
};
use serde::{Deserialize, Serialize};

/// Size of the board block at the start of both records.
pub const BOARD_SIZE: usize = 48;

/// Byte offset of the wants-move flag in the request.
pub const WANTS_MOVE_OFFSET: usize = BOARD_SIZE;

/// The unit image: settings a [`BudgetUnit`] is instantiated from.
///
/// Travels in the `Init` message as UTF-8 TOML.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitImage {
    /// Wall-clock time each search takes, in milliseconds.
    pub budget_ms: f64,
    /// Working memory reserved by `allocate_memory`.
    pub memory_bytes: usize,
}

impl Default for UnitImage {
    fn default() -> Self {
        Self {
            budget_ms: 250.0,
            memory_bytes: 16 * 1024 * 1024,
        }
    }
}

impl UnitImage {
    /// Serialize to the bytes carried by an `Init` message.
    pub fn to_bytes(&self) -> Result<Vec<u8>, toml::ser::Error> {
        toml::to_string(self).map(String::into_bytes)
    }

    /// Parse an image received in an `Init` message.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, UnitError> {
        let text = std::str::from_utf8(bytes).map_err(UnitError::instantiate)?;
        let image: Self = toml::from_str(text).map_err(UnitError::instantiate)?;
        if !image.budget_ms.is_finite() || image.budget_ms < 0.0 {
            return Err(UnitError::instantiate(format!(
                "budget_ms must be a non-negative number, got {}",
                image.budget_ms
            )));
        }
        Ok(image)
    }
}

/// A unit that completes each search after a fixed time budget.
pub struct BudgetUnit {
    image: UnitImage,
    sink: SharedSink,
    request: RequestRegion,
    responses: [ResponseRegion; 2],
    arena: Vec<u8>,
    started_at: Option<f64>,
    searches: u8,
}

impl BudgetUnit {
    /// Create a unit; memory is reserved later by `allocate_memory`.
    pub fn new(image: UnitImage, sink: SharedSink) -> Self {
        Self {
            image,
            sink,
            request: Region::new(),
            responses: [Region::new(), Region::new()],
            arena: Vec::new(),
            started_at: None,
            searches: 0,
        }
    }

    /// The image this unit was built from.
    pub fn image(&self) -> &UnitImage {
        &self.image
    }

    /// Searches completed so far (wrapping).
    pub fn searches(&self) -> u8 {
        self.searches
    }

    /// Whether a search is in progress.
    pub fn is_searching(&self) -> bool {
        self.started_at.is_some()
    }

    fn wants_move(&self) -> bool {
        let bytes = self.request.as_bytes();
        let flag = [
            bytes[WANTS_MOVE_OFFSET],
            bytes[WANTS_MOVE_OFFSET + 1],
            bytes[WANTS_MOVE_OFFSET + 2],
            bytes[WANTS_MOVE_OFFSET + 3],
        ];
        u32::from_le_bytes(flag) != 0
    }

    fn publish(&mut self) {
        let board = &self.request.as_bytes()[..BOARD_SIZE];
        let out = self.responses[Side::Worker as usize].as_bytes_mut();
        out.fill(0);
        out[..BOARD_SIZE].copy_from_slice(board);
        out[BOARD_SIZE] = self.searches;
        self.searches = self.searches.wrapping_add(1);
    }
}

impl std::fmt::Debug for BudgetUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BudgetUnit")
            .field("image", &self.image)
            .field("reserved", &self.arena.capacity())
            .field("started_at", &self.started_at)
            .field("searches", &self.searches)
            .finish_non_exhaustive()
    }
}

impl UnitRegions for BudgetUnit {
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

impl ComputeUnit for BudgetUnit {
    fn allocate_memory(&mut self) -> bool {
        let bytes = self.image.memory_bytes;
        match self.arena.try_reserve_exact(bytes) {
            Ok(()) => {
                self.sink.log(&format!("reserved {bytes} bytes"));
                true
            }
            Err(err) => {
                self.sink.log(&format!("failed to reserve {bytes} bytes: {err}"));
                false
            }
        }
    }

    fn begin(&mut self, now_ms: f64) -> bool {
        if !self.wants_move() {
            return false;
        }
        self.started_at = Some(now_ms);
        true
    }

    fn tick(&mut self, now_ms: f64) -> bool {
        let Some(started_at) = self.started_at else {
            return false;
        };
        if now_ms - started_at < self.image.budget_ms {
            return true;
        }

        let search = self.searches;
        self.publish();
        self.started_at = None;
        self.sink.log(&format!(
            "search {search} done after {:.1} ms",
            now_ms - started_at
        ));
        false
    }
}

/// Builds [`BudgetUnit`]s from TOML [`UnitImage`] bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BudgetFactory;

impl UnitFactory for BudgetFactory {
    fn instantiate(
        &self,
        image: &[u8],
        sink: SharedSink,
    ) -> Result<Box<dyn ComputeUnit>, UnitError> {
        let image = UnitImage::from_bytes(image)?;
        Ok(Box::new(BudgetUnit::new(image, sink)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ponder_core::{NullSink, REQUEST_SIZE};
    use std::sync::Arc;

    fn unit(budget_ms: f64) -> BudgetUnit {
        BudgetUnit::new(
            UnitImage {
                budget_ms,
                memory_bytes: 1024,
            },
            Arc::new(NullSink),
        )
    }

    fn request(wants_move: bool) -> [u8; REQUEST_SIZE] {
        let mut bytes = [0u8; REQUEST_SIZE];
        for (i, b) in bytes[..BOARD_SIZE].iter_mut().enumerate() {
            *b = i as u8 + 1;
        }
        if wants_move {
            bytes[WANTS_MOVE_OFFSET] = 1;
        }
        bytes
    }

    #[test]
    fn image_round_trips_through_toml() {
        let image = UnitImage {
            budget_ms: 12.5,
            memory_bytes: 4096,
        };
        let bytes = image.to_bytes().unwrap();
        assert_eq!(UnitImage::from_bytes(&bytes).unwrap(), image);
    }

    #[test]
    fn empty_image_uses_defaults() {
        assert_eq!(UnitImage::from_bytes(b"").unwrap(), UnitImage::default());
    }

    #[test]
    fn bad_images_fail_to_instantiate() {
        let sink: SharedSink = Arc::new(NullSink);
        assert!(matches!(
            BudgetFactory.instantiate(b"budget_ms = \"soon\"", sink.clone()),
            Err(UnitError::Instantiate(_))
        ));
        assert!(matches!(
            BudgetFactory.instantiate(&[0xff, 0xfe], sink.clone()),
            Err(UnitError::Instantiate(_))
        ));
        assert!(matches!(
            BudgetFactory.instantiate(b"budget_ms = -1.0", sink),
            Err(UnitError::Instantiate(_))
        ));
    }

    #[test]
    fn begin_requires_wants_move() {
        let mut unit = unit(0.0);
        unit.request_region_mut()
            .copy_from_slice(&request(false))
            .unwrap();
        assert!(!unit.begin(0.0));
        assert!(!unit.is_searching());

        unit.request_region_mut()
            .copy_from_slice(&request(true))
            .unwrap();
        assert!(unit.begin(0.0));
        assert!(unit.is_searching());
    }

    #[test]
    fn runs_until_budget_then_publishes() {
        let mut unit = unit(10.0);
        assert!(unit.allocate_memory());
        unit.request_region_mut()
            .copy_from_slice(&request(true))
            .unwrap();

        assert!(unit.begin(100.0));
        assert!(unit.tick(100.0));
        assert!(unit.tick(109.9));
        assert!(!unit.tick(110.0));

        let out = unit.response_region(Side::Worker).as_bytes();
        assert_eq!(&out[..BOARD_SIZE], &request(true)[..BOARD_SIZE]);
        assert_eq!(out[BOARD_SIZE], 0);
        assert!(out[BOARD_SIZE + 1..].iter().all(|&b| b == 0));
        assert_eq!(unit.searches(), 1);

        // The producer copy is not the unit's to write.
        assert!(
            unit.response_region(Side::Producer)
                .as_bytes()
                .iter()
                .all(|&b| b == 0)
        );
    }

    #[test]
    fn counter_distinguishes_consecutive_searches() {
        let mut unit = unit(0.0);
        unit.request_region_mut()
            .copy_from_slice(&request(true))
            .unwrap();
        for expected in 0..3u8 {
            assert!(unit.begin(0.0));
            assert!(!unit.tick(0.0));
            assert_eq!(
                unit.response_region(Side::Worker).as_bytes()[BOARD_SIZE],
                expected
            );
        }
    }

    #[test]
    fn oversized_arena_fails_allocation() {
        let mut unit = BudgetUnit::new(
            UnitImage {
                budget_ms: 0.0,
                memory_bytes: usize::MAX,
            },
            Arc::new(NullSink),
        );
        assert!(!unit.allocate_memory());
    }

    #[derive(Default)]
    struct Lines(std::sync::Mutex<Vec<String>>);

    impl ponder_core::DiagnosticSink for Lines {
        fn log(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    #[test]
    fn completion_log_names_the_finished_search() {
        let lines = Arc::new(Lines::default());
        let mut unit = BudgetUnit::new(
            UnitImage {
                budget_ms: 0.0,
                memory_bytes: 0,
            },
            lines.clone(),
        );
        unit.request_region_mut()
            .copy_from_slice(&request(true))
            .unwrap();
        for _ in 0..2 {
            assert!(unit.begin(0.0));
            assert!(!unit.tick(0.0));
        }

        let lines = lines.0.lock().unwrap();
        assert!(lines[0].starts_with("search 0 done"), "{lines:?}");
        assert!(lines[1].starts_with("search 1 done"), "{lines:?}");
    }

    #[test]
    fn tick_without_begin_is_idle() {
        let mut unit = unit(0.0);
        assert!(!unit.tick(5.0));
        assert_eq!(unit.searches(), 0);
    }
}
