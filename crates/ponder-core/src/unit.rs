//! The opaque compute unit contract.
//!
//! A compute unit is the search engine instance living inside one execution
//! context. Each context hosts its own instance; instances never share
//! memory. The scheduler around a unit only ever touches it through the
//! traits in this module.
//!
//! ```text
//!   producer context                    worker context
//!  ┌──────────────────────┐           ┌──────────────────────┐
//!  │ unit (producer side) │           │ unit (worker side)   │
//!  │  request region ─────┼── record ─┼─▶ request region     │
//!  │  response[Producer] ◀┼── record ─┼── response[Worker]   │
//!  └──────────────────────┘           └──────────────────────┘
//! ```

use crate::diag::SharedSink;
use crate::error::UnitError;
use crate::region::{RequestRegion, ResponseRegion};

/// Which context a response region belongs to.
///
/// A unit exposes one response region per side: the worker's copy is
/// written by the search, the producer's copy is written by the
/// coordinator when a response message arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The context that owns UI state and issues requests.
    Producer,
    /// The context that runs the search.
    Worker,
}

impl Side {
    /// Lowercase name used in log fields.
    pub const fn as_str(self) -> &'static str {
        match self {
            Side::Producer => "producer",
            Side::Worker => "worker",
        }
    }
}

/// Access to the fixed regions a unit exposes.
pub trait UnitRegions {
    /// Region the next search request is read from.
    fn request_region(&self) -> &RequestRegion;

    /// Mutable access to the request region.
    fn request_region_mut(&mut self) -> &mut RequestRegion;

    /// Response region for the given side.
    fn response_region(&self, side: Side) -> &ResponseRegion;

    /// Mutable access to the response region for the given side.
    fn response_region_mut(&mut self, side: Side) -> &mut ResponseRegion;
}

/// A search engine instance driven cooperatively.
///
/// Timestamps are milliseconds on a clock owned by the hosting context.
/// `tick` must do a bounded amount of work per call; a full search takes
/// many ticks.
pub trait ComputeUnit: UnitRegions {
    /// Reserve the unit's working memory. Returns `false` on failure.
    fn allocate_memory(&mut self) -> bool;

    /// Start a search on the current request region contents.
    ///
    /// Returns `false` when the unit refuses to start (for example, the
    /// request does not ask for a move).
    fn begin(&mut self, now_ms: f64) -> bool;

    /// Advance the running search. Returns `true` while still running.
    ///
    /// When this returns `false` the result has been published into the
    /// worker response region.
    fn tick(&mut self, now_ms: f64) -> bool;
}

/// Builds compute units from an image.
///
/// The worker calls this at most once, on the first `init` message.
pub trait UnitFactory: Send {
    /// Instantiate a unit from `image`, handing it a diagnostic sink.
    fn instantiate(&self, image: &[u8], sink: SharedSink)
    -> Result<Box<dyn ComputeUnit>, UnitError>;
}

impl<F> UnitFactory for F
where
    F: Fn(&[u8], SharedSink) -> Result<Box<dyn ComputeUnit>, UnitError> + Send,
{
    fn instantiate(
        &self,
        image: &[u8],
        sink: SharedSink,
    ) -> Result<Box<dyn ComputeUnit>, UnitError> {
        self(image, sink)
    }
}

impl<T: UnitRegions + ?Sized> UnitRegions for Box<T> {
    fn request_region(&self) -> &RequestRegion {
        (**self).request_region()
    }

    fn request_region_mut(&mut self) -> &mut RequestRegion {
        (**self).request_region_mut()
    }

    fn response_region(&self, side: Side) -> &ResponseRegion {
        (**self).response_region(side)
    }

    fn response_region_mut(&mut self, side: Side) -> &mut ResponseRegion {
        (**self).response_region_mut(side)
    }
}

impl<T: ComputeUnit + ?Sized> ComputeUnit for Box<T> {
    fn allocate_memory(&mut self) -> bool {
        (**self).allocate_memory()
    }

    fn begin(&mut self, now_ms: f64) -> bool {
        (**self).begin(now_ms)
    }

    fn tick(&mut self, now_ms: f64) -> bool {
        (**self).tick(now_ms)
    }
}
