//! Ponder Core - shared contracts for background search offload
//!
//! This crate holds the pieces every execution context agrees on: the byte
//! regions a compute unit exposes, the fixed-size records that carry those
//! bytes across a context boundary, and the traits the opaque compute unit
//! implements.
//!
//! # Core Abstractions
//!
//! ## Regions and Records
//!
//! - [`Region`] - Address-stable, fixed-length byte buffer owned by a unit
//! - [`Record`] - Owned payload of the same declared length, safe to send
//! - [`RequestRecord`] / [`ResponseRecord`] - The 56- and 64-byte payloads
//!
//! Bytes only ever move between a region and a record through bounds-checked
//! copies. No address or offset leaves the context that owns the region.
//!
//! ## Compute Units
//!
//! - [`UnitRegions`] - Request region plus one response region per [`Side`]
//! - [`ComputeUnit`] - `allocate_memory` / `begin` / `tick` driven by a scheduler
//! - [`UnitFactory`] - Instantiates a unit from an image, once per context
//!
//! ## Diagnostics
//!
//! - [`DiagnosticSink`] - Best-effort text logging out of a unit
//! - [`TracingSink`], [`NullSink`], [`DeferredSink`]
//!
//! # Example
//!
//! ```rust
//! use ponder_core::{Region, RequestRecord, REQUEST_SIZE};
//!
//! let mut region: Region<REQUEST_SIZE> = Region::new();
//! region.as_bytes_mut()[0] = 7;
//!
//! // Copy out into a payload, then into another context's region
//! let record: RequestRecord = region.read_record();
//! let mut remote: Region<REQUEST_SIZE> = Region::new();
//! remote.write_record(&record);
//! assert_eq!(remote.as_bytes(), region.as_bytes());
//! ```

pub mod diag;
mod error;
pub mod region;
pub mod unit;

pub use diag::{DeferredSink, DiagnosticSink, NullSink, SharedSink, TracingSink};
pub use error::{RegionError, UnitError};
pub use region::{
    REQUEST_SIZE, RESPONSE_SIZE, Record, Region, RequestRecord, RequestRegion, ResponseRecord,
    ResponseRegion,
};
pub use unit::{ComputeUnit, Side, UnitFactory, UnitRegions};
