//! Fixed-size byte regions and the records that carry their contents.
//!
//! A [`Region`] is the memory a compute unit reads requests from and writes
//! responses into. It is heap-allocated once, so its address never changes
//! while the owning unit lives, and its length is part of its type.
//!
//! A [`Record`] is the value that crosses a context boundary. Moving bytes
//! between the two is either infallible (same `N` on both sides, checked by
//! the compiler) or bounds-checked at runtime through
//! [`Region::copy_from_slice`] and [`Record::from_slice`].

use crate::error::RegionError;

/// Size in bytes of a search request payload.
pub const REQUEST_SIZE: usize = 56;

/// Size in bytes of a search response payload.
pub const RESPONSE_SIZE: usize = 64;

/// Address-stable, fixed-length byte buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct Region<const N: usize> {
    bytes: Box<[u8; N]>,
}

/// Region holding the current search request.
pub type RequestRegion = Region<REQUEST_SIZE>;

/// Region holding a search response.
pub type ResponseRegion = Region<RESPONSE_SIZE>;

impl<const N: usize> Region<N> {
    /// Create a zero-filled region.
    pub fn new() -> Self {
        Self {
            bytes: Box::new([0; N]),
        }
    }

    /// Declared length of the region.
    #[inline]
    pub const fn len(&self) -> usize {
        N
    }

    /// Whether the region has zero length.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Borrow the region contents.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; N] {
        &self.bytes
    }

    /// Mutably borrow the region contents.
    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8; N] {
        &mut self.bytes
    }

    /// Copy `src` into the region.
    ///
    /// `src` must be exactly `N` bytes long. Anything else is rejected and the
    /// region keeps its previous contents.
    pub fn copy_from_slice(&mut self, src: &[u8]) -> Result<(), RegionError> {
        if src.len() != N {
            return Err(RegionError::SizeMismatch {
                expected: N,
                actual: src.len(),
            });
        }
        self.bytes.copy_from_slice(src);
        Ok(())
    }

    /// Overwrite the region with a record of the same length.
    #[inline]
    pub fn write_record(&mut self, record: &Record<N>) {
        *self.bytes = record.bytes;
    }

    /// Snapshot the region into a record.
    #[inline]
    pub fn read_record(&self) -> Record<N> {
        Record { bytes: *self.bytes }
    }

    /// Zero the region.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }
}

impl<const N: usize> Default for Region<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> std::fmt::Debug for Region<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Region").field("len", &N).finish_non_exhaustive()
    }
}

/// Owned payload of exactly `N` bytes.
///
/// Records are immutable once built; the only way to change bytes is to
/// write them into a [`Region`] and read a new record back.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Record<const N: usize> {
    bytes: [u8; N],
}

/// Payload of a search request.
pub type RequestRecord = Record<REQUEST_SIZE>;

/// Payload of a search response.
pub type ResponseRecord = Record<RESPONSE_SIZE>;

impl<const N: usize> Record<N> {
    /// Wrap an array as a record.
    pub const fn new(bytes: [u8; N]) -> Self {
        Self { bytes }
    }

    /// Build a record from a slice, rejecting any length other than `N`.
    pub fn from_slice(src: &[u8]) -> Result<Self, RegionError> {
        let bytes: [u8; N] = src.try_into().map_err(|_| RegionError::SizeMismatch {
            expected: N,
            actual: src.len(),
        })?;
        Ok(Self { bytes })
    }

    /// Borrow the payload bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; N] {
        &self.bytes
    }
}

impl<const N: usize> Default for Record<N> {
    fn default() -> Self {
        Self { bytes: [0; N] }
    }
}

impl<const N: usize> From<[u8; N]> for Record<N> {
    fn from(bytes: [u8; N]) -> Self {
        Self { bytes }
    }
}

impl<const N: usize> AsRef<[u8]> for Record<N> {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl<const N: usize> std::fmt::Debug for Record<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // First bytes are enough to tell payloads apart in logs.
        let head = &self.bytes[..N.min(8)];
        f.debug_struct("Record")
            .field("len", &N)
            .field("head", &head)
            .finish()
    }
}
