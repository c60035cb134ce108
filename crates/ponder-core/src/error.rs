//! Error types shared by every context.

use thiserror::Error;

/// A payload did not match the declared length of its region.
///
/// Copies are all-or-nothing: when this error is returned the destination
/// has not been touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegionError {
    /// Source length differs from the fixed region length.
    #[error("payload size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Declared length of the region.
        expected: usize,
        /// Length of the rejected payload.
        actual: usize,
    },
}

/// A compute unit could not be brought up.
///
/// Every variant is an initialization failure: the context that hit it stays
/// inert for the rest of its life and never retries.
#[derive(Debug, Error)]
pub enum UnitError {
    /// The unit image could not be turned into a running instance.
    #[error("failed to instantiate compute unit: {0}")]
    Instantiate(String),

    /// The unit could not reserve its working memory.
    #[error("compute unit could not allocate its working memory")]
    Allocate,

    /// The execution context hosting the unit could not be started.
    #[error("failed to start unit runtime: {0}")]
    Runtime(String),
}

impl UnitError {
    /// Create an instantiation error from anything displayable.
    pub fn instantiate(reason: impl std::fmt::Display) -> Self {
        UnitError::Instantiate(reason.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_mismatch_display() {
        let err = RegionError::SizeMismatch {
            expected: 56,
            actual: 12,
        };
        assert_eq!(
            err.to_string(),
            "payload size mismatch: expected 56 bytes, got 12"
        );
    }

    #[test]
    fn allocate_display() {
        assert_eq!(
            UnitError::Allocate.to_string(),
            "compute unit could not allocate its working memory"
        );
    }

    #[test]
    fn instantiate_factory() {
        let err = UnitError::instantiate("bad magic");
        assert!(matches!(err, UnitError::Instantiate(ref m) if m == "bad magic"));
    }
}
