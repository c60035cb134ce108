//! Settings validation.
//!
//! Every rule is checked; all violations are reported together.

use crate::settings::Settings;
use thiserror::Error;

/// Lowest accepted output sample rate in Hz.
pub const MIN_SAMPLE_RATE: u32 = 8_000;

/// Highest accepted output sample rate in Hz.
pub const MAX_SAMPLE_RATE: u32 = 192_000;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The render loop must tick.
    #[error("producer.frame_rate must be greater than zero")]
    ZeroFrameRate,

    /// Simulated positions must come at some interval.
    #[error("producer.move_interval must be greater than zero")]
    ZeroMoveInterval,

    /// The search budget is not a usable duration.
    #[error("worker.budget_ms must be a non-negative number, got {0}")]
    InvalidBudget(f64),

    /// The reference unit needs some memory.
    #[error("worker.memory_bytes must be greater than zero")]
    ZeroMemory,

    /// The audio device buffer must hold frames.
    #[error("audio.buffer_size must be greater than zero")]
    ZeroBufferSize,

    /// Sample rate outside what output devices accept.
    #[error("audio.sample_rate {value} out of range [{min}, {max}]")]
    SampleRateOutOfRange {
        /// Configured rate.
        value: u32,
        /// Minimum allowed rate.
        min: u32,
        /// Maximum allowed rate.
        max: u32,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Check every rule, returning one error or [`ValidationError::Multiple`].
pub fn validate_settings(settings: &Settings) -> ValidationResult<()> {
    let mut errors = Vec::new();

    if settings.producer.frame_rate == 0 {
        errors.push(ValidationError::ZeroFrameRate);
    }
    if settings.producer.move_interval == 0 {
        errors.push(ValidationError::ZeroMoveInterval);
    }

    let budget = settings.worker.budget_ms;
    if !budget.is_finite() || budget < 0.0 {
        errors.push(ValidationError::InvalidBudget(budget));
    }
    if settings.worker.memory_bytes == 0 {
        errors.push(ValidationError::ZeroMemory);
    }

    if settings.audio.buffer_size == 0 {
        errors.push(ValidationError::ZeroBufferSize);
    }
    let rate = settings.audio.sample_rate;
    if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&rate) {
        errors.push(ValidationError::SampleRateOutOfRange {
            value: rate,
            min: MIN_SAMPLE_RATE,
            max: MAX_SAMPLE_RATE,
        });
    }

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}
