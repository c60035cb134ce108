//! Configuration for ponder.
//!
//! # Features
//!
//! - **Settings**: [`Settings`], one TOML file with `[producer]`, `[worker]`
//!   and `[audio]` tables; every field defaults
//! - **Validation**: [`validate_settings`] reports every violated rule at once
//! - **Paths**: platform-specific config directory
//!
//! # Example
//!
//! ```rust,no_run
//! use ponder_config::{Settings, user_config_file};
//!
//! let mut settings = Settings::load_or_default().unwrap();
//! settings.worker.budget_ms = 100.0;
//! settings.validate().unwrap();
//! settings.save(user_config_file()).unwrap();
//! ```

mod error;
mod settings;

/// Platform-specific paths for configuration.
pub mod paths;

/// Settings validation.
pub mod validation;

pub use error::ConfigError;
pub use paths::{CONFIG_FILE_NAME, ensure_user_config_dir, user_config_dir, user_config_file};
pub use settings::{AudioSettings, ProducerSettings, Settings, WorkerSettings};
pub use validation::{
    MAX_SAMPLE_RATE, MIN_SAMPLE_RATE, ValidationError, ValidationResult, validate_settings,
};
