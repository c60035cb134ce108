//! Background search offload for ponder.
//!
//! This crate moves a slow, cooperative search off the interactive loop:
//!
//! - **Channel**: [`link`] builds an ordered, exactly-once message link
//!   between a producer context and a worker context ([`Message`])
//! - **Worker**: [`WorkerScheduler`] drives a [`ComputeUnit`](ponder_core::ComputeUnit)
//!   tick by tick on a single-threaded runtime, yielding after every tick so a
//!   newer request can supersede the one in flight
//! - **Producer**: [`ProducerCoordinator`] issues requests when its engine
//!   asks for a search and copies responses back into the engine's region
//! - **Reference unit**: [`BudgetUnit`], a stand-in engine that honors the
//!   protocol without searching
//!
//! ## Data Flow
//!
//! ```text
//! producer engine ─▶ request region ─▶ Request(56 B) ─▶ worker request region
//!                                                        │ begin / tick / yield
//! producer response region ◀─ Response(64 B) ◀─ worker response region
//! ```
//!
//! There is no cancel message. A request is cancelled by sending a newer one;
//! the worker notices at its next yield point and drops the stale result.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ponder_offload::{BudgetFactory, ProducerCoordinator, WorkerScheduler, link, spawn_worker};
//!
//! let (producer_link, worker_link) = link();
//! let worker = spawn_worker(WorkerScheduler::new(BudgetFactory), worker_link)?;
//!
//! let mut coordinator = ProducerCoordinator::new(engine, producer_link);
//! coordinator.send_init(image);
//! loop {
//!     coordinator.frame(&input);
//! }
//! ```

pub mod channel;
pub mod message;
pub mod producer;
pub mod reference;
pub mod worker;

pub use channel::{Inbox, Outbox, ProducerLink, WorkerLink, link};
pub use message::{Message, MessageKind};
pub use producer::{FrameInput, FrameReport, HostEngine, ProducerCoordinator, RequestId, SoundState};
pub use reference::{BudgetFactory, BudgetUnit, UnitImage};
pub use worker::{SearchOutcome, WorkerHandle, WorkerScheduler, WorkerStats, spawn_worker};

use ponder_core::RegionError;

/// Error types for the offload channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// The other side of the link has been dropped.
    #[error("channel disconnected")]
    Disconnected,

    /// A raw payload did not match the size its message kind requires.
    #[error("invalid payload: {0}")]
    Payload(#[from] RegionError),

    /// A message arrived in a direction the protocol does not allow.
    #[error("unexpected {0} message")]
    Unexpected(MessageKind),
}

/// Convenience result type for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;
