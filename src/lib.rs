//! Mastermind assistant shell — client-side core.
//!
//! What lives here is the part of the desktop chat client with actual
//! invariants: the persistent conversation/memory store ([`state`]), the
//! message orchestrator ([`orchestrator`]) and the dual-transport backend
//! access ([`transport`]). The presentation layer renders [`state`] snapshots
//! and calls store mutations; it owns no durable state of its own.

pub mod config;
pub mod error;
pub mod logger;
pub mod orchestrator;
pub mod state;
pub mod transport;

pub use error::AppError;
pub use orchestrator::Orchestrator;
pub use state::StateStore;
pub use transport::Transport;
