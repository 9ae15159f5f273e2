//! Persistent application state — the single source of truth the
//! presentation layer renders from and mutates through.

pub mod persist;
pub mod store;
pub mod types;

pub use store::StateStore;
pub use types::{
    AppState, Attachment, Chat, Memory, MemorySource, Message, MessageMeta, ModelRole,
    ModelSelection, Role, Settings, Theme,
};
