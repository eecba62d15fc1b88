//! Conversation state indexing for AI coding-assistant task storage.
//!
//! This crate turns the raw, per-task directories a host coding agent
//! leaves on disk into a queryable, bounded-memory index: a compact
//! [`Skeleton`](types::Skeleton) per task, parent/child links reconstructed
//! from declared sub-task instructions, and a leak-proof cache of
//! everything derived along the way. See [`engine::ConversationIndex`] for
//! the composition root that wires the pieces together.

pub mod cache;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod hierarchy;
pub mod parser;
pub mod queue;
pub mod radix;
pub mod retry;
pub mod skeleton;
pub mod types;

pub use config::EngineConfig;
pub use engine::ConversationIndex;
pub use error::{Error, Result};
pub use types::{Skeleton, TaskId};
