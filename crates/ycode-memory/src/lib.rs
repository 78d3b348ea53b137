//! # ycode-memory
//!
//! File-backed memory for the YCode agent, partitioned into scopes:
//!
//! - **profile**: stable user preferences, shared by every session and project.
//! - **daily**: one list per calendar date, deleted after the retention window.
//! - **project**: one list per project key, plus an optional `AGENTS.md`.
//! - **notes**: free-form markdown documents, only ever read.
//!
//! Each list is one JSON file. Writes deduplicate by normalized content and
//! evict the least recently updated items once a scope is full.

pub mod item;
pub mod scope;
pub mod search;
pub mod store;

mod files;
mod heartbeat;

pub use item::MemoryItem;
pub use scope::{MemoryCategory, Scope, sanitize_project_key};
pub use search::{MemoryHit, tokenize};
pub use store::{MemorySettings, MemoryStore, MemoryWrite};
