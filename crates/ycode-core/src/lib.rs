//! # ycode-core
//!
//! Core types, traits, and primitives for the YCode coding-agent runtime.
//! This crate defines the shared vocabulary used by every other crate in the workspace.

pub mod error;
pub mod event;
pub mod message;
pub mod tool;

pub use error::{Result, YcodeError};
pub use event::{ConversationEvent, Event, EventBus};
pub use message::{Message, MessageContent, Role};
pub use tool::{Tool, ToolCall, ToolExecutor, ToolProvider, ToolResult};
