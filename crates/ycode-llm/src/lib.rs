//! # ycode-llm
//!
//! Abstraction over chat-completion providers. Every provider streams text
//! deltas and complete tool calls through a channel.

pub mod mock;
pub mod openai;
pub mod provider;

pub use mock::{MockProvider, MockResponse};
pub use openai::OpenAiProvider;
pub use provider::{LlmProvider, LlmRequest, StopReason, StreamChunk, Usage};
