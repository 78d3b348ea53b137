use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use ycode_core::{Message, Result, Tool, ToolCall};

/// A request to an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// Provider-specific model name, e.g. "gpt-4o".
    pub model: String,
    /// Conversation history.
    pub messages: Vec<Message>,
    /// Tools the model may call.
    pub tools: Vec<Tool>,
    /// System prompt, sent ahead of the history.
    pub system: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl LlmRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            tools: Vec::new(),
            system: None,
            max_tokens: 8192,
            temperature: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    ContentFilter,
}

impl StopReason {
    /// Map an OpenAI-style `finish_reason`.
    pub fn from_finish_reason(reason: Option<&str>, has_tool_calls: bool) -> Self {
        match reason {
            Some("length") => StopReason::MaxTokens,
            Some("content_filter") => StopReason::ContentFilter,
            _ if has_tool_calls => StopReason::ToolUse,
            _ => StopReason::EndTurn,
        }
    }
}

/// A chunk of a streaming response.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    /// Content text delta.
    TextDelta(String),
    /// A complete tool call, emitted once its arguments are fully assembled.
    ToolCall(ToolCall),
    /// Usage stats (sent at end of stream).
    Usage(Usage),
    /// Stream is done.
    Done(StopReason),
    /// An error occurred mid-stream.
    Error(String),
}

/// Token usage statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    pub fn merge(&mut self, other: &Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Implemented by each chat-completion backend.
///
/// Dropping the returned receiver stops the provider's background work.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn stream(&self, request: &LlmRequest) -> Result<mpsc::Receiver<StreamChunk>>;

    /// Check if this provider is usable before the first request.
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
