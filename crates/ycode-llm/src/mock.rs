//! Mock LLM provider for deterministic testing.
//!
//! Plays back scripted responses without making any HTTP calls.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use ycode_core::{Result, ToolCall, YcodeError};

use crate::provider::*;

/// A scripted response: streamed text, then tool calls.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub stop_reason: StopReason,
    pub usage: Usage,
    /// Fail the `stream` call itself with this message.
    pub error: Option<String>,
    /// Emit this as a mid-stream error after the text.
    pub stream_error: Option<String>,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            text: String::new(),
            tool_calls: vec![],
            stop_reason: StopReason::EndTurn,
            usage: Usage {
                input_tokens: 100,
                output_tokens: 50,
            },
            error: None,
            stream_error: None,
        }
    }
}

impl MockResponse {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            stop_reason: StopReason::ToolUse,
            ..Default::default()
        }
    }
}

/// A provider that returns queued responses in order and records every request.
pub struct MockProvider {
    name: String,
    responses: Mutex<VecDeque<MockResponse>>,
    requests: Arc<Mutex<Vec<LlmRequest>>>,
    chunk_delay: Option<Duration>,
    next_call_id: Mutex<usize>,
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: Mutex::new(VecDeque::new()),
            requests: Arc::new(Mutex::new(Vec::new())),
            chunk_delay: None,
            next_call_id: Mutex::new(0),
        }
    }

    fn call_id(&self) -> String {
        let mut next = self.next_call_id.lock();
        *next += 1;
        format!("call_{next}")
    }

    /// Queue a plain text response.
    pub fn with_response(self, text: &str) -> Self {
        self.with_mock_response(MockResponse::text(text))
    }

    /// Queue a response with a single tool call. Ids run `call_1`, `call_2`, ...
    pub fn with_tool_call(self, name: &str, args: serde_json::Value) -> Self {
        self.with_tool_calls(vec![(name, args)])
    }

    /// Queue one response carrying several tool calls.
    pub fn with_tool_calls(self, calls: Vec<(&str, serde_json::Value)>) -> Self {
        let calls = calls
            .into_iter()
            .map(|(name, arguments)| ToolCall {
                id: self.call_id(),
                tool_name: name.to_string(),
                arguments,
            })
            .collect();
        self.with_mock_response(MockResponse::tool_calls(calls))
    }

    /// Queue a response whose `stream` call fails outright.
    pub fn with_error(self, error: &str) -> Self {
        self.with_mock_response(MockResponse {
            error: Some(error.to_string()),
            ..Default::default()
        })
    }

    pub fn with_mock_response(self, resp: MockResponse) -> Self {
        self.responses.lock().push_back(resp);
        self
    }

    /// Pause between streamed chunks.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().len()
    }

    fn next_response(&self) -> MockResponse {
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| MockResponse::text("(mock: no more queued responses)"))
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream(&self, request: &LlmRequest) -> Result<mpsc::Receiver<StreamChunk>> {
        self.requests.lock().push(request.clone());
        let mock = self.next_response();
        if let Some(error) = mock.error {
            return Err(YcodeError::LlmProvider(error));
        }

        let delay = self.chunk_delay;
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            let mut chunks: Vec<StreamChunk> = mock
                .text
                .split_inclusive(' ')
                .map(|w| StreamChunk::TextDelta(w.to_string()))
                .collect();
            if let Some(error) = mock.stream_error {
                chunks.push(StreamChunk::Error(error));
            } else {
                chunks.extend(mock.tool_calls.into_iter().map(StreamChunk::ToolCall));
                chunks.push(StreamChunk::Usage(mock.usage));
                chunks.push(StreamChunk::Done(mock.stop_reason));
            }
            for chunk in chunks {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                if tx.send(chunk).await.is_err() {
                    return;
                }
            }
        });
        Ok(rx)
    }
}
