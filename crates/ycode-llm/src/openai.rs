use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use ycode_core::{Message, MessageContent, Result, Role, ToolCall, YcodeError};

use crate::provider::*;

/// OpenAI-compatible chat completions provider (OpenAI, Azure, vLLM, etc.)
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    provider_name: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            provider_name: "openai".into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = name.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    async fn stream(&self, request: &LlmRequest) -> Result<mpsc::Receiver<StreamChunk>> {
        let (tx, rx) = mpsc::channel(256);
        let body = build_body(request);

        debug!(
            provider = %self.provider_name,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "sending chat completion request"
        );

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| YcodeError::LlmProvider(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(YcodeError::LlmProvider(format!("HTTP {status}: {text}")));
        }

        tokio::spawn(async move {
            let mut stream = resp.bytes_stream();
            let mut state = SseState::default();

            while let Some(next) = stream.next().await {
                let chunks = match next {
                    Ok(bytes) => state.push(&bytes),
                    Err(e) => vec![StreamChunk::Error(e.to_string())],
                };
                for chunk in chunks {
                    let stop = matches!(chunk, StreamChunk::Done(_) | StreamChunk::Error(_));
                    if tx.send(chunk).await.is_err() {
                        debug!("stream receiver dropped, abandoning response");
                        return;
                    }
                    if stop {
                        return;
                    }
                }
            }
            // Stream ended without [DONE]
            for chunk in state.finish() {
                if tx.send(chunk).await.is_err() {
                    return;
                }
            }
        });

        Ok(rx)
    }

    async fn health_check(&self) -> Result<()> {
        info!(provider = %self.provider_name, "checking API credentials");
        if self.api_key.trim().is_empty() {
            return Err(YcodeError::LlmProvider(format!(
                "{} API key not set",
                self.provider_name
            )));
        }
        Ok(())
    }
}

fn message_json(msg: &Message, out: &mut Vec<Value>) {
    match msg.role {
        Role::System => out.push(json!({ "role": "system", "content": msg.text_content() })),
        Role::User => out.push(json!({ "role": "user", "content": msg.text_content() })),
        Role::Assistant if msg.tool_calls.is_empty() => {
            out.push(json!({ "role": "assistant", "content": msg.text_content() }))
        }
        Role::Assistant => {
            let calls: Vec<Value> = msg
                .tool_calls
                .iter()
                .map(|tc| {
                    json!({
                        "id": tc.id,
                        "type": "function",
                        "function": {
                            "name": tc.tool_name,
                            "arguments": tc.arguments.to_string(),
                        }
                    })
                })
                .collect();
            let text = msg.text_content();
            let content = if text.is_empty() { Value::Null } else { json!(text) };
            out.push(json!({ "role": "assistant", "content": content, "tool_calls": calls }));
        }
        Role::Tool => {
            let mut any = false;
            for block in &msg.content {
                if let MessageContent::ToolResult {
                    tool_call_id,
                    content,
                    ..
                } = block
                {
                    any = true;
                    out.push(json!({
                        "role": "tool",
                        "tool_call_id": tool_call_id,
                        "content": content,
                    }));
                }
            }
            // Tool messages without results would be rejected by the API.
            if !any {
                out.push(json!({ "role": "user", "content": msg.text_content() }));
            }
        }
    }
}

/// Streaming request body in the chat completions wire format.
pub(crate) fn build_body(request: &LlmRequest) -> Value {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = &request.system {
        messages.push(json!({ "role": "system", "content": system }));
    }
    for msg in &request.messages {
        message_json(msg, &mut messages);
    }

    let mut body = json!({
        "model": &request.model,
        "temperature": request.temperature,
        "messages": messages,
        "stream": true,
        "stream_options": { "include_usage": true },
    });

    if uses_max_completion_tokens(&request.model) {
        body["max_completion_tokens"] = json!(request.max_tokens);
    } else {
        body["max_tokens"] = json!(request.max_tokens);
    }

    if !request.tools.is_empty() {
        let tools: Vec<Value> = request
            .tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect();
        body["tools"] = json!(tools);
    }
    body
}

/// Returns true for models that require `max_completion_tokens` instead of `max_tokens`.
fn uses_max_completion_tokens(model: &str) -> bool {
    let m = model.to_lowercase();
    m.starts_with("o1")
        || m.starts_with("o3")
        || m.starts_with("o4")
        || m.contains("gpt-5")
        || m.contains("gpt5")
}

/// Tool call arguments arrive as a JSON string. Blank means no arguments; text
/// that does not parse is passed through so the tool can report it.
fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!(error = %e, "tool call arguments are not valid JSON");
        Value::String(raw.to_string())
    })
}

#[derive(Debug, Default)]
struct PartialCall {
    id: String,
    name: String,
    arguments: String,
}

/// Accumulates server-sent events into stream chunks.
///
/// Text is forwarded as it arrives; tool call fragments are assembled by index
/// and released in index order once the stream finishes.
#[derive(Debug, Default)]
pub(crate) struct SseState {
    buffer: String,
    tool_calls: BTreeMap<u64, PartialCall>,
    usage: Usage,
    finish_reason: Option<String>,
    finished: bool,
}

impl SseState {
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<StreamChunk> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));
        let mut out = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            let line = line.trim();
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();
            if data == "[DONE]" {
                out.extend(self.finish());
                break;
            }
            match serde_json::from_str::<Value>(data) {
                Ok(event) => self.apply(&event, &mut out),
                Err(e) => debug!(error = %e, "skipping unparseable stream event"),
            }
        }
        out
    }

    fn apply(&mut self, event: &Value, out: &mut Vec<StreamChunk>) {
        if let Some(message) = event["error"]["message"].as_str() {
            out.push(StreamChunk::Error(message.to_string()));
            self.finished = true;
            return;
        }
        let choice = &event["choices"][0];
        let delta = &choice["delta"];
        if let Some(text) = delta["content"].as_str()
            && !text.is_empty()
        {
            out.push(StreamChunk::TextDelta(text.to_string()));
        }
        if let Some(calls) = delta["tool_calls"].as_array() {
            for tc in calls {
                let idx = tc["index"].as_u64().unwrap_or(0);
                let entry = self.tool_calls.entry(idx).or_default();
                if let Some(id) = tc["id"].as_str() {
                    entry.id = id.to_string();
                }
                if let Some(name) = tc["function"]["name"].as_str() {
                    entry.name.push_str(name);
                }
                if let Some(args) = tc["function"]["arguments"].as_str() {
                    entry.arguments.push_str(args);
                }
            }
        }
        if let Some(reason) = choice["finish_reason"].as_str() {
            self.finish_reason = Some(reason.to_string());
        }
        let usage = &event["usage"];
        if let Some(pt) = usage["prompt_tokens"].as_u64() {
            self.usage.input_tokens = pt as u32;
        }
        if let Some(ct) = usage["completion_tokens"].as_u64() {
            self.usage.output_tokens = ct as u32;
        }
    }

    /// Flush assembled tool calls, usage and the stop reason. Idempotent.
    pub(crate) fn finish(&mut self) -> Vec<StreamChunk> {
        if self.finished {
            return Vec::new();
        }
        self.finished = true;
        let calls = std::mem::take(&mut self.tool_calls);
        let has_tool_calls = !calls.is_empty();
        let mut out: Vec<StreamChunk> = calls
            .into_values()
            .map(|c| {
                StreamChunk::ToolCall(ToolCall {
                    id: c.id,
                    tool_name: c.name,
                    arguments: parse_arguments(&c.arguments),
                })
            })
            .collect();
        out.push(StreamChunk::Usage(self.usage.clone()));
        out.push(StreamChunk::Done(StopReason::from_finish_reason(
            self.finish_reason.as_deref(),
            has_tool_calls,
        )));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use ycode_core::{Tool, ToolResult};

    fn sse(events: &[&str]) -> String {
        events.iter().map(|e| format!("data: {e}\n\n")).collect()
    }

    #[test]
    fn test_text_deltas_then_done() {
        let mut state = SseState::default();
        let raw = sse(&[
            r#"{"choices":[{"delta":{"content":"Hel"}}]}"#,
            r#"{"choices":[{"delta":{"content":"lo"},"finish_reason":"stop"}]}"#,
            r#"{"choices":[],"usage":{"prompt_tokens":12,"completion_tokens":3}}"#,
            "[DONE]",
        ]);
        let chunks = state.push(raw.as_bytes());
        assert_eq!(
            chunks,
            vec![
                StreamChunk::TextDelta("Hel".into()),
                StreamChunk::TextDelta("lo".into()),
                StreamChunk::Usage(Usage { input_tokens: 12, output_tokens: 3 }),
                StreamChunk::Done(StopReason::EndTurn),
            ]
        );
        assert!(state.finish().is_empty());
    }

    #[test]
    fn test_tool_call_fragments_assembled_in_index_order() {
        let mut state = SseState::default();
        let raw = sse(&[
            r#"{"choices":[{"delta":{"tool_calls":[{"index":1,"id":"call_b","function":{"name":"read_file","arguments":""}}]}}]}"#,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_a","function":{"name":"run","arguments":"{\"comm"}}]}}]}"#,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"and\":\"ls\"}"}}]}}]}"#,
            r#"{"choices":[{"delta":{},"finish_reason":"tool_calls"}]}"#,
            "[DONE]",
        ]);
        let chunks = state.push(raw.as_bytes());
        assert_eq!(chunks.len(), 4);
        assert_eq!(
            chunks[0],
            StreamChunk::ToolCall(ToolCall {
                id: "call_a".into(),
                tool_name: "run".into(),
                arguments: json!({"command": "ls"}),
            })
        );
        match &chunks[1] {
            StreamChunk::ToolCall(call) => {
                assert_eq!(call.id, "call_b");
                assert_eq!(call.arguments, json!({}));
            }
            other => panic!("expected tool call, got {other:?}"),
        }
        assert_eq!(chunks[3], StreamChunk::Done(StopReason::ToolUse));
    }

    #[test]
    fn test_lines_split_across_reads() {
        let mut state = SseState::default();
        assert!(state.push(b"data: {\"choices\":[{\"delta\":{\"con").is_empty());
        let chunks = state.push(b"tent\":\"ok\"}}]}\n\n");
        assert_eq!(chunks, vec![StreamChunk::TextDelta("ok".into())]);
    }

    #[test]
    fn test_error_event() {
        let mut state = SseState::default();
        let chunks = state.push(sse(&[r#"{"error":{"message":"quota exceeded"}}"#]).as_bytes());
        assert_eq!(chunks, vec![StreamChunk::Error("quota exceeded".into())]);
        assert!(state.finish().is_empty());
    }

    #[test]
    fn test_bad_arguments_passed_through() {
        assert_eq!(parse_arguments("{oops"), Value::String("{oops".into()));
        assert_eq!(parse_arguments("  "), json!({}));
    }

    #[test]
    fn test_body_shape() {
        let sid = Uuid::nil();
        let mut assistant = Message::text(sid, Role::Assistant, "");
        assistant.tool_calls.push(ToolCall {
            id: "call_1".into(),
            tool_name: "read_file".into(),
            arguments: json!({"path": "a.txt"}),
        });
        let mut request = LlmRequest::new("gpt-4o");
        request.system = Some("be brief".into());
        request.messages = vec![
            Message::text(sid, Role::User, "hi"),
            assistant,
            Message::tool_result(sid, &ToolResult::text("call_1", "contents")),
        ];
        request.tools = vec![Tool::new("read_file", "Read a file", json!({"type": "object"}))];

        let body = build_body(&request);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[2]["content"], Value::Null);
        assert_eq!(messages[2]["tool_calls"][0]["function"]["arguments"], r#"{"path":"a.txt"}"#);
        assert_eq!(messages[3]["role"], "tool");
        assert_eq!(messages[3]["tool_call_id"], "call_1");
        assert_eq!(body["max_tokens"], 8192);
        assert_eq!(body["tools"][0]["function"]["name"], "read_file");
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn test_reasoning_models_use_completion_tokens() {
        let body = build_body(&LlmRequest::new("o3-mini"));
        assert!(body.get("max_tokens").is_none());
        assert_eq!(body["max_completion_tokens"], 8192);
    }
}
