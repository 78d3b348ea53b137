use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;
use ycode_config::AgentConfig;
use ycode_core::{
    ConversationEvent, Event, EventBus, Message, Result, Role, ToolCall, ToolResult, YcodeError,
};
use ycode_llm::{LlmProvider, LlmRequest, StreamChunk, Usage};

use crate::registry::ToolSet;

const EVENT_BUFFER: usize = 64;

/// Model parameters for one conversation.
#[derive(Debug, Clone)]
pub struct ConversationSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Model calls allowed per `stream` before it stops on its own.
    pub max_iterations: u32,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self::from_config(&AgentConfig::default())
    }
}

impl ConversationSettings {
    pub fn from_config(agent: &AgentConfig) -> Self {
        Self {
            model: agent.model.clone(),
            max_tokens: agent.max_tokens,
            temperature: agent.temperature,
            max_iterations: agent.max_iterations,
        }
    }
}

/// A message history bound to a provider and a tool set.
///
/// Cloning shares the history.
#[derive(Clone)]
pub struct Conversation {
    session_id: Uuid,
    provider: Arc<dyn LlmProvider>,
    tools: ToolSet,
    system: String,
    settings: ConversationSettings,
    history: Arc<Mutex<Vec<Message>>>,
    events: Option<EventBus>,
}

impl Conversation {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: ToolSet,
        system: impl Into<String>,
        settings: ConversationSettings,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            provider,
            tools,
            system: system.into(),
            settings,
            history: Arc::new(Mutex::new(Vec::new())),
            events: None,
        }
    }

    pub fn with_session_id(mut self, session_id: Uuid) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub async fn history(&self) -> Vec<Message> {
        self.history.lock().await.clone()
    }

    /// Append `messages` and run model/tool rounds until the model stops
    /// calling tools.
    ///
    /// Dropping the receiver stops the run after the current step. Anything
    /// already appended to the history stays there.
    pub fn stream(&self, messages: Vec<Message>) -> mpsc::Receiver<Result<ConversationEvent>> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let conversation = self.clone();
        tokio::spawn(async move {
            if let Err(e) = conversation.drive(messages, &tx).await {
                let _ = tx.send(Err(e)).await;
            }
        });
        rx
    }

    async fn drive(
        &self,
        messages: Vec<Message>,
        tx: &mpsc::Sender<Result<ConversationEvent>>,
    ) -> Result<()> {
        self.history.lock().await.extend(messages);
        let mut usage = Usage::default();

        for iteration in 0..self.settings.max_iterations {
            if tx.is_closed() {
                debug!(session = %self.session_id, "consumer gone, stopping");
                return Ok(());
            }

            let request = LlmRequest {
                model: self.settings.model.clone(),
                messages: self.history.lock().await.clone(),
                tools: self.tools.tools(),
                system: Some(self.system.clone()),
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
            };
            let mut chunks = self.provider.stream(&request).await?;

            let mut text = String::new();
            let mut calls: Vec<ToolCall> = Vec::new();
            let mut open = true;
            while let Some(chunk) = chunks.recv().await {
                match chunk {
                    StreamChunk::TextDelta(delta) => {
                        text.push_str(&delta);
                        open = open
                            && tx
                                .send(Ok(ConversationEvent::TextDelta { text: delta }))
                                .await
                                .is_ok();
                    }
                    StreamChunk::ToolCall(call) => {
                        calls.push(call.clone());
                        open = open
                            && tx
                                .send(Ok(ConversationEvent::ToolCall { call }))
                                .await
                                .is_ok();
                    }
                    StreamChunk::Usage(u) => usage.merge(&u),
                    StreamChunk::Done(reason) => {
                        debug!(session = %self.session_id, iteration, ?reason, "model turn done");
                        break;
                    }
                    StreamChunk::Error(e) => return Err(YcodeError::LlmProvider(e)),
                }
                if !open {
                    break;
                }
            }

            let mut assistant = Message::text(self.session_id, Role::Assistant, text);
            assistant.tool_calls = calls.clone();
            self.history.lock().await.push(assistant);

            if !open || calls.is_empty() {
                debug!(
                    session = %self.session_id,
                    input_tokens = usage.input_tokens,
                    output_tokens = usage.output_tokens,
                    "conversation run finished"
                );
                return Ok(());
            }

            let results = self.execute_all(&calls).await;
            {
                let mut history = self.history.lock().await;
                history.extend(results.iter().map(|r| Message::tool_result(self.session_id, r)));
            }
            for result in results {
                if tx
                    .send(Ok(ConversationEvent::ToolResult { result }))
                    .await
                    .is_err()
                {
                    return Ok(());
                }
            }
        }

        warn!(
            session = %self.session_id,
            max_iterations = self.settings.max_iterations,
            "iteration limit reached"
        );
        Ok(())
    }

    /// Read-only batches run concurrently; anything else runs in order.
    async fn execute_all(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        let results = if calls.iter().all(|c| self.tools.is_read_only(&c.tool_name)) {
            join_all(calls.iter().map(|c| self.tools.dispatch(c))).await
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.tools.dispatch(call).await);
            }
            results
        };

        if let Some(events) = &self.events {
            for (call, result) in calls.iter().zip(&results) {
                events.publish(Event::ToolInvoked {
                    session_id: self.session_id,
                    tool_name: call.tool_name.clone(),
                    tool_call_id: call.id.clone(),
                    is_error: result.is_error,
                });
            }
        }
        results
    }
}
