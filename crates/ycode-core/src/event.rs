use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::tool::{ToolCall, ToolResult};

/// What a streamed conversation yields to its consumer.
///
/// The set is closed: text as it arrives, each tool call the model makes,
/// and the result of executing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationEvent {
    TextDelta { text: String },
    ToolCall { call: ToolCall },
    ToolResult { result: ToolResult },
}

/// Runtime events for observability. Nothing in the runtime depends on
/// anyone listening.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    // ── Turn lifecycle ─────────────────────────────────────────
    TurnCompleted {
        session_id: Uuid,
        round: i64,
    },
    ToolInvoked {
        session_id: Uuid,
        tool_name: String,
        tool_call_id: String,
        is_error: bool,
    },

    // ── Subagent lifecycle ─────────────────────────────────────
    SubagentStarted {
        session_id: Uuid,
        agent_type: String,
        description: String,
    },
    SubagentProgress {
        session_id: Uuid,
        tools_used: usize,
        elapsed_secs: f64,
    },
    SubagentFinished {
        session_id: Uuid,
        chars: usize,
        failed: bool,
    },

    // ── Memory ─────────────────────────────────────────────────
    MemorySaved {
        scope: String,
        updated: bool,
    },

    // ── System ─────────────────────────────────────────────────
    Heartbeat {
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for system-wide pub/sub.
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<Event>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn publish(&self, event: Event) {
        // Ignore send errors (no subscribers).
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
