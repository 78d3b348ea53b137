//! # ycode-runtime
//!
//! The agent core: cross-turn session state, the todo board, the tool
//! registry, subagents, the write-freshness guard and the turn loop.
//!
//! ```text
//!   user input ──▶ AgentRuntime::run_turn
//!                    │  drain reminders      (SessionContext)
//!                    │  memory context       (ycode-memory)
//!                    ▼
//!                 Conversation ──▶ LlmProvider (stream)
//!                    │
//!                    ▼
//!                 ToolSet::dispatch ──▶ built-ins │ tool-server groups
//!                    │                      │
//!                    │                      └─ Task ──▶ SubagentOrchestrator
//!                    ▼                                   (fresh Conversation)
//!                 finish_turn: counters, heartbeat, reminders
//! ```

pub mod agent;
pub mod conversation;
pub mod freshness;
pub mod registry;
pub mod session;
pub mod subagent;
pub mod todo;
pub mod tools;

pub use agent::{AgentRuntime, TurnOutcome, build_system_prompt, is_exit};
pub use conversation::{Conversation, ConversationSettings};
pub use freshness::FreshnessGuard;
pub use registry::{ToolHandler, ToolRegistry, ToolSet};
pub use session::SessionContext;
pub use subagent::{AgentProfile, AgentProfiles, SubagentOrchestrator, ToolScope};
pub use todo::{RawTodo, TodoBoard, TodoCounts, TodoItem, TodoStatus};
pub use tools::{ToolContext, builtin_tools};
