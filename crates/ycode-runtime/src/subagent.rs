//! Isolated nested conversations for focused subtasks.

use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;
use ycode_core::{ConversationEvent, Event, EventBus, Message, Result, Role, Tool, YcodeError};
use ycode_llm::LlmProvider;

use crate::conversation::{Conversation, ConversationSettings};
use crate::registry::ToolRegistry;
use crate::tools::TASK;

/// Expands to the shell-control tool family.
pub const BASH_ALIAS: &str = "bash";
pub const SHELL_FAMILY: [&str; 4] = ["run", "run_background", "kill_background", "list_background"];

pub const EMPTY_RESULT: &str = "(subagent returned no text)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolScope {
    /// Every registered tool except `Task`.
    All,
    /// Tool names, or the `bash` alias.
    Only(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct AgentProfile {
    pub name: &'static str,
    pub description: &'static str,
    pub instructions: &'static str,
    pub scope: ToolScope,
}

impl AgentProfile {
    pub fn allows(&self, tool: &Tool) -> bool {
        match self.scope {
            ToolScope::All => tool.name != TASK,
            ToolScope::Only(names) => names.iter().any(|n| {
                if *n == BASH_ALIAS {
                    SHELL_FAMILY.contains(&tool.name.as_str())
                } else {
                    tool.name == *n
                }
            }),
        }
    }
}

const PROFILES: [AgentProfile; 3] = [
    AgentProfile {
        name: "explore",
        description: "Read-only agent for exploring code, finding files, searching",
        instructions: "You are an exploration agent. Search and analyze, but never modify files. Return a concise summary.",
        scope: ToolScope::Only(&[BASH_ALIAS, "read_file"]),
    },
    AgentProfile {
        name: "code",
        description: "Full agent for implementing features and fixing bugs",
        instructions: "You are a coding agent. Implement the requested changes efficiently.",
        scope: ToolScope::All,
    },
    AgentProfile {
        name: "plan",
        description: "Planning agent for designing implementation strategies",
        instructions: "You are a planning agent. Analyze the codebase and output a numbered implementation plan. Do NOT make changes.",
        scope: ToolScope::Only(&[BASH_ALIAS, "read_file"]),
    },
];

/// The fixed set of subagent types.
pub struct AgentProfiles;

impl AgentProfiles {
    pub fn all() -> &'static [AgentProfile] {
        &PROFILES
    }

    pub fn get(name: &str) -> Option<&'static AgentProfile> {
        PROFILES.iter().find(|p| p.name == name)
    }

    pub fn names() -> Vec<&'static str> {
        PROFILES.iter().map(|p| p.name).collect()
    }

    /// `- name: description`, one line per profile.
    pub fn description() -> String {
        PROFILES
            .iter()
            .map(|p| format!("- {}: {}", p.name, p.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Runs subagents against the shared tool registry.
///
/// Holds the registry weakly: the registry owns the `Task` tool, which owns this.
pub struct SubagentOrchestrator {
    registry: Weak<ToolRegistry>,
    provider: Arc<dyn LlmProvider>,
    settings: ConversationSettings,
    workdir: PathBuf,
    events: Option<EventBus>,
}

impl SubagentOrchestrator {
    pub fn new(
        registry: &Arc<ToolRegistry>,
        provider: Arc<dyn LlmProvider>,
        settings: ConversationSettings,
        workdir: PathBuf,
    ) -> Self {
        Self {
            registry: Arc::downgrade(registry),
            provider,
            settings,
            workdir,
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn system_prompt(&self, profile: &AgentProfile) -> String {
        format!(
            "You are a {} subagent operating INSIDE the user's repository at {}.\n\n{}\n\nComplete the task and return a clear, concise summary.",
            profile.name,
            self.workdir.display(),
            profile.instructions
        )
    }

    /// Run `prompt` in a fresh conversation and return its transcript.
    ///
    /// Failures inside the nested run are logged; whatever text arrived
    /// before the failure is still returned.
    pub async fn run_task(&self, description: &str, prompt: &str, agent_type: &str) -> Result<String> {
        let profile = AgentProfiles::get(agent_type).ok_or_else(|| {
            YcodeError::validation(format!("Agent type '{agent_type}' is not supported."))
        })?;
        let registry = self.registry.upgrade().ok_or_else(|| YcodeError::ToolExecution {
            tool: TASK.into(),
            reason: "tool registry is no longer available".into(),
        })?;
        let tools = registry.get_tools_where(|t| profile.allows(t)).await;

        let session_id = Uuid::new_v4();
        let mut conversation = Conversation::new(
            Arc::clone(&self.provider),
            tools,
            self.system_prompt(profile),
            self.settings.clone(),
        )
        .with_session_id(session_id);
        if let Some(events) = &self.events {
            conversation = conversation.with_events(events.clone());
        }

        info!(agent_type, description, tools = conversation.tools().len(), "subagent started");
        self.publish(Event::SubagentStarted {
            session_id,
            agent_type: agent_type.to_string(),
            description: description.to_string(),
        });

        let start = Instant::now();
        let mut transcript = String::new();
        let mut tools_used = 0usize;
        let mut failed = false;
        let mut events = conversation.stream(vec![Message::text(session_id, Role::User, prompt)]);

        while let Some(event) = events.recv().await {
            match event {
                Ok(ConversationEvent::TextDelta { text }) => transcript.push_str(&text),
                Ok(ConversationEvent::ToolCall { .. }) => {}
                Ok(ConversationEvent::ToolResult { result }) => {
                    transcript.push_str(&format!(
                        "<previous_tool_use id='{}'>{}</previous_tool_use>",
                        result.tool_call_id, result.content
                    ));
                    tools_used += 1;
                    let elapsed_secs = start.elapsed().as_secs_f64();
                    info!(agent_type, tools_used, elapsed_secs, "subagent progress");
                    self.publish(Event::SubagentProgress {
                        session_id,
                        tools_used,
                        elapsed_secs,
                    });
                }
                Err(e) => {
                    warn!(agent_type, error = %e, "subagent run failed");
                    failed = true;
                    break;
                }
            }
        }

        info!(
            agent_type,
            tools_used,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "subagent finished"
        );
        self.publish(Event::SubagentFinished {
            session_id,
            chars: transcript.len(),
            failed,
        });

        if transcript.trim().is_empty() {
            Ok(EMPTY_RESULT.to_string())
        } else {
            Ok(transcript)
        }
    }

    fn publish(&self, event: Event) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool(name: &str) -> Tool {
        Tool::new(name, "", json!({}))
    }

    #[test]
    fn bash_alias_expands_to_shell_family() {
        let explore = AgentProfiles::get("explore").unwrap();
        assert!(explore.allows(&tool("run")));
        assert!(explore.allows(&tool("kill_background")));
        assert!(explore.allows(&tool("read_file")));
        assert!(!explore.allows(&tool("write_file")));
        assert!(!explore.allows(&tool("bash")));
    }

    #[test]
    fn code_gets_everything_but_task() {
        let code = AgentProfiles::get("code").unwrap();
        assert!(code.allows(&tool("write_file")));
        assert!(code.allows(&tool("MemoryWriter")));
        assert!(!code.allows(&tool(TASK)));
    }

    #[test]
    fn profile_descriptions() {
        let text = AgentProfiles::description();
        assert!(text.starts_with("- explore: Read-only agent"));
        assert_eq!(text.lines().count(), 3);
        assert!(AgentProfiles::get("review").is_none());
    }
}
