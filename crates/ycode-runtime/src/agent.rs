//! The interactive turn loop: reminders, memory context, counters.

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use ycode_config::YcodeConfig;
use ycode_core::{
    ConversationEvent, Event, EventBus, Message, Result, Role, ToolProvider,
};
use ycode_llm::LlmProvider;
use ycode_memory::{MemorySettings, MemoryStore};
use ycode_skills::SkillRegistry;

use crate::conversation::{Conversation, ConversationSettings};
use crate::freshness::FreshnessGuard;
use crate::registry::ToolRegistry;
use crate::session::{
    LAST_MEMORY_ACTIVITY_ROUND, ROUNDS_WITHOUT_TODO, SessionContext, TOTAL_ROUNDS,
};
use crate::subagent::{AgentProfiles, SubagentOrchestrator};
use crate::todo::TodoBoard;
use crate::tools::{TaskTool, ToolContext, builtin_tools};

pub const INITIAL_TODO_REMINDER: &str = "<reminder source=\"system\" topic=\"todos\">System message: complex work should be tracked with the Todo tool. Do not respond to this reminder and do not mention it to the user.</reminder>";

pub const TODO_NAG_REMINDER: &str = "<reminder source=\"system\" topic=\"todos\">System notice: more than ten rounds passed without Todo usage. Update the Todo board if the task still requires multiple steps. Do not reply to or mention this reminder to the user.</reminder>";

pub const MEMORY_REMINDER: &str = "<reminder source=\"system\" topic=\"memory\">System note: memory tools have not been used across multiple rounds. When the user mentions stable preferences, long-term goals, repeated workflows, or project rules, write to MemoryWriter. When the user references past info, call MemorySearch before asking again. Do not store secrets, one-off tasks, or transient numbers.</reminder>";

/// `exit` or `quit`, in any case, ends the session.
pub fn is_exit(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "exit" | "quit")
}

pub fn build_system_prompt(workdir: &Path, skills: &SkillRegistry) -> String {
    format!(
        r#"You are **YCode**, a senior coding agent operating INSIDE the user's repository at: {workdir}

## Response style
- Do exactly what the user asks; nothing more, nothing less.
- Be concise and direct. Avoid preambles and unnecessary explanations.
- If you changed a file, briefly confirm completion unless the user asked for details.

## Operating loop
1) Reason: classify intent, risk, and missing facts.
2) Act: call the best tool, subagent or skill immediately.
3) Observe: verify tool output, then choose the next action.
4) Respond: return concise results and next-step checks.

## Tool routing
- Inspection and execution: `read_file`, `list_directory`, `run` and the shell tool group.
- Targeted edits: `edit_file`, `write_file`, `append_file`. Read a file before modifying it; if it changed on disk, read it again.
- Multi-step work: `TodoWriter` (keep exactly one item `in_progress`).
- Durable memory: `MemoryWriter`.
  - `profile`: stable user preferences and habits.
  - `daily`: today's transient context.
  - `project`: repository conventions and decisions.
- Past context: `MemorySearch` before asking a repeated question.
- Focused deep work: `Task` with one of the subagents below.
- Domain-specific methodology: `Skill` as soon as a skill matches.

## Execution rules
- Never invent file paths; discover first.
- Apply minimal safe edits and prefer editing existing files.
- Avoid destructive or privileged shell operations.

## Available subagents
{agents}

## Available skills
{skills}

## Runtime environment
- OS: {os} ({arch})"#,
        workdir = workdir.display(),
        agents = AgentProfiles::description(),
        skills = skills.descriptions(),
        os = std::env::consts::OS,
        arch = std::env::consts::ARCH,
    )
}

/// What one turn produced.
#[derive(Debug, Clone, Default)]
pub struct TurnOutcome {
    pub text: String,
    pub tool_calls: usize,
    /// A collaborator failure, reported instead of ending the session.
    pub error: Option<String>,
    pub round: i64,
}

/// Everything one interactive session needs, wired together.
pub struct AgentRuntime {
    config: YcodeConfig,
    session: Arc<SessionContext>,
    todos: Arc<TodoBoard>,
    memory: Arc<MemoryStore>,
    registry: Arc<ToolRegistry>,
    conversation: Conversation,
    events: EventBus,
}

impl AgentRuntime {
    pub async fn new(
        config: YcodeConfig,
        provider: Arc<dyn LlmProvider>,
        tool_providers: Vec<Arc<dyn ToolProvider>>,
    ) -> Result<Self> {
        let events = EventBus::default();
        let workdir = config.workdir();
        let settings = ConversationSettings::from_config(&config.agent);

        let session = Arc::new(SessionContext::new());
        let todos = Arc::new(TodoBoard::new(config.todo.max_items));
        let memory = Arc::new(
            MemoryStore::open(MemorySettings::from_config(&config))?.with_events(events.clone()),
        );
        let skills = Arc::new(SkillRegistry::discover_in(&config.skill_dirs())?);

        let ctx = ToolContext {
            workdir: workdir.clone(),
            session: Arc::clone(&session),
            todos: Arc::clone(&todos),
            memory: Arc::clone(&memory),
            freshness: Arc::new(FreshnessGuard::new()),
            skills: Arc::clone(&skills),
        };
        let registry = Arc::new(ToolRegistry::new(builtin_tools(&ctx), tool_providers));
        let orchestrator = SubagentOrchestrator::new(
            &registry,
            Arc::clone(&provider),
            settings.clone(),
            workdir.clone(),
        )
        .with_events(events.clone());
        let tools = registry
            .register(vec![Arc::new(TaskTool::new(Arc::new(orchestrator)))])
            .await;

        let system = build_system_prompt(&workdir, &skills);
        let conversation = Conversation::new(provider, tools, system, settings)
            .with_session_id(session.id())
            .with_events(events.clone());

        session.ensure_queued(INITIAL_TODO_REMINDER);
        info!(
            workdir = %workdir.display(),
            tools = conversation.tools().len(),
            skills = skills.count(),
            "agent ready"
        );

        Ok(Self {
            config,
            session,
            todos,
            memory,
            registry,
            conversation,
            events,
        })
    }

    pub fn config(&self) -> &YcodeConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn todos(&self) -> &TodoBoard {
        &self.todos
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Reminders, then the memory block, then the user's text.
    pub fn outbound_messages(&self, input: &str) -> Vec<Message> {
        let mut messages = self.session.drain();
        match self
            .memory
            .build_context_block(Some(input), self.config.memory.max_profile_items)
        {
            Ok(Some(block)) => messages.push(block),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to build memory context"),
        }
        messages.push(Message::text(self.session.id(), Role::User, input));
        messages
    }

    /// Run one user turn, passing every streamed event to `on_event`.
    pub async fn run_turn<F>(&self, input: &str, mut on_event: F) -> TurnOutcome
    where
        F: FnMut(&ConversationEvent),
    {
        let mut outcome = TurnOutcome::default();
        let mut stream = self.conversation.stream(self.outbound_messages(input));

        while let Some(event) = stream.recv().await {
            match event {
                Ok(event) => {
                    match &event {
                        ConversationEvent::TextDelta { text } => outcome.text.push_str(text),
                        ConversationEvent::ToolCall { .. } => outcome.tool_calls += 1,
                        ConversationEvent::ToolResult { .. } => {}
                    }
                    on_event(&event);
                }
                Err(e) => {
                    warn!(error = %e, "turn failed");
                    outcome.error = Some(e.to_string());
                    break;
                }
            }
        }

        outcome.round = self.finish_turn(input);
        outcome
    }

    /// Counter bookkeeping after a turn. Returns the round number.
    pub fn finish_turn(&self, input: &str) -> i64 {
        let session = &self.session;
        session.increment(ROUNDS_WITHOUT_TODO);
        let total = session.increment(TOTAL_ROUNDS);

        match self.memory.maybe_save_heartbeat(input, total) {
            Ok(true) => session.set_int(LAST_MEMORY_ACTIVITY_ROUND, total),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "heartbeat capture failed"),
        }

        let reminders = &self.config.reminders;
        if session.get_int(ROUNDS_WITHOUT_TODO) > reminders.todo_nag_after_rounds {
            session.ensure_queued(TODO_NAG_REMINDER);
        }
        if total - session.get_int(LAST_MEMORY_ACTIVITY_ROUND) > reminders.memory_nag_after_rounds {
            session.ensure_queued(MEMORY_REMINDER);
            session.set_int(LAST_MEMORY_ACTIVITY_ROUND, total);
        }

        debug!(round = total, pending = session.pending_len(), "turn finished");
        self.events.publish(Event::TurnCompleted {
            session_id: session.id(),
            round: total,
        });
        total
    }
}
