use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use ycode_core::{Result, YcodeError};

/// Root configuration, mapped from `ycode.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct YcodeConfig {
    pub agent: AgentConfig,
    pub memory: MemoryConfig,
    pub todo: TodoConfig,
    pub reminders: RemindersConfig,
    pub skills: SkillsConfig,
    pub mcp: McpConfig,
    pub services: ServicesConfig,
    pub logging: LoggingConfig,
}

// ── Agent ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model identifier sent to the completion endpoint, e.g. "gpt-4o".
    pub model: String,
    /// Maximum tokens per response.
    pub max_tokens: u32,
    /// Temperature (0.0 - 2.0).
    pub temperature: f32,
    /// Model/tool round trips allowed per conversation run before forcing a stop.
    pub max_iterations: u32,
    /// Repository the agent operates in. Defaults to the current directory.
    pub workdir: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".into(),
            max_tokens: 8192,
            temperature: 0.2,
            max_iterations: 25,
            workdir: None,
        }
    }
}

// ── Memory ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Root directory for memory files. Defaults to `~/.ycode/memory`.
    pub root: Option<PathBuf>,
    /// Explicit project key. Defaults to the working directory name.
    pub project: Option<String>,
    pub profile_cap: usize,
    pub daily_cap: usize,
    pub project_cap: usize,
    /// Daily files older than this many days are deleted.
    pub retention_days: u32,
    /// Profile items included in the per-turn context block.
    pub max_profile_items: usize,
    pub heartbeat_cooldown_rounds: i64,
    pub heartbeat_min_chars: usize,
    pub heartbeat_max_chars: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            root: None,
            project: None,
            profile_cap: 50,
            daily_cap: 50,
            project_cap: 80,
            retention_days: 30,
            max_profile_items: 12,
            heartbeat_cooldown_rounds: 6,
            heartbeat_min_chars: 12,
            heartbeat_max_chars: 280,
        }
    }
}

// ── Todo ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TodoConfig {
    pub max_items: usize,
}

impl Default for TodoConfig {
    fn default() -> Self {
        Self { max_items: 20 }
    }
}

// ── Reminders ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemindersConfig {
    /// Queue the todo nag once this many rounds pass without TodoWriter.
    pub todo_nag_after_rounds: i64,
    /// Queue the memory reminder once this many rounds pass without memory activity.
    pub memory_nag_after_rounds: i64,
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            todo_nag_after_rounds: 10,
            memory_nag_after_rounds: 8,
        }
    }
}

// ── Skills ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillsConfig {
    /// Directories scanned for `<name>/SKILL.md`. Defaults to `~/.ycode/skills`.
    pub dirs: Vec<PathBuf>,
}

// ── Child tool processes ───────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McpConfig {
    pub servers: Vec<McpServerConfig>,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            servers: vec![McpServerConfig {
                name: "bash".into(),
                command: "npx".into(),
                args: vec!["bash-mcp".into()],
                env: HashMap::new(),
                enabled: true,
            }],
        }
    }
}

/// One tool server started as a child process and spoken to over stdio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Tool group name, e.g. "bash". Subagent profiles refer to groups by this name.
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

// ── Services ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Key for the OpenAI-compatible completion endpoint.
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".into(),
        }
    }
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Output format: "pretty", "json", "compact".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "pretty".into(),
        }
    }
}

// ── Resolved paths ─────────────────────────────────────────────

fn ycode_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ycode")
}

impl YcodeConfig {
    /// The repository the agent works in.
    pub fn workdir(&self) -> PathBuf {
        self.agent
            .workdir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn memory_root(&self) -> PathBuf {
        self.memory
            .root
            .clone()
            .unwrap_or_else(|| ycode_home().join("memory"))
    }

    pub fn skill_dirs(&self) -> Vec<PathBuf> {
        if self.skills.dirs.is_empty() {
            vec![ycode_home().join("skills")]
        } else {
            self.skills.dirs.clone()
        }
    }
}

// ── Validation ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
    pub severity: WarningSeverity,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    Error,
    Warning,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.severity {
            WarningSeverity::Error => "error",
            WarningSeverity::Warning => "warning",
        };
        write!(f, "{} {}: {}", label, self.field, self.message)?;
        if let Some(ref h) = self.hint {
            write!(f, " ({})", h)?;
        }
        Ok(())
    }
}

impl YcodeConfig {
    /// Validate the config and return a list of warnings.
    /// Fails with the first hard error, listing every error in the reason.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>> {
        let mut warnings = Vec::new();

        // ── Agent ───
        if self.agent.model.trim().is_empty() {
            warnings.push(ConfigWarning {
                field: "agent.model".into(),
                message: "model is empty".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set YCODE_MODEL or agent.model".into()),
            });
        }

        if self.agent.temperature < 0.0 || self.agent.temperature > 2.0 {
            warnings.push(ConfigWarning {
                field: "agent.temperature".into(),
                message: format!("temperature {} is out of range", self.agent.temperature),
                severity: WarningSeverity::Error,
                hint: Some("Temperature must be between 0.0 and 2.0".into()),
            });
        }

        if self.agent.max_tokens == 0 {
            warnings.push(ConfigWarning {
                field: "agent.max_tokens".into(),
                message: "max_tokens is 0, the model cannot produce output".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 8192".into()),
            });
        }

        if self.agent.max_iterations == 0 {
            warnings.push(ConfigWarning {
                field: "agent.max_iterations".into(),
                message: "max_iterations is 0, no model call would ever run".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 25".into()),
            });
        }

        // ── Memory caps ───
        for (field, cap) in [
            ("memory.profile_cap", self.memory.profile_cap),
            ("memory.daily_cap", self.memory.daily_cap),
            ("memory.project_cap", self.memory.project_cap),
        ] {
            if cap == 0 {
                warnings.push(ConfigWarning {
                    field: field.into(),
                    message: "cap is 0, every write would be evicted immediately".into(),
                    severity: WarningSeverity::Error,
                    hint: None,
                });
            }
        }

        if self.memory.retention_days == 0 {
            warnings.push(ConfigWarning {
                field: "memory.retention_days".into(),
                message: "retention of 0 days deletes yesterday's notes on startup".into(),
                severity: WarningSeverity::Warning,
                hint: Some("The default is 30".into()),
            });
        }

        if self.todo.max_items == 0 {
            warnings.push(ConfigWarning {
                field: "todo.max_items".into(),
                message: "max_items is 0, the todo board can never hold a task".into(),
                severity: WarningSeverity::Error,
                hint: Some("The default is 20".into()),
            });
        }

        // ── Services ───
        if self.services.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
            warnings.push(ConfigWarning {
                field: "services.api_key".into(),
                message: "no API key configured".into(),
                severity: WarningSeverity::Warning,
                hint: Some("Set YCODE_AUTH_TOKEN or services.api_key".into()),
            });
        }

        // ── Tool servers ───
        let mut seen = std::collections::HashSet::new();
        for server in &self.mcp.servers {
            if !seen.insert(server.name.as_str()) {
                warnings.push(ConfigWarning {
                    field: format!("mcp.servers.{}", server.name),
                    message: "duplicate server name, only the first is started".into(),
                    severity: WarningSeverity::Warning,
                    hint: None,
                });
            }
        }

        // ── Logging ───
        let valid_formats = ["pretty", "json", "compact"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.format".into(),
                message: format!("unknown log format '{}'", self.logging.format),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_formats.join(", "))),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.level".into(),
                message: format!("unknown log level '{}'", self.logging.level),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_levels.join(", "))),
            });
        }

        let errors: Vec<&ConfigWarning> = warnings
            .iter()
            .filter(|w| w.severity == WarningSeverity::Error)
            .collect();

        if let Some(first) = errors.first() {
            let reason = errors
                .iter()
                .map(|w| format!("{}: {}", w.field, w.message))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(YcodeError::ConfigValidation {
                field: first.field.clone(),
                reason,
            });
        }

        Ok(warnings)
    }
}
