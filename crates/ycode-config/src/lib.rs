//! # ycode-config
//!
//! Configuration system for the YCode runtime. Reads from `ycode.toml`, then
//! applies environment variable overrides, then validates.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::YcodeConfig;
pub use schema::{
    AgentConfig, ConfigWarning, LoggingConfig, McpConfig, McpServerConfig, MemoryConfig,
    RemindersConfig, ServicesConfig, SkillsConfig, TodoConfig, WarningSeverity,
};
