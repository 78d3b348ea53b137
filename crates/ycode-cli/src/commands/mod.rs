use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use ycode_config::{ConfigLoader, YcodeConfig};
use ycode_core::YcodeError;

mod chat;
mod memory;
mod skills;

/// YCode: an interactive coding agent with durable memory, todos and subagents
#[derive(Parser)]
#[command(name = "ycode", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to ycode.toml config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format (overrides [logging] format)
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    /// Repository the agent works in (default: current directory)
    #[arg(short, long, global = true)]
    workdir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat in the terminal (the default)
    Chat,
    /// Read and write the memory store directly
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },
    /// Print the effective configuration as TOML
    Config,
    /// List discovered skills, or show one
    Skills {
        /// Skill to show in full
        name: Option<String>,
    },
}

#[derive(Subcommand)]
pub(crate) enum MemoryAction {
    /// Save an item
    Add {
        /// profile, daily or project
        category: String,
        content: String,
        /// Day for daily memory (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
        /// Tag to attach; repeatable
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        /// Project key override for project memory
        #[arg(long)]
        project: Option<String>,
    },
    /// Search every scope
    Search {
        query: String,
        #[arg(short = 'n', long, default_value = "8")]
        limit: usize,
    },
    /// Print the context block the agent would see before a turn
    Context {
        /// Text of the turn, used to pull related notes
        input: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> ycode_core::Result<()> {
        let loader = ConfigLoader::load(self.config.as_deref())?;
        let mut config = loader.get();
        if let Some(workdir) = self.workdir {
            config.agent.workdir = Some(workdir);
        }
        if let Some(format) = self.log_format {
            config.logging.format = match format {
                LogFormat::Pretty => "pretty".into(),
                LogFormat::Json => "json".into(),
            };
        }

        init_tracing(&config, self.verbose);

        match self.command.unwrap_or(Commands::Chat) {
            Commands::Chat => chat::cmd_chat(config).await,
            Commands::Memory { action } => memory::cmd_memory(&config, action),
            Commands::Config => Self::cmd_config(&config),
            Commands::Skills { name } => skills::cmd_skills(&config, name.as_deref()),
        }
    }

    fn cmd_config(config: &YcodeConfig) -> ycode_core::Result<()> {
        let text = toml::to_string_pretty(config)
            .map_err(|e| YcodeError::Config(format!("failed to render config: {e}")))?;
        print!("{text}");
        Ok(())
    }
}

/// Logs go to stderr; stdout carries the transcript.
fn init_tracing(config: &YcodeConfig, verbose: bool) {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level))
    };

    if config.logging.format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .json()
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_chat() {
        let cli = Cli::parse_from(["ycode"]);
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["ycode", "config", "--workdir", "/repo", "--log-format", "json"]);
        assert!(matches!(cli.command, Some(Commands::Config)));
        assert_eq!(cli.workdir, Some(PathBuf::from("/repo")));
        assert!(matches!(cli.log_format, Some(LogFormat::Json)));
    }

    #[test]
    fn memory_add_collects_tags() {
        let cli = Cli::parse_from([
            "ycode", "memory", "add", "profile", "prefers tabs", "-t", "style", "--tag", "editor",
        ]);
        let Some(Commands::Memory {
            action: MemoryAction::Add { category, tags, date, .. },
        }) = cli.command
        else {
            panic!("expected memory add");
        };
        assert_eq!(category, "profile");
        assert_eq!(tags, vec!["style", "editor"]);
        assert!(date.is_none());
    }

    #[test]
    fn memory_search_default_limit() {
        let cli = Cli::parse_from(["ycode", "memory", "search", "tabs"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Memory { action: MemoryAction::Search { limit: 8, .. } })
        ));
    }
}
