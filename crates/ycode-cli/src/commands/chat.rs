use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio::sync::broadcast;
use tracing::debug;

use ycode_config::YcodeConfig;
use ycode_core::{ConversationEvent, Event, ToolProvider, YcodeError};
use ycode_llm::OpenAiProvider;
use ycode_mcp::McpToolProvider;
use ycode_runtime::{AgentRuntime, is_exit};

type SharedSpinner = Arc<Mutex<Option<ProgressBar>>>;

pub(super) async fn cmd_chat(config: YcodeConfig) -> ycode_core::Result<()> {
    let api_key = config.services.api_key.clone().ok_or_else(|| {
        YcodeError::Config(
            "no API key configured; set [services] api_key in ycode.toml or YCODE_AUTH_TOKEN".into(),
        )
    })?;
    let provider = Arc::new(OpenAiProvider::new(api_key, config.services.base_url.clone()));

    let workdir = config.workdir();
    let servers: Vec<Arc<McpToolProvider>> = McpToolProvider::from_config(&config.mcp, &workdir)
        .into_iter()
        .map(Arc::new)
        .collect();
    let tool_providers = servers
        .iter()
        .map(|s| Arc::clone(s) as Arc<dyn ToolProvider>)
        .collect();

    let model = config.agent.model.clone();
    let agent = AgentRuntime::new(config, provider, tool_providers).await?;

    println!("{} {}", style("YCode").bold().cyan(), style(&model).dim());
    println!("   {}", style(workdir.display()).dim());
    println!("   Type 'exit' or Ctrl+D to quit");
    println!();

    let spinner: SharedSpinner = Arc::new(Mutex::new(None));
    let watcher = tokio::spawn(watch_subagents(agent.events().subscribe(), Arc::clone(&spinner)));

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", style("you>").cyan());
        std::io::stdout().flush().ok();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) | Err(_) => break,
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if is_exit(input) {
            break;
        }

        let mut renderer = TurnRenderer::new(Arc::clone(&spinner));
        let outcome = agent.run_turn(input, |event| renderer.on_event(event)).await;
        renderer.finish();

        if let Some(error) = outcome.error {
            eprintln!("{} {error}", style("Error:").red().bold());
        }
        debug!(round = outcome.round, tool_calls = outcome.tool_calls, "turn rendered");
        println!();
    }

    watcher.abort();
    for server in servers {
        server.shutdown().await;
    }
    println!("Goodbye!");
    Ok(())
}

/// Mirrors subagent progress into the spinner message.
async fn watch_subagents(mut events: broadcast::Receiver<Event>, spinner: SharedSpinner) {
    loop {
        let message = match events.recv().await {
            Ok(Event::SubagentStarted {
                agent_type,
                description,
                ..
            }) => format!("{agent_type}: {description}"),
            Ok(Event::SubagentProgress {
                tools_used,
                elapsed_secs,
                ..
            }) => format!("subagent: {tools_used} tool calls, {elapsed_secs:.0}s"),
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        };
        if let Some(pb) = spinner.lock().as_ref() {
            pb.set_message(message);
        }
    }
}

struct TurnRenderer {
    spinner: SharedSpinner,
    streaming: bool,
}

impl TurnRenderer {
    fn new(spinner: SharedSpinner) -> Self {
        let renderer = Self {
            spinner,
            streaming: false,
        };
        renderer.show_spinner("thinking");
        renderer
    }

    fn show_spinner(&self, message: &str) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        if let Some(old) = self.spinner.lock().replace(pb) {
            old.finish_and_clear();
        }
    }

    fn hide_spinner(&self) {
        if let Some(pb) = self.spinner.lock().take() {
            pb.finish_and_clear();
        }
    }

    fn on_event(&mut self, event: &ConversationEvent) {
        match event {
            ConversationEvent::TextDelta { text } => {
                if !self.streaming {
                    self.hide_spinner();
                    print!("{} ", style("ycode>").green());
                    self.streaming = true;
                }
                print!("{text}");
                std::io::stdout().flush().ok();
            }
            ConversationEvent::ToolCall { call } => {
                self.end_text();
                self.hide_spinner();
                eprintln!(
                    "{} {}",
                    style(format!("● {}", call.tool_name)).yellow(),
                    style(truncate_output(&call.arguments.to_string(), 120)).dim()
                );
                self.show_spinner(&format!("running {}", call.tool_name));
            }
            ConversationEvent::ToolResult { result } => {
                self.hide_spinner();
                let summary = truncate_output(&result.content, 200);
                if result.is_error {
                    eprintln!("  {}", style(format!("✗ {summary}")).red());
                } else {
                    eprintln!("  {}", style(format!("✓ {summary}")).dim());
                }
                self.show_spinner("thinking");
            }
        }
    }

    fn end_text(&mut self) {
        if self.streaming {
            println!();
            self.streaming = false;
        }
    }

    fn finish(mut self) {
        self.hide_spinner();
        self.end_text();
    }
}

fn truncate_output(s: &str, max: usize) -> String {
    let flat = s.replace('\n', " ");
    if flat.chars().count() <= max {
        flat
    } else {
        format!("{}...", flat.chars().take(max).collect::<String>())
    }
}
