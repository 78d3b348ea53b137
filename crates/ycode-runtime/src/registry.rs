//! Merges built-in tools and tool-server groups into one name-keyed set.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use ycode_core::{Result, Tool, ToolCall, ToolExecutor, ToolProvider, ToolResult, YcodeError};

/// A tool implemented inside the process.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn descriptor(&self) -> Tool;

    async fn call(&self, call: &ToolCall) -> Result<ToolResult>;
}

#[derive(Clone)]
enum Handler {
    Local(Arc<dyn ToolHandler>),
    Remote(Arc<dyn ToolProvider>),
}

#[derive(Clone)]
struct ToolEntry {
    tool: Tool,
    handler: Handler,
}

/// A flat set of invocable tools, keyed by name.
#[derive(Clone, Default)]
pub struct ToolSet {
    entries: BTreeMap<String, ToolEntry>,
}

impl ToolSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Descriptors in name order, ready for a completion request.
    pub fn tools(&self) -> Vec<Tool> {
        self.entries.values().map(|e| e.tool.clone()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.entries.get(name).map(|e| &e.tool)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Unknown tools count as mutating.
    pub fn is_read_only(&self, name: &str) -> bool {
        self.entries.get(name).is_some_and(|e| e.tool.is_read_only)
    }

    pub fn filter(&self, predicate: impl Fn(&Tool) -> bool) -> ToolSet {
        ToolSet {
            entries: self
                .entries
                .iter()
                .filter(|(_, e)| predicate(&e.tool))
                .map(|(k, e)| (k.clone(), e.clone()))
                .collect(),
        }
    }

    /// Execute a call. Every failure becomes an error result the model can read.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        match self.execute(call).await {
            Ok(result) => {
                debug!(tool = %call.tool_name, is_error = result.is_error, "tool finished");
                result
            }
            Err(e) => {
                warn!(tool = %call.tool_name, error = %e, "tool failed");
                ToolResult::error(&call.id, format!("Error: {e}"))
            }
        }
    }

    fn insert(&mut self, tool: Tool, handler: Handler) {
        self.entries.insert(tool.name.clone(), ToolEntry { tool, handler });
    }
}

#[async_trait]
impl ToolExecutor for ToolSet {
    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let entry = self
            .entries
            .get(&call.tool_name)
            .ok_or_else(|| YcodeError::ToolNotFound(call.tool_name.clone()))?;
        match &entry.handler {
            Handler::Local(handler) => handler.call(call).await,
            Handler::Remote(provider) => provider.call(call).await,
        }
    }
}

struct ExternalGroup {
    provider: Arc<dyn ToolProvider>,
    tools: Vec<Tool>,
}

/// Owns every tool the process can offer.
///
/// Tool-server groups are listed once, on first use, and cached. Built-in
/// tools win over a server tool with the same name.
pub struct ToolRegistry {
    builtins: Mutex<BTreeMap<String, Arc<dyn ToolHandler>>>,
    providers: Vec<Arc<dyn ToolProvider>>,
    external: OnceCell<Vec<ExternalGroup>>,
}

impl ToolRegistry {
    /// Disabled built-ins are dropped here and never offered.
    pub fn new(builtins: Vec<Arc<dyn ToolHandler>>, providers: Vec<Arc<dyn ToolProvider>>) -> Self {
        let builtins = builtins
            .into_iter()
            .filter_map(|h| {
                let tool = h.descriptor();
                if tool.is_enabled && !tool.name.trim().is_empty() {
                    Some((tool.name, h))
                } else {
                    debug!(tool = %tool.name, "skipping disabled tool");
                    None
                }
            })
            .collect();
        Self {
            builtins: Mutex::new(builtins),
            providers,
            external: OnceCell::new(),
        }
    }

    /// Add or replace built-ins by name, then return the full set.
    pub async fn register(&self, overrides: Vec<Arc<dyn ToolHandler>>) -> ToolSet {
        {
            let mut builtins = self.builtins.lock();
            for handler in overrides {
                let name = handler.descriptor().name;
                if name.trim().is_empty() {
                    continue;
                }
                if builtins.insert(name.clone(), handler).is_some() {
                    debug!(tool = %name, "built-in tool overridden");
                }
            }
        }
        self.get_tools().await
    }

    pub async fn get_tools(&self) -> ToolSet {
        self.get_tools_where(|_| true).await
    }

    pub async fn get_tools_where(&self, predicate: impl Fn(&Tool) -> bool) -> ToolSet {
        let mut set = ToolSet::empty();
        for group in self.external().await {
            for tool in group.tools.iter().filter(|t| t.is_enabled) {
                set.insert(tool.clone(), Handler::Remote(Arc::clone(&group.provider)));
            }
        }

        let builtins: Vec<Arc<dyn ToolHandler>> = self.builtins.lock().values().cloned().collect();
        for handler in builtins {
            set.insert(handler.descriptor(), Handler::Local(handler));
        }

        // Filter after merging so a shadowed group tool never resurfaces.
        set.filter(predicate)
    }

    /// Names of the tool-server groups that advertised at least one tool.
    pub async fn group_names(&self) -> Vec<String> {
        self.external()
            .await
            .iter()
            .filter(|g| !g.tools.is_empty())
            .map(|g| g.provider.name().to_string())
            .collect()
    }

    async fn external(&self) -> &[ExternalGroup] {
        self.external
            .get_or_init(|| async {
                let mut groups = Vec::with_capacity(self.providers.len());
                for provider in &self.providers {
                    let tools = match provider.list_tools().await {
                        Ok(tools) => {
                            info!(group = provider.name(), tools = tools.len(), "tool group registered");
                            tools
                        }
                        Err(e) => {
                            warn!(group = provider.name(), error = %e, "tool group unavailable, skipping");
                            Vec::new()
                        }
                    };
                    groups.push(ExternalGroup {
                        provider: Arc::clone(provider),
                        tools,
                    });
                }
                groups
            })
            .await
    }
}
