use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use ycode_core::{Result, YcodeError};

use crate::schema::{McpServerConfig, YcodeConfig};

/// Loads the YCode configuration once at startup.
pub struct ConfigLoader {
    config: YcodeConfig,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > YCODE_CONFIG env > ~/.ycode/ycode.toml
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("YCODE_CONFIG") {
            return PathBuf::from(p);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".ycode")
            .join("ycode.toml")
    }

    /// Load the config from disk, falling back to defaults, with process env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, |key: &str| std::env::var(key).ok())
    }

    /// Same as [`load`](Self::load) but reads overrides through `env`.
    pub fn load_with_env(path: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config_path = Self::resolve_path(path);
        let config = Self::read_file(&config_path)?;
        let config = Self::apply_env_overrides(config, &env);

        for w in config.validate()? {
            warn!("{}", w);
        }

        Ok(Self {
            config,
            config_path,
        })
    }

    fn read_file(config_path: &Path) -> Result<YcodeConfig> {
        if !config_path.exists() {
            info!(?config_path, "config file not found, using defaults");
            return Ok(YcodeConfig::default());
        }
        info!(?config_path, "loading configuration");
        let raw = std::fs::read_to_string(config_path)?;
        toml::from_str::<YcodeConfig>(&raw).map_err(|e| {
            YcodeError::Config(format!("failed to parse {}: {}", config_path.display(), e))
        })
    }

    /// A copy of the loaded config.
    pub fn get(&self) -> YcodeConfig {
        self.config.clone()
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Apply env var overrides (YCODE_MODEL, YCODE_AUTH_TOKEN, etc.)
    pub fn apply_env_overrides(
        mut config: YcodeConfig,
        env: &impl Fn(&str) -> Option<String>,
    ) -> YcodeConfig {
        let non_blank = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_blank("YCODE_MODEL") {
            config.agent.model = v;
        }
        if let Some(v) = non_blank("YCODE_AUTH_TOKEN") {
            config.services.api_key = Some(v);
        }
        if let Some(v) = non_blank("YCODE_API_BASE_URI") {
            config.services.base_url = v;
        }
        if let Some(v) = non_blank("YCODE_MEMORY_ROOT") {
            config.memory.root = Some(PathBuf::from(v));
        }
        if let Some(v) = non_blank("YCODE_PROJECT") {
            config.memory.project = Some(v);
        }
        if let Some(v) = non_blank("YCODE_LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Some(key) = non_blank("YCODE_CONTEXT7")
            && !config.mcp.servers.iter().any(|s| s.name == "context7")
        {
            config.mcp.servers.push(McpServerConfig {
                name: "context7".into(),
                command: "npx".into(),
                args: vec![
                    "-y".into(),
                    "@upstash/context7-mcp".into(),
                    "--api-key".into(),
                    key,
                ],
                env: HashMap::new(),
                enabled: true,
            });
        }
        config
    }
}
