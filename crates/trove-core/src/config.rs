use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, TroveError};

/// Environment variable holding the Elasticsearch endpoint.
pub const ENV_STORE_HOST: &str = "ES_HOST";
/// Environment variable holding the Elasticsearch user name.
pub const ENV_STORE_USERNAME: &str = "ES_USERNAME";
/// Environment variable holding the Elasticsearch password.
pub const ENV_STORE_PASSWORD: &str = "ES_PASSWORD";

/// Top-level configuration for the Trove service.
///
/// Loaded once at startup. A configuration that fails [`TroveConfig::validate`]
/// aborts startup; it is never a per-turn failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TroveConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub knowledge_base: KnowledgeBaseConfig,
}

impl TroveConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TroveConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Overlay store endpoint and credentials from the environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup(ENV_STORE_HOST) {
            self.store.endpoint = Some(host);
        }
        if let Some(user) = lookup(ENV_STORE_USERNAME) {
            self.store.username = Some(user);
        }
        if let Some(password) = lookup(ENV_STORE_PASSWORD) {
            self.store.password = Some(password);
        }
    }

    /// Check that everything needed to reach the store is present.
    pub fn validate(&self) -> Result<()> {
        if self.knowledge_base.default_limit == 0 {
            return Err(TroveError::Config(
                "knowledge_base.default_limit must be at least 1".to_string(),
            ));
        }
        if self.store.request_timeout_secs == 0 {
            return Err(TroveError::Config(
                "store.request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.knowledge_base.turn_timeout_secs == 0 {
            return Err(TroveError::Config(
                "knowledge_base.turn_timeout_secs must be at least 1".to_string(),
            ));
        }

        match self.store.backend {
            StoreBackend::Elasticsearch => {
                let missing: Vec<&str> = [
                    ("store.endpoint", &self.store.endpoint),
                    ("store.username", &self.store.username),
                    ("store.password", &self.store.password),
                ]
                .into_iter()
                .filter(|(_, v)| v.as_deref().map_or(true, str::is_empty))
                .map(|(k, _)| k)
                .collect();

                if !missing.is_empty() {
                    return Err(TroveError::Config(format!(
                        "elasticsearch backend requires {}",
                        missing.join(", ")
                    )));
                }
            }
            StoreBackend::Memory => {
                if self.store.seed_path.is_none() {
                    return Err(TroveError::Config(
                        "memory backend requires store.seed_path".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Process-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Address the action server binds to.
    pub host: String,
    /// Port the action server listens on.
    pub port: u16,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            host: "127.0.0.1".to_string(),
            port: 5055,
        }
    }
}

/// Which document store implementation serves queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Elasticsearch,
    Memory,
}

/// Document store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Base URL of the Elasticsearch cluster, e.g. `https://localhost:9200`.
    pub endpoint: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Deadline applied to every store request.
    pub request_timeout_secs: u64,
    /// JSON file with documents for the memory backend.
    pub seed_path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Elasticsearch,
            endpoint: None,
            username: None,
            password: None,
            request_timeout_secs: 30,
            seed_path: None,
        }
    }
}

/// Query-resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseConfig {
    /// Result cap used when the conversation carries no limit.
    pub default_limit: usize,
    /// Action name the webhook answers to.
    pub action_name: String,
    /// Upper bound on a whole turn, store calls included.
    pub turn_timeout_secs: u64,
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            default_limit: 5,
            action_name: "action_query_knowledge_base".to_string(),
            turn_timeout_secs: 30,
        }
    }
}
