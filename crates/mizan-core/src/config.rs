use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 18990;
pub const DEFAULT_BIND: &str = "127.0.0.1";
/// Hard cap on sanitized user input (characters).
pub const DEFAULT_MAX_INPUT_CHARS: usize = 10_000;

/// Top-level config (mizan.toml + MIZAN_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MizanConfig {
    pub gateway: GatewayConfig,
    pub agent: AgentConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Default for MizanConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig {
                port: DEFAULT_PORT,
                bind: DEFAULT_BIND.to_string(),
            },
            agent: AgentConfig {
                model: default_model(),
                max_tokens: default_max_tokens(),
                language: default_language(),
            },
            database: DatabaseConfig::default(),
            providers: ProvidersConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// System prompt variant: "ar" (Arabic legal), "en" (English legal).
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    pub anthropic: Option<AnthropicConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    pub api_key: String,
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,
}

/// Pipeline behaviour knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// When false the checkpoint store is bypassed entirely and runs are
    /// stateless (no persistence, no resumption).
    #[serde(default = "bool_true")]
    pub use_checkpointing: bool,
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            use_checkpointing: true,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_model() -> String {
    "claude-sonnet-4-5".to_string()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_language() -> String {
    "ar".to_string()
}
fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}
fn default_max_input_chars() -> usize {
    DEFAULT_MAX_INPUT_CHARS
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.mizan/mizan.db", home)
}

impl MizanConfig {
    /// Load config from a TOML file with MIZAN_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.mizan/mizan.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: MizanConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("MIZAN_").split("_"))
            .extract()
            .map_err(|e| crate::error::MizanError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Fail fast when the provider credential is missing — a configuration
    /// error must surface before any stream is opened.
    pub fn require_provider(&self) -> crate::error::Result<&AnthropicConfig> {
        self.providers
            .anthropic
            .as_ref()
            .filter(|a| !a.api_key.is_empty())
            .ok_or_else(|| {
                crate::error::MizanError::Config(
                    "providers.anthropic.api_key is not set".to_string(),
                )
            })
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.mizan/mizan.toml", home)
}
