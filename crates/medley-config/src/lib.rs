//! Configuration loading for Medley.
//! Reads medley.toml from the current directory or the path in the MEDLEY_CONFIG
//! env var, then applies environment overrides (a `.env` file is honoured).

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

#[cfg(test)]
mod tests;

pub const DEFAULT_CONFIG_FILE: &str = "medley.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub apps: AppsConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub ums: UmsConfig,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed origins for the chat, tasks and rag routers. Empty means any.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16    { 8000 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

/// Which applications the server mounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppsConfig {
    #[serde(default = "bool_true")]
    pub chat: bool,
    #[serde(default = "bool_true")]
    pub tasks: bool,
    #[serde(default = "bool_true")]
    pub ums: bool,
    #[serde(default = "bool_true")]
    pub rag: bool,
}

fn bool_true() -> bool { true }

impl Default for AppsConfig {
    fn default() -> Self {
        Self { chat: true, tasks: true, ums: true, rag: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB.
    #[serde(default = "default_argon2_memory")]
    pub argon2_memory_kib: u32,
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,
}

fn default_argon2_memory()     -> u32 { 19_456 }
fn default_argon2_iterations() -> u32 { 2 }

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_kib: default_argon2_memory(),
            argon2_iterations: default_argon2_iterations(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
    #[serde(default = "default_room")]
    pub default_room: String,
}

fn default_page_size()       -> usize  { 50 }
fn default_queue_capacity()  -> usize  { 100 }
fn default_ping_interval()   -> u64    { 25 }
fn default_max_message_len() -> usize  { 2000 }
fn default_room()            -> String { "general".to_string() }

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            queue_capacity: default_queue_capacity(),
            ping_interval_secs: default_ping_interval(),
            max_message_len: default_max_message_len(),
            default_room: default_room(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UmsConfig {
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
    #[serde(default = "default_rate_window")]
    pub rate_limit_window_ms: u64,
    #[serde(default = "default_rate_max")]
    pub rate_limit_max: u32,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
    /// Demand a UMS session token on every resource and dashboard route.
    #[serde(default = "default_require_auth")]
    pub require_auth: bool,
    /// Seed a handful of departments, people and notices, plus the
    /// `admin@university.edu` account, at startup.
    #[serde(default)]
    pub seed_demo_data: bool,
}

fn default_frontend_url() -> String { "http://localhost:3000".to_string() }
fn default_rate_window()  -> u64    { 15 * 60 * 1000 }
fn default_rate_max()     -> u32    { 100 }
fn default_body_limit()   -> usize  { 10 * 1024 * 1024 }
fn default_require_auth() -> bool   { true }

impl Default for UmsConfig {
    fn default() -> Self {
        Self {
            frontend_url: default_frontend_url(),
            rate_limit_window_ms: default_rate_window(),
            rate_limit_max: default_rate_max(),
            body_limit_bytes: default_body_limit(),
            require_auth: default_require_auth(),
            seed_demo_data: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderKind {
    /// Local feature-hashing embedder, no network.
    Hashing,
    /// The configured LLM backend's /v1/embeddings endpoint.
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_embedder")]
    pub embedder: EmbedderKind,
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,
    pub embedding_model: Option<String>,
}

fn default_upload_dir()      -> PathBuf      { PathBuf::from("uploads") }
fn default_chunk_size()      -> usize        { 500 }
fn default_chunk_overlap()   -> usize        { 50 }
fn default_min_chunk_chars() -> usize        { 80 }
fn default_top_k()           -> usize        { 3 }
fn default_max_tokens()      -> u32          { 300 }
fn default_temperature()     -> f32          { 0.2 }
fn default_embedder()        -> EmbedderKind { EmbedderKind::Hashing }
fn default_embedding_dim()   -> usize        { 384 }

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            min_chunk_chars: default_min_chunk_chars(),
            top_k: default_top_k(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            embedder: default_embedder(),
            embedding_dim: default_embedding_dim(),
            embedding_model: None,
        }
    }
}

/// OpenAI-compatible completion backend (Groq by default).
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,
}

fn default_llm_base_url() -> String { "https://api.groq.com/openai".to_string() }
fn default_llm_model()    -> String { "llama-3.3-70b-versatile".to_string() }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_key: None,
        }
    }
}

impl LlmConfig {
    pub fn api_key(&self) -> Option<SecretString> {
        self.api_key.clone()
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Config {
    /// Load `.env`, the TOML file (if any), then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            info!("Loaded environment from {}", path.display());
        }

        let path = std::env::var("MEDLEY_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = if path.exists() {
            info!("Reading configuration from {}", path.display());
            Self::from_file(&path)?
        } else {
            info!("{} not found, using defaults", path.display());
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply overrides from a key lookup (normally the process environment).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("MEDLEY_HOST") {
            self.server.host = host;
        }
        override_parsed(&lookup, "MEDLEY_PORT", &mut self.server.port);
        if let Some(url) = lookup("FRONTEND_URL") {
            self.ums.frontend_url = url;
        }
        override_parsed(&lookup, "RATE_LIMIT_WINDOW_MS", &mut self.ums.rate_limit_window_ms);
        override_parsed(&lookup, "RATE_LIMIT_MAX", &mut self.ums.rate_limit_max);
        override_parsed(&lookup, "UMS_REQUIRE_AUTH", &mut self.ums.require_auth);
        if let Some(dir) = lookup("UPLOAD_FOLDER") {
            self.rag.upload_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup("LLM_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = lookup("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(key) = lookup("LLM_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.llm.api_key = Some(SecretString::from(key));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rag.chunk_overlap >= self.rag.chunk_size {
            return Err(ConfigError::Invalid(format!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                self.rag.chunk_overlap, self.rag.chunk_size
            )));
        }
        if self.rag.top_k == 0 {
            return Err(ConfigError::Invalid("rag.top_k must be at least 1".into()));
        }
        if self.ums.rate_limit_max == 0 || self.ums.rate_limit_window_ms == 0 {
            return Err(ConfigError::Invalid("ums rate limit window and max must be non-zero".into()));
        }
        if self.chat.page_size == 0 || self.chat.queue_capacity == 0 {
            return Err(ConfigError::Invalid("chat.page_size and chat.queue_capacity must be non-zero".into()));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn override_parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut T)
where
    T::Err: fmt::Display,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse() {
            Ok(value) => *slot = value,
            Err(e) => warn!("Invalid {key} value {raw:?}: {e}, keeping previous setting"),
        }
    }
}
