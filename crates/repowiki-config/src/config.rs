//! Configuration structures and loading.

use crate::error::{ConfigError, ConfigResult};
use crate::paths::AppPaths;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub github: GithubConfig,

    #[serde(default)]
    pub budget: BudgetConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub filter: FilterConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> ConfigResult<Self> {
        let paths = AppPaths::new().ok_or(ConfigError::NoConfigDir)?;
        Self::load_from(&paths.config_file)
    }

    /// Load and validate configuration from a specific path.
    ///
    /// A missing file yields the defaults.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        self.validate()?;
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Create a default config file with comments.
    pub fn create_default_file(path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, Self::default_config_string())?;
        Ok(())
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.budget.max_retries < 1 {
            return Err(ConfigError::Invalid(
                "budget.max_retries must be at least 1".to_string(),
            ));
        }
        if self.budget.character_limit < self.budget.reduce_char_per_retry {
            return Err(ConfigError::Invalid(
                "budget.character_limit must not be smaller than budget.reduce_char_per_retry"
                    .to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Invalid(
                "llm.temperature must be between 0.0 and 2.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.llm.top_p) {
            return Err(ConfigError::Invalid(
                "llm.top_p must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.queue.max_queue_size == 0 {
            return Err(ConfigError::Invalid(
                "queue.max_queue_size must be at least 1".to_string(),
            ));
        }
        if self.ingest.file_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "ingest.file_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Set one value by its dotted key (e.g. `llm.model`).
    ///
    /// An empty value clears optional settings. The result is not validated.
    pub fn set_value(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["general", "data_dir"] => self.general.data_dir = optional(value),
            ["llm", "provider"] => self.llm.provider = value.parse()?,
            ["llm", "host"] => self.llm.host = value.trim_end_matches('/').to_string(),
            ["llm", "model"] => self.llm.model = value.to_string(),
            ["llm", "api_key"] => self.llm.api_key = optional(value),
            ["llm", "timeout_seconds"] => self.llm.timeout_seconds = parse(key, value)?,
            ["llm", "temperature"] => self.llm.temperature = parse(key, value)?,
            ["llm", "top_p"] => self.llm.top_p = parse(key, value)?,
            ["llm", "top_k"] => self.llm.top_k = parse(key, value)?,
            ["llm", "max_tokens"] => self.llm.max_tokens = parse(key, value)?,
            ["github", "api_url"] => self.github.api_url = value.trim_end_matches('/').to_string(),
            ["github", "raw_url"] => self.github.raw_url = value.trim_end_matches('/').to_string(),
            ["github", "token"] => self.github.token = optional(value),
            ["github", "timeout_seconds"] => self.github.timeout_seconds = parse(key, value)?,
            ["budget", "character_limit"] => self.budget.character_limit = parse(key, value)?,
            ["budget", "reduce_char_per_retry"] => {
                self.budget.reduce_char_per_retry = parse(key, value)?
            }
            ["budget", "max_retries"] => self.budget.max_retries = parse(key, value)?,
            ["queue", "max_queue_size"] => self.queue.max_queue_size = parse(key, value)?,
            ["queue", "rate_limit_threshold"] => {
                self.queue.rate_limit_threshold = parse(key, value)?
            }
            ["queue", "grace_seconds"] => self.queue.grace_seconds = parse(key, value)?,
            ["queue", "existence_check_timeout_seconds"] => {
                self.queue.existence_check_timeout_seconds = parse(key, value)?
            }
            ["ingest", "file_concurrency"] => self.ingest.file_concurrency = parse(key, value)?,
            ["server", "bind"] => self.server.bind = value.to_string(),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }

        Ok(())
    }

    /// Generate a default config file with helpful comments.
    pub fn default_config_string() -> String {
        let filter = FilterConfig::default();
        format!(
            r#"# Repowiki Configuration
# AI-generated documentation trees for source repositories

[general]
# Data directory for the database and logs
# data_dir = "~/.local/share/repowiki"

[llm]
# Provider: "ollama" or "openai" (any OpenAI-compatible endpoint, e.g. DeepSeek)
provider = "ollama"
host = "http://localhost:11434"
model = "llama3.1:8b"
# api_key = "sk-..."
timeout_seconds = 300

# Generation parameters
temperature = 1.0      # 0.0 - 2.0
top_p = 0.95           # 0.0 - 1.0
top_k = 0
max_tokens = 8192

[github]
api_url = "https://api.github.com"
raw_url = "https://raw.githubusercontent.com"
# Falls back to the GITHUB_TOKEN environment variable
# token = "ghp_..."
timeout_seconds = 30

[budget]
# Characters sent to the model on the first attempt
character_limit = 1000000
# Characters removed on every retry
reduce_char_per_retry = 200000
max_retries = 3

[queue]
max_queue_size = 25
# Pause processing when fewer API requests than this remain
rate_limit_threshold = 500
grace_seconds = 1
existence_check_timeout_seconds = 10
# Primary languages accepted for ingestion (empty accepts everything)
allowed_languages = {languages}

[filter]
# Regular expressions searched in the lowercased path
allow_patterns = {allow}
deny_file_patterns = {deny_files}
deny_folder_patterns = {deny_folders}

[ingest]
# Files summarized concurrently within one folder
file_concurrency = 8

[server]
bind = "127.0.0.1:8000"
"#,
            languages = toml_list(&QueueConfig::default().allowed_languages),
            allow = toml_list(&filter.allow_patterns),
            deny_files = toml_list(&filter.deny_file_patterns),
            deny_folders = toml_list(&filter.deny_folder_patterns),
        )
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("Invalid value for {}: {}", key, value)))
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Render a string list as a multi-line TOML array of literal strings.
fn toml_list(values: &[String]) -> String {
    let mut out = String::from("[\n");
    for value in values {
        out.push_str(&format!("    '{}',\n", value));
    }
    out.push(']');
    out
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub data_dir: Option<String>,
}

/// Which chat API the summarizer talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    Ollama,
    OpenAi,
}

impl LlmProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProviderKind::Ollama => "ollama",
            LlmProviderKind::OpenAi => "openai",
        }
    }
}

impl std::str::FromStr for LlmProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(LlmProviderKind::Ollama),
            "openai" => Ok(LlmProviderKind::OpenAi),
            _ => Err(ConfigError::Invalid(format!("Unknown LLM provider: {}", s))),
        }
    }
}

/// LLM provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProviderKind,
    pub host: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::Ollama,
            host: "http://localhost:11434".to_string(),
            model: "llama3.1:8b".to_string(),
            api_key: None,
            timeout_seconds: 300,
            temperature: 1.0,
            top_p: 0.95,
            top_k: 0,
            max_tokens: 8192,
        }
    }
}

/// GitHub API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub api_url: String,
    pub raw_url: String,
    pub token: Option<String>,
    pub timeout_seconds: u64,
}

impl GithubConfig {
    /// Configured token, or `GITHUB_TOKEN` from the environment.
    pub fn resolved_token(&self) -> Option<String> {
        self.token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()))
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            raw_url: "https://raw.githubusercontent.com".to_string(),
            token: None,
            timeout_seconds: 30,
        }
    }
}

/// Input size budget for summarization retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub character_limit: usize,
    pub reduce_char_per_retry: usize,
    pub max_retries: usize,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            character_limit: 1_000_000,
            reduce_char_per_retry: 200_000,
            max_retries: 3,
        }
    }
}

/// Ingestion queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub max_queue_size: usize,
    pub rate_limit_threshold: u64,
    pub grace_seconds: u64,
    pub existence_check_timeout_seconds: u64,
    pub allowed_languages: Vec<String>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 25,
            rate_limit_threshold: 500,
            grace_seconds: 1,
            existence_check_timeout_seconds: 10,
            allowed_languages: strings(&[
                "Python",
                "JavaScript",
                "TypeScript",
                "Java",
                "Scala",
                "C",
                "C++",
                "Go",
                "Ruby",
                "Rust",
                "PHP",
            ]),
        }
    }
}

/// Path filter patterns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub allow_patterns: Vec<String>,
    pub deny_file_patterns: Vec<String>,
    pub deny_folder_patterns: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            allow_patterns: strings(&[
                r"\.py$",
                r"\.js$",
                r"\.ts$",
                r"\.java$",
                r"\.scala$",
                r"readme\.md",
                r"\.cpp$",
                r"\.cc$",
                r"\.cxx$",
                r"\.hpp$",
                r"\.hxx$",
                r"\.h$",
                r"\.go$",
                r"\.rb$",
                r"\.rs$",
                r"\.php$",
            ]),
            deny_file_patterns: strings(&[
                r"(^|/)\.[^/]+($|/)",
                r"__\w+",
                r"setup",
                r"d\.ts",
                r"build",
                r"demo",
                r"entrypoint",
                r"example",
                r"config",
                r"sponsor",
                r"contrib",
                r"gulpfile",
                r"webpack",
                r"\.min\.js",
                r"\.spec",
                r"types",
            ]),
            deny_folder_patterns: strings(&[
                r"(^|/)\.[^/]+($|/)",
                r"__\w+",
                "appimage",
                "appearance",
                "art",
                "assets",
                "audio",
                "bench",
                "bin",
                "build",
                "cache",
                "changelog",
                "ci",
                "cmake",
                "contrib",
                "debug",
                "demo",
                "developer",
                "docker",
                "doc",
                "e2e",
                "example",
                "extra",
                "esm",
                "guide",
                "html",
                "image",
                "img",
                "node_modules",
                "output",
                "public",
                "picture",
                "release",
                "requirement",
                "sample",
                "script",
                "setup",
                "static",
                "support",
                "screenshot",
                "target",
                "temp",
                "theme",
                "tool",
                "test",
                "third_party",
                "tmp",
                "vendor",
                "video",
                "workflows",
                "locale",
                "conf",
                "tutorial",
            ]),
        }
    }
}

/// Repository walk settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub file_concurrency: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { file_concurrency: 8 }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
