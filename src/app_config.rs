use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration module
/// This module holds the typed settings the translation pipeline consumes.
/// Loading them from files or the environment is the caller's business;
/// `Config::merge` combines a base configuration with explicit overrides.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Name of the translation service, part of every cache key
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Outbound request budget (requests per minute, 0 disables throttling)
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    /// Maximum simultaneous provider calls (0 means unbounded)
    #[serde(default)]
    pub max_concurrency: usize,

    /// Maximum cumulative size of one provider request, in bytes
    #[serde(default = "default_max_batch_bytes")]
    pub max_batch_bytes: usize,

    /// Retry settings
    #[serde(default)]
    pub retry: RetryConfig,

    /// Cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Glossary terms (source term -> protected target)
    #[serde(default)]
    pub glossary: BTreeMap<String, String>,

    /// Literal replacements applied to every translation
    #[serde(default)]
    pub fixes: Vec<TranslationFix>,

    /// Log level for the embedding application's logger
    ///
    /// The library only emits through `log` and never installs a logger.
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Retry settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    #[serde(default = "default_retry_attempts")]
    pub attempts: u32,

    /// Base delay in milliseconds, multiplied by the attempt number
    #[serde(default = "default_retry_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_retry_attempts(),
            base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

/// Cache settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CacheConfig {
    /// Whether translations are cached at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds after which an entry counts as a miss
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Maximum number of live entries
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// Persistence file; `None` uses the default location
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// The file the cache is loaded from and saved to
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(default_cache_path)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_cache_ttl_secs(),
            capacity: default_cache_capacity(),
            path: None,
        }
    }
}

/// A literal post-translation replacement
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TranslationFix {
    pub from: String,
    pub to: String,
}

impl TranslationFix {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Filter to hand to the application's logger, e.g. `env_logger`
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Explicit overrides for `Config`; every field set here wins over the base
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub service_name: Option<String>,
    pub requests_per_minute: Option<u32>,
    pub max_concurrency: Option<usize>,
    pub max_batch_bytes: Option<usize>,
    pub retry_attempts: Option<u32>,
    pub retry_base_delay_ms: Option<u64>,
    pub cache_enabled: Option<bool>,
    pub cache_ttl_secs: Option<u64>,
    pub cache_capacity: Option<usize>,
    pub cache_path: Option<PathBuf>,
    pub glossary: Option<BTreeMap<String, String>>,
    pub fixes: Option<Vec<TranslationFix>>,
    pub log_level: Option<LogLevel>,
}

fn default_service_name() -> String {
    "default".to_string()
}

fn default_requests_per_minute() -> u32 {
    60
}

fn default_max_batch_bytes() -> usize {
    2000
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    8000 // 8s, 16s, 24s between attempts
}

fn default_cache_ttl_secs() -> u64 {
    20 * 60
}

fn default_cache_capacity() -> usize {
    5000
}

fn default_true() -> bool {
    true
}

fn default_cache_path() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("batchtrans"))
        .unwrap_or_else(std::env::temp_dir)
        .join("translate-cache.json")
}

impl Config {
    /// Create a configuration for the named service with default settings
    pub fn new(service_name: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            ..Default::default()
        }
    }

    /// Apply overrides field by field; a field set in `overrides` wins
    pub fn merge(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(service_name) = overrides.service_name {
            self.service_name = service_name;
        }
        if let Some(rpm) = overrides.requests_per_minute {
            self.requests_per_minute = rpm;
        }
        if let Some(max_concurrency) = overrides.max_concurrency {
            self.max_concurrency = max_concurrency;
        }
        if let Some(max_batch_bytes) = overrides.max_batch_bytes {
            self.max_batch_bytes = max_batch_bytes;
        }
        if let Some(attempts) = overrides.retry_attempts {
            self.retry.attempts = attempts;
        }
        if let Some(base_delay_ms) = overrides.retry_base_delay_ms {
            self.retry.base_delay_ms = base_delay_ms;
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = enabled;
        }
        if let Some(ttl_secs) = overrides.cache_ttl_secs {
            self.cache.ttl_secs = ttl_secs;
        }
        if let Some(capacity) = overrides.cache_capacity {
            self.cache.capacity = capacity;
        }
        if let Some(path) = overrides.cache_path {
            self.cache.path = Some(path);
        }
        if let Some(glossary) = overrides.glossary {
            self.glossary = glossary;
        }
        if let Some(fixes) = overrides.fixes {
            self.fixes = fixes;
        }
        if let Some(log_level) = overrides.log_level {
            self.log_level = log_level;
        }
        self
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.service_name.trim().is_empty() {
            return Err(anyhow!("Service name must not be empty"));
        }
        if self.max_batch_bytes == 0 {
            return Err(anyhow!("max_batch_bytes must be greater than zero"));
        }
        if self.retry.attempts == 0 {
            return Err(anyhow!("retry.attempts must be at least 1"));
        }
        if self.cache.enabled && self.cache.capacity == 0 {
            return Err(anyhow!("cache.capacity must be greater than zero when the cache is enabled"));
        }
        if self.glossary.keys().any(|term| term.trim().is_empty()) {
            return Err(anyhow!("Glossary terms must not be empty"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            service_name: default_service_name(),
            requests_per_minute: default_requests_per_minute(),
            max_concurrency: 0,
            max_batch_bytes: default_max_batch_bytes(),
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
            glossary: BTreeMap::new(),
            fixes: Vec::new(),
            log_level: LogLevel::default(),
        }
    }
}
