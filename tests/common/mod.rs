/*!
 * Common test utilities for the batchtrans test suite
 */

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use batchtrans::app_config::Config;
use batchtrans::providers::mock::MockProvider;
use batchtrans::{TranslationCache, TranslationService};

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Path of a cache file inside `dir`
pub fn cache_path(dir: &Path) -> PathBuf {
    dir.join("translate-cache.json")
}

/// Install a logger once at the configured level; `RUST_LOG` still wins
pub fn init_logging() {
    let level = Config::default().log_level.to_level_filter();
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

/// Owned strings from literals
pub fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Fast configuration: no throttling, no cache, millisecond retries
pub fn fast_config() -> Config {
    let mut config = Config::new("test");
    config.requests_per_minute = 0;
    config.retry.base_delay_ms = 1;
    config.cache.enabled = false;
    config
}

/// Service over `provider` with an in-memory cache
pub fn service_with_cache(config: Config, provider: &MockProvider) -> TranslationService {
    let cache = TranslationCache::new(config.cache.capacity, config.cache.ttl());
    TranslationService::with_cache(config, Arc::new(provider.clone()), Some(cache))
}

/// Service over `provider` without a cache
pub fn service_without_cache(config: Config, provider: &MockProvider) -> TranslationService {
    TranslationService::with_cache(config, Arc::new(provider.clone()), None)
}

/// What the working mock returns for `items`
pub fn expected(items: &[&str], target_language: &str) -> Vec<String> {
    items
        .iter()
        .map(|text| MockProvider::expected_translation(text, target_language))
        .collect()
}
