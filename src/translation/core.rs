/*!
 * Core translation service implementation.
 *
 * `TranslationService` owns the configuration, the shared cache and the
 * composed middleware chain, and is the entry point callers use to translate
 * a batch of texts. Stages, outermost first:
 *
 * texts limit, regroup, translation fixes, glossary, retry, cache,
 * rate limit, concurrency limit, provider.
 */

use anyhow::Result;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::app_config::Config;
use crate::errors::{CacheError, PipelineError};
use crate::middleware::{
    BoxedHandler, Cache, Chain, Concurrent, Glossary, ObserverSlot, ProviderHandler, RateLimit,
    Regroup, Retry, TextsLimit, TranslationBatch, TranslationFixes,
};
use crate::providers::Provider;

use super::cache::TranslationCache;

/// Translation service composing the middleware chain around a provider
pub struct TranslationService {
    /// Service configuration
    config: Config,

    /// Translation cache, absent when caching is disabled
    cache: Option<TranslationCache>,

    /// Progress observer registration shared with the regroup stage
    observer: ObserverSlot,

    /// Outermost handler of the chain
    handler: BoxedHandler,
}

impl std::fmt::Debug for TranslationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationService")
            .field("service_name", &self.config.service_name)
            .field("cache", &self.cache)
            .field("observer", &self.observer)
            .finish()
    }
}

impl TranslationService {
    /// Create a new translation service
    ///
    /// Validates the configuration and, when caching is enabled, opens the
    /// cache file. A missing or corrupt cache file starts an empty cache.
    pub fn new(config: Config, provider: Arc<dyn Provider>) -> Result<Self> {
        config.validate()?;

        let cache = if config.cache.enabled {
            Some(TranslationCache::open(&config.cache))
        } else {
            None
        };

        Ok(Self::with_cache(config, provider, cache))
    }

    /// Create a service around an already constructed cache
    ///
    /// Unlike `new`, the configuration is not validated and `config.cache` is
    /// ignored.
    pub fn with_cache(config: Config, provider: Arc<dyn Provider>, cache: Option<TranslationCache>) -> Self {
        let observer = ObserverSlot::new();
        let handler = Self::build_chain(&config, cache.as_ref(), &observer)
            .build(ProviderHandler::boxed(provider));

        info!(
            "Translation service '{}' ready: {} rpm, {} batch bytes, cache {}",
            config.service_name,
            config.requests_per_minute,
            config.max_batch_bytes,
            if cache.is_some() { "enabled" } else { "disabled" }
        );

        Self {
            config,
            cache,
            observer,
            handler,
        }
    }

    fn build_chain(config: &Config, cache: Option<&TranslationCache>, observer: &ObserverSlot) -> Chain {
        let mut chain = Chain::new()
            .layer(TextsLimit::new(config.max_batch_bytes))
            .layer(Regroup::new(config.max_batch_bytes, config.max_concurrency).with_observer(observer.clone()))
            .layer(TranslationFixes::new(config.fixes.clone()))
            .layer(Glossary::new(&config.glossary))
            .layer(Retry::new(config.retry.attempts, config.retry.base_delay()));

        if let Some(cache) = cache {
            chain = chain.layer(Cache::new(cache.clone(), config.service_name.clone()));
        }

        chain
            .layer_if(config.requests_per_minute > 0, RateLimit::per_minute(config.requests_per_minute))
            .layer(Concurrent::new(config.max_concurrency))
    }

    /// Register the progress observer, replacing any previous one
    ///
    /// The observer receives each completed group's translations in group
    /// order. An error from the observer aborts the call in progress.
    ///
    /// Groups are reported before long texts are merged back: a split text
    /// streams an empty-source entry for its own slot followed by one entry
    /// per segment, so the streamed entries can differ from the final result.
    pub fn on_translated<F>(&self, observer: F)
    where
        F: Fn(&[String]) -> Result<()> + Send + Sync + 'static,
    {
        self.observer.set(Arc::new(observer));
    }

    /// Remove the progress observer
    pub fn clear_observer(&self) {
        self.observer.clear();
    }

    /// Translate `texts` into `target_language`
    ///
    /// Returns one translation per input text, in input order.
    pub async fn translate(&self, texts: &[String], target_language: &str) -> Result<Vec<String>, PipelineError> {
        self.translate_with_cancel(texts, target_language, &CancellationToken::new())
            .await
    }

    /// Translate `texts`, aborting with `PipelineError::Cancelled` once `cancel` fires
    pub async fn translate_with_cancel(
        &self,
        texts: &[String],
        target_language: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, PipelineError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Translating {} texts into {}", texts.len(), target_language);
        let batch = TranslationBatch::new(texts.to_vec(), target_language);
        let results = self.handler.handle(batch, cancel).await?;

        if results.len() != texts.len() {
            return Err(PipelineError::MergeMismatch {
                expected: texts.len(),
                actual: results.len(),
            });
        }
        Ok(results)
    }

    /// Translate a single text
    pub async fn translate_text(&self, text: &str, target_language: &str) -> Result<String, PipelineError> {
        let mut results = self.translate(&[text.to_string()], target_language).await?;
        results.pop().ok_or(PipelineError::MergeMismatch { expected: 1, actual: 0 })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The translation cache, if caching is enabled
    pub fn cache(&self) -> Option<&TranslationCache> {
        self.cache.as_ref()
    }

    /// Cache statistics as (hits, misses, hit rate)
    pub fn cache_stats(&self) -> Option<(usize, usize, f64)> {
        self.cache.as_ref().map(TranslationCache::stats)
    }

    /// Write the cache to its file
    pub fn save_cache(&self) -> Result<(), CacheError> {
        match &self.cache {
            Some(cache) => cache.save(),
            None => Ok(()),
        }
    }

    /// Flush the cache and release the service
    pub fn shutdown(self) -> Result<(), CacheError> {
        if let Some((hits, misses, rate)) = self.cache_stats() {
            info!(
                "Shutting down '{}': cache hits {}, misses {}, hit rate {:.1}%",
                self.config.service_name,
                hits,
                misses,
                rate * 100.0
            );
        }

        self.save_cache().inspect_err(|e| warn!("Failed to save translation cache: {}", e))
    }
}
