/*!
 * Cache stage: answers texts that were translated before and forwards only
 * the rest. Fresh translations are stored on the way back.
 */

use async_trait::async_trait;
use log::debug;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::errors::PipelineError;
use crate::translation::cache::TranslationCache;

use super::{BoxedHandler, Handler, Middleware, TranslationBatch};

/// Serves and records translations through a `TranslationCache`
#[derive(Debug, Clone)]
pub struct Cache {
    cache: TranslationCache,
    service: Arc<str>,
}

impl Cache {
    /// Entries are namespaced by `service`
    pub fn new(cache: TranslationCache, service: impl Into<String>) -> Self {
        Self {
            cache,
            service: Arc::from(service.into()),
        }
    }
}

impl Middleware for Cache {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(CacheHandler {
            cache: self.cache.clone(),
            service: self.service.clone(),
            next,
        })
    }
}

struct CacheHandler {
    cache: TranslationCache,
    service: Arc<str>,
    next: BoxedHandler,
}

#[async_trait]
impl Handler for CacheHandler {
    async fn handle(
        &self,
        batch: TranslationBatch,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, PipelineError> {
        let language = batch.target_language.as_str();

        let cached: Vec<Option<String>> = batch
            .texts
            .iter()
            .map(|text| self.cache.get(&self.service, language, text))
            .collect();

        let missing: Vec<String> = batch
            .texts
            .iter()
            .zip(&cached)
            .filter(|(_, hit)| hit.is_none())
            .map(|(text, _)| text.clone())
            .collect();

        if missing.is_empty() {
            debug!("All {} texts served from cache", batch.len());
            return Ok(cached.into_iter().flatten().collect());
        }
        debug!(
            "{} of {} texts served from cache, forwarding {}",
            batch.len() - missing.len(),
            batch.len(),
            missing.len()
        );

        let translated = self.next.handle(batch.with_texts(missing.clone()), cancel).await?;
        if translated.len() != missing.len() {
            return Err(PipelineError::MergeMismatch {
                expected: missing.len(),
                actual: translated.len(),
            });
        }

        for (text, result) in missing.iter().zip(&translated) {
            self.cache.set(&self.service, language, text, result);
        }

        let mut fresh = translated.into_iter();
        let mut merged = Vec::with_capacity(cached.len());
        for hit in cached {
            match hit.or_else(|| fresh.next()) {
                Some(result) => merged.push(result),
                None => {
                    return Err(PipelineError::MergeMismatch {
                        expected: batch.len(),
                        actual: merged.len(),
                    })
                }
            }
        }
        Ok(merged)
    }
}
