/*!
 * Rate limit stage: every call to the rest of the chain takes one token from
 * a shared requests-per-minute bucket.
 */

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::errors::PipelineError;
use crate::translation::rate_limit::TokenBucket;

use super::{BoxedHandler, Handler, Middleware, TranslationBatch};

/// Throttles outbound calls through a token bucket
#[derive(Debug, Clone)]
pub struct RateLimit {
    bucket: Arc<TokenBucket>,
}

impl RateLimit {
    pub fn per_minute(requests_per_minute: u32) -> Self {
        Self::with_bucket(Arc::new(TokenBucket::per_minute(requests_per_minute)))
    }

    /// Share an existing bucket
    pub fn with_bucket(bucket: Arc<TokenBucket>) -> Self {
        Self { bucket }
    }
}

impl Middleware for RateLimit {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(RateLimitHandler {
            bucket: self.bucket.clone(),
            next,
        })
    }
}

struct RateLimitHandler {
    bucket: Arc<TokenBucket>,
    next: BoxedHandler,
}

#[async_trait]
impl Handler for RateLimitHandler {
    async fn handle(
        &self,
        batch: TranslationBatch,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, PipelineError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        self.bucket.acquire(cancel).await?;
        self.next.handle(batch, cancel).await
    }
}
