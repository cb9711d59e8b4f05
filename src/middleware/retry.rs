/*!
 * Retry stage.
 *
 * Re-runs the rest of the chain after retryable errors (throttling,
 * unparsable responses, count mismatches, untranslated echoes), waiting
 * `base_delay * attempt` between attempts. Any other error is returned as
 * is. When every attempt fails the last error is wrapped in
 * `RetriesExhausted`.
 */

use async_trait::async_trait;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::errors::PipelineError;

use super::{BoxedHandler, Handler, Middleware, TranslationBatch};

/// Retries retryable failures with linear backoff
#[derive(Debug, Clone, Copy)]
pub struct Retry {
    attempts: u32,
    base_delay: Duration,
}

impl Retry {
    /// `attempts` is the total number of calls, at least one
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Wait before the attempt following attempt number `attempt`
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

impl Middleware for Retry {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(RetryHandler { policy: *self, next })
    }
}

struct RetryHandler {
    policy: Retry,
    next: BoxedHandler,
}

#[async_trait]
impl Handler for RetryHandler {
    async fn handle(
        &self,
        batch: TranslationBatch,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, PipelineError> {
        let mut attempt = 1;
        loop {
            let err = match self.next.handle(batch.clone(), cancel).await {
                Ok(results) => {
                    if attempt > 1 {
                        debug!("Batch of {} texts succeeded on attempt {}", batch.len(), attempt);
                    }
                    return Ok(results);
                }
                Err(err) => err,
            };

            if !err.is_retryable() {
                return Err(err);
            }
            if attempt >= self.policy.attempts {
                warn!("Giving up after {} attempts: {}", attempt, err);
                return Err(PipelineError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            let delay = self.policy.delay_after(attempt);
            warn!(
                "Attempt {}/{} failed: {}. Retrying in {:?}",
                attempt, self.policy.attempts, err, delay
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            }
            attempt += 1;
        }
    }
}
