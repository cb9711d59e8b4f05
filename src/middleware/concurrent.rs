/*!
 * Concurrency bound: at most `max` calls may be inside the rest of the chain
 * at once, across every batch sharing the layer.
 */

use async_trait::async_trait;
use log::debug;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::errors::PipelineError;

use super::{BoxedHandler, Handler, Middleware, TranslationBatch};

/// Limits in-flight calls with a shared semaphore
#[derive(Debug, Clone)]
pub struct Concurrent {
    permits: Option<Arc<Semaphore>>,
}

impl Concurrent {
    /// `max == 0` leaves calls unbounded
    pub fn new(max: usize) -> Self {
        Self {
            permits: (max > 0).then(|| Arc::new(Semaphore::new(max))),
        }
    }

    /// Permits currently free, `None` when unbounded
    pub fn available(&self) -> Option<usize> {
        self.permits.as_ref().map(|permits| permits.available_permits())
    }
}

impl Middleware for Concurrent {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        match &self.permits {
            Some(permits) => Arc::new(ConcurrentHandler {
                permits: permits.clone(),
                next,
            }),
            None => next,
        }
    }
}

struct ConcurrentHandler {
    permits: Arc<Semaphore>,
    next: BoxedHandler,
}

#[async_trait]
impl Handler for ConcurrentHandler {
    async fn handle(
        &self,
        batch: TranslationBatch,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, PipelineError> {
        let _permit = tokio::select! {
            permit = self.permits.acquire() => match permit {
                Ok(permit) => permit,
                // The semaphore is never closed while handlers hold it
                Err(_) => return Err(PipelineError::Cancelled),
            },
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
        };
        debug!(
            "Acquired provider slot, {} left",
            self.permits.available_permits()
        );
        self.next.handle(batch, cancel).await
    }
}
