/*!
 * Regroup stage: packs a batch into size-bounded groups, fans the groups out
 * to the rest of the chain and reports each completed group to the progress
 * observer.
 */

use async_trait::async_trait;
use futures::FutureExt;
use log::debug;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::errors::PipelineError;
use crate::translation::batch::regroup_texts;
use crate::translation::concurrency::fan_out;

use super::on_translated::{ObserverSlot, OrderedEmitter};
use super::{BoxedHandler, Handler, Middleware, TranslationBatch};

/// Splits a batch into groups of at most `max_len` bytes
#[derive(Debug, Clone)]
pub struct Regroup {
    max_len: usize,
    max_workers: usize,
    observer: ObserverSlot,
}

impl Regroup {
    /// `max_workers == 0` processes every group concurrently
    pub fn new(max_len: usize, max_workers: usize) -> Self {
        Self {
            max_len,
            max_workers,
            observer: ObserverSlot::new(),
        }
    }

    /// Report completed groups to the observer registered on `observer`
    ///
    /// Inside the long-text stage, so split texts are reported segment by
    /// segment.
    pub fn with_observer(mut self, observer: ObserverSlot) -> Self {
        self.observer = observer;
        self
    }
}

impl Middleware for Regroup {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(RegroupHandler {
            max_len: self.max_len,
            max_workers: self.max_workers,
            observer: self.observer.clone(),
            next,
        })
    }
}

struct RegroupHandler {
    max_len: usize,
    max_workers: usize,
    observer: ObserverSlot,
    next: BoxedHandler,
}

#[async_trait]
impl Handler for RegroupHandler {
    async fn handle(
        &self,
        batch: TranslationBatch,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, PipelineError> {
        let groups = regroup_texts(&batch.texts, self.max_len)?;
        debug!("Regrouped {} texts into {} groups", batch.len(), groups.len());

        let emitter = OrderedEmitter::new(self.observer.current());
        let emitter = &emitter;
        let batch = &batch;

        fan_out(groups, self.max_workers, |index, group| {
            async move {
                let translated = self.next.handle(batch.with_texts(group), cancel).await?;
                emitter.complete(index, &translated)?;
                Ok(translated)
            }
            .boxed()
        })
        .await
    }
}
