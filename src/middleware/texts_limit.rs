/*!
 * Long-text guard: splits texts over the byte limit before the batch moves
 * on and merges their translated segments back on the way out.
 */

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::errors::PipelineError;
use crate::translation::batch::{merge_back, split_long_texts};

use super::{BoxedHandler, Handler, Middleware, TranslationBatch};

/// Splits overlong texts into appended segments and merges them back
#[derive(Debug, Clone, Copy)]
pub struct TextsLimit {
    max_len: usize,
}

impl TextsLimit {
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }
}

impl Middleware for TextsLimit {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(TextsLimitHandler {
            max_len: self.max_len,
            next,
        })
    }
}

struct TextsLimitHandler {
    max_len: usize,
    next: BoxedHandler,
}

#[async_trait]
impl Handler for TextsLimitHandler {
    async fn handle(
        &self,
        batch: TranslationBatch,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, PipelineError> {
        let TranslationBatch { texts, target_language } = batch;
        let (expanded, mapping) = split_long_texts(texts, self.max_len)?;

        let results = self
            .next
            .handle(TranslationBatch::new(expanded, target_language), cancel)
            .await?;

        merge_back(results, &mapping)
    }
}
