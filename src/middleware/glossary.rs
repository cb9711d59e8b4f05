/*!
 * Glossary protection: terms are swapped for placeholders before the batch
 * reaches the provider and replaced by their fixed translations afterwards.
 */

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::errors::PipelineError;
use crate::translation::glossary::GlossaryGuard;

use super::{BoxedHandler, Handler, Middleware, TranslationBatch};

/// Keeps glossary terms out of the provider's hands
#[derive(Debug, Clone)]
pub struct Glossary {
    guard: Arc<GlossaryGuard>,
}

impl Glossary {
    pub fn new(terms: &BTreeMap<String, String>) -> Self {
        Self {
            guard: Arc::new(GlossaryGuard::new(terms)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.guard.is_empty()
    }
}

impl Middleware for Glossary {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        if self.is_empty() {
            return next;
        }
        Arc::new(GlossaryHandler {
            guard: self.guard.clone(),
            next,
        })
    }
}

struct GlossaryHandler {
    guard: Arc<GlossaryGuard>,
    next: BoxedHandler,
}

#[async_trait]
impl Handler for GlossaryHandler {
    async fn handle(
        &self,
        batch: TranslationBatch,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, PipelineError> {
        let (protected, placeholders) = self.guard.protect(&batch.texts);
        let results = self.next.handle(batch.with_texts(protected), cancel).await?;
        Ok(self.guard.restore(results, &placeholders))
    }
}
