/*!
 * Post-translation fixes: literal replacements applied to every result, in
 * the order they are configured.
 */

use async_trait::async_trait;
use log::debug;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::app_config::TranslationFix;
use crate::errors::PipelineError;

use super::{BoxedHandler, Handler, Middleware, TranslationBatch};

/// Applies configured `from -> to` replacements to translated texts
#[derive(Debug, Clone, Default)]
pub struct TranslationFixes {
    fixes: Arc<Vec<TranslationFix>>,
}

impl TranslationFixes {
    pub fn new(fixes: Vec<TranslationFix>) -> Self {
        let fixes = fixes.into_iter().filter(|fix| !fix.from.is_empty()).collect();
        Self { fixes: Arc::new(fixes) }
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    /// Apply every fix to `text`
    pub fn apply(&self, text: &str) -> String {
        self.fixes
            .iter()
            .fold(text.to_string(), |current, fix| current.replace(&fix.from, &fix.to))
    }
}

impl Middleware for TranslationFixes {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        if self.is_empty() {
            return next;
        }
        Arc::new(TranslationFixHandler {
            fixes: self.clone(),
            next,
        })
    }
}

struct TranslationFixHandler {
    fixes: TranslationFixes,
    next: BoxedHandler,
}

#[async_trait]
impl Handler for TranslationFixHandler {
    async fn handle(
        &self,
        batch: TranslationBatch,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, PipelineError> {
        let results = self.next.handle(batch, cancel).await?;

        Ok(results
            .into_iter()
            .map(|result| {
                let fixed = self.fixes.apply(&result);
                if fixed != result {
                    debug!("Applied translation fix: '{}' -> '{}'", result, fixed);
                }
                fixed
            })
            .collect())
    }
}
