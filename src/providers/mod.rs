/*!
 * Translation provider abstraction.
 *
 * The pipeline never speaks a backend wire format. It depends on one
 * primitive: translate an ordered batch of texts into a target language.
 * This module contains:
 * - `Provider`: the batch primitive every backend implements
 * - `TextProvider` / `SingleTextProvider`: adapter for backends that only
 *   accept a single string
 * - `mock`: scriptable provider used by tests and benchmarks
 */

use async_trait::async_trait;
use log::debug;
use std::fmt::Debug;
use tokio_util::sync::CancellationToken;

use crate::errors::ProviderError;

/// Common trait for all translation backends
///
/// Implementations return exactly one translation per input text, in order,
/// or a classified `ProviderError`.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Translate `texts` into `target_language`
    ///
    /// # Arguments
    /// * `texts` - Ordered source texts
    /// * `target_language` - Target language identifier
    /// * `cancel` - Token that aborts the request when cancelled
    async fn translate(
        &self,
        texts: &[String],
        target_language: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ProviderError>;
}

/// Backend that translates a single string at a time
#[async_trait]
pub trait TextProvider: Send + Sync + Debug {
    async fn translate_text(
        &self,
        text: &str,
        target_language: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ProviderError>;
}

/// Adapts a `TextProvider` to the batch `Provider` contract
///
/// The batch is joined with line breaks into one request and the answer is
/// split back into lines. A batch holding a multi-line text cannot be told
/// apart after joining, so each of its texts is sent as its own request.
#[derive(Debug)]
pub struct SingleTextProvider<P> {
    inner: P,
}

impl<P: TextProvider> SingleTextProvider<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<P: TextProvider> Provider for SingleTextProvider<P> {
    async fn translate(
        &self,
        texts: &[String],
        target_language: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        if texts.iter().any(|text| text.contains('\n')) {
            debug!("Batch contains multi-line texts, sending {} requests", texts.len());
            let mut translated = Vec::with_capacity(texts.len());
            for text in texts {
                translated.push(self.inner.translate_text(text, target_language, cancel).await?);
            }
            return Ok(translated);
        }

        let joined = texts.join("\n");
        let translated = self.inner.translate_text(&joined, target_language, cancel).await?;
        let lines: Vec<String> = translated.split('\n').map(str::to_string).collect();

        if lines.len() != texts.len() {
            return Err(ProviderError::CountMismatch {
                expected: texts.len(),
                actual: lines.len(),
            });
        }
        Ok(lines)
    }
}

pub mod mock;
