/*!
 * Handler/middleware composition for the translation pipeline.
 *
 * A `Handler` turns a `TranslationBatch` into exactly one translation per
 * text, in order. A `Middleware` wraps a handler into a new handler. `Chain`
 * composes middlewares so that the first one added is the outermost:
 * `Chain(m1, m2, m3).build(h) == m1(m2(m3(h)))`.
 *
 * Stages, outermost first:
 * - `texts_limit`: split overlong texts, merge their segments back
 * - `regroup`: size-bounded groups, fan-out, progress notifications
 * - `translation_fix`: literal post-translation replacements
 * - `glossary`: placeholder protection of glossary terms
 * - `retry`: classified retries with linear backoff
 * - `cache`: answers already-translated texts
 * - `rate_limit`: requests-per-minute budget
 * - `concurrent`: bound on in-flight provider calls
 */

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::errors::{PipelineError, ProviderError};
use crate::providers::Provider;

pub mod cache;
pub mod concurrent;
pub mod glossary;
pub mod on_translated;
pub mod rate_limit;
pub mod regroup;
pub mod retry;
pub mod texts_limit;
pub mod translation_fix;

pub use self::cache::Cache;
pub use self::concurrent::Concurrent;
pub use self::glossary::Glossary;
pub use self::on_translated::{ObserverSlot, ProgressObserver};
pub use self::rate_limit::RateLimit;
pub use self::regroup::Regroup;
pub use self::retry::Retry;
pub use self::texts_limit::TextsLimit;
pub use self::translation_fix::TranslationFixes;

/// Sources at least this long must not come back unchanged
pub const NO_TRANSLATION_MIN_LEN: usize = 20;

/// An ordered batch of source texts and the language to translate them into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationBatch {
    pub texts: Vec<String>,
    pub target_language: String,
}

impl TranslationBatch {
    pub fn new(texts: Vec<String>, target_language: impl Into<String>) -> Self {
        Self {
            texts,
            target_language: target_language.into(),
        }
    }

    /// Same target language, different texts
    pub fn with_texts(&self, texts: Vec<String>) -> Self {
        Self {
            texts,
            target_language: self.target_language.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}

/// Processes a batch into one translation per text, in order
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(
        &self,
        batch: TranslationBatch,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, PipelineError>;
}

/// Shared, type-erased handler
pub type BoxedHandler = Arc<dyn Handler>;

/// Wraps a handler into a new handler
pub trait Middleware: Send + Sync {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;
}

/// Ordered list of middlewares, first added is outermost
#[derive(Default)]
pub struct Chain {
    layers: Vec<Box<dyn Middleware>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware inside the ones already added
    pub fn layer(mut self, middleware: impl Middleware + 'static) -> Self {
        self.layers.push(Box::new(middleware));
        self
    }

    /// Append a middleware only when `condition` holds
    pub fn layer_if(self, condition: bool, middleware: impl Middleware + 'static) -> Self {
        if condition {
            self.layer(middleware)
        } else {
            self
        }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Wrap `innermost` with every layer, last added first
    pub fn build(self, innermost: BoxedHandler) -> BoxedHandler {
        self.layers
            .iter()
            .rev()
            .fold(innermost, |next, layer| layer.wrap(next))
    }
}

struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(TranslationBatch) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<String>, PipelineError>> + Send,
{
    async fn handle(
        &self,
        batch: TranslationBatch,
        _cancel: &CancellationToken,
    ) -> Result<Vec<String>, PipelineError> {
        (self.f)(batch).await
    }
}

/// Build a handler from an async closure
pub fn handler_fn<F, Fut>(f: F) -> BoxedHandler
where
    F: Fn(TranslationBatch) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<String>, PipelineError>> + Send + 'static,
{
    Arc::new(HandlerFn { f })
}

/// Innermost handler: calls the provider and checks its answer
///
/// A result of the wrong length is a `CountMismatch`; a source longer than
/// `NO_TRANSLATION_MIN_LEN` that comes back unchanged is a `NoTranslation`.
pub struct ProviderHandler {
    provider: Arc<dyn Provider>,
}

impl ProviderHandler {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    pub fn boxed(provider: Arc<dyn Provider>) -> BoxedHandler {
        Arc::new(Self::new(provider))
    }
}

#[async_trait]
impl Handler for ProviderHandler {
    async fn handle(
        &self,
        batch: TranslationBatch,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, PipelineError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let translated = match self
            .provider
            .translate(&batch.texts, &batch.target_language, cancel)
            .await
        {
            Ok(translated) => translated,
            Err(ProviderError::Cancelled) => return Err(PipelineError::Cancelled),
            Err(e) => return Err(e.into()),
        };

        if translated.len() != batch.len() {
            return Err(ProviderError::CountMismatch {
                expected: batch.len(),
                actual: translated.len(),
            }
            .into());
        }

        let echoed = batch
            .texts
            .iter()
            .zip(&translated)
            .any(|(source, result)| source.len() > NO_TRANSLATION_MIN_LEN && source == result);
        if echoed {
            return Err(ProviderError::NoTranslation.into());
        }

        Ok(translated)
    }
}
