/*!
 * Mock provider implementation for testing.
 *
 * This module provides a mock provider that simulates different behaviors:
 * - `MockProvider::working()` - Always succeeds with a tagged translation
 * - `MockProvider::echo()` - Returns every input unchanged
 * - `MockProvider::failing(err)` - Always fails with the given error
 * - `MockProvider::flaky(n, err)` - Fails `n` times, then succeeds
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::errors::ProviderError;
use crate::providers::Provider;

/// Behavior mode for the mock provider
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with `[<lang>] <text>`
    Working,
    /// Returns the input unchanged
    Echo,
    /// Always fails with the given error
    Failing(ProviderError),
    /// Fails with the given error for the first `failures` calls
    Flaky { failures: usize, error: ProviderError },
    /// Returns one translation fewer than requested
    DropsLast,
}

/// Mock provider for testing pipeline behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    behavior: MockBehavior,
    /// Simulated latency per call
    delay: Option<Duration>,
    /// Number of `translate` calls received
    request_count: Arc<AtomicUsize>,
    /// Texts of every call, in arrival order
    requests: Arc<Mutex<Vec<Vec<String>>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            delay: None,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new(MockBehavior::Failing(error))
    }

    pub fn flaky(failures: usize, error: ProviderError) -> Self {
        Self::new(MockBehavior::Flaky { failures, error })
    }

    /// Delay every call by `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// The translation `Working` produces for `text`
    pub fn expected_translation(text: &str, target_language: &str) -> String {
        format!("[{}] {}", target_language, text)
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Texts received by each call so far
    pub fn requests(&self) -> Vec<Vec<String>> {
        self.requests.lock().clone()
    }

    /// Highest number of calls observed running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn respond(&self, count: usize, texts: &[String], target_language: &str) -> Result<Vec<String>, ProviderError> {
        let translate_all = || {
            texts
                .iter()
                .map(|text| Self::expected_translation(text, target_language))
                .collect()
        };

        match &self.behavior {
            MockBehavior::Working => Ok(translate_all()),
            MockBehavior::Echo => Ok(texts.to_vec()),
            MockBehavior::Failing(error) => Err(error.clone()),
            MockBehavior::Flaky { failures, error } => {
                if count < *failures {
                    Err(error.clone())
                } else {
                    Ok(translate_all())
                }
            }
            MockBehavior::DropsLast => {
                let mut result: Vec<String> = translate_all();
                result.pop();
                Ok(result)
            }
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn translate(
        &self,
        texts: &[String],
        target_language: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(texts.to_vec());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let outcome = match self.delay {
            Some(delay) => {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => Ok(()),
                    _ = cancel.cancelled() => Err(ProviderError::Cancelled),
                }
            }
            None => Ok(()),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome?;
        self.respond(count, texts, target_language)
    }
}
