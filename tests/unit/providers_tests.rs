/*!
 * Tests for the mock provider and the single-text adapter
 */

use async_trait::async_trait;
use batchtrans::errors::ProviderError;
use batchtrans::providers::mock::{MockBehavior, MockProvider};
use batchtrans::providers::{Provider, SingleTextProvider, TextProvider};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::common::{expected, texts};

#[derive(Debug)]
struct Reversing;

#[async_trait]
impl TextProvider for Reversing {
    async fn translate_text(
        &self,
        text: &str,
        _target_language: &str,
        _cancel: &CancellationToken,
    ) -> Result<String, ProviderError> {
        Ok(text.lines().rev().collect::<Vec<_>>().join("\n"))
    }
}

#[tokio::test]
async fn test_mockProvider_working_shouldTagEveryText() {
    let provider = MockProvider::working();
    let result = provider
        .translate(&texts(&["a", "b"]), "de", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(result, expected(&["a", "b"], "de"));
    assert_eq!(provider.request_count(), 1);
    assert_eq!(provider.requests(), vec![texts(&["a", "b"])]);
}

#[tokio::test]
async fn test_mockProvider_flaky_shouldRecoverAfterFailures() {
    let provider = MockProvider::flaky(2, ProviderError::RateLimitExceeded("429".into()));
    let cancel = CancellationToken::new();

    for _ in 0..2 {
        let err = provider.translate(&texts(&["a"]), "de", &cancel).await.unwrap_err();
        assert!(err.is_retryable());
    }
    assert!(provider.translate(&texts(&["a"]), "de", &cancel).await.is_ok());
}

#[tokio::test]
async fn test_mockProvider_withDelay_shouldHonorCancellation() {
    let provider = MockProvider::new(MockBehavior::Working).with_delay(Duration::from_secs(30));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = provider.translate(&texts(&["a"]), "de", &cancel).await.unwrap_err();
    assert_eq!(err, ProviderError::Cancelled);
}

#[tokio::test]
async fn test_singleTextProvider_withReorderingBackend_shouldKeepLinePositions() {
    let provider = SingleTextProvider::new(Reversing);
    let result = provider
        .translate(&texts(&["one", "two", "three"]), "fr", &CancellationToken::new())
        .await
        .unwrap();
    // The adapter maps answer lines to inputs by position only
    assert_eq!(result, texts(&["three", "two", "one"]));
}

#[test]
fn test_mockProvider_dropsLast_shouldReturnShortResult() {
    let provider = MockProvider::new(MockBehavior::DropsLast);
    let result = tokio_test::block_on(provider.translate(
        &texts(&["a", "b", "c"]),
        "fr",
        &CancellationToken::new(),
    ))
    .unwrap();
    assert_eq!(result, expected(&["a", "b"], "fr"));
}
