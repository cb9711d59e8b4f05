/*!
 * End-to-end tests of the translation pipeline through `TranslationService`
 */

use async_trait::async_trait;
use batchtrans::errors::{PipelineError, ProviderError};
use batchtrans::providers::mock::MockProvider;
use batchtrans::providers::{SingleTextProvider, TextProvider};
use batchtrans::{TranslationCache, TranslationService};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::common::{
    expected, fast_config, init_logging, service_with_cache, service_without_cache, texts,
};

/// Single-string backend that upper-cases its input
#[derive(Debug)]
struct Shouting;

#[async_trait]
impl TextProvider for Shouting {
    async fn translate_text(
        &self,
        text: &str,
        _target_language: &str,
        _cancel: &CancellationToken,
    ) -> Result<String, ProviderError> {
        Ok(text.to_uppercase())
    }
}

const WORDS: [&str; 9] = [
    "apple", "banana", "cherry", "date", "elderberry", "fig", "grape", "honeydew", "kiwi",
];

#[tokio::test]
async fn test_pipeline_withSmallGroups_shouldPreserveOrderAndLength() {
    init_logging();
    let provider = MockProvider::working();
    let mut config = fast_config();
    config.max_batch_bytes = 12;
    config.max_concurrency = 3;
    let service = service_without_cache(config, &provider);

    let result = service.translate(&texts(&WORDS), "fr").await.unwrap();

    assert_eq!(result, expected(&WORDS, "fr"));
    for request in provider.requests() {
        assert!(request.iter().map(String::len).sum::<usize>() <= 12);
    }
    assert!(provider.request_count() > 1);
}

#[tokio::test]
async fn test_pipeline_withConcurrentWorkers_shouldMatchSequentialResult() {
    let sequential_provider = MockProvider::working();
    let mut config = fast_config();
    config.max_batch_bytes = 10;
    config.max_concurrency = 1;
    let sequential = service_without_cache(config.clone(), &sequential_provider)
        .translate(&texts(&WORDS), "es")
        .await
        .unwrap();

    let concurrent_provider = MockProvider::working().with_delay(Duration::from_millis(10));
    config.max_concurrency = 3;
    let concurrent = service_without_cache(config, &concurrent_provider)
        .translate(&texts(&WORDS), "es")
        .await
        .unwrap();

    assert_eq!(concurrent, sequential);
    assert!(concurrent_provider.max_in_flight() <= 3);
}

#[tokio::test]
async fn test_pipeline_withRepeatedText_shouldServeSecondCallFromCache() {
    let provider = MockProvider::working();
    let service = service_with_cache(fast_config(), &provider);

    let first = service.translate(&texts(&["good morning"]), "it").await.unwrap();
    let second = service.translate(&texts(&["good morning"]), "it").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(provider.request_count(), 1);
    let (hits, misses, _) = service.cache_stats().unwrap();
    assert_eq!((hits, misses), (1, 1));
}

#[tokio::test]
async fn test_pipeline_withCachedText_shouldNotNeedWorkingBackend() {
    let cache = TranslationCache::new(100, Duration::from_secs(60));
    let working = TranslationService::with_cache(
        fast_config(),
        Arc::new(MockProvider::working()),
        Some(cache.clone()),
    );
    let cached = working.translate(&texts(&["good night"]), "it").await.unwrap();

    let broken_provider = MockProvider::failing(ProviderError::RequestFailed("offline".into()));
    let broken = TranslationService::with_cache(fast_config(), Arc::new(broken_provider.clone()), Some(cache));
    let again = broken.translate(&texts(&["good night"]), "it").await.unwrap();

    assert_eq!(again, cached);
    assert_eq!(broken_provider.request_count(), 0);
}

#[tokio::test]
async fn test_pipeline_withIdentityTranslation_shouldNotCache() {
    let provider = MockProvider::echo();
    let service = service_with_cache(fast_config(), &provider);

    for _ in 0..2 {
        let result = service.translate(&texts(&["OK"]), "fr").await.unwrap();
        assert_eq!(result, texts(&["OK"]));
    }
    assert_eq!(provider.request_count(), 2);
    assert!(service.cache().unwrap().is_empty());
}

#[tokio::test]
async fn test_pipeline_withNonRetryableError_shouldCallBackendOnce() {
    let error = ProviderError::ApiError {
        status_code: 401,
        message: "invalid key".into(),
    };
    let provider = MockProvider::failing(error.clone());
    let service = service_without_cache(fast_config(), &provider);

    let err = service.translate(&texts(&["hello"]), "fr").await.unwrap_err();

    assert_eq!(err, PipelineError::Provider(error));
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn test_pipeline_withPersistentRateLimit_shouldExhaustRetries() {
    let provider = MockProvider::failing(ProviderError::RateLimitExceeded("429".into()));
    let service = service_without_cache(fast_config(), &provider);

    let err = service.translate(&texts(&["hello"]), "fr").await.unwrap_err();

    assert!(matches!(err, PipelineError::RetriesExhausted { attempts: 3, .. }));
    assert_eq!(provider.request_count(), 3);
}

#[tokio::test]
async fn test_pipeline_withFlakyBackend_shouldRecover() {
    let provider = MockProvider::flaky(2, ProviderError::ParseError("truncated".into()));
    let service = service_without_cache(fast_config(), &provider);

    let result = service.translate(&texts(&["hello"]), "fr").await.unwrap();

    assert_eq!(result, expected(&["hello"], "fr"));
    assert_eq!(provider.request_count(), 3);
}

#[tokio::test]
async fn test_pipeline_withEchoingBackend_shouldReportNoTranslation() {
    let provider = MockProvider::echo();
    let service = service_without_cache(fast_config(), &provider);

    let err = service
        .translate(&texts(&["This sentence is clearly longer than twenty bytes"]), "fr")
        .await
        .unwrap_err();

    match err {
        PipelineError::RetriesExhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert_eq!(*last, PipelineError::Provider(ProviderError::NoTranslation));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_pipeline_withLongText_shouldSplitAndMergeBack() {
    let provider = MockProvider::working();
    let mut config = fast_config();
    config.max_batch_bytes = 12;
    let service = service_without_cache(config, &provider);

    let result = service
        .translate(&texts(&["hello\nfunny\nworld", "wonderful"]), "fr")
        .await
        .unwrap();

    assert_eq!(
        result,
        texts(&["[fr] hello\nfunny\n[fr] world", "[fr] wonderful"])
    );
    for request in provider.requests() {
        assert!(request.iter().all(|text| text.len() <= 12));
    }
}

#[tokio::test]
async fn test_pipeline_withUnsplittableText_shouldFailBeforeCallingBackend() {
    let provider = MockProvider::working();
    let mut config = fast_config();
    config.max_batch_bytes = 8;
    let service = service_without_cache(config, &provider);

    let err = service
        .translate(&texts(&["unbreakablewordwithoutspaces"]), "fr")
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::TextTooLong { max: 8, .. }));
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_pipeline_withGlossary_shouldHideTermsFromBackend() {
    let provider = MockProvider::working();
    let mut config = fast_config();
    config
        .glossary
        .insert("AWS".to_string(), "Amazon Web Services".to_string());
    let service = service_without_cache(config, &provider);

    let result = service
        .translate(&texts(&["AWS is a cloud platform"]), "fr")
        .await
        .unwrap();

    assert_eq!(result, texts(&["[fr] Amazon Web Services is a cloud platform"]));
    assert_eq!(provider.requests(), vec![texts(&["{ID_0} is a cloud platform"])]);
}

#[tokio::test]
async fn test_pipeline_withObserver_shouldReceiveEveryGroupInOrder() {
    let provider = MockProvider::working().with_delay(Duration::from_millis(5));
    let mut config = fast_config();
    config.max_batch_bytes = 12;
    config.max_concurrency = 3;
    let service = service_without_cache(config, &provider);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    service.on_translated(move |group: &[String]| {
        sink.lock().push(group.to_vec());
        Ok(())
    });

    let result = service.translate(&texts(&WORDS), "fr").await.unwrap();

    let groups = seen.lock().clone();
    assert_eq!(groups.len(), provider.request_count());
    let streamed: Vec<String> = groups.into_iter().flatten().collect();
    assert_eq!(streamed, result);
}

#[tokio::test]
async fn test_pipeline_withFailingObserver_shouldAbort() {
    let provider = MockProvider::working();
    let mut config = fast_config();
    config.max_batch_bytes = 12;
    config.max_concurrency = 1;
    let service = service_without_cache(config, &provider);

    service.on_translated(|_: &[String]| Err(anyhow::anyhow!("output closed")));

    let err = service.translate(&texts(&WORDS), "fr").await.unwrap_err();
    assert_eq!(err, PipelineError::Observer("output closed".to_string()));
    // The only worker stops at its first group
    assert_eq!(provider.request_count(), 1);

    service.clear_observer();
    assert!(service.translate(&texts(&WORDS), "fr").await.is_ok());
}

#[tokio::test]
async fn test_pipeline_whenCancelled_shouldStopWaitingOnBackend() {
    let provider = MockProvider::working().with_delay(Duration::from_secs(30));
    let service = service_without_cache(fast_config(), &provider);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = service
        .translate_with_cancel(&texts(&["hello"]), "fr", &cancel)
        .await
        .unwrap_err();
    assert_eq!(err, PipelineError::Cancelled);
}

#[tokio::test]
async fn test_pipeline_withFixes_shouldRewriteResults() {
    let provider = MockProvider::working();
    let mut config = fast_config();
    config
        .fixes
        .push(batchtrans::app_config::TranslationFix::new("[de] ", ""));
    let service = service_without_cache(config, &provider);

    let result = service.translate(&texts(&["Haus", "Boot"]), "de").await.unwrap();
    assert_eq!(result, texts(&["Haus", "Boot"]));
}

#[tokio::test]
async fn test_pipeline_withSingleTextBackend_shouldTranslateMultiLineTexts() {
    let service = TranslationService::with_cache(
        fast_config(),
        Arc::new(SingleTextProvider::new(Shouting)),
        None,
    );

    let result = service.translate(&texts(&["a\nb", "c"]), "fr").await.unwrap();
    assert_eq!(result, texts(&["A\nB", "C"]));
}

#[tokio::test]
async fn test_pipeline_withSingleTextBackend_shouldTranslateSplitLongText() {
    let mut config = fast_config();
    config.max_batch_bytes = 12;
    let service = TranslationService::with_cache(config, Arc::new(SingleTextProvider::new(Shouting)), None);

    let result = service
        .translate(&texts(&["hello\nfunny\nworld"]), "fr")
        .await
        .unwrap();
    assert_eq!(result, texts(&["HELLO\nFUNNY\nWORLD"]));
}

#[tokio::test]
async fn test_pipeline_withObserverAndSplitText_shouldStreamSegmentsBeforeMerge() {
    let provider = MockProvider::working();
    let mut config = fast_config();
    config.max_batch_bytes = 12;
    config.max_concurrency = 1;
    let service = service_without_cache(config, &provider);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    service.on_translated(move |group: &[String]| {
        sink.lock().extend(group.iter().cloned());
        Ok(())
    });

    let result = service
        .translate(&texts(&["hello\nfunny\nworld", "wonderful"]), "fr")
        .await
        .unwrap();

    assert_eq!(result, texts(&["[fr] hello\nfunny\n[fr] world", "[fr] wonderful"]));
    // The blanked slot and the raw segments are streamed as they were sent
    assert_eq!(
        *seen.lock(),
        texts(&["[fr] ", "[fr] wonderful", "[fr] hello\nfunny", "[fr] world"])
    );
}
