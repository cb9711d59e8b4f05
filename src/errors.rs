/*!
 * Error types for the batchtrans pipeline.
 *
 * The taxonomy is closed: every failure a caller can observe is one of the
 * variants below, and the retry layer decides what to re-attempt through
 * `is_retryable` instead of comparing error identities.
 */

use thiserror::Error;

/// Errors reported by a translation provider (the backend collaborator)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The backend signalled throttling
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// The backend payload could not be parsed
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// The backend returned a different number of segments than requested
    #[error("Translation count mismatch: expected {expected}, got {actual}")]
    CountMismatch {
        /// Number of segments sent
        expected: usize,
        /// Number of segments received
        actual: usize,
    },

    /// The backend echoed a non-trivial input unchanged
    #[error("No translation produced")]
    NoTranslation,

    /// The request could not be sent or completed
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// The call was aborted through its cancellation token
    #[error("Request cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Whether re-sending the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded(_)
                | Self::ParseError(_)
                | Self::CountMismatch { .. }
                | Self::NoTranslation
        )
    }
}

/// Errors surfaced by the translation pipeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// A single text cannot be brought under the size limit
    #[error("Text too long: {len} bytes exceeds limit of {max} bytes")]
    TextTooLong {
        /// Byte length of the offending text or segment
        len: usize,
        /// Configured byte limit
        max: usize,
    },

    /// Error from the provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// All retry attempts failed
    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// The error of the final attempt
        last: Box<PipelineError>,
    },

    /// Worker outputs did not add up to the input length
    #[error("Internal error: merged {actual} results for {expected} inputs")]
    MergeMismatch {
        /// Expected number of results
        expected: usize,
        /// Number of results produced
        actual: usize,
    },

    /// A split mapping refers to a result that does not exist
    #[error("Internal error: inconsistent split mapping: {0}")]
    SplitMapping(String),

    /// The progress observer rejected a batch
    #[error("Progress observer failed: {0}")]
    Observer(String),

    /// The call was aborted through its cancellation token
    #[error("Translation cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Whether the retry layer should re-attempt after this error
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider(err) => err.is_retryable(),
            _ => false,
        }
    }

    /// Whether this error reports a broken pipeline invariant
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::MergeMismatch { .. } | Self::SplitMapping(_))
    }
}

/// Errors from explicit cache load/save calls
#[derive(Error, Debug)]
pub enum CacheError {
    /// Reading or writing the cache file failed
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The cache contents could not be (de)serialized
    #[error("Cache serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The temp file could not be moved into place
    #[error("Cache persist error: {0}")]
    Persist(#[from] tempfile::PersistError),
}
