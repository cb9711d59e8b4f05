/*!
 * # batchtrans - batch translation request pipeline
 *
 * A Rust library that sends batches of short texts to a translation backend
 * through a chain of middlewares, returning one translation per input text in
 * input order.
 *
 * ## Features
 *
 * - Size-bounded request groups with bounded concurrent fan-out
 * - Transparent splitting and merging of texts over the size limit
 * - Glossary terms protected from the backend by placeholders
 * - Expiring LRU translation cache with atomic file persistence
 * - Requests-per-minute throttling and in-flight call limits
 * - Classified retries with linear backoff
 * - Streaming progress notifications per completed group
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration and override merging
 * - `middleware`: Handler/middleware composition and the pipeline stages
 * - `translation`: Pipeline algorithms and shared resources:
 *   - `translation::core`: The `TranslationService` facade
 *   - `translation::batch`: Regrouping, splitting and merge-back
 *   - `translation::cache`: Caching of translations
 *   - `translation::glossary`: Glossary protection
 *   - `translation::rate_limit`: Token bucket throttling
 *   - `translation::concurrency`: Worker fan-out
 * - `providers`: The backend trait, a single-text adapter and a mock backend
 * - `errors`: Custom error types for the library
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod errors;
pub mod middleware;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::{Config, ConfigOverrides};
pub use errors::{CacheError, PipelineError, ProviderError};
pub use middleware::{Chain, Handler, Middleware, TranslationBatch};
pub use providers::Provider;
pub use translation::{TranslationCache, TranslationService};
