/*!
 * Translation building blocks and the service facade.
 *
 * - `batch`: size-bounded regrouping, long-text splitting and merge-back
 * - `glossary`: placeholder protection of glossary terms
 * - `cache`: LRU translation cache with expiry and file persistence
 * - `rate_limit`: token bucket for the requests-per-minute budget
 * - `concurrency`: bounded fan-out of groups to workers
 * - `core`: `TranslationService`, which composes the middleware chain
 */

pub use self::cache::TranslationCache;
pub use self::core::TranslationService;
pub use self::glossary::GlossaryGuard;
pub use self::rate_limit::TokenBucket;

pub mod batch;
pub mod cache;
pub mod concurrency;
pub mod core;
pub mod glossary;
pub mod rate_limit;
