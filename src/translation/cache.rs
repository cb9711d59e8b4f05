/*!
 * Translation caching functionality.
 *
 * This module provides a bounded, expiring translation cache shared by all
 * concurrent callers of a service. Entries are keyed by a fingerprint of
 * (service, target language, source text), evicted least-recently-used first
 * when the capacity is reached, and persisted to a single JSON file on an
 * explicit `save`.
 */

use chrono::{DateTime, Utc};
use log::{debug, warn};
use lru::LruCache;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Write as _;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::CacheConfig;
use crate::errors::CacheError;

/// Bytes of the text digest kept in a cache key
const KEY_HASH_BYTES: usize = 8;

/// A cached translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The translated text
    pub translated: String,

    /// When the translation was obtained
    pub created_at: DateTime<Utc>,
}

/// Build the cache key for a translation: `service:language:hash(text)`
pub fn fingerprint(service: &str, target_language: &str, text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut key = format!("{}:{}:", service, target_language);
    for byte in &digest[..KEY_HASH_BYTES] {
        let _ = write!(key, "{:02x}", byte);
    }
    key
}

/// Translation cache for storing and retrieving translations
#[derive(Clone)]
pub struct TranslationCache {
    /// Entries in recency order
    entries: Arc<RwLock<LruCache<String, CacheEntry>>>,

    /// Cache hit counter
    hits: Arc<AtomicUsize>,

    /// Cache miss counter
    misses: Arc<AtomicUsize>,

    /// Age after which an entry counts as a miss
    ttl: chrono::Duration,

    /// Persistence file, if any
    path: Option<PathBuf>,
}

impl std::fmt::Debug for TranslationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationCache")
            .field("len", &self.len())
            .field("ttl", &self.ttl)
            .field("path", &self.path)
            .finish()
    }
}

impl TranslationCache {
    /// Create an empty in-memory cache
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Arc::new(RwLock::new(LruCache::new(capacity))),
            hits: Arc::new(AtomicUsize::new(0)),
            misses: Arc::new(AtomicUsize::new(0)),
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36500)),
            path: None,
        }
    }

    /// Attach a persistence file without reading it
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Create a cache from configuration and load its file best-effort
    ///
    /// A missing or unreadable file yields an empty cache.
    pub fn open(config: &CacheConfig) -> Self {
        let path = config.resolved_path();
        let cache = Self::new(config.capacity, config.ttl()).with_path(&path);

        match cache.load() {
            Ok(count) => debug!("Loaded {} cached translations from {}", count, path.display()),
            Err(CacheError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No translation cache at {}", path.display());
            }
            Err(e) => warn!("Ignoring translation cache at {}: {}", path.display(), e),
        }
        cache
    }

    /// The persistence file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Get a translation from the cache
    ///
    /// Expired entries are removed and reported as misses.
    pub fn get(&self, service: &str, target_language: &str, text: &str) -> Option<String> {
        let key = fingerprint(service, target_language, text);

        let lookup = {
            let entries = self.entries.read();
            entries
                .peek(&key)
                .map(|entry| (self.is_expired(entry), entry.translated.clone()))
        };

        match lookup {
            Some((false, translated)) => {
                self.entries.write().promote(&key);
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit for '{}' ({})", truncate_text(text, 30), target_language);
                Some(translated)
            }
            Some((true, _)) => {
                let mut entries = self.entries.write();
                if entries.peek(&key).is_some_and(|entry| self.is_expired(entry)) {
                    entries.pop(&key);
                }
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache entry expired for '{}' ({})", truncate_text(text, 30), target_language);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache miss for '{}' ({})", truncate_text(text, 30), target_language);
                None
            }
        }
    }

    /// Store a translation in the cache
    ///
    /// A translation identical to its source is not stored; it usually means
    /// the provider failed rather than that the text needs no translation.
    /// Returns whether the entry was stored.
    pub fn set(&self, service: &str, target_language: &str, text: &str, translated: &str) -> bool {
        if text == translated {
            debug!("Not caching unchanged text '{}'", truncate_text(text, 30));
            return false;
        }

        let key = fingerprint(service, target_language, text);
        let entry = CacheEntry {
            translated: translated.to_string(),
            created_at: Utc::now(),
        };

        let evicted = self.entries.write().push(key.clone(), entry);
        if let Some((evicted_key, _)) = evicted {
            if evicted_key != key {
                debug!("Evicted least recently used cache entry {}", evicted_key);
            }
        }
        true
    }

    /// Replace the contents of the cache with the persistence file
    ///
    /// Returns the number of entries read. Without a path this is a no-op.
    pub fn load(&self) -> Result<usize, CacheError> {
        let Some(path) = &self.path else {
            return Ok(0);
        };

        let data = std::fs::read(path)?;
        let stored: BTreeMap<String, CacheEntry> = serde_json::from_slice(&data)?;

        // Oldest first, so the newest entries end up most recently used
        let mut ordered: Vec<(String, CacheEntry)> = stored.into_iter().collect();
        ordered.sort_by_key(|(_, entry)| entry.created_at);

        let count = ordered.len();
        let mut entries = self.entries.write();
        entries.clear();
        for (key, entry) in ordered {
            entries.push(key, entry);
        }
        Ok(count)
    }

    /// Write all entries to the persistence file
    ///
    /// The file is written to a temp file in the same directory and renamed
    /// into place. Without a path this is a no-op.
    pub fn save(&self) -> Result<(), CacheError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let snapshot: BTreeMap<String, CacheEntry> = {
            let entries = self.entries.read();
            entries
                .iter()
                .map(|(key, entry)| (key.clone(), entry.clone()))
                .collect()
        };
        let data = serde_json::to_vec(&snapshot)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut file = tempfile::NamedTempFile::new_in(&dir)?;
        file.write_all(&data)?;
        file.flush()?;
        file.persist(path)?;

        debug!("Saved {} cached translations to {}", snapshot.len(), path.display());
        Ok(())
    }

    /// Get cache statistics as (hits, misses, hit rate)
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        (hits, misses, hit_rate)
    }

    /// Clear the cache and its statistics
    pub fn clear(&self) {
        self.entries.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        debug!("Translation cache cleared");
    }

    /// Get the number of entries in the cache, expired ones included
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        Utc::now().signed_duration_since(entry.created_at) > self.ttl
    }
}

/// Truncate text to a maximum length with ellipsis
fn truncate_text(text: &str, max_length: usize) -> String {
    match text.char_indices().nth(max_length) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
