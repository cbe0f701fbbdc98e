//! Bounded, expiring cache of verification keys.
//!
//! Entries are keyed by `(issuer, kid)` and live for a fixed TTL so that an
//! issuer-side key rotation is picked up without a restart. The entry count
//! is capped; when full, expired entries are purged first and then the
//! oldest insertion is evicted.
//!
//! Values are immutable once written. Two requests that miss on the same key
//! concurrently may both fetch; the first insert wins and the second caller
//! gets the stored value back.

use crate::auth::keys::VerificationKey;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default key lifetime (10 minutes), shorter than typical IdP rotation overlap.
pub const DEFAULT_KEY_CACHE_TTL: Duration = Duration::from_secs(600);

/// Default maximum number of cached `(issuer, kid)` pairs.
pub const DEFAULT_KEY_CACHE_MAX_ENTRIES: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    issuer: String,
    kid: String,
}

impl CacheKey {
    fn new(issuer: &str, kid: &str) -> Self {
        Self {
            issuer: issuer.to_string(),
            kid: kid.to_string(),
        }
    }
}

struct CachedKey {
    key: VerificationKey,
    inserted_at: Instant,
    sequence: u64,
}

impl CachedKey {
    fn is_live(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() < ttl
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, CachedKey>,
    next_sequence: u64,
}

/// Concurrency-safe signing key cache with TTL and entry bound.
pub struct SigningKeyCache {
    state: RwLock<CacheState>,
    ttl: Duration,
    max_entries: usize,
}

impl SigningKeyCache {
    /// Create a cache. A `max_entries` of zero is treated as one.
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Look up a live entry.
    pub async fn get(&self, issuer: &str, kid: &str) -> Option<VerificationKey> {
        let state = self.state.read().await;
        state
            .entries
            .get(&CacheKey::new(issuer, kid))
            .filter(|cached| cached.is_live(self.ttl))
            .map(|cached| cached.key.clone())
    }

    /// Store a key and return the value now cached for `(issuer, kid)`.
    ///
    /// If a live entry already exists it is kept and returned.
    pub async fn insert(&self, issuer: &str, kid: &str, key: VerificationKey) -> VerificationKey {
        let cache_key = CacheKey::new(issuer, kid);
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        if let Some(existing) = state.entries.get(&cache_key) {
            if existing.is_live(self.ttl) {
                return existing.key.clone();
            }
        }

        if !state.entries.contains_key(&cache_key) && state.entries.len() >= self.max_entries {
            let ttl = self.ttl;
            state.entries.retain(|_, cached| cached.is_live(ttl));

            if state.entries.len() >= self.max_entries {
                let oldest = state
                    .entries
                    .iter()
                    .min_by_key(|(_, cached)| cached.sequence)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    tracing::debug!(target: "authz.jwks", "Key cache full, evicting oldest entry");
                    state.entries.remove(&oldest);
                }
            }
        }

        let sequence = state.next_sequence;
        state.next_sequence = state.next_sequence.wrapping_add(1);
        state.entries.insert(
            cache_key,
            CachedKey {
                key: key.clone(),
                inserted_at: Instant::now(),
                sequence,
            },
        );
        key
    }

    /// Number of stored entries, expired ones included until they are purged.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        self.state.write().await.entries.clear();
    }
}

impl Default for SigningKeyCache {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_CACHE_TTL, DEFAULT_KEY_CACHE_MAX_ENTRIES)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn key(label: &str) -> VerificationKey {
        VerificationKey::from_pem_unchecked(label)
    }

    #[tokio::test]
    async fn test_get_miss_on_empty_cache() {
        let cache = SigningKeyCache::default();
        assert!(cache.get("https://idp.example/", "abc").await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_insert_then_get() {
        let cache = SigningKeyCache::default();
        cache.insert("https://idp.example/", "abc", key("k1")).await;

        let hit = cache.get("https://idp.example/", "abc").await.unwrap();
        assert_eq!(hit.pem(), "k1");
    }

    #[tokio::test]
    async fn test_entries_are_scoped_by_issuer_and_kid() {
        let cache = SigningKeyCache::default();
        cache.insert("https://a.example/", "abc", key("a")).await;

        assert!(cache.get("https://b.example/", "abc").await.is_none());
        assert!(cache.get("https://a.example/", "xyz").await.is_none());
    }

    #[tokio::test]
    async fn test_first_writer_wins_for_live_entry() {
        let cache = SigningKeyCache::default();
        cache.insert("iss", "kid", key("first")).await;

        let stored = cache.insert("iss", "kid", key("second")).await;

        assert_eq!(stored.pem(), "first");
        assert_eq!(cache.get("iss", "kid").await.unwrap().pem(), "first");
    }

    #[tokio::test]
    async fn test_zero_ttl_never_serves_entries() {
        let cache = SigningKeyCache::new(Duration::ZERO, 10);
        cache.insert("iss", "kid", key("k")).await;

        assert!(cache.get("iss", "kid").await.is_none());

        // Expired entries are replaced, not kept
        let stored = cache.insert("iss", "kid", key("fresh")).await;
        assert_eq!(stored.pem(), "fresh");
    }

    #[tokio::test]
    async fn test_evicts_oldest_when_full() {
        let cache = SigningKeyCache::new(Duration::from_secs(60), 2);
        cache.insert("iss", "k1", key("1")).await;
        cache.insert("iss", "k2", key("2")).await;
        cache.insert("iss", "k3", key("3")).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get("iss", "k1").await.is_none());
        assert!(cache.get("iss", "k2").await.is_some());
        assert!(cache.get("iss", "k3").await.is_some());
    }

    #[tokio::test]
    async fn test_zero_max_entries_is_clamped() {
        let cache = SigningKeyCache::new(Duration::from_secs(60), 0);
        assert_eq!(cache.max_entries(), 1);

        cache.insert("iss", "k1", key("1")).await;
        cache.insert("iss", "k2", key("2")).await;
        assert_eq!(cache.len().await, 1);
        assert!(cache.get("iss", "k2").await.is_some());
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = SigningKeyCache::default();
        cache.insert("iss", "kid", key("k")).await;
        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[test]
    fn test_defaults() {
        let cache = SigningKeyCache::default();
        assert_eq!(cache.ttl(), DEFAULT_KEY_CACHE_TTL);
        assert_eq!(cache.max_entries(), DEFAULT_KEY_CACHE_MAX_ENTRIES);
    }
}
