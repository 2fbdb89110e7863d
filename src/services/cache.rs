use moka::future::Cache;
use moka::Expiry;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::models::ScoringRequest;

/// A cached value together with its own time-to-live
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub created_at: Instant,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            ttl,
        }
    }

    /// An entry is dead once its age exceeds its TTL
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

/// Per-entry expiration: each entry lives exactly as long as its own TTL
struct EntryExpiry;

impl<V> Expiry<String, CacheEntry<V>> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-memory key/value store with per-entry TTL
///
/// Backed by a bounded moka cache. Safe for concurrent readers and writers;
/// clones share the same underlying storage.
pub struct TtlCache<V> {
    entries: Cache<String, CacheEntry<V>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl<V> Clone for TtlCache<V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            hits: Arc::clone(&self.hits),
            misses: Arc::clone(&self.misses),
        }
    }
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache holding at most `max_capacity` entries
    pub fn new(max_capacity: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryExpiry)
            .build();

        Self {
            entries,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Get a live value; expired entries are treated as absent
    pub async fn get(&self, key: &str) -> Option<V> {
        match self.entries.get(key).await {
            Some(entry) if !entry.is_expired() => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!("Cache hit: {}", key);
                Some(entry.value)
            }
            Some(_) => {
                self.entries.invalidate(key).await;
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::trace!("Cache entry expired: {}", key);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::trace!("Cache miss: {}", key);
                None
            }
        }
    }

    /// Store a value for `ttl`, replacing any previous entry
    pub async fn put(&self, key: String, value: V, ttl: Duration) {
        tracing::trace!("Cache set: {} (ttl {:?})", key, ttl);
        self.entries.insert(key, CacheEntry::new(value, ttl)).await;
    }

    pub async fn invalidate(&self, key: &str) {
        self.entries.invalidate(key).await;
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.invalidate_all();
        tracing::debug!("Cache cleared");
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;

        CacheStats {
            entries: self.entries.entry_count(),
            hit_count: hits,
            miss_count: misses,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64
            },
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: u64,
    pub hit_count: u64,
    pub miss_count: u64,
    pub hit_rate: f64,
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Build the canonical key of a scoring request
    ///
    /// Two requests share a key exactly when they are equal, context
    /// included. Field order is fixed by the type definitions and context
    /// attributes are kept in a sorted map, so the encoding is stable.
    pub fn for_request(request: &ScoringRequest) -> String {
        let canonical = serde_json::to_string(request).unwrap_or_else(|_| format!("{:?}", request));
        format!("score:{}:{}", request.kind(), canonical)
    }

    /// Build a cache key for an industry market snapshot
    pub fn market(industry: &str) -> String {
        format!("market:{}", industry.trim().to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DealSummary, Profile, ScoringContext};

    fn profile(id: &str) -> Profile {
        Profile {
            id: id.to_string(),
            industry: "technology".to_string(),
            title: "CEO".to_string(),
            network_value: 1000.0,
            bio: None,
            reputation: None,
            location: None,
        }
    }

    #[tokio::test]
    async fn test_cache_set_get() {
        let cache: TtlCache<String> = TtlCache::new(100);

        cache
            .put("test_key".to_string(), "test_value".to_string(), Duration::from_secs(60))
            .await;
        assert_eq!(cache.get("test_key").await.as_deref(), Some("test_value"));

        cache.invalidate("test_key").await;
        assert!(cache.get("test_key").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entries_are_absent() {
        let cache: TtlCache<u32> = TtlCache::new(100);

        cache.put("short".to_string(), 1, Duration::from_millis(20)).await;
        cache.put("long".to_string(), 2, Duration::from_secs(60)).await;
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(cache.get("short").await.is_none());
        assert_eq!(cache.get("long").await, Some(2));
    }

    #[tokio::test]
    async fn test_clear_and_stats() {
        let cache: TtlCache<u32> = TtlCache::new(100);
        cache.put("a".to_string(), 1, Duration::from_secs(60)).await;

        assert_eq!(cache.get("a").await, Some(1));
        assert!(cache.get("b").await.is_none());

        let stats = cache.stats();
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);

        cache.clear();
        assert!(cache.get("a").await.is_none());
    }

    #[test]
    fn test_cache_key_builder() {
        assert_eq!(CacheKey::market(" Technology "), "market:technology");

        let a = ScoringRequest::Compatibility {
            profile_a: profile("1"),
            profile_b: profile("2"),
        };
        let b = a.clone();
        assert_eq!(CacheKey::for_request(&a), CacheKey::for_request(&b));
        assert!(CacheKey::for_request(&a).starts_with("score:compatibility:"));
    }

    #[test]
    fn test_cache_key_includes_context() {
        let without = ScoringRequest::MeetingSuccess {
            profile_a: profile("1"),
            profile_b: profile("2"),
            context: ScoringContext::default(),
        };
        let with = ScoringRequest::MeetingSuccess {
            profile_a: profile("1"),
            profile_b: profile("2"),
            context: ScoringContext {
                event_type: Some("conference".to_string()),
                ..ScoringContext::default()
            },
        };
        assert_ne!(CacheKey::for_request(&without), CacheKey::for_request(&with));

        let deal = ScoringRequest::DealSuccess {
            deal: DealSummary {
                title: "Pilot".to_string(),
                description: String::new(),
                value: 1.0,
                match_score: None,
            },
        };
        assert!(CacheKey::for_request(&deal).starts_with("score:deal:"));
    }
}
