use std::time::Duration;

use crate::core::engine::ScoringError;
use crate::core::gateway::PredictionGateway;
use crate::models::MarketSnapshot;
use crate::services::{CacheKey, CacheStats, InFlight, PredictionPayload, TtlCache};

/// Industry-level market intelligence
///
/// Same cache / in-flight / gateway pipeline as scoring, keyed by the
/// lower-cased industry name and kept for a shorter time.
#[derive(Clone)]
pub struct MarketIntelligence {
    gateway: PredictionGateway,
    snapshots: TtlCache<MarketSnapshot>,
    inflight: InFlight<MarketSnapshot>,
    ttl: Duration,
    fallback_ttl: Duration,
}

impl MarketIntelligence {
    pub fn new(
        gateway: PredictionGateway,
        cache_capacity: u64,
        ttl: Duration,
        fallback_ttl: Duration,
    ) -> Self {
        Self {
            gateway,
            snapshots: TtlCache::new(cache_capacity),
            inflight: InFlight::new(),
            ttl,
            fallback_ttl,
        }
    }

    /// Get the snapshot for `industry`; backend trouble yields an empty snapshot
    pub async fn snapshot(&self, industry: &str) -> Result<MarketSnapshot, ScoringError> {
        let industry = normalize_industry(industry)?;
        let key = CacheKey::market(&industry);

        if let Some(cached) = self.snapshots.get(&key).await {
            return Ok(cached);
        }

        let gateway = self.gateway.clone();
        let cache = self.snapshots.clone();
        let ttl = self.ttl;
        let fallback_ttl = self.fallback_ttl;
        let leader_key = key.clone();
        let leader_industry = industry.clone();

        let outcome = self
            .inflight
            .run(&key, async move {
                if let Some(cached) = cache.get(&leader_key).await {
                    return cached;
                }

                let payload = PredictionPayload::market(&leader_industry);
                let snapshot = gateway.market(&leader_industry, &payload).await;
                let ttl = if snapshot.used_fallback {
                    ttl.min(fallback_ttl)
                } else {
                    ttl
                };
                cache.put(leader_key, snapshot.clone(), ttl).await;
                snapshot
            })
            .await;

        Ok(outcome.unwrap_or_else(|e| {
            tracing::warn!("Market computation for {} lost ({})", industry, e);
            MarketSnapshot::empty(&industry)
        }))
    }

    pub fn clear_cache(&self) {
        self.snapshots.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.snapshots.stats()
    }
}

fn normalize_industry(industry: &str) -> Result<String, ScoringError> {
    let normalized = industry.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(ScoringError::InvalidRequest(
            "industry must not be empty".to_string(),
        ));
    }
    Ok(normalized)
}
