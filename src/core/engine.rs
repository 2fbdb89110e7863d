use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use validator::Validate;

use crate::core::gateway::{PredictionGateway, RetryPolicy};
use crate::core::heuristics;
use crate::core::market::MarketIntelligence;
use crate::models::{
    CompatibilityWeights, MarketSnapshot, PredictionResult, Profile, RequestKind, ScoringRequest,
};
use crate::services::{CacheKey, CacheStats, InFlight, PredictionPayload, Predictor, TtlCache};

/// The only error callers of the engine ever see
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScoringError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Time-to-live per result kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheTtls {
    pub compatibility: Duration,
    pub meeting: Duration,
    pub deal: Duration,
    pub market: Duration,
    /// Upper bound for results produced by a fallback
    pub fallback: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            compatibility: Duration::from_secs(600),
            meeting: Duration::from_secs(300),
            deal: Duration::from_secs(300),
            market: Duration::from_secs(120),
            fallback: Duration::from_secs(30),
        }
    }
}

impl CacheTtls {
    pub fn for_kind(&self, kind: RequestKind) -> Duration {
        match kind {
            RequestKind::Compatibility => self.compatibility,
            RequestKind::Meeting => self.meeting,
            RequestKind::Deal => self.deal,
            RequestKind::Market => self.market,
        }
    }

    /// Degraded results are kept for a shorter time so a recovered backend is used again soon
    pub fn for_result(&self, kind: RequestKind, used_fallback: bool) -> Duration {
        let ttl = self.for_kind(kind);
        if used_fallback {
            ttl.min(self.fallback)
        } else {
            ttl
        }
    }
}

/// Tunables of a [`ScoringEngine`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineOptions {
    pub retry: RetryPolicy,
    pub ttls: CacheTtls,
    pub cache_capacity: u64,
    pub weights: CompatibilityWeights,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            ttls: CacheTtls::default(),
            cache_capacity: 10_000,
            weights: CompatibilityWeights::default(),
        }
    }
}

/// Public scoring façade
///
/// # Pipeline
/// 1. Validate the request (the only failure callers can see)
/// 2. Cache lookup by canonical key
/// 3. Join the in-flight computation for the key, or lead a new one
/// 4. The leader asks the gateway (retries, then local fallback) and caches the result
///
/// Cloning is cheap; clones share caches and the in-flight map.
#[derive(Clone)]
pub struct ScoringEngine {
    gateway: PredictionGateway,
    predictions: TtlCache<PredictionResult>,
    inflight: InFlight<PredictionResult>,
    market: MarketIntelligence,
    ttls: CacheTtls,
    weights: CompatibilityWeights,
}

impl ScoringEngine {
    pub fn new(predictor: Arc<dyn Predictor>, options: EngineOptions) -> Self {
        let gateway = PredictionGateway::new(predictor, options.retry, options.weights);
        let market = MarketIntelligence::new(
            gateway.clone(),
            options.cache_capacity,
            options.ttls.market,
            options.ttls.fallback,
        );

        Self {
            gateway,
            predictions: TtlCache::new(options.cache_capacity),
            inflight: InFlight::new(),
            market,
            ttls: options.ttls,
            weights: options.weights,
        }
    }

    pub fn with_defaults(predictor: Arc<dyn Predictor>) -> Self {
        Self::new(predictor, EngineOptions::default())
    }

    /// Score a request
    ///
    /// Never fails for a well-formed request: backend trouble yields a
    /// result with `used_fallback = true`.
    pub async fn score(&self, request: ScoringRequest) -> Result<PredictionResult, ScoringError> {
        validate_request(&request)?;

        let key = CacheKey::for_request(&request);
        if let Some(cached) = self.predictions.get(&key).await {
            return Ok(cached);
        }

        let payload = PredictionPayload::from(&request);
        let gateway = self.gateway.clone();
        let cache = self.predictions.clone();
        let ttls = self.ttls;
        let leader_key = key.clone();
        let leader_request = request.clone();

        let outcome = self
            .inflight
            .run(&key, async move {
                // A previous leader may have finished between our miss and now
                if let Some(cached) = cache.get(&leader_key).await {
                    return cached;
                }

                let result = gateway.predict(&leader_request, &payload).await;
                let ttl = ttls.for_result(result.kind, result.used_fallback);
                cache.put(leader_key, result.clone(), ttl).await;
                result
            })
            .await;

        Ok(outcome.unwrap_or_else(|e| {
            tracing::warn!("Scoring computation lost ({}), using local heuristic", e);
            heuristics::evaluate(&request, &self.weights)
        }))
    }

    /// Market intelligence for an industry (case-insensitive)
    pub async fn get_market_snapshot(&self, industry: &str) -> Result<MarketSnapshot, ScoringError> {
        self.market.snapshot(industry).await
    }

    /// Drop every cached prediction and snapshot
    pub fn clear_cache(&self) {
        self.predictions.clear();
        self.market.clear_cache();
    }

    pub fn prediction_cache_stats(&self) -> CacheStats {
        self.predictions.stats()
    }

    pub fn market_cache_stats(&self) -> CacheStats {
        self.market.cache_stats()
    }
}

/// Reject requests that would otherwise produce a misleading score
pub fn validate_request(request: &ScoringRequest) -> Result<(), ScoringError> {
    match request {
        ScoringRequest::Compatibility { profile_a, profile_b }
        | ScoringRequest::MeetingSuccess {
            profile_a,
            profile_b,
            ..
        } => {
            validate_profile("profileA", profile_a)?;
            validate_profile("profileB", profile_b)?;
            if profile_a.id == profile_b.id {
                return Err(ScoringError::InvalidRequest(
                    "a profile cannot be scored against itself".to_string(),
                ));
            }
            Ok(())
        }
        ScoringRequest::DealSuccess { deal } => {
            deal.validate()
                .map_err(|e| ScoringError::InvalidRequest(format!("deal: {}", e)))?;
            if !deal.value.is_finite() || deal.match_score.is_some_and(|s| !s.is_finite()) {
                return Err(ScoringError::InvalidRequest(
                    "deal: numeric fields must be finite".to_string(),
                ));
            }
            Ok(())
        }
    }
}

fn validate_profile(field: &str, profile: &Profile) -> Result<(), ScoringError> {
    profile
        .validate()
        .map_err(|e| ScoringError::InvalidRequest(format!("{}: {}", field, e)))?;

    if !profile.network_value.is_finite() || profile.reputation.is_some_and(|r| !r.is_finite()) {
        return Err(ScoringError::InvalidRequest(format!(
            "{}: numeric fields must be finite",
            field
        )));
    }

    Ok(())
}
