use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::core::heuristics;
use crate::models::{
    CompatibilityWeights, Factor, MarketSnapshot, Opportunity, PredictionResult, RequestKind,
    RiskLevel, ScoringRequest, Trend,
};
use crate::services::{PredictionPayload, Predictor, PredictorError};

/// Confidence assumed for market answers that do not state one
const DEFAULT_MARKET_CONFIDENCE: f64 = 0.85;

/// Reasons a backend answer is rejected
#[derive(Debug, Error, PartialEq)]
pub enum ResponseValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Field {field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Everything that can go wrong between the gateway and the backend
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Predictor(#[from] PredictorError),

    #[error(transparent)]
    Validation(#[from] ResponseValidationError),
}

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, first call included
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles after each further failure
    pub base_delay: Duration,
    /// Upper bound for a single attempt
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            attempt_timeout: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Backoff before the attempt following `attempt` (1-based): base, 2*base, 4*base, ...
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

/// Calls the prediction backend and never fails
///
/// Transient failures are retried per the [`RetryPolicy`]. Exhausted retries
/// and invalid answers both degrade to the local heuristic, tagged
/// `used_fallback = true`.
#[derive(Clone)]
pub struct PredictionGateway {
    predictor: Arc<dyn Predictor>,
    policy: RetryPolicy,
    weights: CompatibilityWeights,
}

impl PredictionGateway {
    pub fn new(
        predictor: Arc<dyn Predictor>,
        policy: RetryPolicy,
        weights: CompatibilityWeights,
    ) -> Self {
        Self {
            predictor,
            policy,
            weights,
        }
    }

    /// Predict a score for `request`, falling back to the local heuristic
    pub async fn predict(
        &self,
        request: &ScoringRequest,
        payload: &PredictionPayload,
    ) -> PredictionResult {
        let kind = request.kind();

        match self.fetch_prediction(kind, payload).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Using local heuristic for {} request: {}", kind, e);
                heuristics::evaluate(request, &self.weights)
            }
        }
    }

    /// Fetch market intelligence for an already-normalized industry
    ///
    /// Degrades to an empty snapshot with zero confidence.
    pub async fn market(&self, industry: &str, payload: &PredictionPayload) -> MarketSnapshot {
        let outcome = match self.call_with_retry(payload).await {
            Ok(body) => parse_market(industry, &body).map_err(GatewayError::from),
            Err(e) => Err(GatewayError::from(e)),
        };

        outcome.unwrap_or_else(|e| {
            tracing::warn!("Using empty market snapshot for {}: {}", industry, e);
            MarketSnapshot::empty(industry)
        })
    }

    async fn fetch_prediction(
        &self,
        kind: RequestKind,
        payload: &PredictionPayload,
    ) -> Result<PredictionResult, GatewayError> {
        let body = self.call_with_retry(payload).await?;
        Ok(parse_prediction(kind, &body)?)
    }

    /// Call the backend up to `max_attempts` times
    ///
    /// Only retryable errors lead to another attempt; no lock is held while
    /// sleeping between attempts.
    async fn call_with_retry(&self, payload: &PredictionPayload) -> Result<Value, PredictorError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let outcome = match tokio::time::timeout(
                self.policy.attempt_timeout,
                self.predictor.predict(payload),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(PredictorError::Timeout(self.policy.attempt_timeout)),
            };

            match outcome {
                Ok(body) => {
                    if attempt > 1 {
                        tracing::info!(
                            "Predictor call for {} succeeded on attempt {}",
                            payload.kind,
                            attempt
                        );
                    }
                    return Ok(body);
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.policy.delay_after(attempt);
                    tracing::warn!(
                        "Predictor attempt {}/{} for {} failed: {} (retrying in {:?})",
                        attempt,
                        max_attempts,
                        payload.kind,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        "Predictor attempt {}/{} for {} failed: {}",
                        attempt,
                        max_attempts,
                        payload.kind,
                        e
                    );
                    return Err(e);
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct PredictionBody {
    #[serde(alias = "compatibility_score", alias = "match_score", alias = "success_probability")]
    score: Option<f64>,
    confidence: Option<f64>,
    #[serde(default)]
    factors: Option<Vec<Factor>>,
    #[serde(default)]
    recommendations: Option<Vec<String>>,
    #[serde(default)]
    risk_level: Option<RiskLevel>,
}

#[derive(Debug, Deserialize)]
struct MarketBody {
    #[serde(default)]
    trends: Option<Vec<Trend>>,
    #[serde(default)]
    opportunities: Option<Vec<Opportunity>>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Validate a prediction answer
///
/// Out-of-range values are rejected, never clamped.
pub fn parse_prediction(
    kind: RequestKind,
    body: &Value,
) -> Result<PredictionResult, ResponseValidationError> {
    let parsed: PredictionBody = serde_json::from_value(body.clone())
        .map_err(|e| ResponseValidationError::Malformed(e.to_string()))?;

    let score = parsed
        .score
        .ok_or(ResponseValidationError::MissingField("score"))?;
    let confidence = parsed
        .confidence
        .ok_or(ResponseValidationError::MissingField("confidence"))?;

    check_range("score", score, kind.score_max())?;
    check_range("confidence", confidence, 1.0)?;

    let factors = parsed.factors.unwrap_or_default();
    for factor in &factors {
        check_range("importance", factor.importance, 1.0)?;
        if !factor.current_value.is_finite() {
            return Err(ResponseValidationError::OutOfRange {
                field: "current_value",
                value: factor.current_value,
            });
        }
    }

    Ok(PredictionResult {
        kind,
        score,
        confidence,
        factors,
        recommendations: parsed.recommendations.unwrap_or_default(),
        risk_level: parsed
            .risk_level
            .unwrap_or_else(|| RiskLevel::from_score(score / kind.score_max() * 100.0)),
        used_fallback: false,
    })
}

/// Validate a market answer; at least one of trends/opportunities must be present
pub fn parse_market(industry: &str, body: &Value) -> Result<MarketSnapshot, ResponseValidationError> {
    let parsed: MarketBody = serde_json::from_value(body.clone())
        .map_err(|e| ResponseValidationError::Malformed(e.to_string()))?;

    if parsed.trends.is_none() && parsed.opportunities.is_none() {
        return Err(ResponseValidationError::MissingField("trends"));
    }

    let trends = parsed.trends.unwrap_or_default();
    let opportunities = parsed.opportunities.unwrap_or_default();

    for trend in &trends {
        check_range("trend score", trend.score, 1.0)?;
    }
    for opportunity in &opportunities {
        check_range("opportunity score", opportunity.score, 1.0)?;
    }

    let confidence = parsed.confidence.unwrap_or(DEFAULT_MARKET_CONFIDENCE);
    check_range("confidence", confidence, 1.0)?;

    Ok(MarketSnapshot {
        industry: industry.to_string(),
        trends,
        opportunities,
        confidence,
        generated_at: chrono::Utc::now(),
        used_fallback: false,
    })
}

#[inline]
fn check_range(field: &'static str, value: f64, max: f64) -> Result<(), ResponseValidationError> {
    if value.is_finite() && (0.0..=max).contains(&value) {
        Ok(())
    } else {
        Err(ResponseValidationError::OutOfRange { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DealSummary, TrendDirection};
    use crate::services::{ScriptedOutcome, ScriptedPredictor};
    use serde_json::json;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            attempt_timeout: Duration::from_millis(200),
        }
    }

    fn deal_request() -> ScoringRequest {
        ScoringRequest::DealSuccess {
            deal: DealSummary {
                title: "Distribution agreement".to_string(),
                description: "Regional distribution".to_string(),
                value: 200_000.0,
                match_score: Some(80.0),
            },
        }
    }

    fn gateway(predictor: ScriptedPredictor) -> PredictionGateway {
        PredictionGateway::new(Arc::new(predictor), fast_policy(), CompatibilityWeights::default())
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(100),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
    }

    #[test]
    fn test_parse_valid_prediction() {
        let body = json!({
            "score": 72.5,
            "confidence": 0.82,
            "factors": [
                {"factor": "Partner Compatibility", "importance": 0.4, "current_value": 0.8, "impact": "positive"}
            ],
            "recommendations": ["Schedule a follow-up"],
            "risk_level": "Low"
        });

        let result = parse_prediction(RequestKind::Deal, &body).unwrap();

        assert_eq!(result.score, 72.5);
        assert_eq!(result.factors.len(), 1);
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert!(!result.used_fallback);
    }

    #[test]
    fn test_parse_derives_missing_risk_level() {
        let body = json!({"score": 45.0, "confidence": 0.7});
        let result = parse_prediction(RequestKind::Compatibility, &body).unwrap();
        assert_eq!(result.risk_level, RiskLevel::High);
        assert!(result.factors.is_empty());
    }

    #[test]
    fn test_parse_rejects_invalid_predictions() {
        let missing_score = json!({"confidence": 0.7});
        assert_eq!(
            parse_prediction(RequestKind::Deal, &missing_score),
            Err(ResponseValidationError::MissingField("score"))
        );

        let missing_confidence = json!({"score": 50.0});
        assert_eq!(
            parse_prediction(RequestKind::Deal, &missing_confidence),
            Err(ResponseValidationError::MissingField("confidence"))
        );

        let out_of_range = json!({"score": 140.0, "confidence": 0.7});
        assert!(matches!(
            parse_prediction(RequestKind::Deal, &out_of_range),
            Err(ResponseValidationError::OutOfRange { field: "score", .. })
        ));

        let bad_confidence = json!({"score": 40.0, "confidence": 87.5});
        assert!(parse_prediction(RequestKind::Meeting, &bad_confidence).is_err());

        let bad_factors = json!({"score": 40.0, "confidence": 0.5, "factors": "none"});
        assert!(matches!(
            parse_prediction(RequestKind::Deal, &bad_factors),
            Err(ResponseValidationError::Malformed(_))
        ));

        let heavy_factor = json!({
            "score": 40.0,
            "confidence": 0.5,
            "factors": [{"factor": "x", "importance": 1.5, "current_value": 0.1, "impact": "negative"}]
        });
        assert!(parse_prediction(RequestKind::Deal, &heavy_factor).is_err());

        assert!(parse_prediction(RequestKind::Deal, &json!([1, 2, 3])).is_err());
    }

    #[test]
    fn test_parse_market() {
        let body = json!({
            "trends": [{"topic": "AI/ML adoption", "score": 0.9, "trend": "rising"}]
        });
        let snapshot = parse_market("technology", &body).unwrap();
        assert_eq!(snapshot.trends[0].direction, TrendDirection::Rising);
        assert!(snapshot.opportunities.is_empty());
        assert_eq!(snapshot.confidence, DEFAULT_MARKET_CONFIDENCE);

        assert_eq!(
            parse_market("technology", &json!({"industry": "technology"})),
            Err(ResponseValidationError::MissingField("trends"))
        );
        assert!(parse_market(
            "technology",
            &json!({"trends": [{"topic": "x", "score": 0.5, "trend": "sideways"}]})
        )
        .is_err());
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let predictor = ScriptedPredictor::responding(json!({"score": 66.0, "confidence": 0.9}))
            .then(ScriptedOutcome::unavailable("connection refused"))
            .then(ScriptedOutcome::Status(503));
        let gateway = gateway(predictor.clone());
        let request = deal_request();

        let result = gateway
            .predict(&request, &PredictionPayload::from(&request))
            .await;

        assert!(!result.used_fallback);
        assert_eq!(result.score, 66.0);
        assert_eq!(predictor.call_count(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_fall_back() {
        let predictor = ScriptedPredictor::new();
        let gateway = gateway(predictor.clone());
        let request = deal_request();

        let result = gateway
            .predict(&request, &PredictionPayload::from(&request))
            .await;

        assert!(result.used_fallback);
        assert_eq!(
            result,
            heuristics::evaluate(&request, &CompatibilityWeights::default())
        );
        assert_eq!(predictor.call_count(), 3);
    }

    #[tokio::test]
    async fn test_invalid_response_is_not_retried() {
        let predictor = ScriptedPredictor::responding(json!({"confidence": 0.9}));
        let gateway = gateway(predictor.clone());
        let request = deal_request();

        let result = gateway
            .predict(&request, &PredictionPayload::from(&request))
            .await;

        assert!(result.used_fallback);
        assert_eq!(predictor.call_count(), 1);
    }

    #[tokio::test]
    async fn test_client_error_status_is_not_retried() {
        let predictor = ScriptedPredictor::new().with_default(ScriptedOutcome::Status(400));
        let gateway = gateway(predictor.clone());
        let request = deal_request();

        let result = gateway
            .predict(&request, &PredictionPayload::from(&request))
            .await;

        assert!(result.used_fallback);
        assert_eq!(predictor.call_count(), 1);
    }

    #[tokio::test]
    async fn test_slow_attempts_time_out() {
        let predictor = ScriptedPredictor::responding(json!({"score": 90.0, "confidence": 0.9}))
            .with_delay(Duration::from_secs(5));
        let gateway = gateway(predictor.clone());
        let request = deal_request();

        let started = std::time::Instant::now();
        let result = gateway
            .predict(&request, &PredictionPayload::from(&request))
            .await;

        assert!(result.used_fallback);
        assert_eq!(predictor.call_count(), 3);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_market_falls_back_to_empty_snapshot() {
        let gateway = gateway(ScriptedPredictor::new());

        let snapshot = gateway
            .market("finance", &PredictionPayload::market("finance"))
            .await;

        assert!(snapshot.used_fallback);
        assert_eq!(snapshot.confidence, 0.0);
        assert!(snapshot.trends.is_empty());
        assert_eq!(snapshot.industry, "finance");
    }
}
