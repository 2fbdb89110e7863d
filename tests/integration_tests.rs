// Integration tests for DigBiz Scoring

use digbiz_scoring::core::heuristics;
use digbiz_scoring::core::{CacheTtls, EngineOptions, RetryPolicy, ScoringEngine, ScoringError};
use digbiz_scoring::models::{CompatibilityWeights, DealSummary, Profile, ScoringContext, ScoringRequest};
use digbiz_scoring::services::{HttpPredictor, ScriptedOutcome, ScriptedPredictor};
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn create_profile(id: &str, industry: &str, title: &str, network_value: f64) -> Profile {
    Profile {
        id: id.to_string(),
        industry: industry.to_string(),
        title: title.to_string(),
        network_value,
        bio: Some("Innovative, collaborative and results-driven".to_string()),
        reputation: Some(72.0),
        location: Some("Berlin".to_string()),
    }
}

fn compatibility_request() -> ScoringRequest {
    ScoringRequest::Compatibility {
        profile_a: create_profile("founder-1", "technology", "Founder & CEO", 60_000.0),
        profile_b: create_profile("investor-7", "finance", "Investment Director", 120_000.0),
    }
}

fn fast_options() -> EngineOptions {
    EngineOptions {
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(5),
            attempt_timeout: Duration::from_millis(500),
        },
        ..EngineOptions::default()
    }
}

fn create_engine(predictor: &ScriptedPredictor, options: EngineOptions) -> ScoringEngine {
    ScoringEngine::new(Arc::new(predictor.clone()), options)
}

#[tokio::test]
async fn test_integration_repeated_request_hits_cache() {
    let predictor = ScriptedPredictor::responding(json!({
        "compatibility_score": 84.0,
        "confidence": 0.91,
        "recommendations": ["Schedule an intro call"]
    }));
    let engine = create_engine(&predictor, fast_options());

    let first = engine.score(compatibility_request()).await.unwrap();
    let second = engine.score(compatibility_request()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.score, 84.0);
    assert!(!first.used_fallback);
    assert_eq!(predictor.call_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_integration_concurrent_requests_share_one_call() {
    let predictor = ScriptedPredictor::responding(json!({"score": 66.0, "confidence": 0.7}))
        .with_delay(Duration::from_millis(150));
    let engine = create_engine(&predictor, fast_options());

    let calls = (0..10).map(|_| {
        let engine = engine.clone();
        tokio::spawn(async move { engine.score(compatibility_request()).await })
    });
    let results: Vec<_> = join_all(calls)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(predictor.call_count(), 1);
    assert!(results.iter().all(|r| *r == results[0]));
    assert_eq!(results[0].score, 66.0);

    // The finished computation is unregistered, so a new burst starts a fresh cycle
    engine.clear_cache();
    let calls = (0..10).map(|_| {
        let engine = engine.clone();
        tokio::spawn(async move { engine.score(compatibility_request()).await })
    });
    for joined in join_all(calls).await {
        assert_eq!(joined.unwrap().unwrap().score, 66.0);
    }
    assert_eq!(predictor.call_count(), 2);
}

#[tokio::test]
async fn test_integration_backend_down_matches_local_heuristic() {
    let predictor = ScriptedPredictor::new();
    let engine = create_engine(&predictor, fast_options());
    let request = compatibility_request();

    let result = engine.score(request.clone()).await.unwrap();
    let expected = heuristics::evaluate(&request, &CompatibilityWeights::default());

    assert_eq!(result, expected);
    assert!(result.used_fallback);
    assert_eq!(predictor.call_count(), 3);
}

#[tokio::test]
async fn test_integration_recovers_on_third_attempt() {
    let predictor = ScriptedPredictor::responding(json!({
        "success_probability": 74.0,
        "confidence": 0.82
    }))
    .then(ScriptedOutcome::unavailable("connection reset"))
    .then(ScriptedOutcome::Status(503));
    let engine = create_engine(&predictor, fast_options());

    let request = ScoringRequest::MeetingSuccess {
        profile_a: create_profile("a", "healthcare", "Head of Research", 30_000.0),
        profile_b: create_profile("b", "pharmaceuticals", "VP Partnerships", 45_000.0),
        context: ScoringContext {
            event_type: Some("conference".to_string()),
            ..ScoringContext::default()
        },
    };
    let result = engine.score(request).await.unwrap();

    assert!(!result.used_fallback);
    assert_eq!(result.score, 74.0);
    assert_eq!(predictor.call_count(), 3);
}

#[tokio::test]
async fn test_integration_missing_score_uses_fallback() {
    let predictor = ScriptedPredictor::responding(json!({"confidence": 0.8}));
    let engine = create_engine(&predictor, fast_options());

    let deal = ScoringRequest::DealSuccess {
        deal: DealSummary {
            title: "Regional distribution".to_string(),
            description: "Three year exclusive distribution agreement".to_string(),
            value: 400_000.0,
            match_score: Some(70.0),
        },
    };
    let result = engine.score(deal.clone()).await.unwrap();

    assert!(result.used_fallback);
    assert_eq!(result, heuristics::evaluate(&deal, &CompatibilityWeights::default()));
    assert_eq!(predictor.call_count(), 1);
}

#[tokio::test]
async fn test_integration_market_snapshot_cache_and_expiry() {
    let predictor = ScriptedPredictor::responding(json!({
        "trends": [{"topic": "Digital Transformation", "score": 0.85, "trend": "rising"}],
        "opportunities": [{"title": "Cross-Industry Partnerships", "score": 0.72, "category": "partnership"}],
        "confidence": 0.9
    }));
    let options = EngineOptions {
        ttls: CacheTtls {
            market: Duration::from_millis(200),
            ..CacheTtls::default()
        },
        ..fast_options()
    };
    let engine = create_engine(&predictor, options);

    let first = engine.get_market_snapshot("Technology").await.unwrap();
    let cached = engine.get_market_snapshot("technology").await.unwrap();
    assert_eq!(first.generated_at, cached.generated_at);
    assert_eq!(predictor.call_count(), 1);

    tokio::time::sleep(Duration::from_millis(400)).await;

    let refreshed = engine.get_market_snapshot("technology").await.unwrap();
    assert_eq!(predictor.call_count(), 2);
    assert!(refreshed.generated_at >= first.generated_at);
    assert_eq!(refreshed.trends.len(), 1);
}

#[tokio::test]
async fn test_integration_abandoned_caller_still_populates_cache() {
    let predictor = ScriptedPredictor::responding(json!({"score": 58.0, "confidence": 0.6}))
        .with_delay(Duration::from_millis(200));
    let engine = create_engine(&predictor, fast_options());

    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        engine.score(compatibility_request()),
    )
    .await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_millis(400)).await;

    let result = engine.score(compatibility_request()).await.unwrap();
    assert_eq!(result.score, 58.0);
    assert_eq!(predictor.call_count(), 1);
}

#[tokio::test]
async fn test_integration_invalid_input_is_reported() {
    let predictor = ScriptedPredictor::new();
    let engine = create_engine(&predictor, fast_options());

    let profile = create_profile("same", "technology", "CTO", 10_000.0);
    let err = engine
        .score(ScoringRequest::Compatibility {
            profile_a: profile.clone(),
            profile_b: profile,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ScoringError::InvalidRequest(_)));

    assert!(engine.get_market_snapshot("  ").await.is_err());
    assert_eq!(predictor.call_count(), 0);
}

#[tokio::test]
async fn test_integration_http_predictor_retries_then_falls_back() {
    let mut server = mockito::Server::new_async().await;
    let failing = server
        .mock("POST", "/match")
        .with_status(502)
        .expect(3)
        .create_async()
        .await;

    let predictor = HttpPredictor::new(server.url(), Duration::from_secs(5)).unwrap();
    let engine = ScoringEngine::new(Arc::new(predictor), fast_options());

    let result = engine.score(compatibility_request()).await.unwrap();

    failing.assert_async().await;
    assert!(result.used_fallback);
}

#[tokio::test]
async fn test_integration_http_predictor_client_error_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let rejected = server
        .mock("POST", "/predict-deal")
        .with_status(422)
        .expect(1)
        .create_async()
        .await;

    let predictor = HttpPredictor::new(server.url(), Duration::from_secs(5)).unwrap();
    let engine = ScoringEngine::new(Arc::new(predictor), fast_options());

    let result = engine
        .score(ScoringRequest::DealSuccess {
            deal: DealSummary {
                title: "Licensing".to_string(),
                description: String::new(),
                value: 50_000.0,
                match_score: None,
            },
        })
        .await
        .unwrap();

    rejected.assert_async().await;
    assert!(result.used_fallback);
}

#[tokio::test]
async fn test_integration_http_predictor_success() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/match")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"compatibility_score": 81.0, "confidence": 0.9, "risk_level": "Low"}"#)
        .expect(1)
        .create_async()
        .await;

    let predictor = HttpPredictor::new(server.url(), Duration::from_secs(5)).unwrap();
    let engine = ScoringEngine::new(Arc::new(predictor), fast_options());

    let first = engine.score(compatibility_request()).await.unwrap();
    let second = engine.score(compatibility_request()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(first, second);
    assert_eq!(first.score, 81.0);
    assert!(!first.used_fallback);
}
