use actix_web::{web, HttpResponse, Responder};
use crate::core::{ScoringEngine, ScoringError};
use crate::models::{
    CompatibilityRequest, DealRequest, ErrorResponse, HealthResponse, MarketResponse, MeetingRequest,
    PredictionResult, RequestKind, ScoreResponse, ScoringRequest,
};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: ScoringEngine,
}

/// Configure all scoring routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/score/compatibility", web::post().to(score_compatibility))
        .route("/score/meeting", web::post().to(score_meeting))
        .route("/score/deal", web::post().to(score_deal))
        .route("/market/{industry}", web::get().to(market_snapshot))
        .route("/cache", web::delete().to(clear_cache));
}

/// Health check endpoint
///
/// Always healthy: a missing AI service only degrades results to the local heuristic.
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        predictions_cache: state.engine.prediction_cache_stats(),
        market_cache: state.engine.market_cache_stats(),
    })
}

/// Compatibility score endpoint
///
/// POST /api/v1/score/compatibility
///
/// Request body:
/// ```json
/// {
///   "profileA": { "id": "string", "industry": "string", "title": "string", "networkValue": 0 },
///   "profileB": { "id": "string", "industry": "string", "title": "string", "networkValue": 0 }
/// }
/// ```
async fn score_compatibility(
    state: web::Data<AppState>,
    req: web::Json<CompatibilityRequest>,
) -> impl Responder {
    tracing::info!(
        "Scoring compatibility of {} and {}",
        req.profile_a.id,
        req.profile_b.id
    );
    score(&state, req.into_inner().into()).await
}

/// Meeting success endpoint
///
/// POST /api/v1/score/meeting
async fn score_meeting(state: web::Data<AppState>, req: web::Json<MeetingRequest>) -> impl Responder {
    tracing::info!(
        "Predicting meeting success of {} and {}",
        req.profile_a.id,
        req.profile_b.id
    );
    score(&state, req.into_inner().into()).await
}

/// Deal success endpoint
///
/// POST /api/v1/score/deal
async fn score_deal(state: web::Data<AppState>, req: web::Json<DealRequest>) -> impl Responder {
    tracing::info!("Predicting success of deal '{}'", req.deal.title);
    score(&state, req.into_inner().into()).await
}

async fn score(state: &AppState, request: ScoringRequest) -> HttpResponse {
    match state.engine.score(request).await {
        Ok(result) => {
            if result.used_fallback {
                tracing::debug!("{} result served from local heuristic", result.kind);
            }
            HttpResponse::Ok().json(ScoreResponse {
                success: true,
                label: label_for(&result).to_string(),
                result,
            })
        }
        Err(e) => bad_request(e),
    }
}

/// Market intelligence endpoint
///
/// GET /api/v1/market/{industry}
async fn market_snapshot(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let industry = path.into_inner();

    match state.engine.get_market_snapshot(&industry).await {
        Ok(snapshot) => HttpResponse::Ok().json(MarketResponse {
            success: true,
            snapshot,
        }),
        Err(e) => bad_request(e),
    }
}

/// Drop all cached predictions and snapshots
///
/// DELETE /api/v1/cache
async fn clear_cache(state: web::Data<AppState>) -> impl Responder {
    state.engine.clear_cache();
    tracing::info!("Prediction and market caches cleared");
    HttpResponse::Ok().json(serde_json::json!({ "success": true }))
}

fn label_for(result: &PredictionResult) -> &'static str {
    match result.kind {
        RequestKind::Compatibility => result.compatibility_level(),
        RequestKind::Meeting => result.meeting_grade(),
        RequestKind::Deal | RequestKind::Market => result.recommended_action(),
    }
}

fn bad_request(err: ScoringError) -> HttpResponse {
    tracing::info!("Rejected request: {}", err);
    let message = match err {
        ScoringError::InvalidRequest(message) => message,
    };
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message,
        status_code: 400,
    })
}
