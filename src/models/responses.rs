use serde::{Deserialize, Serialize};
use crate::models::domain::{MarketSnapshot, PredictionResult};
use crate::services::CacheStats;

/// Response for the scoring endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub success: bool,
    pub result: PredictionResult,
    /// Compatibility level, meeting grade or recommended action depending on kind
    pub label: String,
}

/// Response for the market intelligence endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketResponse {
    pub success: bool,
    pub snapshot: MarketSnapshot,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub predictions_cache: CacheStats,
    pub market_cache: CacheStats,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
