// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    CompatibilityWeights, DealSummary, Factor, Impact, MarketSnapshot, Opportunity, PredictionResult,
    Profile, RequestKind, RiskLevel, ScoringContext, ScoringRequest, Trend, TrendDirection,
};
pub use requests::{CompatibilityRequest, DealRequest, MeetingRequest};
pub use responses::{ErrorResponse, HealthResponse, MarketResponse, ScoreResponse};
