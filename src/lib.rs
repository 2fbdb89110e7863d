//! DigBiz Scoring - compatibility and success prediction service for DigBiz
//!
//! This library scores business profile pairs, meetings and deals by asking an
//! external AI service and falling back to a local heuristic when it cannot
//! answer. Results are cached per request and concurrent identical requests
//! share a single backend call.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{heuristics, EngineOptions, RetryPolicy, ScoringEngine, ScoringError};
pub use crate::models::{
    CompatibilityWeights, DealSummary, MarketSnapshot, PredictionResult, Profile, RiskLevel,
    ScoringContext, ScoringRequest,
};
pub use crate::services::{HttpPredictor, Predictor};
