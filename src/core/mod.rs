// Core exports
pub mod engine;
pub mod gateway;
pub mod heuristics;
pub mod market;

pub use engine::{validate_request, CacheTtls, EngineOptions, ScoringEngine, ScoringError};
pub use gateway::{GatewayError, PredictionGateway, ResponseValidationError, RetryPolicy};
pub use market::MarketIntelligence;
