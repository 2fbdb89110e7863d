// Service exports
pub mod cache;
pub mod inflight;
pub mod predictor;
pub mod scripted;

pub use cache::{CacheEntry, CacheKey, CacheStats, TtlCache};
pub use inflight::{InFlight, InFlightError};
pub use predictor::{HttpPredictor, PredictionPayload, Predictor, PredictorError};
pub use scripted::{ScriptedOutcome, ScriptedPredictor};
