//! In-process predictor with scripted answers.
//!
//! Development and test double only: the service binary always talks to the
//! AI service through [`HttpPredictor`](crate::services::HttpPredictor).
//! Integration tests and benchmarks use it in place of the AI service:
//!
//! - queued outcomes consumed in order, then a default outcome
//! - simulated latency per call
//! - call counting and payload recording for verification
//!
//! ```ignore
//! let predictor = ScriptedPredictor::new()
//!     .then(ScriptedOutcome::unavailable("connection refused"))
//!     .then(ScriptedOutcome::Respond(json!({"score": 72.0, "confidence": 0.8})));
//! ```

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::sleep;

use crate::services::predictor::{PredictionPayload, Predictor, PredictorError};

/// One scripted answer
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    /// Answer with this JSON body
    Respond(Value),
    /// Fail with a transient, retryable error
    Unavailable(String),
    /// Fail with an HTTP status
    Status(u16),
    /// Answer with something that is not a usable body
    Invalid(String),
}

impl ScriptedOutcome {
    pub fn unavailable(message: impl Into<String>) -> Self {
        ScriptedOutcome::Unavailable(message.into())
    }

    fn into_result(self) -> Result<Value, PredictorError> {
        match self {
            ScriptedOutcome::Respond(body) => Ok(body),
            ScriptedOutcome::Unavailable(message) => Err(PredictorError::Unavailable(message)),
            ScriptedOutcome::Status(code) => Err(PredictorError::Status(code)),
            ScriptedOutcome::Invalid(message) => Err(PredictorError::InvalidResponse(message)),
        }
    }
}

/// Predictor returning scripted outcomes
#[derive(Debug, Clone)]
pub struct ScriptedPredictor {
    script: Arc<Mutex<VecDeque<ScriptedOutcome>>>,
    default: ScriptedOutcome,
    delay: Duration,
    calls: Arc<AtomicUsize>,
    payloads: Arc<Mutex<Vec<PredictionPayload>>>,
}

impl Default for ScriptedPredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedPredictor {
    /// A predictor that is unreachable until told otherwise
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            default: ScriptedOutcome::unavailable("no scripted response"),
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
            payloads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always answer with `body` once the queue is drained
    pub fn responding(body: Value) -> Self {
        Self::new().with_default(ScriptedOutcome::Respond(body))
    }

    pub fn with_default(mut self, outcome: ScriptedOutcome) -> Self {
        self.default = outcome;
        self
    }

    /// Queue an outcome for the next unanswered call
    pub fn then(self, outcome: ScriptedOutcome) -> Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(outcome);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of calls received so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn payloads(&self) -> Vec<PredictionPayload> {
        self.payloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Predictor for ScriptedPredictor {
    async fn predict(&self, payload: &PredictionPayload) -> Result<Value, PredictorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(payload.clone());

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        let outcome = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| self.default.clone());

        outcome.into_result()
    }
}
