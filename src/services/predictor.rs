use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{DealSummary, Profile, RequestKind, ScoringContext, ScoringRequest};

/// Errors that can occur when calling the prediction backend
#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Predictor timed out after {0:?}")]
    Timeout(Duration),

    #[error("Predictor returned status {0}")]
    Status(u16),

    #[error("Predictor unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl PredictorError {
    /// Transport failures, timeouts and server-side statuses are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            PredictorError::RequestError(_)
            | PredictorError::Timeout(_)
            | PredictorError::Unavailable(_) => true,
            PredictorError::Status(code) => *code >= 500 || *code == 429,
            PredictorError::InvalidResponse(_) => false,
        }
    }
}

/// Logical request sent to the prediction backend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionPayload {
    pub kind: RequestKind,
    #[serde(rename = "subjectA", skip_serializing_if = "Option::is_none")]
    pub subject_a: Option<Profile>,
    #[serde(rename = "subjectB", skip_serializing_if = "Option::is_none")]
    pub subject_b: Option<Profile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ScoringContext>,
    #[serde(rename = "dealSummary", skip_serializing_if = "Option::is_none")]
    pub deal_summary: Option<DealSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
}

impl PredictionPayload {
    /// Payload for an industry market snapshot
    pub fn market(industry: &str) -> Self {
        Self {
            kind: RequestKind::Market,
            subject_a: None,
            subject_b: None,
            context: None,
            deal_summary: None,
            industry: Some(industry.to_string()),
        }
    }
}

impl From<&ScoringRequest> for PredictionPayload {
    fn from(request: &ScoringRequest) -> Self {
        let mut payload = Self {
            kind: request.kind(),
            subject_a: None,
            subject_b: None,
            context: None,
            deal_summary: None,
            industry: None,
        };

        match request {
            ScoringRequest::Compatibility { profile_a, profile_b } => {
                payload.subject_a = Some(profile_a.clone());
                payload.subject_b = Some(profile_b.clone());
            }
            ScoringRequest::MeetingSuccess {
                profile_a,
                profile_b,
                context,
            } => {
                payload.subject_a = Some(profile_a.clone());
                payload.subject_b = Some(profile_b.clone());
                payload.context = Some(context.clone());
            }
            ScoringRequest::DealSuccess { deal } => {
                payload.deal_summary = Some(deal.clone());
            }
        }

        payload
    }
}

/// External prediction backend
///
/// Implementations return the raw JSON answer; interpreting and validating
/// it is the gateway's job.
#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, payload: &PredictionPayload) -> Result<Value, PredictorError>;
}

/// HTTP client for the AI prediction service
///
/// Routes each payload kind to the service's endpoint:
/// - compatibility -> POST /match
/// - meeting -> POST /predict-meeting
/// - deal -> POST /predict-deal
/// - market -> GET /market-trends?industry=...
pub struct HttpPredictor {
    base_url: String,
    client: Client,
}

impl HttpPredictor {
    /// Create a new client; `timeout` bounds each individual HTTP call
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, PredictorError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { base_url, client })
    }

    fn endpoint(&self, kind: RequestKind) -> String {
        let path = match kind {
            RequestKind::Compatibility => "match",
            RequestKind::Meeting => "predict-meeting",
            RequestKind::Deal => "predict-deal",
            RequestKind::Market => "market-trends",
        };
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl Predictor for HttpPredictor {
    async fn predict(&self, payload: &PredictionPayload) -> Result<Value, PredictorError> {
        let request_id = Uuid::new_v4().to_string();
        let url = self.endpoint(payload.kind);

        let request = match payload.kind {
            RequestKind::Market => {
                let industry = payload.industry.as_deref().unwrap_or_default();
                let full_url = format!("{}?industry={}", url, urlencoding::encode(industry));
                self.client.get(full_url)
            }
            _ => self.client.post(&url).json(payload),
        };

        tracing::debug!("Calling predictor {} (request {})", url, request_id);

        let response = request
            .header("X-Request-Id", &request_id)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("Predictor returned {} for request {}", status, request_id);
            return Err(PredictorError::Status(status.as_u16()));
        }

        let body = response.text().await?;

        serde_json::from_str(&body)
            .map_err(|e| PredictorError::InvalidResponse(format!("Body is not JSON: {}", e)))
    }
}
