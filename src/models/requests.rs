use serde::{Deserialize, Serialize};
use crate::models::domain::{DealSummary, Profile, ScoringContext, ScoringRequest};

/// Request to score the compatibility of two profiles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityRequest {
    #[serde(alias = "profile_a", rename = "profileA")]
    pub profile_a: Profile,
    #[serde(alias = "profile_b", rename = "profileB")]
    pub profile_b: Profile,
}

/// Request to predict the outcome of a meeting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingRequest {
    #[serde(alias = "profile_a", rename = "profileA")]
    pub profile_a: Profile,
    #[serde(alias = "profile_b", rename = "profileB")]
    pub profile_b: Profile,
    #[serde(default)]
    pub context: Option<ScoringContext>,
}

/// Request to predict deal success
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealRequest {
    pub deal: DealSummary,
}

impl From<CompatibilityRequest> for ScoringRequest {
    fn from(req: CompatibilityRequest) -> Self {
        ScoringRequest::Compatibility {
            profile_a: req.profile_a,
            profile_b: req.profile_b,
        }
    }
}

impl From<MeetingRequest> for ScoringRequest {
    fn from(req: MeetingRequest) -> Self {
        ScoringRequest::MeetingSuccess {
            profile_a: req.profile_a,
            profile_b: req.profile_b,
            context: req.context.unwrap_or_default(),
        }
    }
}

impl From<DealRequest> for ScoringRequest {
    fn from(req: DealRequest) -> Self {
        ScoringRequest::DealSuccess { deal: req.deal }
    }
}
