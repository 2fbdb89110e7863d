use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use validator::Validate;

/// Business profile as resolved by the record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Profile {
    #[validate(length(min = 1))]
    pub id: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "networkValue", default)]
    #[validate(range(min = 0.0))]
    pub network_value: f64,
    #[serde(default)]
    pub bio: Option<String>,
    /// Reputation on a 0-100 scale, 50 when unknown
    #[serde(default)]
    #[validate(range(min = 0.0, max = 100.0))]
    pub reputation: Option<f64>,
    #[serde(default)]
    pub location: Option<String>,
}

impl Profile {
    pub fn reputation_or_default(&self) -> f64 {
        self.reputation.unwrap_or(50.0)
    }
}

/// Per-request context for meeting predictions. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringContext {
    #[serde(rename = "eventType", default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(rename = "mutualConnections", default)]
    pub mutual_connections: Option<u32>,
    /// Free-form attributes; ordered so that equal contexts serialize identically
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

/// Summary of a deal under evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DealSummary {
    #[validate(length(min = 1))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 0.0))]
    pub value: f64,
    /// Precomputed partner match score, 0-100
    #[serde(rename = "matchScore", default)]
    #[validate(range(min = 0.0, max = 100.0))]
    pub match_score: Option<f64>,
}

/// A scoring request. Equality, context included, defines cache-key equivalence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoringRequest {
    Compatibility {
        #[serde(rename = "profileA")]
        profile_a: Profile,
        #[serde(rename = "profileB")]
        profile_b: Profile,
    },
    MeetingSuccess {
        #[serde(rename = "profileA")]
        profile_a: Profile,
        #[serde(rename = "profileB")]
        profile_b: Profile,
        #[serde(default)]
        context: ScoringContext,
    },
    DealSuccess {
        deal: DealSummary,
    },
}

impl ScoringRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            ScoringRequest::Compatibility { .. } => RequestKind::Compatibility,
            ScoringRequest::MeetingSuccess { .. } => RequestKind::Meeting,
            ScoringRequest::DealSuccess { .. } => RequestKind::Deal,
        }
    }
}

/// Kind of call made to the prediction backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Compatibility,
    Meeting,
    Deal,
    Market,
}

impl RequestKind {
    /// Upper bound of the score scale for this kind
    pub fn score_max(&self) -> f64 {
        match self {
            RequestKind::Compatibility | RequestKind::Meeting | RequestKind::Deal => 100.0,
            RequestKind::Market => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Compatibility => "compatibility",
            RequestKind::Meeting => "meeting",
            RequestKind::Deal => "deal",
            RequestKind::Market => "market",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction in which a factor moves the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Positive,
    Negative,
    Neutral,
}

impl Impact {
    /// Positive above the midpoint of a normalized value, negative below
    pub fn from_value(value: f64) -> Self {
        if value > 0.5 {
            Impact::Positive
        } else if value < 0.5 {
            Impact::Negative
        } else {
            Impact::Neutral
        }
    }
}

/// A named contribution to a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    #[serde(rename = "factor")]
    pub name: String,
    pub importance: f64,
    pub current_value: f64,
    pub impact: Impact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Classify a 0-100 success score
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            RiskLevel::Low
        } else if score >= 50.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

/// Normalized outcome of a scoring request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub kind: RequestKind,
    pub score: f64,
    pub confidence: f64,
    pub factors: Vec<Factor>,
    pub recommendations: Vec<String>,
    pub risk_level: RiskLevel,
    #[serde(rename = "usedFallback")]
    pub used_fallback: bool,
}

impl PredictionResult {
    /// Human-readable band for a compatibility score
    pub fn compatibility_level(&self) -> &'static str {
        match self.score {
            s if s >= 80.0 => "Excellent",
            s if s >= 70.0 => "Very Good",
            s if s >= 60.0 => "Good",
            s if s >= 40.0 => "Fair",
            _ => "Poor",
        }
    }

    /// Letter grade for a meeting success score
    pub fn meeting_grade(&self) -> &'static str {
        match self.score {
            s if s >= 85.0 => "A+",
            s if s >= 75.0 => "A",
            s if s >= 65.0 => "B+",
            s if s >= 55.0 => "B",
            _ => "C",
        }
    }

    pub fn recommended_action(&self) -> &'static str {
        match self.risk_level {
            RiskLevel::Low => "Proceed with confidence",
            RiskLevel::Medium => "Proceed with standard precautions",
            RiskLevel::High => "Consider additional risk mitigation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Rising,
    Falling,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub topic: String,
    pub score: f64,
    #[serde(rename = "trend")]
    pub direction: TrendDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub title: String,
    pub score: f64,
    pub category: String,
}

/// Industry-level market intelligence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub industry: String,
    pub trends: Vec<Trend>,
    pub opportunities: Vec<Opportunity>,
    pub confidence: f64,
    #[serde(rename = "generatedAt")]
    pub generated_at: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "usedFallback")]
    pub used_fallback: bool,
}

impl MarketSnapshot {
    /// Degraded snapshot returned when the backend cannot be used
    pub fn empty(industry: &str) -> Self {
        Self {
            industry: industry.to_string(),
            trends: Vec::new(),
            opportunities: Vec::new(),
            confidence: 0.0,
            generated_at: chrono::Utc::now(),
            used_fallback: true,
        }
    }
}

/// Weights of the compatibility heuristic
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompatibilityWeights {
    pub industry: f64,
    pub title: f64,
    pub network: f64,
    pub personality: f64,
}

impl Default for CompatibilityWeights {
    fn default() -> Self {
        Self {
            industry: 0.30,
            title: 0.25,
            network: 0.20,
            personality: 0.25,
        }
    }
}
