//! Local heuristic calculator
//!
//! Deterministic, side-effect-free scoring used whenever the prediction
//! backend is unreachable or answers with something unusable. Every result
//! produced here is tagged `used_fallback = true` and carries a reduced
//! confidence.

use std::collections::BTreeSet;

use crate::models::{
    CompatibilityWeights, DealSummary, Factor, Impact, PredictionResult, Profile, RequestKind,
    RiskLevel, ScoringContext, ScoringRequest,
};

/// Confidence reported for every heuristic result
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Score given to industry pairs missing from the matrix
const DEFAULT_INDUSTRY_SCORE: f64 = 0.5;

/// Network value at which network synergy saturates
const NETWORK_VALUE_NORMALIZER: f64 = 100_000.0;

/// Deal value at which complexity is maximal
const DEAL_VALUE_NORMALIZER: f64 = 1_000_000.0;

const HISTORICAL_SUCCESS_PRIOR: f64 = 0.65;
const MEETING_CONTEXT_SCORE: f64 = 0.70;
const MARKET_CONDITIONS_SCORE: f64 = 0.60;

/// (industry, industry, score); lookups are case-insensitive and mirrored
const INDUSTRY_MATRIX: &[(&str, &str, f64)] = &[
    ("technology", "technology", 0.9),
    ("technology", "finance", 0.8),
    ("technology", "healthcare", 0.7),
    ("technology", "marketing", 0.75),
    ("finance", "finance", 0.6),
    ("finance", "real-estate", 0.9),
    ("finance", "consulting", 0.85),
    ("healthcare", "healthcare", 0.5),
    ("healthcare", "pharmaceuticals", 0.9),
    ("healthcare", "research", 0.8),
    ("marketing", "marketing", 0.6),
    ("marketing", "retail", 0.8),
    ("marketing", "media", 0.9),
    ("consulting", "consulting", 0.5),
    ("consulting", "technology", 0.75),
    ("consulting", "healthcare", 0.7),
];

const PERSONALITY_KEYWORDS: &[&str] = &[
    "innovative",
    "strategic",
    "collaborative",
    "analytical",
    "creative",
    "results-driven",
    "visionary",
    "entrepreneurial",
];

/// Score a request without any I/O
pub fn evaluate(request: &ScoringRequest, weights: &CompatibilityWeights) -> PredictionResult {
    match request {
        ScoringRequest::Compatibility { profile_a, profile_b } => {
            compatibility(profile_a, profile_b, weights)
        }
        ScoringRequest::MeetingSuccess {
            profile_a,
            profile_b,
            context,
        } => meeting_success(profile_a, profile_b, context),
        ScoringRequest::DealSuccess { deal } => deal_success(deal),
    }
}

/// Compatibility score (0-100) between two profiles
///
/// score = (
///     industry * 0.30 +      # matrix lookup
///     title * 0.25 +         # seniority gap of 1-2 ranks preferred
///     network * 0.20 +       # average network value, saturating
///     personality * 0.25     # shared bio keywords
/// ) * 100
pub fn compatibility(a: &Profile, b: &Profile, weights: &CompatibilityWeights) -> PredictionResult {
    let industry = industry_compatibility(&a.industry, &b.industry);
    let title = title_synergy(&a.title, &b.title);
    let network = network_synergy(a.network_value, b.network_value);
    let personality = personality_overlap(a.bio.as_deref(), b.bio.as_deref());

    let score = weighted_score(&[
        (industry, weights.industry),
        (title, weights.title),
        (network, weights.network),
        (personality, weights.personality),
    ]);

    let factors = ranked_factors(vec![
        factor("Industry Compatibility", weights.industry, industry),
        factor("Title Synergy", weights.title, title),
        factor("Network Value", weights.network, network),
        factor("Personality Overlap", weights.personality, personality),
    ]);

    let mut recommendations = vec![connection_advice(score).to_string()];
    if industry < 0.6 {
        recommendations.push("Look for a shared project that bridges both industries".to_string());
    }
    if personality < 0.3 {
        recommendations.push("Research common industry interests beforehand".to_string());
    }

    fallback_result(RequestKind::Compatibility, score, factors, recommendations)
}

/// Meeting success probability (0-100)
///
/// Blends a historical success prior, a context score and the pair's
/// average reputation.
pub fn meeting_success(a: &Profile, b: &Profile, _context: &ScoringContext) -> PredictionResult {
    let reputation = ((normalize_reputation(a) + normalize_reputation(b)) / 2.0).clamp(0.0, 1.0);

    let score = weighted_score(&[
        (HISTORICAL_SUCCESS_PRIOR, 0.25),
        (MEETING_CONTEXT_SCORE, 0.40),
        (reputation, 0.35),
    ]);

    let factors = ranked_factors(vec![
        factor("Historical Success", 0.25, HISTORICAL_SUCCESS_PRIOR),
        factor("Meeting Context", 0.40, MEETING_CONTEXT_SCORE),
        factor("Reputation", 0.35, reputation),
    ]);

    let mut recommendations = vec![
        "Meet in a professional environment (office or conference room)".to_string(),
    ];
    if reputation < 0.5 {
        recommendations.push("Prepare specific collaboration proposals".to_string());
    }

    fallback_result(RequestKind::Meeting, score, factors, recommendations)
}

/// Deal success probability (0-100)
///
/// score = (
///     complexity * 0.25 +    # 1 - min(value / 1M, 1)
///     partner * 0.30 +       # precomputed match score, 0 when absent
///     market * 0.25 +        # constant placeholder
///     historical * 0.20      # constant placeholder
/// ) * 100
pub fn deal_success(deal: &DealSummary) -> PredictionResult {
    let value_ratio = (deal.value / DEAL_VALUE_NORMALIZER).clamp(0.0, 1.0);
    let complexity = 1.0 - value_ratio;
    let partner = (deal.match_score.unwrap_or(0.0) / 100.0).clamp(0.0, 1.0);

    let score = weighted_score(&[
        (complexity, 0.25),
        (partner, 0.30),
        (MARKET_CONDITIONS_SCORE, 0.25),
        (HISTORICAL_SUCCESS_PRIOR, 0.20),
    ]);

    let factors = ranked_factors(vec![
        factor("Deal Complexity", 0.25, complexity),
        factor("Partner Compatibility", 0.30, partner),
        factor("Market Conditions", 0.25, MARKET_CONDITIONS_SCORE),
        factor("Historical Success", 0.20, HISTORICAL_SUCCESS_PRIOR),
    ]);

    let mut recommendations = Vec::new();
    if partner < 0.6 {
        recommendations
            .push("Consider improving partner alignment through preliminary meetings".to_string());
    }
    if (deal.description.len() as f64) / 1000.0 < 0.3 {
        recommendations.push("Provide more detailed deal documentation to build trust".to_string());
    }
    if score < 50.0 {
        recommendations.push("Consider risk mitigation strategies or deal restructuring".to_string());
    }
    if value_ratio > 0.8 {
        recommendations
            .push("Implement milestone-based payment structure for large deals".to_string());
    }

    fallback_result(RequestKind::Deal, score, factors, recommendations)
}

/// Industry compatibility (0-1) from the fixed matrix
pub fn industry_compatibility(industry_a: &str, industry_b: &str) -> f64 {
    let a = industry_a.trim().to_lowercase();
    let b = industry_b.trim().to_lowercase();

    INDUSTRY_MATRIX
        .iter()
        .find(|(x, y, _)| *x == a && *y == b)
        .or_else(|| INDUSTRY_MATRIX.iter().find(|(x, y, _)| *x == b && *y == a))
        .map(|(_, _, score)| *score)
        .unwrap_or(DEFAULT_INDUSTRY_SCORE)
}

/// Seniority rank 1-5 derived from title keywords
pub fn seniority_rank(title: &str) -> u8 {
    let lower = title.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let has = |keys: &[&str]| words.iter().any(|w| keys.contains(w));

    // "president" only counts when it is not part of "vice president"
    let president = words
        .iter()
        .enumerate()
        .any(|(i, w)| *w == "president" && (i == 0 || words[i - 1] != "vice"));

    if president || has(&["ceo", "founder", "owner"]) {
        return 5;
    }
    if lower.contains("vice president") || has(&["director", "vp", "head"]) {
        return 4;
    }
    if has(&["manager", "lead", "principal"]) {
        return 3;
    }
    if has(&["senior", "sr"]) {
        return 2;
    }
    1
}

/// Title synergy (0-1): a gap of one or two seniority ranks scores best
pub fn title_synergy(title_a: &str, title_b: &str) -> f64 {
    let gap = seniority_rank(title_a).abs_diff(seniority_rank(title_b));
    if (1..=2).contains(&gap) {
        0.8
    } else {
        0.4
    }
}

/// Network synergy (0-1) from the average network value
pub fn network_synergy(value_a: f64, value_b: f64) -> f64 {
    let average = (value_a + value_b) / 2.0;
    (average / NETWORK_VALUE_NORMALIZER).clamp(0.0, 1.0)
}

/// Shared personality keywords over the larger keyword count
pub fn personality_overlap(bio_a: Option<&str>, bio_b: Option<&str>) -> f64 {
    let keywords_a = personality_keywords(bio_a.unwrap_or_default());
    let keywords_b = personality_keywords(bio_b.unwrap_or_default());

    let shared = keywords_a.intersection(&keywords_b).count();
    let denominator = keywords_a.len().max(keywords_b.len()).max(1);

    shared as f64 / denominator as f64
}

fn personality_keywords(bio: &str) -> BTreeSet<&'static str> {
    let lower = bio.to_lowercase();
    let words: BTreeSet<&str> = lower
        .split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .filter(|w| !w.is_empty())
        .collect();

    PERSONALITY_KEYWORDS
        .iter()
        .copied()
        .filter(|keyword| words.contains(keyword))
        .collect()
}

fn normalize_reputation(profile: &Profile) -> f64 {
    (profile.reputation_or_default() / 100.0).clamp(0.0, 1.0)
}

/// Weighted sum of normalized sub-scores, scaled to 0-100
#[inline]
fn weighted_score(parts: &[(f64, f64)]) -> f64 {
    let total: f64 = parts.iter().map(|(value, weight)| value * weight).sum();
    (total * 100.0).clamp(0.0, 100.0)
}

fn factor(name: &str, importance: f64, value: f64) -> Factor {
    Factor {
        name: name.to_string(),
        importance: importance.clamp(0.0, 1.0),
        current_value: value,
        impact: Impact::from_value(value),
    }
}

/// Order factors by importance, most important first
fn ranked_factors(mut factors: Vec<Factor>) -> Vec<Factor> {
    factors.sort_by(|a, b| {
        b.importance
            .partial_cmp(&a.importance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    factors
}

fn connection_advice(score: f64) -> &'static str {
    if score >= 75.0 {
        "Highly recommended connection"
    } else if score >= 60.0 {
        "Promising networking opportunity"
    } else if score >= 40.0 {
        "Consider context before connecting"
    } else {
        "Low compatibility - proceed with caution"
    }
}

fn fallback_result(
    kind: RequestKind,
    score: f64,
    factors: Vec<Factor>,
    recommendations: Vec<String>,
) -> PredictionResult {
    PredictionResult {
        kind,
        score,
        confidence: FALLBACK_CONFIDENCE,
        factors,
        recommendations,
        risk_level: RiskLevel::from_score(score),
        used_fallback: true,
    }
}
