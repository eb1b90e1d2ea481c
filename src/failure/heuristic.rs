use serde::{Deserialize, Serialize};
use std::fmt;

use crate::features::{value_or, FeatureMap};

/// Upper bound for rule-based failure probability
pub const MAX_HEURISTIC_PROBABILITY: f64 = 0.95;
pub const HEURISTIC_CONFIDENCE: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_probability(probability: f64) -> Self {
        if probability < 0.1 {
            Self::Low
        } else if probability < 0.3 {
            Self::Medium
        } else if probability < 0.6 {
            Self::High
        } else {
            Self::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn needs_review(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weighted rule score, capped at [`MAX_HEURISTIC_PROBABILITY`]
pub fn heuristic_probability(features: &FeatureMap) -> f64 {
    let mut score = value_or(features, "failure_rate_7d", 0.05) * 0.3;

    let churn = value_or(features, "code_churn", 0.0);
    if churn > 1000.0 {
        score += 0.2;
    } else if churn > 500.0 {
        score += 0.1;
    }

    let coverage = value_or(features, "test_coverage", 80.0);
    if coverage < 70.0 {
        score += 0.15;
    } else if coverage < 80.0 {
        score += 0.1;
    }

    if value_or(features, "error_rate", 0.01) > 0.05 {
        score += 0.2;
    }

    if value_or(features, "flaky_test_count", 0.0) > 5.0 {
        score += 0.15;
    }

    if value_or(features, "resource_utilization", 50.0) > 90.0
        || value_or(features, "memory_utilization", 60.0) > 90.0
    {
        score += 0.1;
    }

    score.clamp(0.0, MAX_HEURISTIC_PROBABILITY)
}

/// Confidence for a model-produced probability
pub fn model_confidence(features: &FeatureMap, probability: f64) -> f64 {
    let mut confidence = 0.8;
    if !(0.05..=0.95).contains(&probability) {
        confidence *= 0.8;
    }
    if value_or(features, "failure_rate_7d", 0.05) == 0.0 {
        confidence *= 0.7;
    }
    f64::min(1.0, confidence)
}
