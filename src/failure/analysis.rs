//! Risk factors and recommendations derived from a failure prediction.

use serde::{Deserialize, Serialize};

use super::heuristic::RiskLevel;
use crate::features::{value_or, FeatureMap};

pub const MAX_RECOMMENDATIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

pub type Priority = Severity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub factor: String,
    pub severity: Severity,
    pub value: f64,
    pub description: String,
    pub impact: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationType {
    Immediate,
    Process,
    Quality,
    Security,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationType,
    pub priority: Priority,
    pub action: String,
    pub reason: String,
}

#[derive(Clone, Copy)]
enum Trigger {
    Above(f64),
    Below(f64),
}

impl Trigger {
    fn fires(self, value: f64) -> bool {
        match self {
            Self::Above(limit) => value > limit,
            Self::Below(limit) => value < limit,
        }
    }
}

struct FactorRule {
    factor: &'static str,
    feature: &'static str,
    default: f64,
    trigger: Trigger,
    severity: Severity,
    description: &'static str,
    impact: f64,
}

const FACTOR_RULES: &[FactorRule] = &[
    FactorRule {
        factor: "high_failure_rate",
        feature: "failure_rate_7d",
        default: 0.0,
        trigger: Trigger::Above(0.2),
        severity: Severity::High,
        description: "Recent builds have high failure rate",
        impact: 0.3,
    },
    FactorRule {
        factor: "large_code_changes",
        feature: "code_churn",
        default: 0.0,
        trigger: Trigger::Above(1000.0),
        severity: Severity::Medium,
        description: "Large number of code changes increases risk",
        impact: 0.2,
    },
    FactorRule {
        factor: "low_test_coverage",
        feature: "test_coverage",
        default: 80.0,
        trigger: Trigger::Below(70.0),
        severity: Severity::High,
        description: "Test coverage below recommended threshold",
        impact: 0.25,
    },
    FactorRule {
        factor: "high_error_rate",
        feature: "error_rate",
        default: 0.01,
        trigger: Trigger::Above(0.05),
        severity: Severity::High,
        description: "Application error rate is elevated",
        impact: 0.3,
    },
    FactorRule {
        factor: "flaky_tests",
        feature: "flaky_test_count",
        default: 0.0,
        trigger: Trigger::Above(3.0),
        severity: Severity::Medium,
        description: "Multiple flaky tests detected",
        impact: 0.15,
    },
    FactorRule {
        factor: "security_vulnerabilities",
        feature: "security_vulnerabilities",
        default: 0.0,
        trigger: Trigger::Above(0.0),
        severity: Severity::High,
        description: "Security vulnerabilities in dependencies",
        impact: 0.2,
    },
];

/// Triggered risk factors, highest impact first.
///
/// Equal impacts keep rule order (the sort is stable).
pub fn analyze_risk_factors(features: &FeatureMap) -> Vec<RiskFactor> {
    let mut factors: Vec<RiskFactor> = FACTOR_RULES
        .iter()
        .filter_map(|rule| {
            let value = value_or(features, rule.feature, rule.default);
            rule.trigger.fires(value).then(|| RiskFactor {
                factor: rule.factor.to_string(),
                severity: rule.severity,
                value,
                description: rule.description.to_string(),
                impact: rule.impact,
            })
        })
        .collect();

    factors.sort_by(|a, b| b.impact.total_cmp(&a.impact));
    factors
}

fn recommendation(
    kind: RecommendationType,
    priority: Priority,
    action: &str,
    reason: String,
) -> Recommendation {
    Recommendation {
        kind,
        priority,
        action: action.to_string(),
        reason,
    }
}

/// Recommendation for a risk factor; factors without one map to `None`
fn factor_recommendation(factor: &RiskFactor) -> Option<Recommendation> {
    let rec = match factor.factor.as_str() {
        "high_failure_rate" => recommendation(
            RecommendationType::Process,
            Priority::High,
            "Review recent failures and implement fixes",
            "Failure rate trending upward".to_string(),
        ),
        "low_test_coverage" => recommendation(
            RecommendationType::Quality,
            Priority::Medium,
            "Increase test coverage before proceeding",
            format!("Coverage at {:.1}%, target >80%", factor.value),
        ),
        "flaky_tests" => recommendation(
            RecommendationType::Quality,
            Priority::Medium,
            "Fix or quarantine flaky tests",
            format!("{} flaky tests detected", factor.value),
        ),
        "security_vulnerabilities" => recommendation(
            RecommendationType::Security,
            Priority::High,
            "Address security vulnerabilities",
            format!("{} vulnerabilities found", factor.value),
        ),
        _ => return None,
    };
    Some(rec)
}

/// Ordered, capped recommendation list for one prediction
pub fn generate_recommendations(
    features: &FeatureMap,
    probability: f64,
    risk_level: RiskLevel,
    risk_factors: &[RiskFactor],
) -> Vec<Recommendation> {
    let mut recs = Vec::new();

    if risk_level.needs_review() {
        recs.push(recommendation(
            RecommendationType::Immediate,
            Priority::High,
            "Consider manual review before deployment",
            format!("High failure probability ({:.2}%)", probability * 100.0),
        ));
    }

    recs.extend(risk_factors.iter().filter_map(factor_recommendation));

    if value_or(features, "deployment_frequency", 1.0) < 0.5 {
        recs.push(recommendation(
            RecommendationType::Process,
            Priority::Low,
            "Consider increasing deployment frequency",
            "More frequent deployments reduce risk".to_string(),
        ));
    }

    recs.truncate(MAX_RECOMMENDATIONS);
    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn features(pairs: &[(&str, f64)]) -> FeatureMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_no_factors_for_defaults() {
        assert!(analyze_risk_factors(&FeatureMap::new()).is_empty());
    }

    #[test]
    fn test_factors_sorted_by_impact_stable() {
        let f = features(&[
            ("failure_rate_7d", 0.25),
            ("code_churn", 1200.0),
            ("test_coverage", 65.0),
            ("error_rate", 0.06),
            ("flaky_test_count", 6.0),
            ("security_vulnerabilities", 2.0),
        ]);
        let names: Vec<String> = analyze_risk_factors(&f).into_iter().map(|r| r.factor).collect();
        assert_eq!(
            names,
            vec![
                "high_failure_rate",
                "high_error_rate",
                "low_test_coverage",
                "large_code_changes",
                "security_vulnerabilities",
                "flaky_tests",
            ]
        );
    }

    #[test]
    fn test_recommendation_texts() {
        let f = features(&[("test_coverage", 65.0), ("flaky_test_count", 6.0)]);
        let factors = analyze_risk_factors(&f);
        let recs = generate_recommendations(&f, 0.3456, RiskLevel::High, &factors);

        assert_eq!(recs[0].action, "Consider manual review before deployment");
        assert_eq!(recs[0].reason, "High failure probability (34.56%)");
        assert_eq!(recs[0].kind, RecommendationType::Immediate);
        assert_eq!(recs[1].reason, "Coverage at 65.0%, target >80%");
        assert_eq!(recs[2].reason, "6 flaky tests detected");
        assert_eq!(recs.len(), 3);
    }

    #[test]
    fn test_unmapped_factors_are_skipped() {
        let f = features(&[("code_churn", 2000.0), ("error_rate", 0.2)]);
        let factors = analyze_risk_factors(&f);
        assert_eq!(factors.len(), 2);
        let recs = generate_recommendations(&f, 0.05, RiskLevel::Low, &factors);
        assert!(recs.is_empty());
    }

    #[test]
    fn test_capped_at_five() {
        let f = features(&[
            ("failure_rate_7d", 0.5),
            ("test_coverage", 50.0),
            ("flaky_test_count", 9.0),
            ("security_vulnerabilities", 3.0),
            ("deployment_frequency", 0.1),
        ]);
        let factors = analyze_risk_factors(&f);
        let recs = generate_recommendations(&f, 0.9, RiskLevel::Critical, &factors);
        assert_eq!(recs.len(), MAX_RECOMMENDATIONS);
        assert!(recs
            .iter()
            .all(|r| r.action != "Consider increasing deployment frequency"));
    }

    #[test]
    fn test_low_deployment_frequency() {
        let f = features(&[("deployment_frequency", 0.2)]);
        let recs = generate_recommendations(&f, 0.02, RiskLevel::Low, &[]);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].priority, Priority::Low);
        assert_eq!(recs[0].reason, "More frequent deployments reduce risk");
    }
}
