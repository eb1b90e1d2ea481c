use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::features::FeatureMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSelectionRequest {
    pub project_name: String,
    #[serde(default)]
    pub commit_hash: Option<String>,
    #[serde(default)]
    pub changed_files: Vec<String>,
    #[serde(default)]
    pub tests: Vec<TestCandidate>,
    /// Overrides the relevance cutoff for this request
    #[serde(default)]
    pub threshold: Option<f64>,
}

/// A test the selector may run or skip, with its execution history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCandidate {
    pub name: String,
    /// Source files the test is known to exercise
    #[serde(default)]
    pub covered_files: Vec<String>,
    /// Paths or directory prefixes the test imports from
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Mean execution time in seconds
    #[serde(default = "default_execution_time")]
    pub execution_time: f64,
    /// Fraction of recent runs that failed
    #[serde(default)]
    pub failure_rate: f64,
    /// Share of total line coverage this test contributes, 0..=1
    #[serde(default)]
    pub coverage_impact: f64,
    /// Days since the test was added; unknown ages count as established
    #[serde(default = "default_age_days")]
    pub age_days: f64,
    /// Fraction of runs whose outcome flipped without a code change
    #[serde(default)]
    pub flakiness_score: f64,
}

fn default_execution_time() -> f64 {
    1.0
}

fn default_age_days() -> f64 {
    365.0
}

impl TestCandidate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            covered_files: Vec::new(),
            dependencies: Vec::new(),
            execution_time: default_execution_time(),
            failure_rate: 0.0,
            coverage_impact: 0.0,
            age_days: default_age_days(),
            flakiness_score: 0.0,
        }
    }
}

fn normalize(path: &str) -> &str {
    path.trim().trim_start_matches("./")
}

/// Fraction of changed files the test covers directly
pub fn file_change_overlap(test: &TestCandidate, changed: &[String]) -> f64 {
    if changed.is_empty() {
        return 0.0;
    }
    let covered: BTreeSet<&str> = test.covered_files.iter().map(|f| normalize(f)).collect();
    let hits = changed
        .iter()
        .filter(|f| covered.contains(normalize(f)))
        .count();
    hits as f64 / changed.len() as f64
}

/// Fraction of changed files under one of the test's dependency paths
pub fn dependency_impact(test: &TestCandidate, changed: &[String]) -> f64 {
    if changed.is_empty() || test.dependencies.is_empty() {
        return 0.0;
    }
    let hits = changed
        .iter()
        .filter(|f| {
            let f = normalize(f);
            test.dependencies.iter().any(|d| {
                let d = normalize(d).trim_end_matches('/');
                !d.is_empty()
                    && (f == d || f.strip_prefix(d).is_some_and(|rest| rest.starts_with('/')))
            })
        })
        .count();
    hits as f64 / changed.len() as f64
}

pub fn extract_features(test: &TestCandidate, changed: &[String]) -> FeatureMap {
    FeatureMap::from([
        ("file_change_overlap".to_string(), file_change_overlap(test, changed)),
        ("test_execution_time".to_string(), test.execution_time),
        ("test_failure_history".to_string(), test.failure_rate),
        ("code_coverage_impact".to_string(), test.coverage_impact),
        ("dependency_impact".to_string(), dependency_impact(test, changed)),
        ("test_age".to_string(), test.age_days),
        ("flakiness_score".to_string(), test.flakiness_score),
    ])
}
