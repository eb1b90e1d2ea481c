//! Pipeline metrics accepted by the failure predictor.
//!
//! Every section and field is optional on the wire. A missing field takes
//! the default the extractor documents, so `{}` is a valid request.
//! Malformed values are treated the same as missing ones: a `null` or
//! mistyped field keeps its default and a non-string timestamp is unparsable.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineMetrics {
    /// Durations of recent pipeline runs in seconds, oldest first
    #[serde(deserialize_with = "numbers_only")]
    pub duration_history: Vec<f64>,
    /// 1.0 for a failed run, 0.0 for a successful one, oldest first
    #[serde(deserialize_with = "numbers_only")]
    pub failure_history: Vec<f64>,
    #[serde(deserialize_with = "section_or_default")]
    pub code_metrics: CodeMetrics,
    #[serde(deserialize_with = "section_or_default")]
    pub test_metrics: TestMetrics,
    #[serde(deserialize_with = "section_or_default")]
    pub deployment_metrics: DeploymentMetrics,
    #[serde(deserialize_with = "section_or_default")]
    pub infrastructure_metrics: InfrastructureMetrics,
    #[serde(deserialize_with = "section_or_default")]
    pub environment_metrics: EnvironmentMetrics,
    #[serde(deserialize_with = "section_or_default")]
    pub dependency_metrics: DependencyMetrics,
}

/// Keep the numeric entries of a history array; anything else is empty.
fn numbers_only<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.iter().filter_map(Value::as_f64).collect(),
        _ => Vec::new(),
    })
}

/// Overlay each well-typed field of a section onto its default.
///
/// A field whose value does not deserialize is dropped and keeps the
/// default, so one bad value never rejects the request.
fn section_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Serialize + Default,
{
    let Value::Object(incoming) = Value::deserialize(deserializer)? else {
        return Ok(T::default());
    };
    let Ok(Value::Object(mut merged)) = serde_json::to_value(T::default()) else {
        return Ok(T::default());
    };

    for (key, value) in incoming {
        let previous = merged.insert(key.clone(), value);
        if serde_json::from_value::<T>(Value::Object(merged.clone())).is_err() {
            match previous {
                Some(previous) => merged.insert(key, previous),
                None => merged.remove(&key),
            };
        }
    }

    Ok(serde_json::from_value(Value::Object(merged)).unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeMetrics {
    pub lines_changed: f64,
    pub files_changed: f64,
    pub complexity_change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestMetrics {
    pub coverage_percentage: f64,
    pub test_count: f64,
    pub test_duration: f64,
    pub flaky_tests: f64,
}

impl Default for TestMetrics {
    fn default() -> Self {
        Self {
            coverage_percentage: 80.0,
            test_count: 0.0,
            test_duration: 0.0,
            flaky_tests: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentMetrics {
    pub deployments_per_day: f64,
    pub success_rate: f64,
}

impl Default for DeploymentMetrics {
    fn default() -> Self {
        Self {
            deployments_per_day: 1.0,
            success_rate: 0.95,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfrastructureMetrics {
    pub error_rate: f64,
    pub response_time_p95: f64,
    pub cpu_utilization: f64,
    pub memory_utilization: f64,
}

impl Default for InfrastructureMetrics {
    fn default() -> Self {
        Self {
            error_rate: 0.01,
            response_time_p95: 200.0,
            cpu_utilization: 50.0,
            memory_utilization: 60.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentMetrics {
    /// ISO-8601 time the pipeline is scheduled to run
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DependencyMetrics {
    pub total_dependencies: f64,
    pub outdated_count: f64,
    pub vulnerability_count: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_takes_defaults() {
        let metrics: PipelineMetrics = serde_json::from_str("{}").unwrap();
        assert_eq!(metrics, PipelineMetrics::default());
        assert_eq!(metrics.test_metrics.coverage_percentage, 80.0);
        assert_eq!(metrics.infrastructure_metrics.error_rate, 0.01);
    }

    #[test]
    fn test_malformed_fields_keep_defaults() {
        let metrics: PipelineMetrics = serde_json::from_str(
            r#"{
                "environment_metrics": {"timestamp": 1718474400},
                "test_metrics": {"coverage_percentage": null, "flaky_tests": 3},
                "code_metrics": "not a section",
                "infrastructure_metrics": null,
                "duration_history": [120, "fast", null, 95.5],
                "failure_history": 7
            }"#,
        )
        .unwrap();
        assert_eq!(metrics.environment_metrics.timestamp, None);
        assert_eq!(metrics.test_metrics.coverage_percentage, 80.0);
        assert_eq!(metrics.test_metrics.flaky_tests, 3.0);
        assert_eq!(metrics.code_metrics, CodeMetrics::default());
        assert_eq!(metrics.infrastructure_metrics, InfrastructureMetrics::default());
        assert_eq!(metrics.duration_history, vec![120.0, 95.5]);
        assert!(metrics.failure_history.is_empty());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let metrics: PipelineMetrics =
            serde_json::from_str(r#"{"test_metrics": {"flaky_tests": 4}}"#).unwrap();
        assert_eq!(metrics.test_metrics.flaky_tests, 4.0);
        assert_eq!(metrics.test_metrics.coverage_percentage, 80.0);
    }
}
