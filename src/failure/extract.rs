use super::metrics::PipelineMetrics;
use crate::features::stats::{last_n, mean, std_dev, trend};
use crate::features::time::{encode_day_of_week, encode_time_of_day, is_weekend};
use crate::features::FeatureMap;

/// Failure rate is computed over this many most recent runs
pub const FAILURE_WINDOW: usize = 20;

const DEFAULT_DURATION_MEAN: f64 = 300.0;
const DEFAULT_DURATION_STD: f64 = 50.0;
const DEFAULT_FAILURE_RATE: f64 = 0.05;

/// Flatten pipeline metrics into the failure feature map.
///
/// Never fails: absent sections fall back to their defaults and an
/// unparsable timestamp encodes as 0.0 for all three time features.
pub fn extract_features(metrics: &PipelineMetrics) -> FeatureMap {
    let mut f = FeatureMap::new();
    let mut put = |key: &str, value: f64| {
        f.insert(key.to_string(), value);
    };

    let durations = &metrics.duration_history;
    if durations.is_empty() {
        put("pipeline_duration_mean", DEFAULT_DURATION_MEAN);
        put("pipeline_duration_std", DEFAULT_DURATION_STD);
        put("pipeline_duration_trend", 0.0);
    } else {
        put("pipeline_duration_mean", mean(durations));
        put("pipeline_duration_std", std_dev(durations));
        put("pipeline_duration_trend", trend(durations));
    }

    if metrics.failure_history.is_empty() {
        put("failure_rate_7d", DEFAULT_FAILURE_RATE);
        put("failure_trend", 0.0);
    } else {
        let recent = last_n(&metrics.failure_history, FAILURE_WINDOW);
        put("failure_rate_7d", mean(recent));
        put("failure_trend", trend(recent));
    }

    let code = &metrics.code_metrics;
    put("code_churn", code.lines_changed);
    put("files_changed", code.files_changed);
    put("complexity_delta", code.complexity_change);

    let tests = &metrics.test_metrics;
    put("test_coverage", tests.coverage_percentage);
    put("test_count", tests.test_count);
    put("test_duration", tests.test_duration);
    put("flaky_test_count", tests.flaky_tests);

    let deploy = &metrics.deployment_metrics;
    put("deployment_frequency", deploy.deployments_per_day);
    put("deployment_success_rate", deploy.success_rate);

    let infra = &metrics.infrastructure_metrics;
    put("error_rate", infra.error_rate);
    put("response_time_p95", infra.response_time_p95);
    put("resource_utilization", infra.cpu_utilization);
    put("memory_utilization", infra.memory_utilization);

    let timestamp = metrics.environment_metrics.timestamp.as_deref();
    put("time_of_day", encode_time_of_day(timestamp));
    put("day_of_week", encode_day_of_week(timestamp));
    put("is_weekend", is_weekend(timestamp));

    let deps = &metrics.dependency_metrics;
    put("dependency_count", deps.total_dependencies);
    put("outdated_dependencies", deps.outdated_count);
    put("security_vulnerabilities", deps.vulnerability_count);

    f
}
