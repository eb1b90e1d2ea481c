use super::request::BuildOptimizationRequest;
use crate::features::stats::{mean, variance};
use crate::features::FeatureMap;

const DEFAULT_BUILD_TIME: f64 = 300.0;
const DEFAULT_SUCCESS_RATE: f64 = 0.9;
/// Estimated on-disk size of one dependency, in MB
const MB_PER_DEPENDENCY: f64 = 10.0;
/// Historical records are assumed to span this many days
const HISTORY_DAYS: f64 = 30.0;

pub fn encode_environment(environment: &str) -> f64 {
    match environment.to_lowercase().as_str() {
        "staging" => 2.0,
        "production" => 3.0,
        _ => 1.0,
    }
}

/// Average lines per changed file, scaled to 0..=10
pub fn branch_complexity(lines_changed: f64, files_changed: f64) -> f64 {
    if files_changed == 0.0 {
        return 1.0;
    }
    f64::min(10.0, (lines_changed / files_changed) / 10.0)
}

pub fn extract_features(request: &BuildOptimizationRequest) -> FeatureMap {
    let mut f = FeatureMap::new();
    let deps = request.dependencies.len() as f64;
    let lines = request.code_changes.total_lines() as f64;
    let files = request.code_changes.files_changed as f64;

    f.insert("dependency_count".into(), deps);
    f.insert("code_change_size".into(), lines);
    f.insert("file_count".into(), files);
    f.insert("test_count".into(), request.test_files.len() as f64);

    let history = &request.historical_data;
    if history.is_empty() {
        f.insert("historical_build_time".into(), DEFAULT_BUILD_TIME);
        f.insert("build_time_variance".into(), 0.0);
        f.insert("build_success_rate".into(), DEFAULT_SUCCESS_RATE);
        f.insert("commit_frequency".into(), 1.0);
    } else {
        let durations: Vec<f64> = history.iter().map(|b| b.duration).collect();
        let successes = history.iter().filter(|b| b.success).count() as f64;
        f.insert("historical_build_time".into(), mean(&durations));
        f.insert("build_time_variance".into(), variance(&durations));
        f.insert("build_success_rate".into(), successes / history.len() as f64);
        f.insert("commit_frequency".into(), history.len() as f64 / HISTORY_DAYS);
    }

    f.insert("branch_complexity".into(), branch_complexity(lines, files));
    f.insert("package_size".into(), deps * MB_PER_DEPENDENCY);
    f.insert("dependency_update_frequency".into(), deps * 0.1);
    f.insert(
        "target_environment".into(),
        encode_environment(&request.target_environment),
    );
    f.insert(
        "parallel_jobs".into(),
        request.build_config.parallel_jobs as f64,
    );
    f
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::request::{BuildRecord, CodeChanges};

    #[test]
    fn test_defaults_for_bare_request() {
        let f = extract_features(&BuildOptimizationRequest::new("api"));
        assert_eq!(f.len(), 13);
        assert_eq!(f["historical_build_time"], 300.0);
        assert_eq!(f["build_success_rate"], 0.9);
        assert_eq!(f["branch_complexity"], 1.0);
        assert_eq!(f["commit_frequency"], 1.0);
        assert_eq!(f["target_environment"], 1.0);
        assert_eq!(f["parallel_jobs"], 1.0);
    }

    #[test]
    fn test_history_and_changes() {
        let mut request = BuildOptimizationRequest::new("api");
        request.dependencies = vec!["serde".into(), "tokio".into(), "clap".into()];
        request.code_changes = CodeChanges {
            lines_added: 150,
            lines_deleted: 50,
            files_changed: 4,
        };
        request.historical_data = vec![
            BuildRecord { duration: 100.0, success: true },
            BuildRecord { duration: 300.0, success: false },
        ];
        request.target_environment = "Production".into();

        let f = extract_features(&request);
        assert_eq!(f["code_change_size"], 200.0);
        assert_eq!(f["branch_complexity"], 5.0);
        assert_eq!(f["historical_build_time"], 200.0);
        assert_eq!(f["build_time_variance"], 10_000.0);
        assert_eq!(f["build_success_rate"], 0.5);
        assert_eq!(f["commit_frequency"], 2.0 / 30.0);
        assert_eq!(f["package_size"], 30.0);
        assert_eq!(f["target_environment"], 3.0);
    }

    #[test]
    fn test_branch_complexity_caps_at_ten() {
        assert_eq!(branch_complexity(5000.0, 2.0), 10.0);
        assert_eq!(branch_complexity(5000.0, 0.0), 1.0);
    }
}
