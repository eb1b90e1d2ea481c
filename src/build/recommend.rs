//! Build optimization recommendations.
//!
//! Each recommender is a pure function of the request, its extracted
//! features and the estimated build time, so the set as a whole is
//! deterministic for a given input.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::request::{BuildOptimizationRequest, ResourceConstraints};
use crate::features::{value_or, FeatureMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRecommendations {
    pub cache_strategy: CacheStrategy,
    pub resource_allocation: ResourceAllocation,
    pub parallelization: Parallelization,
    pub dependency_optimizations: Vec<DependencyOptimization>,
    pub build_optimizations: Vec<BuildStepOptimization>,
}

pub fn recommend(
    request: &BuildOptimizationRequest,
    features: &FeatureMap,
    estimated_build_time: f64,
) -> BuildRecommendations {
    let resource_allocation = recommend_resource_allocation(
        features,
        estimated_build_time,
        request.resource_constraints.as_ref(),
    );
    let parallelization = recommend_parallelization(features, resource_allocation.cpu_cores);
    BuildRecommendations {
        cache_strategy: recommend_cache_strategy(features),
        resource_allocation,
        parallelization,
        dependency_optimizations: recommend_dependency_optimizations(&request.dependencies),
        build_optimizations: recommend_build_optimizations(features),
    }
}

// ---------------------------------------------------------------------------
// Caching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheLayer {
    #[serde(rename = "type")]
    pub kind: String,
    pub priority: Priority,
    pub estimated_savings: String,
    pub cache_key_strategy: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStrategy {
    pub enable_dependency_cache: bool,
    pub enable_build_cache: bool,
    pub enable_test_cache: bool,
    pub cache_layers: Vec<CacheLayer>,
}

fn layer(kind: &str, priority: Priority, savings: &str, key_strategy: &str) -> CacheLayer {
    CacheLayer {
        kind: kind.to_string(),
        priority,
        estimated_savings: savings.to_string(),
        cache_key_strategy: key_strategy.to_string(),
    }
}

pub fn recommend_cache_strategy(features: &FeatureMap) -> CacheStrategy {
    let mut cache_layers = Vec::new();
    if value_or(features, "dependency_count", 0.0) > 10.0 {
        cache_layers.push(layer("dependency", Priority::High, "30-50%", "hash_package_lock"));
    }
    if value_or(features, "code_change_size", 0.0) < 100.0 {
        cache_layers.push(layer("build_artifacts", Priority::Medium, "20-40%", "content_hash"));
    }
    if value_or(features, "test_count", 0.0) > 50.0 {
        cache_layers.push(layer("test_results", Priority::Medium, "15-30%", "test_file_hash"));
    }
    CacheStrategy {
        enable_dependency_cache: true,
        enable_build_cache: true,
        enable_test_cache: true,
        cache_layers,
    }
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAllocation {
    pub cpu_cores: u32,
    pub memory_gb: u32,
    pub disk_gb: u32,
    pub estimated_cost_per_build: f64,
    /// True when a resource constraint lowered the recommendation
    pub constrained: bool,
}

pub fn recommend_resource_allocation(
    features: &FeatureMap,
    estimated_build_time: f64,
    constraints: Option<&ResourceConstraints>,
) -> ResourceAllocation {
    let deps = value_or(features, "dependency_count", 0.0);
    let package_size = value_or(features, "package_size", 0.0);

    let mut cpu_cores = if estimated_build_time > 600.0 {
        ((deps / 10.0) as u32).clamp(2, 8)
    } else {
        2
    };
    let mut memory_gb = if package_size > 1000.0 {
        ((package_size / 500.0) as u32).clamp(4, 16)
    } else {
        2
    };
    let disk_gb = u32::max(20, (package_size / 100.0) as u32);

    let mut constrained = false;
    if let Some(limits) = constraints {
        if let Some(max_cpu) = limits.max_cpu_cores.filter(|&m| m > 0 && m < cpu_cores) {
            cpu_cores = max_cpu;
            constrained = true;
        }
        if let Some(max_mem) = limits.max_memory_gb.filter(|&m| m > 0 && m < memory_gb) {
            memory_gb = max_mem;
            constrained = true;
        }
    }

    ResourceAllocation {
        cpu_cores,
        memory_gb,
        disk_gb,
        estimated_cost_per_build: cpu_cores as f64 * 0.1 + memory_gb as f64 * 0.05,
        constrained,
    }
}

// ---------------------------------------------------------------------------
// Parallelism
// ---------------------------------------------------------------------------

/// Tests per shard when sharding is recommended
const TESTS_PER_SHARD: u32 = 50;
const MAX_SHARDS: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parallelization {
    pub current_jobs: u32,
    pub recommended_jobs: u32,
    pub test_sharding: bool,
    pub shard_count: u32,
}

pub fn recommend_parallelization(features: &FeatureMap, cpu_cores: u32) -> Parallelization {
    let tests = value_or(features, "test_count", 0.0) as u32;
    let files = value_or(features, "file_count", 0.0);

    let mut jobs = match tests {
        t if t > 100 => 4,
        t if t > 20 => 2,
        _ => 1,
    };
    if files > 50.0 {
        jobs += 1;
    }
    let recommended_jobs = jobs.min(cpu_cores.max(1));

    let test_sharding = tests > TESTS_PER_SHARD;
    let shard_count = if test_sharding {
        tests.div_ceil(TESTS_PER_SHARD).min(MAX_SHARDS)
    } else {
        1
    };

    Parallelization {
        current_jobs: value_or(features, "parallel_jobs", 1.0) as u32,
        recommended_jobs,
        test_sharding,
        shard_count,
    }
}

// ---------------------------------------------------------------------------
// Dependencies
// ---------------------------------------------------------------------------

/// Dependency lists longer than this get a pruning suggestion
const LARGE_DEPENDENCY_SET: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyIssue {
    Duplicate,
    Unpinned,
    Prune,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyOptimization {
    pub issue: DependencyIssue,
    pub dependency: Option<String>,
    pub suggestion: String,
}

const VERSION_SEPARATORS: &[char] = &['=', '>', '<', '~', '^', ':', ' '];

/// Split a declaration into its name and whether it carries a version.
///
/// A leading `@` is an npm scope, not a version separator.
fn parse_dependency(spec: &str) -> (String, bool) {
    let spec = spec.trim();
    let (scope, rest) = match spec.strip_prefix('@') {
        Some(rest) => ("@", rest),
        None => ("", spec),
    };
    let cut = rest
        .find(|c: char| c == '@' || VERSION_SEPARATORS.contains(&c))
        .unwrap_or(rest.len());
    let name = format!("{scope}{}", &rest[..cut]).to_lowercase();
    let versioned = !rest[cut..]
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .is_empty();
    (name, versioned)
}

pub fn recommend_dependency_optimizations(dependencies: &[String]) -> Vec<DependencyOptimization> {
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    let mut out = Vec::new();

    for spec in dependencies {
        let (name, versioned) = parse_dependency(spec);
        if name.is_empty() {
            continue;
        }
        let count = seen.entry(name.clone()).or_insert(0);
        *count += 1;
        if *count == 2 {
            out.push(DependencyOptimization {
                issue: DependencyIssue::Duplicate,
                dependency: Some(name.clone()),
                suggestion: format!("Declare {name} once to avoid resolving it twice"),
            });
        }
        if !versioned && *count == 1 {
            out.push(DependencyOptimization {
                issue: DependencyIssue::Unpinned,
                dependency: Some(name.clone()),
                suggestion: format!("Pin {name} to a version so dependency caches stay valid"),
            });
        }
    }

    if dependencies.len() > LARGE_DEPENDENCY_SET {
        out.push(DependencyOptimization {
            issue: DependencyIssue::Prune,
            dependency: None,
            suggestion: format!(
                "Audit the {} declared dependencies and remove unused ones",
                dependencies.len()
            ),
        });
    }
    out
}

// ---------------------------------------------------------------------------
// Build steps
// ---------------------------------------------------------------------------

/// Change sets below this many lines qualify for incremental builds
const SMALL_CHANGE_LINES: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStepOptimization {
    pub optimization: String,
    pub priority: Priority,
    pub description: String,
}

fn step(optimization: &str, priority: Priority, description: String) -> BuildStepOptimization {
    BuildStepOptimization {
        optimization: optimization.to_string(),
        priority,
        description,
    }
}

pub fn recommend_build_optimizations(features: &FeatureMap) -> Vec<BuildStepOptimization> {
    let mut out = Vec::new();
    let change_size = value_or(features, "code_change_size", 0.0);
    let success_rate = value_or(features, "build_success_rate", 0.9);
    let mean_time = value_or(features, "historical_build_time", 300.0);
    let std_dev = value_or(features, "build_time_variance", 0.0).sqrt();

    if change_size < SMALL_CHANGE_LINES {
        out.push(step(
            "incremental_build",
            Priority::Medium,
            format!("Only {change_size} lines changed; reuse previous build outputs"),
        ));
    }
    if success_rate < 0.8 {
        out.push(step(
            "retry_flaky_steps",
            Priority::High,
            format!(
                "Success rate is {:.0}%; retry steps that fail intermittently",
                success_rate * 100.0
            ),
        ));
    }
    if mean_time > 900.0 {
        out.push(step(
            "split_pipeline",
            Priority::High,
            format!("Builds average {mean_time:.0}s; split into independent stages"),
        ));
    }
    if mean_time > 0.0 && std_dev > 0.25 * mean_time {
        out.push(step(
            "stabilize_build_time",
            Priority::Low,
            format!("Build time varies by {std_dev:.0}s around a {mean_time:.0}s mean"),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn features(pairs: &[(&str, f64)]) -> FeatureMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_cache_layers() {
        let strategy = recommend_cache_strategy(&features(&[
            ("dependency_count", 11.0),
            ("code_change_size", 500.0),
            ("test_count", 51.0),
        ]));
        let kinds: Vec<&str> = strategy.cache_layers.iter().map(|l| l.kind.as_str()).collect();
        assert_eq!(kinds, vec!["dependency", "test_results"]);
        assert_eq!(strategy.cache_layers[0].cache_key_strategy, "hash_package_lock");
        assert!(strategy.enable_test_cache);
    }

    #[test]
    fn test_resource_allocation_small_build() {
        let alloc = recommend_resource_allocation(&features(&[("package_size", 100.0)]), 300.0, None);
        assert_eq!(alloc.cpu_cores, 2);
        assert_eq!(alloc.memory_gb, 2);
        assert_eq!(alloc.disk_gb, 20);
        assert!((alloc.estimated_cost_per_build - 0.3).abs() < 1e-12);
        assert!(!alloc.constrained);
    }

    #[test]
    fn test_resource_allocation_large_build_with_caps() {
        let f = features(&[("dependency_count", 120.0), ("package_size", 9000.0)]);
        let alloc = recommend_resource_allocation(&f, 1200.0, None);
        assert_eq!(alloc.cpu_cores, 8);
        assert_eq!(alloc.memory_gb, 16);
        assert_eq!(alloc.disk_gb, 90);

        let limits = ResourceConstraints {
            max_cpu_cores: Some(4),
            max_memory_gb: Some(32),
        };
        let capped = recommend_resource_allocation(&f, 1200.0, Some(&limits));
        assert_eq!(capped.cpu_cores, 4);
        assert_eq!(capped.memory_gb, 16);
        assert!(capped.constrained);
    }

    #[test]
    fn test_parallelization() {
        let p = recommend_parallelization(&features(&[("test_count", 120.0), ("file_count", 60.0)]), 8);
        assert_eq!(p.recommended_jobs, 5);
        assert!(p.test_sharding);
        assert_eq!(p.shard_count, 3);

        let capped = recommend_parallelization(&features(&[("test_count", 120.0)]), 2);
        assert_eq!(capped.recommended_jobs, 2);

        let small = recommend_parallelization(&features(&[("test_count", 5.0)]), 2);
        assert_eq!(small.recommended_jobs, 1);
        assert!(!small.test_sharding);
        assert_eq!(small.shard_count, 1);
        assert_eq!(small.current_jobs, 1);
    }

    #[test]
    fn test_dependency_parsing() {
        assert_eq!(parse_dependency("serde@1.0"), ("serde".to_string(), true));
        assert_eq!(parse_dependency("requests==2.31"), ("requests".to_string(), true));
        assert_eq!(parse_dependency("@types/node"), ("@types/node".to_string(), false));
        assert_eq!(parse_dependency("@types/node@20"), ("@types/node".to_string(), true));
        assert_eq!(parse_dependency("lodash"), ("lodash".to_string(), false));
        assert_eq!(parse_dependency("lodash@"), ("lodash".to_string(), false));
    }

    #[test]
    fn test_dependency_optimizations() {
        let deps = strings(&["serde@1.0", "lodash", "Serde@1.0.2"]);
        let issues: Vec<(DependencyIssue, Option<String>)> = recommend_dependency_optimizations(&deps)
            .into_iter()
            .map(|o| (o.issue, o.dependency))
            .collect();
        assert_eq!(
            issues,
            vec![
                (DependencyIssue::Unpinned, Some("lodash".to_string())),
                (DependencyIssue::Duplicate, Some("serde".to_string())),
            ]
        );
    }

    #[test]
    fn test_large_dependency_set_gets_prune_suggestion() {
        let deps: Vec<String> = (0..51).map(|i| format!("dep{i}@1")).collect();
        let out = recommend_dependency_optimizations(&deps);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].issue, DependencyIssue::Prune);
        assert_eq!(out[0].dependency, None);
    }

    #[test]
    fn test_build_step_optimizations() {
        let steps = recommend_build_optimizations(&features(&[
            ("code_change_size", 40.0),
            ("build_success_rate", 0.7),
            ("historical_build_time", 1000.0),
            ("build_time_variance", 90_000.0),
        ]));
        let names: Vec<&str> = steps.iter().map(|s| s.optimization.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "incremental_build",
                "retry_flaky_steps",
                "split_pipeline",
                "stabilize_build_time"
            ]
        );
        assert_eq!(steps[1].description, "Success rate is 70%; retry steps that fail intermittently");
    }

    #[test]
    fn test_steady_healthy_build_needs_nothing() {
        let steps = recommend_build_optimizations(&features(&[
            ("code_change_size", 400.0),
            ("build_success_rate", 0.95),
            ("historical_build_time", 300.0),
            ("build_time_variance", 100.0),
        ]));
        assert!(steps.is_empty());
    }
}
