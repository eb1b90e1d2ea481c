use pipeline_ml::build::{
    BuildOptimizationRequest, BuildOptimizer, BuildRecord, BuildTrainingRecord,
    CodeChanges, ResourceConstraints,
};
use pipeline_ml::cache::{MemoryCache, NoOpCache};
use pipeline_ml::config::{model_config, PipelineMlConfig, BUILD_OPTIMIZER};
use pipeline_ml::errors::Error;
use pipeline_ml::model::{FallbackReason, PredictionSource};
use pretty_assertions::assert_eq;
use std::time::Duration;

fn request() -> BuildOptimizationRequest {
    BuildOptimizationRequest {
        dependencies: (0..10).map(|i| format!("crate-{i}==1.0.{i}")).collect(),
        code_changes: CodeChanges {
            lines_added: 150,
            lines_deleted: 50,
            files_changed: 8,
        },
        test_files: (0..30).map(|i| format!("tests/t{i}.rs")).collect(),
        historical_data: vec![
            BuildRecord {
                duration: 380.0,
                success: true,
            },
            BuildRecord {
                duration: 420.0,
                success: false,
            },
        ],
        ..BuildOptimizationRequest::new("checkout-service")
    }
}

fn optimizer(min_samples: usize) -> BuildOptimizer {
    BuildOptimizer::with_model_config(
        model_config(BUILD_OPTIMIZER).unwrap(),
        min_samples,
        Box::new(MemoryCache::new(Duration::from_secs(60))),
    )
}

#[test]
fn test_untrained_estimate_uses_heuristic() {
    let response = optimizer(1000).optimize_build(&request());

    // 120 + 10*5 + 200*0.1 + 30*2 + 400*0.3
    assert!((response.estimated_build_time - 370.0).abs() < 1e-9);
    assert_eq!(response.confidence_score, 0.6);
    assert_eq!(response.optimization_potential, 0.2);
    assert_eq!(response.project_name, "checkout-service");
    assert_eq!(response.model_version, "v0.0.0");
    assert_eq!(
        response.source,
        PredictionSource::heuristic(FallbackReason::Untrained)
    );
}

#[test]
fn test_repeated_request_is_served_from_cache() {
    let optimizer = optimizer(1000);
    let first = optimizer.optimize_build(&request());
    let second = optimizer.optimize_build(&request());
    // cached responses carry the original timestamp
    assert_eq!(first, second);

    optimizer.clear_cache();
    let third = optimizer.optimize_build(&request());
    assert_eq!(third.estimated_build_time, first.estimated_build_time);
}

#[test]
fn test_resource_constraints_cap_allocation() {
    let mut big = request();
    big.dependencies = (0..80).map(|i| format!("dep{i}")).collect();
    big.test_files = (0..200).map(|i| format!("t{i}")).collect();
    big.resource_constraints = Some(ResourceConstraints {
        max_cpu_cores: Some(2),
        max_memory_gb: None,
    });

    let optimizer = BuildOptimizer::with_model_config(
        model_config(BUILD_OPTIMIZER).unwrap(),
        1000,
        Box::new(NoOpCache),
    );
    let response = optimizer.optimize_build(&big);
    let allocation = &response.recommendations.resource_allocation;
    assert_eq!(allocation.cpu_cores, 2);
    assert!(allocation.constrained);
    assert!(response.recommendations.parallelization.test_sharding);
}

#[test]
fn test_insufficient_training_data() {
    let optimizer = optimizer(1000);
    let records = vec![
        BuildTrainingRecord {
            request: request(),
            duration: 300.0,
        };
        3
    ];
    assert!(matches!(
        optimizer.train(&records),
        Err(Error::InsufficientData { samples: 3, .. })
    ));
    assert!(!optimizer.is_trained());
}

fn history(n: usize) -> Vec<BuildTrainingRecord> {
    (0..n)
        .map(|i| {
            let deps = 5 + i % 20;
            let mut req = BuildOptimizationRequest::new(format!("svc-{i}"));
            req.dependencies = (0..deps).map(|d| format!("dep{d}")).collect();
            req.code_changes.lines_added = (i * 13 % 500) as u64;
            req.code_changes.files_changed = (1 + i % 9) as u64;
            let duration = 90.0 + deps as f64 * 12.0 + req.code_changes.lines_added as f64 * 0.2;
            BuildTrainingRecord {
                request: req,
                duration,
            }
        })
        .collect()
}

#[test]
fn test_training_replaces_heuristic_and_clears_cache() {
    let optimizer = optimizer(20);
    let before = optimizer.optimize_build(&request());
    assert!(!before.source.is_model());

    let metrics = optimizer.train(&history(50)).unwrap();
    assert_eq!(metrics["training_samples"], 50.0);
    assert!(metrics["mae"] >= 0.0);
    assert!(metrics.contains_key("r2_score"));

    let after = optimizer.optimize_build(&request());
    assert_eq!(after.source, PredictionSource::Model);
    assert!(after.estimated_build_time >= 30.0);
    assert!((0.0..=1.0).contains(&after.confidence_score));
    assert!(after.model_version.starts_with("v2"));
}

#[test]
fn test_service_built_from_config_has_working_cache() {
    let optimizer = BuildOptimizer::new(&PipelineMlConfig::default()).unwrap();
    let response = optimizer.optimize_batch(&[request(), request()]);
    assert_eq!(response.len(), 2);
    assert_eq!(response[0].estimated_build_time, response[1].estimated_build_time);
}

#[test]
fn test_concurrent_training_keeps_responses_consistent() {
    let optimizer = optimizer(20);
    let records = history(60);

    let responses = std::thread::scope(|scope| {
        let trainers: Vec<_> = (0..2)
            .map(|_| scope.spawn(|| optimizer.train(&records)))
            .collect();
        let reader = scope.spawn(|| {
            (0..200)
                .map(|_| optimizer.optimize_build(&request()))
                .collect::<Vec<_>>()
        });
        for trainer in trainers {
            trainer.join().unwrap().unwrap();
        }
        reader.join().unwrap()
    });

    for response in &responses {
        let untrained = response.source == PredictionSource::heuristic(FallbackReason::Untrained);
        assert_eq!(untrained, response.model_version == "v0.0.0", "{response:?}");
    }

    // nothing scored by the untrained model survives in the cache
    let after = optimizer.optimize_build(&request());
    assert_eq!(after.source, PredictionSource::Model);
    assert!(after.model_version.starts_with("v2"));
}
