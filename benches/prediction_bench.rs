use criterion::{criterion_group, criterion_main, Criterion};
use pipeline_ml::build::{BuildOptimizationRequest, BuildOptimizer, BuildRecord};
use pipeline_ml::cache::NoOpCache;
use pipeline_ml::config::{model_config, BUILD_OPTIMIZER, FAILURE_PREDICTOR, TEST_INTELLIGENCE};
use pipeline_ml::failure::{FailurePredictor, PipelineMetrics};
use pipeline_ml::test_selection::{TestCandidate, TestSelectionRequest, TestSelector};
use std::hint::black_box;

fn pipeline_metrics(i: usize) -> PipelineMetrics {
    let mut metrics = PipelineMetrics {
        duration_history: (0..50).map(|d| 240.0 + ((d * 7 + i) % 60) as f64).collect(),
        failure_history: (0..50).map(|d| if (d + i) % 9 == 0 { 1.0 } else { 0.0 }).collect(),
        ..Default::default()
    };
    metrics.code_metrics.lines_changed = (i * 37 % 2000) as f64;
    metrics.test_metrics.flaky_tests = (i % 8) as f64;
    metrics
}

fn build_request(i: usize) -> BuildOptimizationRequest {
    let mut request = BuildOptimizationRequest::new(format!("service-{i}"));
    request.dependencies = (0..40).map(|d| format!("dep{d}=={i}.0")).collect();
    request.test_files = (0..120).map(|t| format!("tests/t{t}.rs")).collect();
    request.code_changes.lines_added = 300;
    request.historical_data = (0..30)
        .map(|h| BuildRecord {
            duration: 400.0 + h as f64,
            success: h % 10 != 0,
        })
        .collect();
    request
}

fn selection_request(n: usize) -> TestSelectionRequest {
    let changed: Vec<String> = (0..20).map(|f| format!("src/m{f}.rs")).collect();
    let tests = (0..n)
        .map(|t| TestCandidate {
            covered_files: vec![format!("src/m{}.rs", t % 40)],
            dependencies: vec!["src".to_string()],
            failure_rate: (t % 10) as f64 / 100.0,
            coverage_impact: 0.05,
            age_days: (t % 30) as f64,
            ..TestCandidate::new(format!("test_{t}"))
        })
        .collect();
    TestSelectionRequest {
        project_name: "bench".to_string(),
        commit_hash: None,
        changed_files: changed,
        tests,
        threshold: None,
    }
}

fn bench_failure_prediction(c: &mut Criterion) {
    let predictor = FailurePredictor::with_model_config(model_config(FAILURE_PREDICTOR).unwrap(), 1000);
    let single = pipeline_metrics(3);
    let batch: Vec<_> = (0..256).map(pipeline_metrics).collect();

    c.bench_function("predict_failure_single", |b| {
        b.iter(|| predictor.predict_failure(black_box(&single)))
    });
    c.bench_function("predict_failure_batch_256", |b| {
        b.iter(|| predictor.predict_batch(black_box(&batch)))
    });
}

fn bench_build_optimization(c: &mut Criterion) {
    let optimizer = BuildOptimizer::with_model_config(
        model_config(BUILD_OPTIMIZER).unwrap(),
        1000,
        Box::new(NoOpCache),
    );
    let request = build_request(1);
    c.bench_function("optimize_build_uncached", |b| {
        b.iter(|| optimizer.optimize_build(black_box(&request)))
    });
}

fn bench_test_selection(c: &mut Criterion) {
    let selector = TestSelector::with_model_config(model_config(TEST_INTELLIGENCE).unwrap(), 1000);
    let request = selection_request(2000);
    c.bench_function("select_tests_2000", |b| {
        b.iter(|| selector.select_tests(black_box(&request)))
    });
}

criterion_group!(
    benches,
    bench_failure_prediction,
    bench_build_optimization,
    bench_test_selection
);
criterion_main!(benches);
