use anyhow::Result;
use std::path::Path;

use crate::build::BuildOptimizationRequest;
use crate::failure::PipelineMetrics;
use crate::io;
use crate::service::ServiceManager;
use crate::test_selection::TestSelectionRequest;

pub fn predict_failure(manager: &ServiceManager, input: &Path, batch: bool) -> Result<()> {
    let predictor = manager.failure_predictor();
    if batch {
        let metrics: Vec<PipelineMetrics> = io::read_json(input)?;
        io::write_json_stdout(&predictor.predict_batch(&metrics))
    } else {
        let metrics: PipelineMetrics = io::read_json(input)?;
        io::write_json_stdout(&predictor.predict_failure(&metrics))
    }
}

pub fn optimize_build(manager: &ServiceManager, input: &Path, batch: bool) -> Result<()> {
    let optimizer = manager.build_optimizer();
    if batch {
        let requests: Vec<BuildOptimizationRequest> = io::read_json(input)?;
        io::write_json_stdout(&optimizer.optimize_batch(&requests))
    } else {
        let request: BuildOptimizationRequest = io::read_json(input)?;
        io::write_json_stdout(&optimizer.optimize_build(&request))
    }
}

pub fn select_tests(manager: &ServiceManager, input: &Path) -> Result<()> {
    let request: TestSelectionRequest = io::read_json(input)?;
    io::write_json_stdout(&manager.test_selector().select_tests(&request))
}
