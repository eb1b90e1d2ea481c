use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::path::Path;

use crate::cli::ModelName;
use crate::io;
use crate::service::ServiceManager;

pub fn train_model(manager: &ServiceManager, model: ModelName, input: &Path) -> Result<()> {
    let records: Value = io::read_json(input)?;
    if !records.is_array() {
        anyhow::bail!("Training input must be a JSON array of records");
    }
    let samples = records.as_array().map_or(0, Vec::len);

    let metrics = manager
        .retrain(model.as_str(), records)
        .with_context(|| format!("Training {} failed", model.as_str()))?;

    io::write_json_stdout(&json!({
        "model": model.as_str(),
        "samples": samples,
        "metrics": metrics,
    }))
}

pub fn health(manager: &ServiceManager) -> Result<()> {
    io::write_json_stdout(&json!({
        "health": manager.health(),
        "models": manager.models_status(),
    }))
}
