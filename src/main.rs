use anyhow::Result;
use clap::Parser;
use pipeline_ml::cli::{Cli, Commands};
use pipeline_ml::commands;
use pipeline_ml::config::{apply_env_overrides, load_config, load_config_from_path, PipelineMlConfig};
use pipeline_ml::observability::init_logging;
use pipeline_ml::service::ServiceManager;
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init { force } = cli.command {
        return commands::init_config(force);
    }

    let config = resolve_config(cli.config.as_deref())?;
    init_logging(&config.logging);
    let manager = ServiceManager::new(config)?;

    match cli.command {
        Commands::PredictFailure { input, batch } => {
            commands::predict_failure(&manager, &input, batch)
        }
        Commands::OptimizeBuild { input, batch } => {
            commands::optimize_build(&manager, &input, batch)
        }
        Commands::SelectTests { input } => commands::select_tests(&manager, &input),
        Commands::Train { model, input } => commands::train_model(&manager, model, &input),
        Commands::Health => commands::health(&manager),
        Commands::Init { .. } => Ok(()),
    }
}

fn resolve_config(explicit: Option<&Path>) -> Result<PipelineMlConfig> {
    match explicit {
        Some(path) => {
            let config = load_config_from_path(path)?;
            Ok(apply_env_overrides(config, |key| std::env::var(key).ok()))
        }
        None => Ok(load_config()),
    }
}
