use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pipeline-ml")]
#[command(about = "Build-time, failure and test-selection predictions for delivery pipelines", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to the nearest .pipeline-ml.toml)
    #[arg(long, global = true, env = "PIPELINE_ML_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelName {
    /// Build duration regressor
    BuildOptimizer,
    /// Pipeline failure classifier
    FailurePredictor,
    /// Test relevance classifier
    TestIntelligence,
}

impl ModelName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BuildOptimizer => crate::config::BUILD_OPTIMIZER,
            Self::FailurePredictor => crate::config::FAILURE_PREDICTOR,
            Self::TestIntelligence => crate::config::TEST_INTELLIGENCE,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Predict the failure probability of a pipeline run
    PredictFailure {
        /// JSON pipeline metrics, or - for stdin
        input: PathBuf,

        /// Treat the input as a JSON array and predict each element
        #[arg(long)]
        batch: bool,
    },

    /// Estimate build time and recommend optimizations
    OptimizeBuild {
        /// JSON build optimization request, or - for stdin
        input: PathBuf,

        /// Treat the input as a JSON array of requests
        #[arg(long)]
        batch: bool,
    },

    /// Choose which tests to run for a change set
    SelectTests {
        /// JSON test selection request, or - for stdin
        input: PathBuf,
    },

    /// Train a model from labelled records and print its metrics
    Train {
        #[arg(value_enum)]
        model: ModelName,

        /// JSON array of training records, or - for stdin
        input: PathBuf,
    },

    /// Report service health and model status
    Health,

    /// Initialize a pipeline-ml configuration file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_train() {
        let cli = Cli::try_parse_from(["pipeline-ml", "train", "failure-predictor", "data.json"]).unwrap();
        match cli.command {
            Commands::Train { model, input } => {
                assert_eq!(model, ModelName::FailurePredictor);
                assert_eq!(input, PathBuf::from("data.json"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_stdin_batch() {
        let cli = Cli::try_parse_from(["pipeline-ml", "predict-failure", "-", "--batch"]).unwrap();
        assert!(matches!(cli.command, Commands::PredictFailure { batch: true, .. }));
    }
}
