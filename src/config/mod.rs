mod core;
mod loader;
pub mod models;

pub use self::core::{CacheSettings, LogFormat, LoggingConfig, PipelineMlConfig, ServiceSettings, TrainingSettings};

pub use self::loader::{
    apply_env_overrides, directory_ancestors, discover_config, load_config,
    load_config_from_path, parse_and_validate_config, CONFIG_FILE_NAME,
};

pub use self::models::{
    model_config, EstimatorKind, ModelConfig, TrainingOverrides, TrainingParams,
    BUILD_OPTIMIZER, FAILURE_PREDICTOR, TEST_INTELLIGENCE,
};
