use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::core::{LogFormat, PipelineMlConfig};
use super::models::{model_config, ModelConfig};
use crate::errors::{Error, Result};

pub const CONFIG_FILE_NAME: &str = ".pipeline-ml.toml";

const MAX_TRAVERSAL_DEPTH: usize = 10;

/// Read config file contents
pub(crate) fn read_config_file(path: &Path) -> std::result::Result<String, std::io::Error> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut contents = String::new();
    reader.read_to_string(&mut contents)?;
    Ok(contents)
}

/// Parse and validate config from a TOML string
pub fn parse_and_validate_config(contents: &str) -> Result<PipelineMlConfig> {
    let config = toml::from_str::<PipelineMlConfig>(contents)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &PipelineMlConfig) -> Result<()> {
    if config.training.min_training_samples == 0 {
        return Err(Error::Configuration(
            "training.min_training_samples must be at least 1".to_string(),
        ));
    }
    for (name, overrides) in &config.models {
        model_config(name)?;
        if let Some(split) = overrides.validation_split {
            if !(split > 0.0 && split < 1.0) {
                return Err(Error::Configuration(format!(
                    "models.{name}.validation_split must be in (0, 1), got {split}"
                )));
            }
        }
    }
    Ok(())
}

/// Load configuration from an explicit path; a missing or invalid file is an error
pub fn load_config_from_path(path: &Path) -> Result<PipelineMlConfig> {
    let contents = read_config_file(path)
        .map_err(|e| Error::file_system("Failed to read config file", path, e))?;
    let config = parse_and_validate_config(&contents)?;
    tracing::debug!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Try loading config from a specific path, logging and skipping failures
pub(crate) fn try_load_config_from_path(config_path: &Path) -> Option<PipelineMlConfig> {
    let contents = match read_config_file(config_path) {
        Ok(contents) => contents,
        Err(e) => {
            handle_read_error(config_path, &e);
            return None;
        }
    };

    match parse_and_validate_config(&contents) {
        Ok(config) => {
            tracing::debug!(path = %config_path.display(), "Loaded config");
            Some(config)
        }
        Err(e) => {
            tracing::warn!(path = %config_path.display(), error = %e, "Invalid config, using defaults");
            None
        }
    }
}

/// Handle file read errors with appropriate logging
pub(crate) fn handle_read_error(config_path: &Path, error: &std::io::Error) {
    // Only log actual errors, not "file not found"
    if error.kind() != std::io::ErrorKind::NotFound {
        tracing::warn!(
            path = %config_path.display(),
            error = %error,
            "Failed to read config file"
        );
    }
}

/// Generate directory ancestors up to a depth limit
pub fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        if parent.pop() {
            Some(parent)
        } else {
            None
        }
    })
    .take(max_depth)
}

/// Find `.pipeline-ml.toml` in `start` or its ancestors
pub fn discover_config(start: PathBuf) -> PipelineMlConfig {
    directory_ancestors(start, MAX_TRAVERSAL_DEPTH)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find_map(|path| try_load_config_from_path(&path))
        .unwrap_or_else(|| {
            tracing::debug!(
                depth = MAX_TRAVERSAL_DEPTH,
                "No config found, using default config"
            );
            PipelineMlConfig::default()
        })
}

/// Load configuration from the current directory hierarchy, then apply
/// `PIPELINE_ML_*` environment overrides.
pub fn load_config() -> PipelineMlConfig {
    let config = match std::env::current_dir() {
        Ok(dir) => discover_config(dir),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to get current directory, using default config");
            PipelineMlConfig::default()
        }
    };
    apply_env_overrides(config, |key| std::env::var(key).ok())
}

/// Apply environment overrides using `lookup` as the variable source.
///
/// Unparsable values are logged and ignored.
pub fn apply_env_overrides<F>(mut config: PipelineMlConfig, lookup: F) -> PipelineMlConfig
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup("PIPELINE_ML_MIN_TRAINING_SAMPLES") {
        match raw.parse::<usize>() {
            Ok(n) if n > 0 => config.training.min_training_samples = n,
            _ => tracing::warn!(value = %raw, "Ignoring invalid PIPELINE_ML_MIN_TRAINING_SAMPLES"),
        }
    }
    if let Some(raw) = lookup("PIPELINE_ML_MODEL_STORAGE_PATH") {
        config.training.model_storage_path = PathBuf::from(raw);
    }
    if let Some(raw) = lookup("PIPELINE_ML_CACHE_TTL") {
        match raw.parse::<u64>() {
            Ok(ttl) => config.cache.ttl_secs = ttl,
            Err(_) => tracing::warn!(value = %raw, "Ignoring invalid PIPELINE_ML_CACHE_TTL"),
        }
    }
    if let Some(raw) = lookup("PIPELINE_ML_LOG_LEVEL") {
        config.logging.level = raw.to_lowercase();
    }
    if let Some(raw) = lookup("PIPELINE_ML_LOG_FORMAT") {
        match raw.to_lowercase().as_str() {
            "json" => config.logging.format = LogFormat::Json,
            "plain" => config.logging.format = LogFormat::Plain,
            _ => tracing::warn!(value = %raw, "Ignoring invalid PIPELINE_ML_LOG_FORMAT"),
        }
    }
    if let Some(raw) = lookup("PIPELINE_ML_ENVIRONMENT") {
        config.service.environment = raw;
    }
    config
}

impl PipelineMlConfig {
    /// Static model configuration with any `[models.<name>]` overrides applied
    pub fn model_config(&self, name: &str) -> Result<ModelConfig> {
        let mut config = model_config(name)?;
        if let Some(overrides) = self.models.get(name) {
            config.training = config.training.with_overrides(overrides);
        }
        Ok(config)
    }
}
