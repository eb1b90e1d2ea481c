use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::models::TrainingOverrides;

/// Root configuration structure for pipeline-ml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineMlConfig {
    /// Service identity
    #[serde(default)]
    pub service: ServiceSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Training orchestration settings shared by all models
    #[serde(default)]
    pub training: TrainingSettings,

    /// Build optimization result cache
    #[serde(default)]
    pub cache: CacheSettings,

    /// Per-model training overrides, keyed by model name
    #[serde(default)]
    pub models: BTreeMap<String, TrainingOverrides>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    #[serde(default = "default_app_name")]
    pub app_name: String,

    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            environment: default_environment(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when neither `PIPELINE_ML_LOG` nor `RUST_LOG` is set
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSettings {
    /// Training runs with fewer samples fail with `InsufficientData`
    #[serde(default = "default_min_training_samples")]
    pub min_training_samples: usize,

    /// Root directory for per-model artifacts
    #[serde(default = "default_model_storage_path")]
    pub model_storage_path: PathBuf,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            min_training_samples: default_min_training_samples(),
            model_storage_path: default_model_storage_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

fn default_app_name() -> String {
    "Pipeline ML Services".to_string()
}
fn default_environment() -> String {
    "development".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_min_training_samples() -> usize {
    1000
}
fn default_model_storage_path() -> PathBuf {
    PathBuf::from("./models")
}
fn default_cache_enabled() -> bool {
    true
}
fn default_cache_ttl() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineMlConfig::default();
        assert_eq!(config.service.app_name, "Pipeline ML Services");
        assert_eq!(config.service.environment, "development");
        assert_eq!(config.training.min_training_samples, 1000);
        assert_eq!(config.training.model_storage_path, PathBuf::from("./models"));
        assert_eq!(config.cache.ttl_secs, 3600);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Plain);
        assert!(config.models.is_empty());
    }

    #[test]
    fn test_partial_toml_keeps_field_defaults() {
        let config: PipelineMlConfig = toml::from_str(
            r#"
[training]
min_training_samples = 50

[logging]
format = "json"
"#,
        )
        .unwrap();
        assert_eq!(config.training.min_training_samples, 50);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
    }
}
