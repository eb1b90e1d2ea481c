use crate::config::CONFIG_FILE_NAME;
use crate::io;
use anyhow::Result;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG: &str = r#"# pipeline-ml configuration

[service]
app_name = "Pipeline ML Services"
environment = "development"

[logging]
level = "info"
format = "plain"

[training]
min_training_samples = 1000
model_storage_path = "./models"

[cache]
enabled = true
ttl_secs = 3600

# Per-model overrides, e.g.
# [models.failure_predictor]
# epochs = 200
# learning_rate = 0.005
"#;

pub fn init_config(force: bool) -> Result<()> {
    init_config_in(Path::new("."), force).map(|path| {
        println!("Created {} configuration file", path.display());
    })
}

pub fn init_config_in(dir: &Path, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILE_NAME);

    if io::file_exists(&config_path) && !force {
        anyhow::bail!("Configuration file already exists. Use --force to overwrite.");
    }

    io::write_file(&config_path, DEFAULT_CONFIG)?;
    Ok(config_path)
}
