use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildOptimizationRequest {
    pub project_name: String,
    /// Declared dependencies, optionally with a version (`serde@1.0`, `requests==2.31`)
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub code_changes: CodeChanges,
    #[serde(default)]
    pub test_files: Vec<String>,
    #[serde(default)]
    pub historical_data: Vec<BuildRecord>,
    #[serde(default)]
    pub resource_constraints: Option<ResourceConstraints>,
    #[serde(default = "default_target_environment")]
    pub target_environment: String,
    #[serde(default)]
    pub build_config: BuildConfig,
}

impl BuildOptimizationRequest {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            dependencies: Vec::new(),
            code_changes: CodeChanges::default(),
            test_files: Vec::new(),
            historical_data: Vec::new(),
            resource_constraints: None,
            target_environment: default_target_environment(),
            build_config: BuildConfig::default(),
        }
    }
}

fn default_target_environment() -> String {
    "development".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeChanges {
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub files_changed: u64,
}

impl CodeChanges {
    pub fn total_lines(&self) -> u64 {
        self.lines_added + self.lines_deleted
    }
}

/// A past build of the same project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord {
    /// Wall-clock duration in seconds
    pub duration: f64,
    #[serde(default = "default_success")]
    pub success: bool,
}

fn default_success() -> bool {
    true
}

/// Upper limits the recommended allocation must respect
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConstraints {
    pub max_cpu_cores: Option<u32>,
    pub max_memory_gb: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub parallel_jobs: u32,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self { parallel_jobs: 1 }
    }
}
