//! CLI command implementations for pipeline-ml.
//!
//! Available commands:
//! - **predict-failure**: Failure probability, risk factors and recommendations
//! - **optimize-build**: Build-time estimate and optimization plan
//! - **select-tests**: Change-aware test selection
//! - **train**: Fit one model from labelled records
//! - **health**: Service health and model status
//! - **init**: Write a default configuration file

pub mod init;
pub mod predict;
pub mod train;

pub use init::init_config;
pub use predict::{optimize_build, predict_failure, select_tests};
pub use train::{health, train_model};
