//! Predictive services for delivery pipelines: build-time estimation,
//! failure prediction and change-aware test selection.
//!
//! Every service answers even without a trained model by falling back to a
//! deterministic heuristic; responses record which path produced them.

pub mod build;
pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod errors;
pub mod failure;
pub mod features;
pub mod io;
pub mod model;
pub mod observability;
pub mod service;
pub mod test_selection;

pub use crate::build::{BuildOptimizationRequest, BuildOptimizationResponse, BuildOptimizer};
pub use crate::config::PipelineMlConfig;
pub use crate::errors::{Error, Result};
pub use crate::failure::{FailurePredictionReport, FailurePredictor, PipelineMetrics, RiskLevel};
pub use crate::model::{FallbackReason, PredictionSource};
pub use crate::service::{ServiceHealth, ServiceManager};
pub use crate::test_selection::{TestSelectionRequest, TestSelectionResponse, TestSelector};
