use thiserror::Error;

use crate::config::ConfigError;
use crate::core::{EstimatorError, QueryError};
use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Estimator(#[from] EstimatorError),
    #[error("{0}")]
    Query(#[from] QueryError),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
