use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::recruitment::RecruitmentError;

/// Failure surfaced by the command-line front end.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("pipeline error: {0}")]
    Pipeline(#[from] RecruitmentError),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
