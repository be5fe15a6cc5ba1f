use std::env;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the pipeline and its command-line front end.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub pipeline: PipelineConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let defaults = PipelineConfig::default();
        let max_document_bytes = numeric_var(
            "APP_MAX_DOCUMENT_BYTES",
            defaults.max_document_bytes as u64,
        )? as usize;
        let extraction_timeout_ms = numeric_var(
            "APP_EXTRACTION_TIMEOUT_MS",
            defaults.extraction_timeout.as_millis() as u64,
        )?;
        let posting_validity_months = numeric_var(
            "APP_POSTING_VALIDITY_MONTHS",
            u64::from(defaults.posting_validity_months),
        )?;
        let posting_validity_months = u32::try_from(posting_validity_months).map_err(|_| {
            ConfigError::InvalidNumber {
                variable: "APP_POSTING_VALIDITY_MONTHS",
            }
        })?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = LogFormat::from_str(
            &env::var("APP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
        );

        Ok(Self {
            environment,
            pipeline: PipelineConfig {
                max_document_bytes,
                extraction_timeout: Duration::from_millis(extraction_timeout_ms),
                posting_validity_months,
            },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
        })
    }
}

fn numeric_var(variable: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(variable) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber { variable }),
        Err(_) => Ok(default),
    }
}

/// Limits applied while processing candidate documents and postings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub max_document_bytes: usize,
    pub extraction_timeout: Duration,
    pub posting_validity_months: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_document_bytes: 10 * 1024 * 1024,
            extraction_timeout: Duration::from_secs(10),
            posting_validity_months: 3,
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
}

impl LogFormat {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Self::Pretty,
            _ => Self::Compact,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{variable} must be a non-negative integer")]
    InvalidNumber { variable: &'static str },
}
