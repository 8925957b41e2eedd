//! Configuration management for the email composer

use crate::domain::Culture;
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Culture used when the caller does not pass one
    pub default_culture: Culture,
    /// JSON template catalogue loaded by the binary
    pub templates_path: Option<PathBuf>,
    /// SMTP configuration
    pub smtp: SmtpConfig,
    /// Logging and metrics configuration
    pub telemetry: TelemetryConfig,
}

/// SMTP configuration for email sending
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP server host
    pub host: String,
    /// SMTP server port (typically 587 for STARTTLS, 25 for unencrypted)
    pub port: u16,
    /// Username for authentication (optional)
    pub username: Option<String>,
    /// Password for authentication (optional)
    pub password: Option<String>,
    /// Use STARTTLS
    pub use_tls: bool,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 587,
            username: None,
            password: None,
            use_tls: true,
        }
    }
}

/// Logging and metrics configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// "text" or "json"
    pub log_format: String,
    /// Install the Prometheus recorder
    pub metrics_enabled: bool,
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            metrics_enabled: false,
            service_name: "composer-core".to_string(),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_bool(key: &str, default: bool) -> Result<bool> {
    match env::var(key) {
        Ok(value) => parse_bool(&value).with_context(|| format!("Invalid {}", key)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let smtp_defaults = SmtpConfig::default();
        let telemetry_defaults = TelemetryConfig::default();

        Ok(Self {
            default_culture: env::var("COMPOSER_DEFAULT_CULTURE")
                .unwrap_or_else(|_| "en-US".to_string())
                .parse()
                .context("Invalid COMPOSER_DEFAULT_CULTURE")?,
            templates_path: env::var("COMPOSER_TEMPLATES_PATH").ok().map(PathBuf::from),
            smtp: SmtpConfig {
                host: env::var("SMTP_HOST").unwrap_or(smtp_defaults.host),
                port: env::var("SMTP_PORT")
                    .unwrap_or_else(|_| smtp_defaults.port.to_string())
                    .parse()
                    .context("Invalid SMTP_PORT")?,
                username: env::var("SMTP_USERNAME").ok(),
                password: env::var("SMTP_PASSWORD").ok(),
                use_tls: env_bool("SMTP_USE_TLS", smtp_defaults.use_tls)?,
            },
            telemetry: TelemetryConfig {
                log_format: env::var("LOG_FORMAT").unwrap_or(telemetry_defaults.log_format),
                metrics_enabled: env_bool("METRICS_ENABLED", telemetry_defaults.metrics_enabled)?,
                service_name: env::var("SERVICE_NAME")
                    .unwrap_or(telemetry_defaults.service_name),
            },
        })
    }
}
