//! Configuration loading.
//!
//! Connection settings come from environment variables (optionally seeded
//! from a `.env` file). The list of databases to maintain comes from a YAML
//! document with a top-level `databases` key.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;
use validator::Validate;

use crate::errors::{AppError, AppResult};
use crate::models::DatabaseConfig;

/// Default VDP server port for the PostgreSQL-compatible endpoint.
pub const DEFAULT_VDP_PORT: u16 = 9996;

/// Default location of the statistics configuration file.
pub const DEFAULT_STATISTICS_CONFIG: &str = "config/statistics.yaml";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Process-level settings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Name reported in logs.
    pub service_name: String,
    /// VDP server host.
    pub vdp_host: String,
    /// VDP server port.
    pub vdp_port: u16,
    /// Login user.
    pub vdp_user: String,
    /// Login password.
    pub vdp_password: String,
    /// Database used for the session.
    pub vdp_database: String,
    /// Timeout for acquiring a connection.
    pub connect_timeout_secs: u64,
    /// Path of the statistics YAML file.
    pub statistics_config_path: String,
    /// Log output format.
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Loads settings from the process environment.
    pub fn load_with_service(service: &str) -> Self {
        Self::from_lookup(service, |key| std::env::var(key).ok())
    }

    /// Loads settings through `lookup`, falling back to defaults for
    /// missing or unparsable values.
    pub fn from_lookup<F>(service: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Self {
            service_name: service.to_string(),
            vdp_host: string("VDP_HOST", "localhost"),
            vdp_port: lookup("VDP_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_VDP_PORT),
            vdp_user: string("VDP_USER", "admin"),
            vdp_password: string("VDP_PASSWORD", "admin"),
            vdp_database: string("VDP_DATABASE", "admin"),
            connect_timeout_secs: lookup("VDP_CONNECT_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            statistics_config_path: string("STATISTICS_CONFIG", DEFAULT_STATISTICS_CONFIG),
            log_format: lookup("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or_default(),
        }
    }

    /// Connection options for the VDP server.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.vdp_host)
            .port(self.vdp_port)
            .username(&self.vdp_user)
            .password(&self.vdp_password)
            .database(&self.vdp_database)
            .application_name(&self.service_name)
    }

    /// Connection acquire timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Loads a `.env` file from the working directory (best-effort, no error if
/// missing). Variables already set in the environment win.
pub fn load_dotenv() {
    let env_path = Path::new(".env");
    if !env_path.exists() {
        return;
    }
    if let Ok(content) = std::fs::read_to_string(env_path) {
        for (key, value) in parse_dotenv(&content) {
            if std::env::var(&key).is_err() {
                std::env::set_var(key, value);
            }
        }
    }
}

fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

#[derive(Debug, Deserialize)]
struct StatisticsFile {
    #[serde(default)]
    databases: Vec<DatabaseConfig>,
}

/// Parses and validates the statistics YAML document.
///
/// A document without a `databases` key yields an empty list.
pub fn parse_databases(content: &str) -> AppResult<Vec<DatabaseConfig>> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let file: StatisticsFile = serde_yaml::from_str(content)?;
    for database in &file.databases {
        database.validate()?;
    }
    Ok(file.databases)
}

/// Reads the statistics configuration file.
///
/// Any read, parse or validation failure is logged and yields an empty list;
/// callers treat an empty list as fatal.
pub fn load_databases(path: impl AsRef<Path>) -> Vec<DatabaseConfig> {
    let path = path.as_ref();
    let result = std::fs::read_to_string(path)
        .map_err(AppError::from)
        .and_then(|content| parse_databases(&content));

    match result {
        Ok(databases) => {
            tracing::info!(path = %path.display(), count = databases.len(), "Statistics configuration loaded");
            databases
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, code = e.code(), "Failed to load statistics configuration");
            Vec::new()
        }
    }
}
