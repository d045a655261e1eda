//! Application error types.
//!
//! A single error enum shared by the configuration loader, the query
//! executor and the refresh control loop.

use thiserror::Error;

/// Result alias used across the workspace.
pub type AppResult<T> = Result<T, AppError>;

/// Errors raised while loading configuration or talking to the VDP server.
#[derive(Debug, Error)]
pub enum AppError {
    /// The statistics configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A configuration entry failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// No database entries were found in the statistics configuration.
    #[error("no databases found in configuration")]
    NoDatabasesConfigured,

    /// Connecting to the VDP server failed.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// A statement failed on the VDP server.
    #[error("database query error: {0}")]
    DatabaseQuery(String),

    /// A metadata query returned a row of an unexpected shape.
    #[error("unexpected row: {0}")]
    UnexpectedRow(String),
}

impl AppError {
    /// Returns a stable error code for log correlation.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NoDatabasesConfigured => "NO_DATABASES_CONFIGURED",
            AppError::DatabaseConnection(_) => "CONNECTION_ERROR",
            AppError::DatabaseQuery(_) => "QUERY_ERROR",
            AppError::UnexpectedRow(_) => "UNEXPECTED_ROW",
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Configuration(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::NoDatabasesConfigured.code(), "NO_DATABASES_CONFIGURED");
        assert_eq!(AppError::DatabaseQuery("boom".into()).code(), "QUERY_ERROR");
    }

    #[test]
    fn test_display_includes_message() {
        let err = AppError::DatabaseConnection("refused".into());
        assert_eq!(err.to_string(), "database connection error: refused");
    }
}
