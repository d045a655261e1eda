//! Shared data models.

pub mod query;
pub mod statistics;

// Re-export commonly used types
pub use query::{QueryRow, SqlValue, Statement};
pub use statistics::{DatabaseConfig, Freshness, RunSummary, ViewRef, ViewStatisticsRecord};
