//! View statistics models.
//!
//! Contains the per-database refresh settings and the per-view statistics
//! snapshot used by the freshness check.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Refresh settings for one virtual database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    /// Virtual database name.
    #[serde(alias = "database_name")]
    #[validate(length(min = 1, message = "Database name must not be empty"))]
    pub name: String,

    /// Days after the last update before statistics count as stale.
    #[serde(rename = "freshness_in_days")]
    pub freshness_days: u32,

    /// View names skipped during enumeration.
    #[serde(rename = "exclude_tables", default)]
    pub excluded_tables: BTreeSet<String>,
}

impl DatabaseConfig {
    /// Creates a configuration entry.
    pub fn new<I, S>(name: &str, freshness_days: u32, excluded_tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            freshness_days,
            excluded_tables: excluded_tables.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `view_name` is in the exclusion list.
    pub fn is_excluded(&self, view_name: &str) -> bool {
        self.excluded_tables.contains(view_name)
    }
}

/// A view returned by the enumeration query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ViewRef {
    /// Database the view belongs to.
    pub database_name: String,
    /// View name.
    pub view_name: String,
}

impl ViewRef {
    /// Creates a view reference.
    pub fn new(database_name: impl Into<String>, view_name: impl Into<String>) -> Self {
        Self {
            database_name: database_name.into(),
            view_name: view_name.into(),
        }
    }
}

impl std::fmt::Display for ViewRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.database_name, self.view_name)
    }
}

/// Statistics snapshot of one view, built fresh on every check.
///
/// `last_updated` is only ever set when `statistics_enabled` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewStatisticsRecord {
    /// Database the view belongs to.
    pub database_name: String,
    /// View name.
    pub table_name: String,
    /// Whether any statistics rows exist for the view.
    pub statistics_enabled: bool,
    /// Oldest `last_updated` across the view's statistics rows.
    pub last_updated: Option<DateTime<Utc>>,
}

impl ViewStatisticsRecord {
    /// Record for a view without statistics.
    pub fn disabled(view: &ViewRef) -> Self {
        Self {
            database_name: view.database_name.clone(),
            table_name: view.view_name.clone(),
            statistics_enabled: false,
            last_updated: None,
        }
    }

    /// Record for a view with statistics.
    pub fn enabled(view: &ViewRef, last_updated: Option<DateTime<Utc>>) -> Self {
        Self {
            database_name: view.database_name.clone(),
            table_name: view.view_name.clone(),
            statistics_enabled: true,
            last_updated,
        }
    }
}

/// Outcome of a freshness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    /// The view has no statistics. Counted as fresh: there is nothing to
    /// refresh, which says nothing about plan quality.
    NoStatistics,
    /// Statistics were updated inside the freshness window.
    Fresh,
    /// Statistics are older than the window, or have no timestamp.
    Stale,
}

impl Freshness {
    /// Whether the view is left alone.
    pub fn is_fresh(&self) -> bool {
        !matches!(self, Freshness::Stale)
    }
}

impl std::fmt::Display for Freshness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Freshness::NoStatistics => write!(f, "no_statistics"),
            Freshness::Fresh => write!(f, "fresh"),
            Freshness::Stale => write!(f, "stale"),
        }
    }
}

/// Counters for one refresh run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Databases processed.
    pub databases: usize,
    /// Views checked.
    pub views_checked: usize,
    /// Views left alone, including views without statistics.
    pub fresh: usize,
    /// Views whose statistics were refreshed.
    pub refreshed: usize,
}
