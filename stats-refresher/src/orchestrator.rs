//! Refresh control loop.
//!
//! For every configured database: enumerate its views minus the excluded
//! ones, check each view's statistics and refresh the stale ones. The first
//! failing statement aborts the whole run.

use tracing::Instrument;

use common::errors::{AppError, AppResult};
use common::models::{DatabaseConfig, RunSummary, SqlValue, Statement, ViewRef};
use common::utils::{IdGenerator, SqlBuilder};

use crate::checker::StatisticsChecker;
use crate::executor::QueryExecutor;
use crate::refresh::RefreshTrigger;

const LIST_VIEWS_SQL: &str =
    "SELECT database_name, name FROM GET_VIEWS() WHERE input_database_name = $1";

/// Builds the view enumeration statement for one database. Excluded names
/// are bound after the database name; no clause is emitted when there are
/// none.
pub fn list_views_statement(database: &DatabaseConfig) -> Statement {
    let mut sql = LIST_VIEWS_SQL.to_string();
    if let Some(clause) = SqlBuilder::not_in_clause("name", 2, database.excluded_tables.len()) {
        sql.push_str(&clause);
    }

    let mut params = vec![SqlValue::from(database.name.as_str())];
    params.extend(database.excluded_tables.iter().map(|t| SqlValue::from(t.as_str())));
    Statement { sql, params }
}

/// Drives the checker and the refresh trigger over all configured databases.
pub struct Orchestrator<'a, E: ?Sized> {
    executor: &'a E,
}

impl<'a, E: QueryExecutor + ?Sized> Orchestrator<'a, E> {
    pub fn new(executor: &'a E) -> Self {
        Self { executor }
    }

    /// Processes every database in order.
    ///
    /// # Errors
    /// `AppError::NoDatabasesConfigured` when `databases` is empty, before any
    /// statement is issued. Otherwise the first executor error.
    pub async fn run(&self, databases: &[DatabaseConfig]) -> AppResult<RunSummary> {
        if databases.is_empty() {
            tracing::error!("No databases found in configuration");
            return Err(AppError::NoDatabasesConfigured);
        }

        let span = tracing::info_span!("refresh_run", run_id = %IdGenerator::run_id());
        self.run_databases(databases).instrument(span).await
    }

    async fn run_databases(&self, databases: &[DatabaseConfig]) -> AppResult<RunSummary> {
        let mut summary = RunSummary::default();
        for database in databases {
            self.process_database(database, &mut summary)
                .instrument(tracing::info_span!("database", name = %database.name))
                .await?;
            summary.databases += 1;
        }
        tracing::info!(
            databases = summary.databases,
            views_checked = summary.views_checked,
            fresh = summary.fresh,
            refreshed = summary.refreshed,
            "Statistics refresh run completed"
        );
        Ok(summary)
    }

    /// Lists the views of `database`, excluded names removed.
    pub async fn list_views(&self, database: &DatabaseConfig) -> AppResult<Vec<ViewRef>> {
        let rows = self.executor.execute(list_views_statement(database)).await?;

        let mut views = Vec::with_capacity(rows.len());
        for row in &rows {
            let view = ViewRef::new(row.get_str(0)?, row.get_str(1)?);
            // The server already filters; this only guards against a
            // backend that ignores the clause.
            if database.is_excluded(&view.view_name) {
                continue;
            }
            views.push(view);
        }
        Ok(views)
    }

    async fn process_database(&self, database: &DatabaseConfig, summary: &mut RunSummary) -> AppResult<()> {
        let views = self.list_views(database).await?;
        tracing::info!(
            views = views.len(),
            excluded = database.excluded_tables.len(),
            freshness_days = database.freshness_days,
            "Views enumerated"
        );

        let checker = StatisticsChecker::new(self.executor);
        let trigger = RefreshTrigger::new(self.executor);

        for view in &views {
            summary.views_checked += 1;
            if checker
                .is_fresh(&view.database_name, &view.view_name, database.freshness_days)
                .await?
            {
                summary.fresh += 1;
                continue;
            }
            trigger.refresh(view).await?;
            summary.refreshed += 1;
            tracing::info!(view = %view, "Updated statistics");
        }
        Ok(())
    }
}
