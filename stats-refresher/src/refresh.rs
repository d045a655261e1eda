//! Statistics refresh trigger.

use common::errors::AppResult;
use common::models::{Statement, ViewRef};

use crate::executor::QueryExecutor;

/// Statistics are gathered by the VDP server itself, reading through the
/// source only.
pub const REFRESH_MODE: &str = "ATSOURCE_THROUGH_VDP_ONLY";

const REFRESH_SQL: &str = "CALL GET_STATS_FOR_FIELDS($1, $2, $3, NULL, $4, $5, $6, $7)";

/// Boolean switches passed to the refresh procedure, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshFlags {
    pub include_indexes: bool,
    pub recompute_existing: bool,
    pub sample: bool,
    pub cascade: bool,
}

impl RefreshFlags {
    /// Flags used for every refresh.
    pub const DEFAULT: RefreshFlags = RefreshFlags {
        include_indexes: true,
        recompute_existing: false,
        sample: false,
        cascade: true,
    };
}

/// Issues the statistics recomputation call for stale views.
pub struct RefreshTrigger<'a, E: ?Sized> {
    executor: &'a E,
    flags: RefreshFlags,
}

impl<'a, E: QueryExecutor + ?Sized> RefreshTrigger<'a, E> {
    pub fn new(executor: &'a E) -> Self {
        Self {
            executor,
            flags: RefreshFlags::DEFAULT,
        }
    }

    /// Builds the procedure call for `view`. No field filter is passed.
    pub fn statement(&self, view: &ViewRef) -> Statement {
        Statement::new(REFRESH_SQL)
            .bind(REFRESH_MODE)
            .bind(view.database_name.as_str())
            .bind(view.view_name.as_str())
            .bind(self.flags.include_indexes)
            .bind(self.flags.recompute_existing)
            .bind(self.flags.sample)
            .bind(self.flags.cascade)
    }

    /// Requests recomputation of the view's statistics. The returned rows
    /// are logged only; success means the call did not fail.
    pub async fn refresh(&self, view: &ViewRef) -> AppResult<()> {
        let rows = self.executor.execute(self.statement(view)).await?;
        tracing::info!(
            view = %view,
            rows = ?rows,
            "Statistics refresh requested"
        );
        Ok(())
    }
}
