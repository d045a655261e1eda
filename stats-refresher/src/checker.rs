//! View statistics freshness checks.
//!
//! Two read-only metadata queries per view: whether statistics exist at all,
//! and the oldest `last_updated` timestamp among them.

use chrono::{DateTime, Duration, Utc};

use common::errors::{AppError, AppResult};
use common::models::{Freshness, SqlValue, Statement, ViewRef, ViewStatisticsRecord};

use crate::executor::QueryExecutor;

const STATISTICS_COUNT_SQL: &str = "SELECT COUNT(1) FROM GET_VIEW_STATISTICS() \
     WHERE input_database_name = $1 AND input_name = $2";

const STATISTICS_LAST_UPDATED_SQL: &str = "SELECT MIN(last_updated) FROM GET_VIEW_STATISTICS() \
     WHERE input_database_name = $1 AND input_name = $2";

/// Reads statistics metadata for views and classifies their freshness.
pub struct StatisticsChecker<'a, E: ?Sized> {
    executor: &'a E,
}

impl<'a, E: QueryExecutor + ?Sized> StatisticsChecker<'a, E> {
    pub fn new(executor: &'a E) -> Self {
        Self { executor }
    }

    /// Whether at least one statistics row exists for the view.
    pub async fn enabled(&self, database: &str, table: &str) -> AppResult<bool> {
        let rows = self
            .executor
            .execute(Statement::new(STATISTICS_COUNT_SQL).bind(database).bind(table))
            .await?;

        let row = rows
            .first()
            .ok_or_else(|| AppError::UnexpectedRow("statistics count returned no rows".into()))?;
        let cell = row.get(0)?;
        let count = cell
            .as_i64()
            .ok_or_else(|| AppError::UnexpectedRow(format!("statistics count is not an integer: {:?}", cell)))?;
        Ok(count > 0)
    }

    /// Oldest `last_updated` across the view's statistics rows.
    pub async fn last_updated(&self, database: &str, table: &str) -> AppResult<Option<DateTime<Utc>>> {
        let rows = self
            .executor
            .execute(Statement::new(STATISTICS_LAST_UPDATED_SQL).bind(database).bind(table))
            .await?;

        let Some(row) = rows.first() else {
            return Ok(None);
        };
        match row.get(0)? {
            SqlValue::Null => Ok(None),
            SqlValue::Timestamp(ts) => Ok(Some(*ts)),
            other => Err(AppError::UnexpectedRow(format!(
                "last_updated is not a timestamp: {:?}",
                other
            ))),
        }
    }

    /// Builds the statistics snapshot of a view. `last_updated` is only
    /// queried when statistics exist.
    pub async fn inspect(&self, view: &ViewRef) -> AppResult<ViewStatisticsRecord> {
        if !self.enabled(&view.database_name, &view.view_name).await? {
            return Ok(ViewStatisticsRecord::disabled(view));
        }
        let last_updated = self.last_updated(&view.database_name, &view.view_name).await?;
        Ok(ViewStatisticsRecord::enabled(view, last_updated))
    }

    /// Inspects the view and classifies it against the current UTC time.
    pub async fn check(
        &self,
        view: &ViewRef,
        freshness_days: u32,
    ) -> AppResult<(ViewStatisticsRecord, Freshness)> {
        self.check_at(view, freshness_days, Utc::now()).await
    }

    /// Inspects the view and classifies it against `now`.
    pub async fn check_at(
        &self,
        view: &ViewRef,
        freshness_days: u32,
        now: DateTime<Utc>,
    ) -> AppResult<(ViewStatisticsRecord, Freshness)> {
        let record = self.inspect(view).await?;
        let freshness = classify(&record, freshness_days, now);
        tracing::debug!(
            view = %view,
            statistics_enabled = record.statistics_enabled,
            last_updated = ?record.last_updated,
            freshness = %freshness,
            "Statistics checked"
        );
        Ok((record, freshness))
    }

    /// True when the view needs no refresh.
    pub async fn is_fresh(&self, database: &str, table: &str, freshness_days: u32) -> AppResult<bool> {
        let view = ViewRef::new(database, table);
        let (_, freshness) = self.check(&view, freshness_days).await?;
        Ok(freshness.is_fresh())
    }
}

/// Classifies a statistics snapshot.
///
/// A view without statistics is `NoStatistics`, which counts as fresh.
/// Statistics without a timestamp are `Stale` so that a refresh fills them in.
pub fn classify(record: &ViewStatisticsRecord, freshness_days: u32, now: DateTime<Utc>) -> Freshness {
    if !record.statistics_enabled {
        return Freshness::NoStatistics;
    }
    match record.last_updated {
        Some(last_updated) if is_within_window(last_updated, freshness_days, now) => Freshness::Fresh,
        Some(_) => Freshness::Stale,
        None => {
            tracing::warn!(
                database = %record.database_name,
                view = %record.table_name,
                "Statistics exist but have no last_updated timestamp"
            );
            Freshness::Stale
        }
    }
}

/// `last_updated + freshness_days > now`. The window end itself is stale.
pub fn is_within_window(last_updated: DateTime<Utc>, freshness_days: u32, now: DateTime<Utc>) -> bool {
    match last_updated.checked_add_signed(Duration::days(i64::from(freshness_days))) {
        Some(expires_at) => expires_at > now,
        // Window ends past the representable range.
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::MockQueryExecutor;
    use chrono::TimeZone;
    use common::models::QueryRow;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()
    }

    fn single(value: SqlValue) -> Vec<QueryRow> {
        vec![QueryRow::new(vec![value])]
    }

    fn expect_count(mock: &mut MockQueryExecutor, count: i64) {
        mock.expect_execute()
            .withf(|stmt| stmt.sql == STATISTICS_COUNT_SQL)
            .returning(move |_| Ok(single(SqlValue::Int(count))));
    }

    fn expect_last_updated(mock: &mut MockQueryExecutor, value: SqlValue) {
        mock.expect_execute()
            .withf(|stmt| stmt.sql == STATISTICS_LAST_UPDATED_SQL)
            .returning(move |_| Ok(single(value.clone())));
    }

    #[test]
    fn test_window_boundary() {
        let last = at(1);
        assert!(is_within_window(last, 5, at(5)));
        assert!(is_within_window(last, 5, at(6) - Duration::seconds(1)));
        // now == last_updated + days is stale
        assert!(!is_within_window(last, 5, at(6)));
        assert!(!is_within_window(last, 5, at(7)));
    }

    #[test]
    fn test_zero_day_window_is_always_stale() {
        let last = at(1);
        assert!(!is_within_window(last, 0, last));
    }

    #[test]
    fn test_window_overflow_is_fresh() {
        assert!(is_within_window(DateTime::<Utc>::MAX_UTC, 1, at(1)));
    }

    #[test]
    fn test_no_statistics_is_fresh_for_any_window() {
        let record = ViewStatisticsRecord::disabled(&ViewRef::new("SALES", "V1"));
        for days in [0, 1, 5, 365, u32::MAX] {
            assert_eq!(classify(&record, days, at(20)), Freshness::NoStatistics);
        }
    }

    #[test]
    fn test_enabled_without_timestamp_is_stale() {
        let record = ViewStatisticsRecord::enabled(&ViewRef::new("SALES", "V1"), None);
        assert_eq!(classify(&record, 5, at(20)), Freshness::Stale);
    }

    #[tokio::test]
    async fn test_disabled_view_skips_last_updated_query() {
        let mut mock = MockQueryExecutor::new();
        mock.expect_execute()
            .withf(|stmt| {
                stmt.sql == STATISTICS_COUNT_SQL
                    && stmt.params == vec![SqlValue::from("SALES"), SqlValue::from("V1")]
            })
            .times(1)
            .returning(|_| Ok(single(SqlValue::Int(0))));

        let checker = StatisticsChecker::new(&mock);
        let (record, freshness) = checker
            .check_at(&ViewRef::new("SALES", "V1"), 5, at(20))
            .await
            .unwrap();

        assert!(!record.statistics_enabled);
        assert_eq!(record.last_updated, None);
        assert_eq!(freshness, Freshness::NoStatistics);
    }

    #[tokio::test]
    async fn test_fresh_and_stale_views() {
        let mut mock = MockQueryExecutor::new();
        expect_count(&mut mock, 3);
        expect_last_updated(&mut mock, SqlValue::Timestamp(at(10)));

        let checker = StatisticsChecker::new(&mock);
        let view = ViewRef::new("SALES", "V2");

        let (record, freshness) = checker.check_at(&view, 5, at(12)).await.unwrap();
        assert_eq!(record.last_updated, Some(at(10)));
        assert_eq!(freshness, Freshness::Fresh);

        let (_, freshness) = checker.check_at(&view, 5, at(15)).await.unwrap();
        assert_eq!(freshness, Freshness::Stale);
    }

    #[tokio::test]
    async fn test_count_as_text_is_accepted() {
        let mut mock = MockQueryExecutor::new();
        mock.expect_execute()
            .returning(|_| Ok(single(SqlValue::Text("2".into()))));

        let checker = StatisticsChecker::new(&mock);
        assert!(checker.enabled("SALES", "V2").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_count_result_is_error() {
        let mut mock = MockQueryExecutor::new();
        mock.expect_execute().returning(|_| Ok(vec![]));

        let checker = StatisticsChecker::new(&mock);
        let err = checker.enabled("SALES", "V2").await.unwrap_err();
        assert!(matches!(err, AppError::UnexpectedRow(_)));
    }

    #[tokio::test]
    async fn test_query_error_propagates() {
        let mut mock = MockQueryExecutor::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Err(AppError::DatabaseQuery("syntax error".into())));

        let checker = StatisticsChecker::new(&mock);
        let err = checker.is_fresh("SALES", "V2", 5).await.unwrap_err();
        assert!(matches!(err, AppError::DatabaseQuery(_)));
    }

    #[tokio::test]
    async fn test_repeated_checks_agree() {
        let mut mock = MockQueryExecutor::new();
        expect_count(&mut mock, 1);
        expect_last_updated(&mut mock, SqlValue::Timestamp(Utc::now() - Duration::days(10)));

        let checker = StatisticsChecker::new(&mock);
        let first = checker.is_fresh("SALES", "V2", 5).await.unwrap();
        let second = checker.is_fresh("SALES", "V2", 5).await.unwrap();
        assert!(!first);
        assert_eq!(first, second);
    }
}
