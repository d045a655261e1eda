//! SQL text helpers.
//!
//! Names are never spliced into statement text; these helpers only emit
//! `$n` placeholders for values bound separately.

/// Builds placeholder lists and optional clauses for parameterized statements.
pub struct SqlBuilder;

impl SqlBuilder {
    /// Returns `count` comma-separated placeholders starting at `$first`.
    ///
    /// # Example
    /// `SqlBuilder::placeholders(2, 3)` yields `"$2, $3, $4"`.
    pub fn placeholders(first: usize, count: usize) -> String {
        (first..first + count)
            .map(|i| format!("${}", i))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Builds ` AND <column> NOT IN ($first, ...)` for `count` values.
    ///
    /// # Returns
    /// `None` when `count` is zero, since `NOT IN ()` is not valid SQL and an
    /// empty exclusion list excludes nothing.
    pub fn not_in_clause(column: &str, first: usize, count: usize) -> Option<String> {
        if count == 0 {
            return None;
        }
        Some(format!(
            " AND {} NOT IN ({})",
            column,
            Self::placeholders(first, count)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(SqlBuilder::placeholders(1, 1), "$1");
        assert_eq!(SqlBuilder::placeholders(2, 3), "$2, $3, $4");
        assert_eq!(SqlBuilder::placeholders(1, 0), "");
    }

    #[test]
    fn test_not_in_clause_empty_is_omitted() {
        assert_eq!(SqlBuilder::not_in_clause("name", 2, 0), None);
    }

    #[test]
    fn test_not_in_clause() {
        assert_eq!(
            SqlBuilder::not_in_clause("name", 2, 2).as_deref(),
            Some(" AND name NOT IN ($2, $3)")
        );
    }
}
