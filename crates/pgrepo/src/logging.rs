//! `tracing` events for executed statements and swallowed page failures.

use crate::error::OrmError;
use crate::statement::Statement;

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

pub(crate) fn display_sql(sql: &str, max_len: Option<usize>) -> String {
    match max_len {
        Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
        _ => sql.to_string(),
    }
}

pub(crate) fn statement(table: &str, stmt: &Statement, max_len: Option<usize>) {
    tracing::debug!(
        target: "pgrepo.sql",
        table,
        param_count = stmt.args.len(),
        sql = %display_sql(&stmt.text, max_len),
    );
}

pub(crate) fn rows(table: &str, row_count: usize) {
    tracing::debug!(target: "pgrepo.sql", table, row_count, "statement returned");
}

/// Which step of a cursor page failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PagePhase {
    Count,
    Page,
}

impl PagePhase {
    fn as_str(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Page => "page",
        }
    }
}

pub(crate) fn page_failure(table: &str, phase: PagePhase, err: &OrmError) {
    tracing::warn!(
        target: "pgrepo.cursor",
        table,
        phase = phase.as_str(),
        error = %err,
        "cursor page failed"
    );
}
