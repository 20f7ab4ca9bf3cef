//! Offset-based cursor pagination.
//!
//! Each edge's cursor is its row position in the filtered, ordered result
//! set. A page request resolves to a [`PageWindow`] (direction, offset,
//! limit), then issues two statements in sequence:
//!
//! 1. `SELECT COUNT(<order column or id>) FROM <table> [WHERE <filter>]`
//! 2. `SELECT * FROM <table> [WHERE <filter>] ORDER BY <column> <dir>
//!    OFFSET <offset> ROWS FETCH NEXT <limit> ROWS ONLY`
//!
//! Page metadata is derived from the total, the offset and the number of
//! rows returned:
//!
//! ```text
//!            offset = start                 end
//!   ... rows |---------- limit -------------|  rows ... | total
//!   has_previous_page: start > 0      has_next_page: total - end > 1
//! ```

use crate::clause::equality_clause;
use crate::config::{CursorFailurePolicy, RepositoryConfig};
use crate::cursor::{self, Cursor, MAX_PAGE_SIZE};
use crate::error::{OrmError, OrmResult};
use crate::executor::{Executor, query_logged};
use crate::logging::{self, PagePhase};
use crate::mapper::EntityMapper;
use crate::payload::Payload;
use crate::row::count_from;
use crate::sql::Sql;
use crate::statement::Statement;
use serde::Serialize;

/// Row ORDER BY column when none is given.
pub const DEFAULT_ORDER_COLUMN: &str = "created_at";
/// COUNT projection column when no order column is given.
pub const DEFAULT_COUNT_COLUMN: &str = "id";

/// Sort direction of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A cursor page request.
///
/// `first` pages forward (newest first); setting `last` flips the sort to
/// ascending. Only one offset source is used: `after`, else `before`, else 0.
#[derive(Debug, Clone, Default)]
pub struct CursorRequest {
    pub order_by: Option<String>,
    pub filter: Option<Sql>,
    pub first: Option<u64>,
    pub last: Option<u64>,
    pub after: Option<String>,
    pub before: Option<String>,
}

impl CursorRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Column used for ordering (and for the COUNT projection).
    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some(column.into());
        self
    }

    /// Restrict rows with a prebuilt predicate.
    pub fn filter(mut self, filter: Sql) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Restrict rows with a parameterized equality predicate.
    pub fn filter_eq(self, payload: &Payload) -> Self {
        self.filter(equality_clause(payload))
    }

    /// Restrict rows with trusted predicate text, spliced verbatim.
    pub fn raw_filter(self, trusted_sql: impl Into<String>) -> Self {
        self.filter(Sql::raw(trusted_sql))
    }

    pub fn first(mut self, n: u64) -> Self {
        self.first = Some(n);
        self
    }

    pub fn last(mut self, n: u64) -> Self {
        self.last = Some(n);
        self
    }

    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.after = Some(cursor.into());
        self
    }

    pub fn before(mut self, cursor: impl Into<String>) -> Self {
        self.before = Some(cursor.into());
        self
    }
}

/// The resolved offset/limit window of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub direction: SortDirection,
    pub offset: u64,
    pub limit: u64,
}

impl PageWindow {
    /// Resolve direction, offset and limit.
    ///
    /// Empty cursor strings and zero page sizes count as absent. A cursor that
    /// does not decode to a non-negative offset is an [`OrmError::InvalidCursor`].
    pub fn resolve(request: &CursorRequest) -> OrmResult<Self> {
        let direction = if request.last.is_some() {
            SortDirection::Asc
        } else {
            SortDirection::Desc
        };

        let offset = match [request.after.as_deref(), request.before.as_deref()]
            .into_iter()
            .flatten()
            .find(|c| !c.is_empty())
        {
            Some(encoded) => {
                let offset = cursor::decode(encoded)?;
                if i64::try_from(offset).is_err() {
                    return Err(OrmError::invalid_cursor(encoded, "offset out of range"));
                }
                offset
            }
            None => 0,
        };

        let requested = request
            .first
            .filter(|n| *n > 0)
            .or(request.last.filter(|n| *n > 0))
            .unwrap_or(MAX_PAGE_SIZE);

        Ok(Self {
            direction,
            offset,
            limit: requested.min(MAX_PAGE_SIZE),
        })
    }
}

/// One row and its cursor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge<T> {
    pub node: T,
    pub cursor: Cursor,
}

/// Boundaries and navigability of a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub start_cursor: Option<Cursor>,
    pub end_cursor: Option<Cursor>,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl PageInfo {
    /// Metadata for a page of `edge_count` rows at `offset` out of `total`.
    ///
    /// `end` is `start + edge_count - 1`, so an empty page ends one before it
    /// starts.
    pub fn compute(total: i64, offset: u64, edge_count: usize) -> Self {
        let offset = offset as i64;
        let start = offset;
        let end = start + edge_count as i64 - 1;

        Self {
            start_cursor: Some(Cursor::encode(start)),
            end_cursor: Some(Cursor::encode(end)),
            has_next_page: total - end > 1,
            has_previous_page: start - offset >= 0 && start > 0,
        }
    }
}

/// A page of results plus pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
    pub count: i64,
    pub page_info: PageInfo,
}

impl<T> Connection<T> {
    /// No edges, zero count, null cursors, no neighbours.
    pub fn empty() -> Self {
        Self {
            edges: Vec::new(),
            count: 0,
            page_info: PageInfo::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Drop cursors and keep the nodes.
    pub fn into_nodes(self) -> Vec<T> {
        self.edges.into_iter().map(|e| e.node).collect()
    }
}

/// Result of a page request that keeps "no rows" and "backend failed" apart.
#[derive(Debug)]
pub enum PageOutcome<T> {
    /// At least one row matched the filter.
    Page(Connection<T>),
    /// No row matched the filter.
    Empty,
    /// The COUNT or page statement failed in the database or the driver.
    BackendError(OrmError),
}

impl<T> PageOutcome<T> {
    pub fn is_backend_error(&self) -> bool {
        matches!(self, Self::BackendError(_))
    }

    /// Collapse to a connection according to `policy`.
    pub fn into_connection(self, policy: CursorFailurePolicy) -> OrmResult<Connection<T>> {
        match self {
            Self::Page(connection) => Ok(connection),
            Self::Empty => Ok(Connection::empty()),
            Self::BackendError(err) => match policy {
                CursorFailurePolicy::CollapseToEmpty => Ok(Connection::empty()),
                CursorFailurePolicy::Surface => Err(err),
            },
        }
    }
}

/// `SELECT COUNT(<column>) FROM <table> [WHERE <filter>]`.
pub fn count_statement(table: &str, order_by: Option<&str>, filter: Option<&Sql>) -> Statement {
    let column = order_by.unwrap_or(DEFAULT_COUNT_COLUMN);
    let mut q = Sql::new(format!("SELECT COUNT({}) FROM {}", column, table));
    q.push_where(filter);
    q.build()
}

/// `SELECT * FROM <table> [WHERE <filter>] ORDER BY .. OFFSET .. FETCH NEXT ..`.
pub fn page_statement(
    table: &str,
    order_by: Option<&str>,
    filter: Option<&Sql>,
    window: &PageWindow,
) -> Statement {
    let column = order_by.unwrap_or(DEFAULT_ORDER_COLUMN);
    let mut q = Sql::new(format!("SELECT * FROM {}", table));
    q.push_where(filter);
    q.push(&format!(
        " ORDER BY {} {} OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
        column,
        window.direction.as_sql(),
        window.offset,
        window.limit
    ));
    q.build()
}

/// Run a cursor page request.
///
/// Returns `Err` for an invalid cursor or for a row that cannot be decoded or
/// mapped; other backend failures are logged and returned as
/// [`PageOutcome::BackendError`].
pub async fn paginate<E, M>(
    executor: &E,
    mapper: &M,
    table: &str,
    request: &CursorRequest,
    config: &RepositoryConfig,
) -> OrmResult<PageOutcome<M::Entity>>
where
    E: Executor,
    M: EntityMapper,
{
    let window = PageWindow::resolve(request)?;
    let order_by = request.order_by.as_deref();
    let filter = request.filter.as_ref();

    let count_stmt = count_statement(table, order_by, filter);
    let total = match query_logged(executor, table, &count_stmt, config)
        .await
        .and_then(|rows| count_from(&rows))
    {
        Ok(total) => total,
        Err(err) if err.is_decode() => return Err(err),
        Err(err) => {
            logging::page_failure(table, PagePhase::Count, &err);
            return Ok(PageOutcome::BackendError(err));
        }
    };

    if total == 0 {
        return Ok(PageOutcome::Empty);
    }

    let page_stmt = page_statement(table, order_by, filter, &window);
    let rows = match query_logged(executor, table, &page_stmt, config).await {
        Ok(rows) => rows,
        Err(err) if err.is_decode() => return Err(err),
        Err(err) => {
            logging::page_failure(table, PagePhase::Page, &err);
            return Ok(PageOutcome::BackendError(err));
        }
    };

    let edges = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            Ok(Edge {
                node: mapper.from_row(row)?,
                cursor: Cursor::from_offset(window.offset + i as u64),
            })
        })
        .collect::<OrmResult<Vec<_>>>()?;

    let page_info = PageInfo::compute(total, window.offset, edges.len());
    Ok(PageOutcome::Page(Connection {
        edges,
        count: total,
        page_info,
    }))
}
