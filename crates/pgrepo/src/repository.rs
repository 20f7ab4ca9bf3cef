//! Table-level repository.
//!
//! A [`Repository`] binds a table name, an [`EntityMapper`] and an
//! [`Executor`]. Every operation builds a parameterized [`Statement`], runs it
//! through the executor and maps the returned rows back to entities.
//!
//! ```ignore
//! use pgrepo::{CursorRequest, Payload, Repository, create_pool};
//!
//! let pool = create_pool(&database_url)?;
//! let users = Repository::new("users", UserMapper, pool).with_debug(true);
//!
//! let alice = users.insert(&UserPatch::named("alice")).await?;
//! let page = users
//!     .find_with_cursor(CursorRequest::new().first(20).order_by("created_at"))
//!     .await?;
//! ```

use crate::clause::equality_clause;
use crate::config::RepositoryConfig;
use crate::error::{OrmError, OrmResult};
use crate::executor::{Executor, query_logged};
use crate::logging;
use crate::mapper::EntityMapper;
use crate::pagination::{self, Connection, CursorRequest, PageOutcome};
use crate::payload::sanitize;
use crate::row::{Record, count_from};
use crate::sql::Sql;
use crate::statement::{self, Statement};

/// CRUD and cursor pagination over one table.
pub struct Repository<M, E> {
    table: String,
    config: RepositoryConfig,
    mapper: M,
    executor: E,
}

impl<M, E> Repository<M, E>
where
    M: EntityMapper,
    E: Executor,
{
    pub fn new(table: impl Into<String>, mapper: M, executor: E) -> Self {
        Self {
            table: table.into(),
            config: RepositoryConfig::default(),
            mapper,
            executor,
        }
    }

    pub fn with_config(mut self, config: RepositoryConfig) -> Self {
        self.config = config;
        self
    }

    /// Log every statement at `debug` under target `pgrepo.sql`.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Insert a row built from the provided fields and return it.
    pub async fn insert(&self, entity: &M::Patch) -> OrmResult<M::Entity> {
        let payload = sanitize(&self.mapper.to_raw(entity));
        let stmt = statement::insert(&self.table, &payload);
        let rows = self.query(&stmt).await?;
        self.first_row(rows, "INSERT")
    }

    /// All rows equal to the provided fields of `filter`.
    pub async fn find(&self, filter: &M::Patch) -> OrmResult<Vec<M::Entity>> {
        let stmt = self.select(&self.clause(filter));
        let rows = self.query(&stmt).await?;
        self.map_results(rows)
    }

    /// First row equal to the provided fields of `filter`, if any.
    pub async fn find_one(&self, filter: &M::Patch) -> OrmResult<Option<M::Entity>> {
        let stmt = self.select(&self.clause(filter));
        let rows = self.query(&stmt).await?;
        rows.first().map(|row| self.mapper.from_row(row)).transpose()
    }

    /// `SELECT * FROM <table> WHERE <trusted_where>`.
    ///
    /// The predicate is spliced verbatim and must not carry user input.
    pub async fn find_with_raw_query(&self, trusted_where: &str) -> OrmResult<Vec<M::Entity>> {
        let mut q = Sql::new(format!("SELECT * FROM {} WHERE ", self.table));
        q.push(trusted_where);
        let rows = self.query(&q.build()).await?;
        self.map_results(rows)
    }

    /// One page of rows with cursors and page metadata.
    ///
    /// Backend failures follow [`RepositoryConfig::cursor_failure`]; an
    /// invalid cursor or a mapping failure is always an error.
    pub async fn find_with_cursor(
        &self,
        request: CursorRequest,
    ) -> OrmResult<Connection<M::Entity>> {
        self.find_with_cursor_outcome(request)
            .await?
            .into_connection(self.config.cursor_failure)
    }

    /// Like [`find_with_cursor`](Self::find_with_cursor), keeping empty
    /// results and backend failures apart.
    pub async fn find_with_cursor_outcome(
        &self,
        request: CursorRequest,
    ) -> OrmResult<PageOutcome<M::Entity>> {
        pagination::paginate(
            &self.executor,
            &self.mapper,
            &self.table,
            &request,
            &self.config,
        )
        .await
    }

    /// Number of rows equal to the provided fields of `filter`.
    pub async fn count(&self, filter: &M::Patch) -> OrmResult<i64> {
        let clause = self.clause(filter);
        let mut q = Sql::new(format!("SELECT COUNT(*) FROM {}", self.table));
        q.push_where(Some(&clause));
        let rows = self.query(&q.build()).await?;
        count_from(&rows)
    }

    /// `SELECT COUNT(*) FROM <table> [WHERE <trusted_where>]`.
    pub async fn count_with_raw_query(&self, trusted_where: &str) -> OrmResult<i64> {
        let mut q = Sql::new(format!("SELECT COUNT(*) FROM {}", self.table));
        if !trusted_where.trim().is_empty() {
            q.push(" WHERE ").push(trusted_where);
        }
        let rows = self.query(&q.build()).await?;
        count_from(&rows)
    }

    /// Set the non-null fields of `values` on rows matching `clause` and
    /// return the first updated row.
    pub async fn update(&self, clause: &M::Patch, values: &M::Patch) -> OrmResult<M::Entity> {
        let clause = sanitize(&self.mapper.to_raw(clause));
        let values = sanitize(&self.mapper.to_raw(values));
        let stmt = statement::update(&self.table, &values, &clause)?;
        let rows = self.query(&stmt).await?;
        self.first_row(rows, "UPDATE")
    }

    /// Delete rows matching `clause`; returns the number of rows removed.
    pub async fn delete(&self, clause: &M::Patch) -> OrmResult<u64> {
        let clause = sanitize(&self.mapper.to_raw(clause));
        let stmt = statement::delete(&self.table, &clause)?;
        if self.config.debug {
            logging::statement(&self.table, &stmt, self.config.max_logged_sql);
        }
        self.executor.execute(&stmt).await
    }

    /// Run trusted SQL and map every returned row.
    pub async fn request_raw(&self, trusted_sql: &str) -> OrmResult<Vec<M::Entity>> {
        let rows = self.query(&Statement::raw(trusted_sql)).await?;
        self.map_results(rows)
    }

    /// Map raw rows to entities, failing on the first row that does not map.
    pub fn map_results(&self, rows: Vec<Record>) -> OrmResult<Vec<M::Entity>> {
        rows.iter().map(|row| self.mapper.from_row(row)).collect()
    }

    fn clause(&self, filter: &M::Patch) -> Sql {
        equality_clause(&sanitize(&self.mapper.to_raw(filter)))
    }

    fn select(&self, clause: &Sql) -> Statement {
        let mut q = Sql::new(format!("SELECT * FROM {}", self.table));
        q.push_where(Some(clause));
        q.build()
    }

    async fn query(&self, stmt: &Statement) -> OrmResult<Vec<Record>> {
        query_logged(&self.executor, &self.table, stmt, &self.config).await
    }

    fn first_row(&self, rows: Vec<Record>, verb: &str) -> OrmResult<M::Entity> {
        let row = rows.first().ok_or_else(|| {
            OrmError::not_found(format!("{} on {} returned no rows", verb, self.table))
        })?;
        self.mapper.from_row(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CursorFailurePolicy;
    use crate::cursor::Cursor;
    use crate::testing::{ScriptedExecutor, User, UserMapper, UserPatch, user_row, user_rows};
    use crate::value::SqlValue;

    fn repo(executor: ScriptedExecutor) -> Repository<UserMapper, ScriptedExecutor> {
        Repository::new("users", UserMapper, executor)
    }

    fn named(name: &str) -> UserPatch {
        UserPatch {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn by_id(id: i64) -> UserPatch {
        UserPatch {
            id: Some(id),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn insert_binds_provided_fields() {
        let users = repo(ScriptedExecutor::new().rows(vec![user_row(1, "alice")]));
        let user = users.insert(&named("alice")).await.unwrap();

        assert_eq!(
            user,
            User {
                id: 1,
                name: "alice".into()
            }
        );
        let stmt = &users.executor().statements()[0];
        assert_eq!(
            stmt.text,
            "INSERT INTO users (display_name) VALUES ($1) RETURNING *"
        );
        assert_eq!(stmt.args, vec![SqlValue::from("alice")]);
    }

    #[tokio::test]
    async fn insert_with_no_rows_back_is_not_found() {
        let users = repo(ScriptedExecutor::new());
        let err = users.insert(&named("alice")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn find_filters_on_provided_fields() {
        let users = repo(ScriptedExecutor::new().rows(user_rows(0..2)));
        let found = users.find(&by_id(1)).await.unwrap();

        assert_eq!(found.len(), 2);
        let stmt = &users.executor().statements()[0];
        assert_eq!(stmt.text, "SELECT * FROM users WHERE id = $1");
        assert_eq!(stmt.args, vec![SqlValue::Int(1)]);
    }

    #[tokio::test]
    async fn find_with_empty_filter_selects_all() {
        let users = repo(ScriptedExecutor::new());
        users.find(&UserPatch::default()).await.unwrap();
        assert_eq!(users.executor().texts(), vec!["SELECT * FROM users"]);
    }

    #[tokio::test]
    async fn find_one_returns_first_or_none() {
        let users = repo(ScriptedExecutor::new().rows(user_rows(4..6)));
        assert_eq!(users.find_one(&by_id(4)).await.unwrap().unwrap().id, 4);
        assert_eq!(users.find_one(&by_id(4)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn raw_queries_are_spliced_verbatim() {
        let users = repo(ScriptedExecutor::new().rows(user_rows(0..1)));
        users.find_with_raw_query("id > 3").await.unwrap();
        users.request_raw("SELECT * FROM users LIMIT 1").await.unwrap();
        assert_eq!(
            users.executor().texts(),
            vec!["SELECT * FROM users WHERE id > 3", "SELECT * FROM users LIMIT 1"]
        );
    }

    #[tokio::test]
    async fn count_reads_scalar() {
        let users = repo(ScriptedExecutor::new().count(7).count(3).count(12));
        assert_eq!(users.count(&named("bob")).await.unwrap(), 7);
        assert_eq!(users.count_with_raw_query("id < 10").await.unwrap(), 3);
        assert_eq!(users.count_with_raw_query("").await.unwrap(), 12);
        assert_eq!(
            users.executor().texts(),
            vec![
                "SELECT COUNT(*) FROM users WHERE display_name = $1",
                "SELECT COUNT(*) FROM users WHERE id < 10",
                "SELECT COUNT(*) FROM users",
            ]
        );
    }

    #[tokio::test]
    async fn update_sets_values_where_clause() {
        let users = repo(ScriptedExecutor::new().rows(vec![user_row(2, "carol")]));
        let user = users.update(&by_id(2), &named("carol")).await.unwrap();

        assert_eq!(user.name, "carol");
        let stmt = &users.executor().statements()[0];
        assert_eq!(
            stmt.text,
            "UPDATE users SET display_name = $1 WHERE id = $2 RETURNING *"
        );
        assert_eq!(stmt.args, vec![SqlValue::from("carol"), SqlValue::Int(2)]);
    }

    #[tokio::test]
    async fn update_without_values_is_rejected_before_executing() {
        let users = repo(ScriptedExecutor::new());
        let err = users.update(&by_id(2), &UserPatch::default()).await.unwrap_err();
        assert!(matches!(err, OrmError::Validation(_)));
        assert!(users.executor().statements().is_empty());
    }

    #[tokio::test]
    async fn update_matching_nothing_is_not_found() {
        let users = repo(ScriptedExecutor::new());
        let err = users.update(&by_id(99), &named("x")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_returns_affected_rows() {
        let users = repo(ScriptedExecutor::new().affected(1));
        assert_eq!(users.delete(&by_id(5)).await.unwrap(), 1);
        assert_eq!(
            users.executor().texts(),
            vec!["DELETE FROM users WHERE id = $1"]
        );
    }

    #[tokio::test]
    async fn delete_without_clause_is_rejected() {
        let users = repo(ScriptedExecutor::new());
        let err = users.delete(&UserPatch::default()).await.unwrap_err();
        assert!(matches!(err, OrmError::EmptyClause(_)));
        assert!(users.executor().statements().is_empty());
    }

    #[tokio::test]
    async fn executor_errors_propagate() {
        let users = repo(ScriptedExecutor::new().fail("gone"));
        let err = users.find(&UserPatch::default()).await.unwrap_err();
        assert!(matches!(err, OrmError::Connection(_)));
    }

    #[tokio::test]
    async fn cursor_page_with_filter() {
        let users = repo(ScriptedExecutor::new().count(25).rows(user_rows(0..10)));
        let connection = users
            .find_with_cursor(CursorRequest::new().first(10))
            .await
            .unwrap();

        assert_eq!(connection.count, 25);
        assert_eq!(connection.edges.len(), 10);
        assert_eq!(
            connection.page_info.end_cursor,
            Some(Cursor::from_offset(9))
        );
        assert!(connection.page_info.has_next_page);
    }

    #[tokio::test]
    async fn cursor_failure_collapses_by_default() {
        let users = repo(ScriptedExecutor::new().fail("down"));
        let connection = users.find_with_cursor(CursorRequest::new()).await.unwrap();
        assert_eq!(connection, Connection::empty());
    }

    #[tokio::test]
    async fn cursor_failure_surfaces_when_configured() {
        let users = repo(ScriptedExecutor::new().count(4).fail("down"))
            .with_config(RepositoryConfig::default().surface_cursor_errors());
        assert_eq!(users.config().cursor_failure, CursorFailurePolicy::Surface);
        let err = users
            .find_with_cursor(CursorRequest::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OrmError::Connection(_)));
    }

    #[tokio::test]
    async fn cursor_outcome_keeps_empty_and_failure_apart() {
        let users = repo(ScriptedExecutor::new().count(0).fail("down"));
        let empty = users
            .find_with_cursor_outcome(CursorRequest::new())
            .await
            .unwrap();
        let failed = users
            .find_with_cursor_outcome(CursorRequest::new())
            .await
            .unwrap();
        assert!(matches!(empty, PageOutcome::Empty));
        assert!(failed.is_backend_error());
    }

    #[tokio::test]
    async fn row_decode_failure_is_not_collapsed() {
        let executor = ScriptedExecutor::new()
            .count(25)
            .fail_with(OrmError::decode("price", "unsupported column type"));
        let users = repo(executor);
        assert_eq!(
            users.config().cursor_failure,
            CursorFailurePolicy::CollapseToEmpty
        );

        let err = users
            .find_with_cursor(CursorRequest::new().first(10))
            .await
            .unwrap_err();
        assert!(
            matches!(err, OrmError::Decode { ref column, .. } if column == "price")
        );
    }

    #[tokio::test]
    async fn invalid_cursor_is_an_error_under_any_policy() {
        let users = repo(ScriptedExecutor::new());
        let err = users
            .find_with_cursor(CursorRequest::new().after("not base64!"))
            .await
            .unwrap_err();
        assert!(err.is_invalid_cursor());
    }

    #[test]
    fn map_results_stops_at_first_bad_row() {
        let users = repo(ScriptedExecutor::new());
        assert_eq!(users.map_results(user_rows(0..3)).unwrap().len(), 3);

        let mut rows = user_rows(0..2);
        rows.push(Record::new().with("id", "seven").with("display_name", "x"));
        assert!(users.map_results(rows).is_err());
    }

    #[test]
    fn builder_accessors() {
        let users = repo(ScriptedExecutor::new()).with_debug(true);
        assert_eq!(users.table_name(), "users");
        assert!(users.config().debug);
    }
}
