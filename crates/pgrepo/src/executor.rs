//! The statement execution seam.

use crate::client::GenericClient;
use crate::config::RepositoryConfig;
use crate::error::OrmResult;
use crate::logging;
use crate::row::Record;
use crate::statement::Statement;

/// Runs a parameterized [`Statement`] and returns raw rows.
///
/// Connection acquisition, retries and timeouts belong to the implementation.
/// Every [`GenericClient`] is an executor; tests can implement this directly
/// to script responses without a database.
pub trait Executor: Send + Sync {
    /// Run a statement that returns rows.
    fn query(
        &self,
        statement: &Statement,
    ) -> impl std::future::Future<Output = OrmResult<Vec<Record>>> + Send;

    /// Run a statement and return the number of affected rows.
    fn execute(
        &self,
        statement: &Statement,
    ) -> impl std::future::Future<Output = OrmResult<u64>> + Send;
}

impl<C: GenericClient> Executor for C {
    async fn query(&self, statement: &Statement) -> OrmResult<Vec<Record>> {
        let params = statement.params_ref();
        let rows = GenericClient::query(self, &statement.text, &params).await?;
        rows.iter().map(Record::from_pg_row).collect()
    }

    async fn execute(&self, statement: &Statement) -> OrmResult<u64> {
        let params = statement.params_ref();
        GenericClient::execute(self, &statement.text, &params).await
    }
}

/// Run a row-returning statement, logging it when `config.debug` is set.
pub(crate) async fn query_logged<E: Executor>(
    executor: &E,
    table: &str,
    statement: &Statement,
    config: &RepositoryConfig,
) -> OrmResult<Vec<Record>> {
    if config.debug {
        logging::statement(table, statement, config.max_logged_sql);
    }
    let rows = executor.query(statement).await?;
    if config.debug {
        logging::rows(table, rows.len());
    }
    Ok(rows)
}
