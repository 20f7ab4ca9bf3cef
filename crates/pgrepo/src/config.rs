//! Repository and pool configuration.

use crate::error::{OrmError, OrmResult};

/// What `find_with_cursor` does when the database fails mid-page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CursorFailurePolicy {
    /// Log the failure and return an empty connection, indistinguishable from
    /// a page with no matching rows.
    #[default]
    CollapseToEmpty,
    /// Return the failure to the caller.
    Surface,
}

/// Configuration for a [`Repository`](crate::Repository).
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// Log every statement and its row count at `debug`.
    pub debug: bool,
    /// Backend failure handling for cursor pagination.
    pub cursor_failure: CursorFailurePolicy,
    /// Truncate logged SQL (in bytes). `None` means no truncation.
    pub max_logged_sql: Option<usize>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            debug: false,
            cursor_failure: CursorFailurePolicy::default(),
            max_logged_sql: Some(200),
        }
    }
}

impl RepositoryConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable statement logging.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the cursor pagination failure policy.
    pub fn cursor_failure(mut self, policy: CursorFailurePolicy) -> Self {
        self.cursor_failure = policy;
        self
    }

    /// Return backend failures from `find_with_cursor` instead of an empty page.
    pub fn surface_cursor_errors(self) -> Self {
        self.cursor_failure(CursorFailurePolicy::Surface)
    }

    /// Set maximum SQL length to log.
    pub fn max_logged_sql(mut self, len: usize) -> Self {
        self.max_logged_sql = Some(len);
        self
    }

    /// Disable SQL truncation in logs.
    pub fn no_truncate(mut self) -> Self {
        self.max_logged_sql = None;
        self
    }
}

/// Environment variable holding the connection string.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
/// Environment variable overriding the pool size.
pub const POOL_MAX_SIZE_ENV: &str = "PGREPO_POOL_MAX_SIZE";
/// Pool size used when none is configured.
pub const DEFAULT_POOL_MAX_SIZE: usize = 16;

/// Connection pool settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub database_url: String,
    pub max_size: usize,
}

impl PoolConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_size: DEFAULT_POOL_MAX_SIZE,
        }
    }

    /// Set the maximum number of pooled connections.
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Read `DATABASE_URL` (required) and `PGREPO_POOL_MAX_SIZE` (optional).
    pub fn from_env() -> OrmResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> OrmResult<Self> {
        let database_url = lookup(DATABASE_URL_ENV)
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| OrmError::Connection(format!("{} is not set", DATABASE_URL_ENV)))?;

        let max_size = match lookup(POOL_MAX_SIZE_ENV) {
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                OrmError::validation(format!(
                    "{} must be a positive integer, got '{}'",
                    POOL_MAX_SIZE_ENV, raw
                ))
            })?,
            None => DEFAULT_POOL_MAX_SIZE,
        };
        if max_size == 0 {
            return Err(OrmError::validation(format!(
                "{} must be greater than zero",
                POOL_MAX_SIZE_ENV
            )));
        }

        Ok(Self {
            database_url,
            max_size,
        })
    }
}
