//! # pgrepo
//!
//! A table-level PostgreSQL repository.
//!
//! ## Features
//!
//! - **Parameterized statements**: values are always bound as `$n` parameters
//! - **Entity mapping**: one [`EntityMapper`] per table converts rows and patches
//! - **Missing vs. null**: [`Payload`] keeps "not provided" apart from SQL `NULL`
//! - **Cursor pagination**: opaque offset cursors with page metadata
//! - **Safe defaults**: DELETE requires a clause, UPDATE requires a SET
//! - **Driver seam**: any [`GenericClient`] (client, pooled client, pool) is an [`Executor`]
//!
//! ## Example
//!
//! ```ignore
//! use pgrepo::{CursorRequest, Repository, create_pool};
//!
//! let pool = create_pool(&std::env::var("DATABASE_URL")?)?;
//! let users = Repository::new("users", UserMapper, pool);
//!
//! let alice = users.insert(&UserPatch::named("alice")).await?;
//! let admins = users.find(&UserPatch::with_role("admin")).await?;
//!
//! let page = users.find_with_cursor(CursorRequest::new().first(20)).await?;
//! for edge in &page.edges {
//!     println!("{} {}", edge.cursor, edge.node.name);
//! }
//! if page.page_info.has_next_page {
//!     let next = CursorRequest::new().first(20).after(page.page_info.end_cursor.unwrap());
//! }
//! ```

pub mod clause;
pub mod client;
pub mod config;
pub mod cursor;
pub mod error;
pub mod executor;
mod logging;
pub mod mapper;
pub mod pagination;
pub mod payload;
pub mod repository;
pub mod row;
pub mod sql;
pub mod statement;
pub mod value;

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(test)]
mod testing;

pub use clause::{equality_clause, legacy_equality_clause};
pub use client::GenericClient;
pub use config::{CursorFailurePolicy, PoolConfig, RepositoryConfig};
pub use cursor::{Cursor, MAX_PAGE_SIZE};
pub use error::{OrmError, OrmResult};
pub use executor::Executor;
pub use mapper::EntityMapper;
pub use pagination::{
    Connection, CursorRequest, Edge, PageInfo, PageOutcome, PageWindow, SortDirection,
};
pub use payload::{Payload, fields, sanitize};
pub use repository::Repository;
pub use row::Record;
pub use sql::Sql;
pub use statement::Statement;
pub use value::{FromValue, SqlValue};

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_from_config, create_pool_with_config};
