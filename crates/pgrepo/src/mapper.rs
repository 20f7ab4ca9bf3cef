//! Entity mapping between domain types and raw rows.

use crate::error::OrmResult;
use crate::payload::Payload;
use crate::row::Record;

/// Converts between one entity type and its table's columns.
///
/// One implementation per entity, handed to [`Repository::new`](crate::Repository::new).
/// `Patch` is the partial form of the entity used for filters and writes:
/// a field left unset should map to a *not provided* payload entry.
///
/// # Example
///
/// ```ignore
/// struct UserMapper;
///
/// impl EntityMapper for UserMapper {
///     type Entity = User;
///     type Patch = UserPatch;
///
///     fn from_row(&self, row: &Record) -> OrmResult<User> {
///         Ok(User {
///             id: row.try_get("id")?,
///             display_name: row.try_get("display_name")?,
///         })
///     }
///
///     fn to_raw(&self, patch: &UserPatch) -> Payload {
///         let mut raw = Payload::new();
///         raw.set_opt("id", patch.id);
///         raw.set_opt("display_name", patch.display_name.clone());
///         raw
///     }
/// }
/// ```
pub trait EntityMapper: Send + Sync {
    /// The domain entity.
    type Entity: Send;
    /// Partial entity used for filters and writes.
    type Patch: Send + Sync;

    /// Build an entity from a raw row.
    fn from_row(&self, row: &Record) -> OrmResult<Self::Entity>;

    /// Translate a partial entity to storage column names.
    fn to_raw(&self, patch: &Self::Patch) -> Payload;
}
