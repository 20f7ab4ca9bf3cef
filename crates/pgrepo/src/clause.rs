//! Equality WHERE predicates built from a [`Payload`].

use crate::payload::Payload;
use crate::sql::Sql;

/// Build `a = $1 AND b = $2 ...` from every provided field.
///
/// An explicit null renders `col IS NULL`; fields that were not provided are
/// skipped. An empty payload yields an empty fragment, which
/// [`Sql::push_where`] drops.
pub fn equality_clause(payload: &Payload) -> Sql {
    let mut clause = Sql::empty();
    for (i, (key, value)) in payload.provided().enumerate() {
        if i > 0 {
            clause.push(" AND ");
        }
        clause.push(key);
        if value.is_null() {
            clause.push(" IS NULL");
        } else {
            clause.push(" = ").push_bind(value.clone());
        }
    }
    clause
}

/// Build `a = '1' AND b = 'x'` with the values inlined as string literals.
///
/// Trusted-filter-only: values are quoted with embedded quotes doubled, so this
/// must only see values the application itself produced. Explicit nulls are
/// rendered as the literal `'null'`. Prefer [`equality_clause`].
pub fn legacy_equality_clause(payload: &Payload) -> String {
    payload
        .provided()
        .map(|(key, value)| format!("{} = {}", key, value.to_quoted_literal()))
        .collect::<Vec<_>>()
        .join(" AND ")
}
