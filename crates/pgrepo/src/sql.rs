//! Placeholder-tracking SQL buffer.
//!
//! `Sql` stores SQL pieces and bound values separately and renders
//! `$1, $2, ...` placeholders when the statement is built, so fragments
//! (a filter clause, a SET list) can be composed without manually tracking
//! parameter indices.
//!
//! # Example
//!
//! ```ignore
//! use pgrepo::sql::Sql;
//!
//! let mut q = Sql::new("SELECT * FROM users WHERE status = ");
//! q.push_bind("active").push(" AND org_id = ").push_bind(7);
//!
//! let stmt = q.build();
//! assert_eq!(stmt.text, "SELECT * FROM users WHERE status = $1 AND org_id = $2");
//! ```

use crate::statement::Statement;
use crate::value::SqlValue;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq)]
enum SqlPart {
    Raw(String),
    Param,
}

/// A composable SQL fragment with positional parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sql {
    parts: Vec<SqlPart>,
    params: Vec<SqlValue>,
}

impl Sql {
    /// Create a new builder with an initial SQL fragment.
    pub fn new(initial_sql: impl Into<String>) -> Self {
        let mut sql = Self::empty();
        sql.push(&initial_sql.into());
        sql
    }

    /// Create an empty builder.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap trusted, already-built SQL text (no parameters).
    ///
    /// The text is spliced verbatim; it must never contain untrusted input.
    pub fn raw(trusted_sql: impl Into<String>) -> Self {
        Self::new(trusted_sql)
    }

    /// Append raw SQL (no parameters).
    pub fn push(&mut self, sql: &str) -> &mut Self {
        if sql.is_empty() {
            return self;
        }

        match self.parts.last_mut() {
            Some(SqlPart::Raw(last)) => last.push_str(sql),
            _ => self.parts.push(SqlPart::Raw(sql.to_string())),
        }
        self
    }

    /// Append a parameter placeholder and bind its value.
    pub fn push_bind(&mut self, value: impl Into<SqlValue>) -> &mut Self {
        self.parts.push(SqlPart::Param);
        self.params.push(value.into());
        self
    }

    /// Append another fragment, consuming it. Its placeholders are renumbered.
    pub fn push_sql(&mut self, other: Sql) -> &mut Self {
        for part in other.parts {
            match part {
                SqlPart::Raw(s) => {
                    self.push(&s);
                }
                SqlPart::Param => self.parts.push(SqlPart::Param),
            }
        }
        self.params.extend(other.params);
        self
    }

    /// Append ` WHERE <filter>` unless the filter is empty.
    pub fn push_where(&mut self, filter: Option<&Sql>) -> &mut Self {
        match filter {
            Some(f) if !f.is_empty() => {
                self.push(" WHERE ");
                self.push_sql(f.clone())
            }
            _ => self,
        }
    }

    /// True when the fragment renders to whitespace only.
    pub fn is_empty(&self) -> bool {
        self.parts.iter().all(|p| match p {
            SqlPart::Raw(s) => s.trim().is_empty(),
            SqlPart::Param => false,
        })
    }

    /// Number of bound parameters.
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Render SQL with `$1, $2, ...` placeholders.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        let mut idx: usize = 0;

        for part in &self.parts {
            match part {
                SqlPart::Raw(s) => out.push_str(s),
                SqlPart::Param => {
                    idx += 1;
                    let _ = write!(&mut out, "${}", idx);
                }
            }
        }
        out
    }

    /// Bound values in placeholder order.
    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    /// Freeze into a [`Statement`].
    pub fn build(self) -> Statement {
        let text = self.to_sql();
        Statement::new(text, self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_placeholders_in_order() {
        let mut q = Sql::new("SELECT * FROM users WHERE a = ");
        q.push_bind(1).push(" AND b = ").push_bind("x");

        assert_eq!(q.to_sql(), "SELECT * FROM users WHERE a = $1 AND b = $2");
        assert_eq!(q.params(), &[SqlValue::Int(1), SqlValue::Text("x".into())]);
    }

    #[test]
    fn can_compose_fragments() {
        let mut w = Sql::empty();
        w.push("id = ").push_bind(42);

        let mut q = Sql::new("UPDATE users SET name = ");
        q.push_bind("bob").push(" WHERE ").push_sql(w);

        assert_eq!(q.to_sql(), "UPDATE users SET name = $1 WHERE id = $2");
        assert_eq!(q.param_count(), 2);
    }

    #[test]
    fn push_where_skips_empty_filter() {
        let mut q = Sql::new("SELECT * FROM users");
        q.push_where(Some(&Sql::raw("   ")));
        q.push_where(None);
        assert_eq!(q.to_sql(), "SELECT * FROM users");
    }

    #[test]
    fn push_where_appends_raw_filter() {
        let mut q = Sql::new("SELECT * FROM users");
        q.push_where(Some(&Sql::raw("age > 30")));
        assert_eq!(q.to_sql(), "SELECT * FROM users WHERE age > 30");
    }

    #[test]
    fn empty_detects_param_only_fragment() {
        let mut q = Sql::empty();
        assert!(q.is_empty());
        q.push_bind(1);
        assert!(!q.is_empty());
    }

    #[test]
    fn build_carries_params() {
        let mut q = Sql::new("DELETE FROM t WHERE id = ");
        q.push_bind(9);
        let stmt = q.build();
        assert_eq!(stmt.text, "DELETE FROM t WHERE id = $1");
        assert_eq!(stmt.args, vec![SqlValue::Int(9)]);
    }
}
