//! INSERT / UPDATE / DELETE statement generators.
//!
//! Generators are pure: they return a [`Statement`] and never execute it.
//! Table and column names are spliced verbatim and must come from the
//! application, never from user input.

use crate::error::{OrmError, OrmResult};
use crate::payload::{Payload, fields};
use crate::sql::Sql;
use crate::value::SqlValue;
use tokio_postgres::types::ToSql;

/// SQL text with positional placeholders plus its ordered arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub text: String,
    pub args: Vec<SqlValue>,
}

impl Statement {
    pub fn new(text: impl Into<String>, args: Vec<SqlValue>) -> Self {
        Self {
            text: text.into(),
            args,
        }
    }

    /// A statement with no parameters.
    pub fn raw(text: impl Into<String>) -> Self {
        Self::new(text, Vec::new())
    }

    /// Parameter refs compatible with `tokio-postgres`.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.args
            .iter()
            .map(|v| v as &(dyn ToSql + Sync))
            .collect()
    }
}

/// `INSERT INTO <table> (<cols>) VALUES ($1, ..) RETURNING *`.
///
/// Null and missing fields are left to column defaults. With nothing left to
/// write this emits `INSERT INTO <table> DEFAULT VALUES RETURNING *`.
pub fn insert(table: &str, payload: &Payload) -> Statement {
    let fields = fields(payload);
    if fields.is_empty() {
        return Statement::raw(format!("INSERT INTO {} DEFAULT VALUES RETURNING *", table));
    }

    let columns = fields.keys().collect::<Vec<_>>().join(", ");
    let mut q = Sql::new(format!("INSERT INTO {} ({}) VALUES (", table, columns));
    for (i, (_, value)) in fields.provided().enumerate() {
        if i > 0 {
            q.push(", ");
        }
        q.push_bind(value.clone());
    }
    q.push(") RETURNING *");
    q.build()
}

/// `UPDATE <table> SET a = $1, .. [WHERE k = $n+1 AND ..] RETURNING *`.
///
/// SET values go through [`fields`]; clause values are bound as given,
/// explicit nulls included. An empty clause omits WHERE and updates every row.
/// Errors when no field is left to SET.
pub fn update(table: &str, payload: &Payload, clause: &Payload) -> OrmResult<Statement> {
    let fields = fields(payload);
    if fields.is_empty() {
        return Err(OrmError::validation(format!(
            "UPDATE {} has no non-null fields to SET",
            table
        )));
    }

    let mut q = Sql::new(format!("UPDATE {} SET ", table));
    for (i, (key, value)) in fields.provided().enumerate() {
        if i > 0 {
            q.push(", ");
        }
        q.push(key).push(" = ").push_bind(value.clone());
    }

    let mut conditions = clause.provided().peekable();
    if conditions.peek().is_some() {
        q.push(" WHERE ");
        push_bound_conditions(&mut q, conditions);
    }

    q.push(" RETURNING *");
    Ok(q.build())
}

/// `DELETE FROM <table> WHERE k = $1 AND ..`.
///
/// An empty clause is rejected with [`OrmError::EmptyClause`] rather than
/// deleting the whole table.
pub fn delete(table: &str, clause: &Payload) -> OrmResult<Statement> {
    let mut conditions = clause.provided().peekable();
    if conditions.peek().is_none() {
        return Err(OrmError::EmptyClause(format!(
            "DELETE FROM {} requires at least one condition",
            table
        )));
    }

    let mut q = Sql::new(format!("DELETE FROM {} WHERE ", table));
    push_bound_conditions(&mut q, conditions);
    Ok(q.build())
}

fn push_bound_conditions<'a>(
    q: &mut Sql,
    conditions: impl Iterator<Item = (&'a str, &'a SqlValue)>,
) {
    for (i, (key, value)) in conditions.enumerate() {
        if i > 0 {
            q.push(" AND ");
        }
        q.push(key).push(" = ").push_bind(value.clone());
    }
}
