//! Scripted executor and sample mapper for unit tests.

use crate::error::{OrmError, OrmResult};
use crate::executor::Executor;
use crate::mapper::EntityMapper;
use crate::payload::Payload;
use crate::row::Record;
use crate::statement::Statement;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays queued responses in order and records every statement it sees.
///
/// An exhausted queue answers with no rows (or 0 affected).
#[derive(Default)]
pub(crate) struct ScriptedExecutor {
    responses: Mutex<VecDeque<OrmResult<Vec<Record>>>>,
    affected: Mutex<VecDeque<OrmResult<u64>>>,
    seen: Mutex<Vec<Statement>>,
}

impl ScriptedExecutor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn rows(self, rows: Vec<Record>) -> Self {
        self.responses.lock().unwrap().push_back(Ok(rows));
        self
    }

    pub(crate) fn count(self, n: i64) -> Self {
        self.rows(vec![Record::new().with("count", n)])
    }

    pub(crate) fn fail(self, message: &str) -> Self {
        self.fail_with(OrmError::Connection(message.to_string()))
    }

    pub(crate) fn fail_with(self, err: OrmError) -> Self {
        self.responses.lock().unwrap().push_back(Err(err));
        self
    }

    pub(crate) fn affected(self, n: u64) -> Self {
        self.affected.lock().unwrap().push_back(Ok(n));
        self
    }

    pub(crate) fn statements(&self) -> Vec<Statement> {
        self.seen.lock().unwrap().clone()
    }

    pub(crate) fn texts(&self) -> Vec<String> {
        self.statements().into_iter().map(|s| s.text).collect()
    }
}

impl Executor for ScriptedExecutor {
    async fn query(&self, statement: &Statement) -> OrmResult<Vec<Record>> {
        self.seen.lock().unwrap().push(statement.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn execute(&self, statement: &Statement) -> OrmResult<u64> {
        self.seen.lock().unwrap().push(statement.clone());
        self.affected.lock().unwrap().pop_front().unwrap_or(Ok(0))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct User {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct UserPatch {
    pub id: Option<i64>,
    pub name: Option<String>,
}

pub(crate) struct UserMapper;

impl EntityMapper for UserMapper {
    type Entity = User;
    type Patch = UserPatch;

    fn from_row(&self, row: &Record) -> OrmResult<User> {
        Ok(User {
            id: row.try_get("id")?,
            name: row.try_get("display_name")?,
        })
    }

    fn to_raw(&self, patch: &UserPatch) -> Payload {
        let mut raw = Payload::new();
        raw.set_opt("id", patch.id);
        raw.set_opt("display_name", patch.name.clone());
        raw
    }
}

pub(crate) fn user_row(id: i64, name: &str) -> Record {
    Record::new().with("id", id).with("display_name", name)
}

pub(crate) fn user_rows(range: std::ops::Range<i64>) -> Vec<Record> {
    range.map(|i| user_row(i, &format!("user{i}"))).collect()
}
