//! Raw rows as returned by an [`Executor`](crate::Executor).

use crate::error::{OrmError, OrmResult};
use crate::value::{FromValue, SqlValue};
use serde::Serialize;
use std::error::Error;
use std::net::IpAddr;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Kind, Type};
use uuid::Uuid;

/// A column-ordered raw row.
///
/// Entity mappers read typed fields out of it with [`Record::try_get`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    columns: Vec<(String, SqlValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column.
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> &mut Self {
        self.columns.push((column.into(), value.into()));
        self
    }

    /// Builder form of [`Record::push`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(column, value);
        self
    }

    /// Raw value of a column, if present.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
    }

    /// Typed value of a column, returning [`OrmError::Decode`] on a missing
    /// column or a type mismatch.
    pub fn try_get<T: FromValue>(&self, column: &str) -> OrmResult<T> {
        let value = self
            .get(column)
            .ok_or_else(|| OrmError::decode(column, "column not present in row"))?;
        T::from_value(value).map_err(|message| OrmError::decode(column, message))
    }

    /// Value of the first column (e.g. a `COUNT(..)` result).
    pub fn first(&self) -> Option<&SqlValue> {
        self.columns.first().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterate columns in result order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Convert a driver row by inspecting each column's Postgres type.
    ///
    /// Types without a dedicated mapping come back as text when their wire
    /// form is text (enums, `citext`) and as raw bytes otherwise.
    pub fn from_pg_row(row: &Row) -> OrmResult<Self> {
        let mut record = Record::new();
        for (idx, column) in row.columns().iter().enumerate() {
            let value = decode_column(row, idx, column.type_())
                .map_err(|message| OrmError::decode(column.name(), message))?;
            record.columns.push((column.name().to_string(), value));
        }
        Ok(record)
    }
}

/// Read the scalar produced by a `SELECT COUNT(..)` statement.
pub(crate) fn count_from(rows: &[Record]) -> OrmResult<i64> {
    let value = rows
        .first()
        .and_then(Record::first)
        .ok_or_else(|| OrmError::decode("count", "COUNT returned no rows"))?;
    match value {
        SqlValue::Int(n) => Ok(*n),
        SqlValue::Text(s) => s
            .parse()
            .map_err(|_| OrmError::decode("count", format!("'{}' is not an integer", s))),
        other => Err(OrmError::decode(
            "count",
            format!("expected int, got {}", other.kind()),
        )),
    }
}

fn read<'a, T>(
    row: &'a Row,
    idx: usize,
    wrap: impl FnOnce(T) -> SqlValue,
) -> Result<SqlValue, String>
where
    T: FromSql<'a>,
{
    row.try_get::<_, Option<T>>(idx)
        .map(|v| v.map_or(SqlValue::Null, wrap))
        .map_err(|e| e.to_string())
}

/// One-dimensional arrays become a JSON array, SQL nulls included.
fn read_array<'a, T>(row: &'a Row, idx: usize) -> Result<SqlValue, String>
where
    T: FromSql<'a> + Serialize,
{
    match row
        .try_get::<_, Option<Vec<Option<T>>>>(idx)
        .map_err(|e| e.to_string())?
    {
        Some(items) => serde_json::to_value(items)
            .map(SqlValue::Json)
            .map_err(|e| e.to_string()),
        None => Ok(SqlValue::Null),
    }
}

/// Column bytes of a type with no dedicated mapping.
struct RawColumn(Vec<u8>);

impl<'a> FromSql<'a> for RawColumn {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(Self(raw.to_vec()))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

fn raw_value(ty: &Type, raw: Vec<u8>) -> SqlValue {
    let textual = matches!(ty.kind(), Kind::Enum(_)) || ty.name() == "citext";
    if !textual {
        return SqlValue::Bytes(raw);
    }
    match String::from_utf8(raw) {
        Ok(text) => SqlValue::Text(text),
        Err(e) => SqlValue::Bytes(e.into_bytes()),
    }
}

fn decode_column(row: &Row, idx: usize, ty: &Type) -> Result<SqlValue, String> {
    match *ty {
        Type::BOOL => read(row, idx, SqlValue::Bool),
        Type::INT2 => read(row, idx, |v: i16| SqlValue::Int(v.into())),
        Type::INT4 => read(row, idx, |v: i32| SqlValue::Int(v.into())),
        Type::INT8 => read(row, idx, SqlValue::Int),
        Type::FLOAT4 => read(row, idx, |v: f32| SqlValue::Float(v.into())),
        Type::FLOAT8 => read(row, idx, SqlValue::Float),
        Type::NUMERIC => read(row, idx, SqlValue::Decimal),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => read(row, idx, SqlValue::Text),
        Type::JSON | Type::JSONB => read(row, idx, SqlValue::Json),
        Type::UUID => read(row, idx, SqlValue::Uuid),
        Type::TIMESTAMPTZ => read(row, idx, SqlValue::Timestamp),
        Type::TIMESTAMP => read(row, idx, |v: chrono::NaiveDateTime| {
            SqlValue::Timestamp(v.and_utc())
        }),
        Type::DATE => read(row, idx, SqlValue::Date),
        Type::TIME => read(row, idx, |v: chrono::NaiveTime| SqlValue::Text(v.to_string())),
        Type::INET => read(row, idx, |v: IpAddr| SqlValue::Text(v.to_string())),
        Type::BYTEA => read(row, idx, SqlValue::Bytes),
        Type::BOOL_ARRAY => read_array::<bool>(row, idx),
        Type::INT2_ARRAY => read_array::<i16>(row, idx),
        Type::INT4_ARRAY => read_array::<i32>(row, idx),
        Type::INT8_ARRAY => read_array::<i64>(row, idx),
        Type::FLOAT8_ARRAY => read_array::<f64>(row, idx),
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY => read_array::<String>(row, idx),
        Type::UUID_ARRAY => read_array::<Uuid>(row, idx),
        _ => read(row, idx, |v: RawColumn| raw_value(ty, v.0)),
    }
}
