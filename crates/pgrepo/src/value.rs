//! Dynamically typed SQL values.
//!
//! Payloads and rows are keyed by column name and hold [`SqlValue`]s, so a
//! single repository can serve any table without per-entity SQL types.

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::error::Error;
use std::fmt;
use tokio_postgres::types::{IsNull, Kind, ToSql, Type};
use uuid::Uuid;

/// A single SQL value bound as a parameter or decoded from a row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL `NULL`. Binds to a column of any type.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Exact `numeric` value.
    Decimal(Decimal),
    Text(String),
    Json(serde_json::Value),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Bytes(Vec<u8>),
}

impl SqlValue {
    /// Whether this is SQL `NULL`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the variant, used in decode errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Decimal(_) => "decimal",
            Self::Text(_) => "text",
            Self::Json(_) => "json",
            Self::Uuid(_) => "uuid",
            Self::Timestamp(_) => "timestamp",
            Self::Date(_) => "date",
            Self::Bytes(_) => "bytes",
        }
    }

    /// Render as an inline SQL string literal (`'...'`), doubling embedded quotes.
    ///
    /// Only used by the trusted-filter legacy clause path.
    pub fn to_quoted_literal(&self) -> String {
        format!("'{}'", self.to_string().replace('\'', "''"))
    }
}

/// Plain text form of the value: `null`, numbers, raw text, RFC 3339 timestamps,
/// `\x`-prefixed hex for bytes.
impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Decimal(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Json(v) => write!(f, "{v}"),
            Self::Uuid(v) => write!(f, "{v}"),
            Self::Timestamp(v) => f.write_str(&v.to_rfc3339()),
            Self::Date(v) => write!(f, "{v}"),
            Self::Bytes(v) => {
                f.write_str("\\x")?;
                for b in v {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
        }
    }
}

impl ToSql for SqlValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Self::Null => Ok(IsNull::Yes),
            Self::Bool(v) => v.to_sql_checked(ty, out),
            Self::Int(v) => match *ty {
                Type::INT2 => i16::try_from(*v)?.to_sql_checked(ty, out),
                Type::INT4 => i32::try_from(*v)?.to_sql_checked(ty, out),
                Type::FLOAT8 => (*v as f64).to_sql_checked(ty, out),
                Type::NUMERIC => Decimal::from(*v).to_sql_checked(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            Self::Float(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql_checked(ty, out),
                Type::NUMERIC => Decimal::try_from(*v)?.to_sql_checked(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            Self::Decimal(v) => v.to_sql_checked(ty, out),
            // Enum labels travel as their text in the binary protocol.
            Self::Text(v) if matches!(ty.kind(), Kind::Enum(_)) => {
                out.extend_from_slice(v.as_bytes());
                Ok(IsNull::No)
            }
            Self::Text(v) => v.to_sql_checked(ty, out),
            Self::Json(v) => v.to_sql_checked(ty, out),
            Self::Uuid(v) => v.to_sql_checked(ty, out),
            Self::Timestamp(v) => match *ty {
                Type::TIMESTAMP => v.naive_utc().to_sql_checked(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            Self::Date(v) => v.to_sql_checked(ty, out),
            Self::Bytes(v) => v.to_sql_checked(ty, out),
        }
    }

    // Each variant checks the concrete column type when it is encoded.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

macro_rules! impl_from_for_sql_value {
    ($($ty:ty => $variant:ident $(as $cast:ty)?),* $(,)?) => {
        $(
            impl From<$ty> for SqlValue {
                fn from(v: $ty) -> Self {
                    SqlValue::$variant(v $(as $cast)?)
                }
            }
        )*
    };
}

impl_from_for_sql_value! {
    bool => Bool,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int,
    u32 => Int as i64,
    f32 => Float as f64,
    f64 => Float,
    Decimal => Decimal,
    String => Text,
    serde_json::Value => Json,
    Uuid => Uuid,
    DateTime<Utc> => Timestamp,
    NaiveDate => Date,
    Vec<u8> => Bytes,
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::Timestamp(v.and_utc())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

/// Conversion out of a [`SqlValue`], used by [`crate::Record::try_get`].
pub trait FromValue: Sized {
    /// Convert the value, returning a human-readable reason on mismatch.
    fn from_value(value: &SqlValue) -> Result<Self, String>;
}

fn mismatch(expected: &str, got: &SqlValue) -> String {
    format!("expected {expected}, got {}", got.kind())
}

impl FromValue for SqlValue {
    fn from_value(value: &SqlValue) -> Result<Self, String> {
        Ok(value.clone())
    }
}

impl FromValue for i64 {
    fn from_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Int(v) => Ok(*v),
            other => Err(mismatch("int", other)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &SqlValue) -> Result<Self, String> {
        let v = i64::from_value(value)?;
        i32::try_from(v).map_err(|e| e.to_string())
    }
}

impl FromValue for i16 {
    fn from_value(value: &SqlValue) -> Result<Self, String> {
        let v = i64::from_value(value)?;
        i16::try_from(v).map_err(|e| e.to_string())
    }
}

impl FromValue for f64 {
    fn from_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Float(v) => Ok(*v),
            SqlValue::Int(v) => Ok(*v as f64),
            SqlValue::Decimal(v) => v
                .to_f64()
                .ok_or_else(|| format!("decimal {v} does not fit in a float")),
            other => Err(mismatch("float", other)),
        }
    }
}

impl FromValue for Decimal {
    fn from_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Decimal(v) => Ok(*v),
            SqlValue::Int(v) => Ok(Decimal::from(*v)),
            SqlValue::Text(v) => v.parse().map_err(|e: rust_decimal::Error| e.to_string()),
            other => Err(mismatch("decimal", other)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Bool(v) => Ok(*v),
            other => Err(mismatch("bool", other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Text(v) => Ok(v.clone()),
            other => Err(mismatch("text", other)),
        }
    }
}

impl FromValue for Uuid {
    fn from_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Uuid(v) => Ok(*v),
            SqlValue::Text(v) => Uuid::parse_str(v).map_err(|e| e.to_string()),
            other => Err(mismatch("uuid", other)),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Timestamp(v) => Ok(*v),
            other => Err(mismatch("timestamp", other)),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Date(v) => Ok(*v),
            other => Err(mismatch("date", other)),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Json(v) => Ok(v.clone()),
            other => Err(mismatch("json", other)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Bytes(v) => Ok(v.clone()),
            other => Err(mismatch("bytes", other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_none_converts_to_null() {
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some("x")), SqlValue::Text("x".into()));
    }

    #[test]
    fn display_renders_plain_text() {
        assert_eq!(SqlValue::Int(5).to_string(), "5");
        assert_eq!(SqlValue::Null.to_string(), "null");
        assert_eq!(SqlValue::Bytes(vec![0xde, 0xad]).to_string(), "\\xdead");
    }

    #[test]
    fn quoted_literal_doubles_single_quotes() {
        let v = SqlValue::from("O'Brien");
        assert_eq!(v.to_quoted_literal(), "'O''Brien'");
    }

    #[test]
    fn from_value_narrows_ints_with_range_check() {
        assert_eq!(i32::from_value(&SqlValue::Int(7)), Ok(7));
        assert!(i16::from_value(&SqlValue::Int(100_000)).is_err());
        assert!(i64::from_value(&SqlValue::Text("7".into())).is_err());
    }

    #[test]
    fn from_value_option_maps_null_to_none() {
        assert_eq!(Option::<String>::from_value(&SqlValue::Null), Ok(None));
        assert_eq!(
            Option::<String>::from_value(&SqlValue::Text("a".into())),
            Ok(Some("a".to_string()))
        );
    }

    #[test]
    fn int_binds_to_int4_column() {
        let mut buf = BytesMut::new();
        let is_null = SqlValue::Int(42).to_sql(&Type::INT4, &mut buf).unwrap();
        assert!(matches!(is_null, IsNull::No));
        assert_eq!(&buf[..], &42_i32.to_be_bytes());
    }

    #[test]
    fn int_out_of_range_for_int2_is_an_error() {
        let mut buf = BytesMut::new();
        assert!(SqlValue::Int(70_000).to_sql(&Type::INT2, &mut buf).is_err());
    }

    #[test]
    fn text_rejects_non_text_column() {
        let mut buf = BytesMut::new();
        assert!(SqlValue::from("x").to_sql(&Type::INT8, &mut buf).is_err());
    }

    #[test]
    fn numbers_bind_to_numeric_column() {
        let mut int_buf = BytesMut::new();
        SqlValue::Int(12).to_sql(&Type::NUMERIC, &mut int_buf).unwrap();
        let mut dec_buf = BytesMut::new();
        Decimal::from(12).to_sql(&Type::NUMERIC, &mut dec_buf).unwrap();
        assert_eq!(int_buf, dec_buf);

        let mut buf = BytesMut::new();
        assert!(
            SqlValue::Float(1.5).to_sql(&Type::NUMERIC, &mut buf).is_ok()
        );
        assert!(
            SqlValue::Float(f64::NAN).to_sql(&Type::NUMERIC, &mut buf).is_err()
        );
    }

    #[test]
    fn text_binds_to_enum_column_as_label() {
        let mood = Type::new(
            "mood".into(),
            90_001,
            Kind::Enum(vec!["todo".into(), "done".into()]),
            "public".into(),
        );
        let mut buf = BytesMut::new();
        SqlValue::from("done").to_sql(&mood, &mut buf).unwrap();
        assert_eq!(&buf[..], b"done");
    }

    #[test]
    fn decimal_reads_from_text_and_int() {
        let price: Decimal = "12.50".parse().unwrap();
        assert_eq!(Decimal::from_value(&SqlValue::Decimal(price)), Ok(price));
        assert_eq!(
            Decimal::from_value(&SqlValue::Text("12.50".into())),
            Ok(price)
        );
        assert_eq!(Decimal::from_value(&SqlValue::Int(3)), Ok(Decimal::from(3)));
        assert_eq!(f64::from_value(&SqlValue::Decimal(price)), Ok(12.5));
        assert_eq!(SqlValue::Decimal(price).to_string(), "12.50");
    }

    #[test]
    fn null_binds_to_any_column() {
        let mut buf = BytesMut::new();
        let is_null = SqlValue::Null.to_sql(&Type::UUID, &mut buf).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
        assert!(buf.is_empty());
    }
}
