use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use thiserror::Error;

/// Dynamically typed scalar used for bound parameters and decoded columns
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Json(Value),
    /// Column whose database type the executor cannot decode. Harmless unless
    /// a record field is mapped onto it.
    Unsupported(String),
}

impl SqlValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "NULL",
            SqlValue::Bool(_) => "bool",
            SqlValue::Int(_) => "integer",
            SqlValue::Float(_) => "float",
            SqlValue::Text(_) => "text",
            SqlValue::Timestamp(_) => "timestamp",
            SqlValue::Json(_) => "json",
            SqlValue::Unsupported(_) => "unsupported",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

/// Conversion failures while moving a column value into a record field
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    #[error("cannot convert {found} into {expected}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("cannot parse '{text}' as {expected}")]
    InvalidText { expected: &'static str, text: String },

    #[error("value {value} out of range for {expected}")]
    OutOfRange { expected: &'static str, value: i64 },

    #[error("unsupported database type {0}")]
    UnsupportedType(String),
}

impl ValueError {
    fn mismatch(expected: &'static str, found: &SqlValue) -> Self {
        match found {
            SqlValue::Unsupported(type_name) => ValueError::UnsupportedType(type_name.clone()),
            other => ValueError::Mismatch {
                expected,
                found: other.type_name(),
            },
        }
    }
}

/// Decode step for a single record field
pub trait FromSqlValue: Sized {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError>;
}

impl FromSqlValue for SqlValue {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        Ok(value)
    }
}

impl FromSqlValue for i64 {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Int(i) => Ok(i),
            SqlValue::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| ValueError::InvalidText { expected: "integer", text }),
            other => Err(ValueError::mismatch("integer", &other)),
        }
    }
}

impl FromSqlValue for i32 {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        let wide = i64::from_sql_value(value)?;
        i32::try_from(wide).map_err(|_| ValueError::OutOfRange {
            expected: "i32",
            value: wide,
        })
    }
}

impl FromSqlValue for f64 {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Float(f) => Ok(f),
            SqlValue::Int(i) => Ok(i as f64),
            SqlValue::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| ValueError::InvalidText { expected: "float", text }),
            other => Err(ValueError::mismatch("float", &other)),
        }
    }
}

impl FromSqlValue for bool {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Bool(b) => Ok(b),
            SqlValue::Int(0) => Ok(false),
            SqlValue::Int(1) => Ok(true),
            SqlValue::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "t" | "true" | "1" => Ok(true),
                "f" | "false" | "0" => Ok(false),
                _ => Err(ValueError::InvalidText { expected: "bool", text }),
            },
            other => Err(ValueError::mismatch("bool", &other)),
        }
    }
}

impl FromSqlValue for String {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Text(s) => Ok(s),
            SqlValue::Int(i) => Ok(i.to_string()),
            SqlValue::Float(f) => Ok(f.to_string()),
            SqlValue::Bool(b) => Ok(b.to_string()),
            SqlValue::Timestamp(ts) => Ok(ts.to_rfc3339()),
            SqlValue::Json(v) => Ok(v.to_string()),
            other => Err(ValueError::mismatch("text", &other)),
        }
    }
}

impl FromSqlValue for DateTime<Utc> {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Timestamp(ts) => Ok(ts),
            SqlValue::Text(text) => parse_timestamp(&text)
                .ok_or(ValueError::InvalidText { expected: "timestamp", text }),
            other => Err(ValueError::mismatch("timestamp", &other)),
        }
    }
}

impl FromSqlValue for Value {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Null => Ok(Value::Null),
            SqlValue::Bool(b) => Ok(Value::Bool(b)),
            SqlValue::Int(i) => Ok(Value::from(i)),
            SqlValue::Float(f) => Ok(Value::from(f)),
            SqlValue::Text(s) => Ok(Value::String(s)),
            SqlValue::Timestamp(ts) => Ok(Value::String(ts.to_rfc3339())),
            SqlValue::Json(v) => Ok(v),
            other => Err(ValueError::mismatch("json", &other)),
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Null => Ok(None),
            other => T::from_sql_value(other).map(Some),
        }
    }
}

/// Accepts RFC 3339 as well as the `YYYY-MM-DD HH:MM:SS` layout Postgres prints
fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v.into())
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&String> for SqlValue {
    fn from(v: &String) -> Self {
        SqlValue::Text(v.clone())
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// JSON request payloads map onto scalars where possible; arrays and objects bind as JSONB
impl From<Value> for SqlValue {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlValue::Int(i)
                } else if let Some(f) = n.as_f64() {
                    SqlValue::Float(f)
                } else {
                    SqlValue::Text(n.to_string())
                }
            }
            Value::String(s) => SqlValue::Text(s),
            other => SqlValue::Json(other),
        }
    }
}
