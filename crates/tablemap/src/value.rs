//! Bindable values and the field codec.
//!
//! [`Value`] is what crosses the execution boundary in both directions.
//! [`SqlField`] converts a struct field to a bound parameter and reads a
//! column value back into the field. Only six scalar kinds are supported;
//! every other field type reports [`FieldKind::Unsupported`] and fails with
//! [`OrmError::UnsupportedFieldKind`] instead of being silently skipped, since
//! positional binding relies on every column being represented.

use crate::error::{OrmError, OrmResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of field kinds the mapper can bind and scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Int,
    UInt,
    Float,
    Text,
    Bool,
    Timestamp,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Int => "int",
            ValueKind::UInt => "uint",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
            ValueKind::Bool => "bool",
            ValueKind::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a declared struct field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// One of the supported scalar kinds.
    Scalar(ValueKind),
    /// Anything else; carries a readable type name for error messages.
    Unsupported(&'static str),
}

impl FieldKind {
    pub fn scalar(&self) -> Option<ValueKind> {
        match self {
            FieldKind::Scalar(kind) => Some(*kind),
            FieldKind::Unsupported(_) => None,
        }
    }
}

/// A driver-bindable scalar.
///
/// Booleans have no variant of their own: they are bound as `Int(1)` / `Int(0)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Timestamp(_) => "timestamp",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Convert a raw column value into the scratch representation for `kind`.
    ///
    /// The result is always `Int` for `Int` and `Bool` targets, `UInt` for
    /// `UInt`, `Float` for `Float`, `Text` for `Text` and `Timestamp` for
    /// `Timestamp`. `NULL` cannot be read into any kind.
    pub fn coerce(self, kind: ValueKind, column: &str) -> OrmResult<Value> {
        let mismatch = |v: &Value| {
            OrmError::scan(
                column,
                format!("cannot read {} into {kind}", v.type_name()),
            )
        };

        match kind {
            ValueKind::Int => match self {
                Value::Int(v) => Ok(Value::Int(v)),
                Value::UInt(v) => i64::try_from(v)
                    .map(Value::Int)
                    .map_err(|_| OrmError::scan(column, format!("{v} overflows int"))),
                Value::Text(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|e| OrmError::scan(column, format!("invalid int '{s}': {e}"))),
                other => Err(mismatch(&other)),
            },
            ValueKind::UInt => match self {
                Value::UInt(v) => Ok(Value::UInt(v)),
                Value::Int(v) => u64::try_from(v)
                    .map(Value::UInt)
                    .map_err(|_| OrmError::scan(column, format!("{v} is negative"))),
                Value::Text(s) => s
                    .trim()
                    .parse::<u64>()
                    .map(Value::UInt)
                    .map_err(|e| OrmError::scan(column, format!("invalid uint '{s}': {e}"))),
                other => Err(mismatch(&other)),
            },
            ValueKind::Float => match self {
                Value::Float(v) => Ok(Value::Float(v)),
                Value::Int(v) => Ok(Value::Float(v as f64)),
                Value::UInt(v) => Ok(Value::Float(v as f64)),
                Value::Text(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|e| OrmError::scan(column, format!("invalid float '{s}': {e}"))),
                other => Err(mismatch(&other)),
            },
            ValueKind::Text => match self {
                Value::Text(s) => Ok(Value::Text(s)),
                Value::Int(v) => Ok(Value::Text(v.to_string())),
                Value::UInt(v) => Ok(Value::Text(v.to_string())),
                Value::Float(v) => Ok(Value::Text(v.to_string())),
                other => Err(mismatch(&other)),
            },
            ValueKind::Bool => match self {
                Value::Int(v) => Ok(Value::Int(i64::from(v != 0))),
                Value::UInt(v) => Ok(Value::Int(i64::from(v != 0))),
                Value::Text(s) => match s.trim() {
                    "1" | "true" | "TRUE" | "t" => Ok(Value::Int(1)),
                    "0" | "false" | "FALSE" | "f" => Ok(Value::Int(0)),
                    other => Err(OrmError::scan(column, format!("invalid bool '{other}'"))),
                },
                other => Err(mismatch(&other)),
            },
            ValueKind::Timestamp => match self {
                Value::Timestamp(t) => Ok(Value::Timestamp(t)),
                Value::Text(s) => DateTime::parse_from_rfc3339(s.trim())
                    .map(|t| Value::Timestamp(t.with_timezone(&Utc)))
                    .map_err(|e| OrmError::scan(column, format!("invalid timestamp '{s}': {e}"))),
                other => Err(mismatch(&other)),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => write!(f, "'{s}'"),
            Value::Timestamp(t) => write!(f, "'{}'", t.to_rfc3339()),
        }
    }
}

macro_rules! impl_from_for_value {
    ($variant:ident as $target:ty: $($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v as $target)
                }
            }
        )*
    };
}

impl_from_for_value!(Int as i64: i8, i16, i32, i64, isize);
impl_from_for_value!(UInt as u64: u8, u16, u32, u64, usize);
impl_from_for_value!(Float as f64: f32, f64);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v.and_utc())
    }
}

/// Field codec between a struct field and a bindable [`Value`].
///
/// Implemented for the supported scalar types; `#[derive(Entity)]` relies on
/// it for every non-skipped field.
pub trait SqlField: Sized {
    /// Kind captured into the entity descriptor.
    const KIND: FieldKind;

    /// Convert the field into a bound parameter.
    fn to_param(&self) -> OrmResult<Value>;

    /// Read a column value back into the field type.
    fn from_column(value: Value, column: &str) -> OrmResult<Self>;
}

fn unsupported(type_name: &str) -> OrmError {
    OrmError::UnsupportedFieldKind {
        entity: String::new(),
        field: String::new(),
        type_name: type_name.to_string(),
    }
}

fn unexpected(column: &str, value: &Value, kind: ValueKind) -> OrmError {
    OrmError::scan(
        column,
        format!("cannot read {} into {kind}", value.type_name()),
    )
}

macro_rules! impl_sql_field_int {
    ($kind:ident, $variant:ident, $wide:ty: $($t:ty),*) => {
        $(
            impl SqlField for $t {
                const KIND: FieldKind = FieldKind::Scalar(ValueKind::$kind);

                fn to_param(&self) -> OrmResult<Value> {
                    Ok(Value::$variant(*self as $wide))
                }

                fn from_column(value: Value, column: &str) -> OrmResult<Self> {
                    match value.coerce(ValueKind::$kind, column)? {
                        Value::$variant(v) => <$t>::try_from(v).map_err(|_| {
                            OrmError::scan(
                                column,
                                format!("{v} out of range for {}", stringify!($t)),
                            )
                        }),
                        other => Err(unexpected(column, &other, ValueKind::$kind)),
                    }
                }
            }
        )*
    };
}

impl_sql_field_int!(Int, Int, i64: i8, i16, i32, i64, isize);
impl_sql_field_int!(UInt, UInt, u64: u8, u16, u32, u64, usize);

impl SqlField for f64 {
    const KIND: FieldKind = FieldKind::Scalar(ValueKind::Float);

    fn to_param(&self) -> OrmResult<Value> {
        Ok(Value::Float(*self))
    }

    fn from_column(value: Value, column: &str) -> OrmResult<Self> {
        match value.coerce(ValueKind::Float, column)? {
            Value::Float(v) => Ok(v),
            other => Err(unexpected(column, &other, ValueKind::Float)),
        }
    }
}

impl SqlField for f32 {
    const KIND: FieldKind = FieldKind::Scalar(ValueKind::Float);

    fn to_param(&self) -> OrmResult<Value> {
        Ok(Value::Float(f64::from(*self)))
    }

    fn from_column(value: Value, column: &str) -> OrmResult<Self> {
        f64::from_column(value, column).map(|v| v as f32)
    }
}

impl SqlField for String {
    const KIND: FieldKind = FieldKind::Scalar(ValueKind::Text);

    fn to_param(&self) -> OrmResult<Value> {
        Ok(Value::Text(self.clone()))
    }

    fn from_column(value: Value, column: &str) -> OrmResult<Self> {
        match value.coerce(ValueKind::Text, column)? {
            Value::Text(s) => Ok(s),
            other => Err(unexpected(column, &other, ValueKind::Text)),
        }
    }
}

impl SqlField for bool {
    const KIND: FieldKind = FieldKind::Scalar(ValueKind::Bool);

    fn to_param(&self) -> OrmResult<Value> {
        Ok(Value::Int(if *self { 1 } else { 0 }))
    }

    fn from_column(value: Value, column: &str) -> OrmResult<Self> {
        match value.coerce(ValueKind::Bool, column)? {
            Value::Int(v) => Ok(v != 0),
            other => Err(unexpected(column, &other, ValueKind::Bool)),
        }
    }
}

impl SqlField for DateTime<Utc> {
    const KIND: FieldKind = FieldKind::Scalar(ValueKind::Timestamp);

    fn to_param(&self) -> OrmResult<Value> {
        Ok(Value::Timestamp(*self))
    }

    fn from_column(value: Value, column: &str) -> OrmResult<Self> {
        match value.coerce(ValueKind::Timestamp, column)? {
            Value::Timestamp(t) => Ok(t),
            other => Err(unexpected(column, &other, ValueKind::Timestamp)),
        }
    }
}

impl SqlField for NaiveDateTime {
    const KIND: FieldKind = FieldKind::Scalar(ValueKind::Timestamp);

    fn to_param(&self) -> OrmResult<Value> {
        Ok(Value::Timestamp(self.and_utc()))
    }

    fn from_column(value: Value, column: &str) -> OrmResult<Self> {
        DateTime::<Utc>::from_column(value, column).map(|t| t.naive_utc())
    }
}

// Types below derive fine but are rejected when the entity is described.

impl<T> SqlField for Option<T> {
    const KIND: FieldKind = FieldKind::Unsupported("Option<_>");

    fn to_param(&self) -> OrmResult<Value> {
        Err(unsupported("Option<_>"))
    }

    fn from_column(_value: Value, _column: &str) -> OrmResult<Self> {
        Err(unsupported("Option<_>"))
    }
}

impl<T> SqlField for Vec<T> {
    const KIND: FieldKind = FieldKind::Unsupported("Vec<_>");

    fn to_param(&self) -> OrmResult<Value> {
        Err(unsupported("Vec<_>"))
    }

    fn from_column(_value: Value, _column: &str) -> OrmResult<Self> {
        Err(unsupported("Vec<_>"))
    }
}

impl SqlField for serde_json::Value {
    const KIND: FieldKind = FieldKind::Unsupported("serde_json::Value");

    fn to_param(&self) -> OrmResult<Value> {
        Err(unsupported("serde_json::Value"))
    }

    fn from_column(_value: Value, _column: &str) -> OrmResult<Self> {
        Err(unsupported("serde_json::Value"))
    }
}
