use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::core::{DataError, Result};

/// A single bound or persisted value, as exchanged with drivers.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
    Json(serde_json::Value),
    Bytes(Vec<u8>),
    /// Multi-valued parameter, e.g. the right-hand side of `IN`.
    List(Vec<Value>),
}

impl Value {
    pub fn list<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::List(values.into_iter().map(Into::into).collect())
    }

    pub fn compare(&self, other: &Value) -> Result<Ordering> {
        match (self, other) {
            // ========================================
            // NULL handling: NULL sorts last
            // ========================================
            (Value::Null, Value::Null) => Ok(Ordering::Equal),
            (Value::Null, _) => Ok(Ordering::Greater),
            (_, Value::Null) => Ok(Ordering::Less),

            // ========================================
            // Same type comparisons
            // ========================================
            (Value::Integer(a), Value::Integer(b)) => Ok(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => Ok(compare_floats(*a, *b)),
            (Value::Text(a), Value::Text(b)) => Ok(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Ok(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Ok(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Ok(a.cmp(b)),
            (Value::Uuid(a), Value::Uuid(b)) => Ok(a.cmp(b)),
            (Value::Bytes(a), Value::Bytes(b)) => Ok(a.cmp(b)),
            (Value::List(a), Value::List(b)) => {
                for (left, right) in a.iter().zip(b.iter()) {
                    let ordering = left.compare(right)?;
                    if ordering != Ordering::Equal {
                        return Ok(ordering);
                    }
                }
                Ok(a.len().cmp(&b.len()))
            }

            // ========================================
            // Mixed numeric types (implicit coercion)
            // ========================================
            (Value::Integer(a), Value::Float(b)) => Ok(compare_floats(*a as f64, *b)),
            (Value::Float(a), Value::Integer(b)) => Ok(compare_floats(*a, *b as f64)),

            _ => Err(DataError::TypeMismatch(format!(
                "Cannot compare incompatible types: {} and {}",
                self.type_name(),
                other.type_name()
            ))),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Integer(_) => "INTEGER",
            Self::Float(_) => "FLOAT",
            Self::Text(_) => "TEXT",
            Self::Boolean(_) => "BOOLEAN",
            Self::Date(_) => "DATE",
            Self::Timestamp(_) => "TIMESTAMP",
            Self::Uuid(_) => "UUID",
            Self::Json(_) => "JSON",
            Self::Bytes(_) => "BYTES",
            Self::List(_) => "LIST",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Float(f) => {
                if f.is_finite() && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    Some(*f as i64)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Float(_))
    }

    /// Empty text, empty byte array, empty JSON array/object or NULL.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.is_empty(),
            Self::Bytes(b) => b.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Json(serde_json::Value::Array(items)) => items.is_empty(),
            Self::Json(serde_json::Value::Object(fields)) => fields.is_empty(),
            Self::Json(serde_json::Value::Null) => true,
            _ => false,
        }
    }
}

fn compare_floats(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => {
                if a.is_nan() && b.is_nan() {
                    return true;
                }
                (a - b).abs() < f64::EPSILON
            }
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Timestamp(a), Self::Timestamp(b)) => a == b,
            (Self::Uuid(a), Self::Uuid(b)) => a == b,
            (Self::Json(a), Self::Json(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Integer(i), Self::Float(f)) | (Self::Float(f), Self::Integer(i)) => {
                (*i as f64 - f).abs() < f64::EPSILON
            }
            _ => false,
        }
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(other).ok()
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Null => 0u8.hash(state),
            // integers and floats compare equal across variants, so both hash through f64 bits
            Self::Integer(i) => {
                1u8.hash(state);
                (*i as f64).to_bits().hash(state);
            }
            Self::Float(f) => {
                1u8.hash(state);
                f.to_bits().hash(state);
            }
            Self::Text(s) => {
                3u8.hash(state);
                s.hash(state);
            }
            Self::Boolean(b) => {
                4u8.hash(state);
                b.hash(state);
            }
            Self::Date(d) => {
                5u8.hash(state);
                d.hash(state);
            }
            Self::Timestamp(t) => {
                6u8.hash(state);
                t.hash(state);
            }
            Self::Uuid(u) => {
                7u8.hash(state);
                u.hash(state);
            }
            Self::Json(j) => {
                8u8.hash(state);
                j.to_string().hash(state);
            }
            Self::Bytes(b) => {
                9u8.hash(state);
                b.hash(state);
            }
            Self::List(items) => {
                10u8.hash(state);
                items.hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(fl) => {
                if fl.is_nan() {
                    write!(f, "NaN")
                } else if fl.is_infinite() {
                    if *fl > 0.0 {
                        write!(f, "Infinity")
                    } else {
                        write!(f, "-Infinity")
                    }
                } else {
                    write!(f, "{fl}")
                }
            }
            Self::Text(s) => write!(f, "{s}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Date(d) => write!(f, "{d}"),
            Self::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Json(j) => write!(f, "{j}"),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::List(items) => {
                let rendered: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
        }
    }
}

// ============================================================================
// Rust values -> Value
// ============================================================================

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<i16> for Value {
    fn from(i: i16) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Self::Float(f64::from(f))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Self::Timestamp(t)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

impl From<serde_json::Value> for Value {
    fn from(j: serde_json::Value) -> Self {
        Self::Json(j)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

// ============================================================================
// Value -> Rust values (used by hydration)
// ============================================================================

/// Fallible conversion out of a persisted [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch<T>(expected: &str, value: &Value) -> Result<T> {
    Err(DataError::TypeMismatch(format!(
        "expected {expected}, got {}",
        value.type_name()
    )))
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Integer(i) => Ok(i),
            other => other.as_i64().map_or_else(|| mismatch("INTEGER", &other), Ok),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Result<Self> {
        let wide = i64::from_value(value)?;
        i32::try_from(wide)
            .map_err(|_| DataError::TypeMismatch(format!("{wide} does not fit into i32")))
    }
}

impl FromValue for i16 {
    fn from_value(value: Value) -> Result<Self> {
        let wide = i64::from_value(value)?;
        i16::try_from(wide)
            .map_err(|_| DataError::TypeMismatch(format!("{wide} does not fit into i16")))
    }
}

impl FromValue for u32 {
    fn from_value(value: Value) -> Result<Self> {
        let wide = i64::from_value(value)?;
        u32::try_from(wide)
            .map_err(|_| DataError::TypeMismatch(format!("{wide} does not fit into u32")))
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self> {
        value.as_f64().map_or_else(|| mismatch("FLOAT", &value), Ok)
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s),
            other => mismatch("TEXT", &other),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Boolean(b) => Ok(b),
            Value::Integer(i) => Ok(i != 0),
            other => mismatch("BOOLEAN", &other),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Date(d) => Ok(d),
            Value::Timestamp(t) => Ok(t.date_naive()),
            Value::Text(s) => s
                .parse()
                .map_err(|err| DataError::TypeMismatch(format!("invalid date '{s}': {err}"))),
            other => mismatch("DATE", &other),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Timestamp(t) => Ok(t),
            Value::Text(s) => DateTime::parse_from_rfc3339(&s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|err| DataError::TypeMismatch(format!("invalid timestamp '{s}': {err}"))),
            other => mismatch("TIMESTAMP", &other),
        }
    }
}

impl FromValue for Uuid {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Uuid(u) => Ok(u),
            Value::Text(s) => Uuid::parse_str(&s)
                .map_err(|err| DataError::TypeMismatch(format!("invalid uuid '{s}': {err}"))),
            other => mismatch("UUID", &other),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Json(j) => Ok(j),
            Value::Text(s) => serde_json::from_str(&s)
                .map_err(|err| DataError::TypeMismatch(format!("invalid json: {err}"))),
            Value::Null => Ok(serde_json::Value::Null),
            other => mismatch("JSON", &other),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bytes(b) => Ok(b),
            other => mismatch("BYTES", &other),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_equality() {
        assert_eq!(Value::Integer(42), Value::Integer(42));
        assert_eq!(Value::Float(2.5), Value::Float(2.5));
        assert_eq!(Value::Integer(3), Value::Float(3.0));
        assert_ne!(Value::Integer(1), Value::Integer(2));
    }

    #[test]
    fn test_value_ordering_puts_null_last() {
        assert!(Value::Integer(1) < Value::Integer(2));
        assert!(Value::Text("a".into()) < Value::Text("b".into()));
        assert_eq!(
            Value::Null.compare(&Value::Integer(0)).unwrap(),
            Ordering::Greater
        );
    }

    #[test]
    fn test_incompatible_compare_fails() {
        let err = Value::Text("a".into()).compare(&Value::Integer(1)).unwrap_err();
        assert!(matches!(err, DataError::TypeMismatch(_)));
    }

    #[test]
    fn test_option_round_trip() {
        let none: Option<i64> = None;
        assert_eq!(Value::from(none), Value::Null);
        assert_eq!(Option::<i64>::from_value(Value::Null).unwrap(), None);
        assert_eq!(Option::<i64>::from_value(Value::Integer(7)).unwrap(), Some(7));
    }

    #[test]
    fn test_narrowing_rejects_overflow() {
        assert!(i32::from_value(Value::Integer(i64::MAX)).is_err());
        assert_eq!(i32::from_value(Value::Integer(12)).unwrap(), 12);
    }
}
