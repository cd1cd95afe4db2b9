use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::{DataError, Value};

/// Category of a persistent property, used for value binding by drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    String,
    Character,
    Boolean,
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    BigDecimal,
    Date,
    Time,
    Timestamp,
    Uuid,
    Json,
    ByteArray,
    Entity,
    Object,
}

impl DataType {
    /// Classify a declared Rust type by its last path segment.
    ///
    /// `Option<T>` classifies as `T`. Unknown types fall back to
    /// [`DataType::Entity`] when flagged as an association, else
    /// [`DataType::Object`].
    pub fn classify(type_name: &str) -> Self {
        let trimmed = type_name.trim();
        if let Some(inner) = generic_inner(trimmed, "Option") {
            return Self::classify(inner);
        }
        if let Some(inner) = generic_inner(trimmed, "Vec") {
            return match last_segment(inner) {
                "u8" => Self::ByteArray,
                _ => Self::Json,
            };
        }

        match last_segment(trimmed) {
            "String" | "str" | "&str" | "Cow" => Self::String,
            "char" => Self::Character,
            "bool" => Self::Boolean,
            "i8" | "u8" => Self::Byte,
            "i16" | "u16" => Self::Short,
            "i32" | "u32" => Self::Integer,
            "i64" | "u64" | "isize" | "usize" | "i128" | "u128" => Self::Long,
            "f32" => Self::Float,
            "f64" => Self::Double,
            "Decimal" | "BigDecimal" => Self::BigDecimal,
            "NaiveDate" => Self::Date,
            "NaiveTime" => Self::Time,
            "DateTime" | "NaiveDateTime" | "SystemTime" => Self::Timestamp,
            "Uuid" => Self::Uuid,
            "Value" | "JsonValue" | "Map" | "HashMap" | "BTreeMap" => Self::Json,
            _ => Self::Object,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Byte
                | Self::Short
                | Self::Integer
                | Self::Long
                | Self::Float
                | Self::Double
                | Self::BigDecimal
        )
    }

    pub fn is_textual(self) -> bool {
        matches!(self, Self::String | Self::Character)
    }

    /// Whether a runtime value can be bound to a column of this type.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::String | Self::Character, Value::Text(_)) => true,
            (Self::Boolean, Value::Boolean(_)) => true,
            (Self::Byte | Self::Short | Self::Integer | Self::Long, Value::Integer(_)) => true,
            (Self::Float | Self::Double | Self::BigDecimal, Value::Float(_) | Value::Integer(_)) => {
                true
            }
            (Self::Date, Value::Date(_)) => true,
            (Self::Timestamp, Value::Timestamp(_)) => true,
            (Self::Time, Value::Text(_)) => true,
            (Self::Uuid, Value::Uuid(_)) => true,
            (Self::Json, _) => true,
            (Self::ByteArray, Value::Bytes(_)) => true,
            (Self::Entity | Self::Object, _) => true,
            _ => false,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::String => "STRING",
            Self::Character => "CHARACTER",
            Self::Boolean => "BOOLEAN",
            Self::Byte => "BYTE",
            Self::Short => "SHORT",
            Self::Integer => "INTEGER",
            Self::Long => "LONG",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::BigDecimal => "BIGDECIMAL",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Timestamp => "TIMESTAMP",
            Self::Uuid => "UUID",
            Self::Json => "JSON",
            Self::ByteArray => "BYTE_ARRAY",
            Self::Entity => "ENTITY",
            Self::Object => "OBJECT",
        };
        f.write_str(label)
    }
}

impl FromStr for DataType {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        let data_type = match normalized.as_str() {
            "STRING" | "TEXT" => Self::String,
            "CHARACTER" | "CHAR" => Self::Character,
            "BOOLEAN" | "BOOL" => Self::Boolean,
            "BYTE" => Self::Byte,
            "SHORT" => Self::Short,
            "INTEGER" | "INT" => Self::Integer,
            "LONG" | "BIGINT" => Self::Long,
            "FLOAT" => Self::Float,
            "DOUBLE" => Self::Double,
            "BIGDECIMAL" | "DECIMAL" => Self::BigDecimal,
            "DATE" => Self::Date,
            "TIME" => Self::Time,
            "TIMESTAMP" => Self::Timestamp,
            "UUID" => Self::Uuid,
            "JSON" => Self::Json,
            "BYTE_ARRAY" | "BYTES" => Self::ByteArray,
            "ENTITY" => Self::Entity,
            "OBJECT" => Self::Object,
            _ => return Err(DataError::Config(format!("unknown data type '{s}'"))),
        };
        Ok(data_type)
    }
}

/// Storage flavour of a JSON-classified property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JsonDataType {
    #[default]
    Default,
    String,
    Blob,
}

impl FromStr for JsonDataType {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "string" => Ok(Self::String),
            "blob" => Ok(Self::Blob),
            _ => Err(DataError::Config(format!("unknown json data type '{s}'"))),
        }
    }
}

fn last_segment(type_name: &str) -> &str {
    let base = type_name.split('<').next().unwrap_or(type_name).trim();
    base.rsplit("::").next().unwrap_or(base).trim()
}

fn generic_inner<'a>(type_name: &'a str, wrapper: &str) -> Option<&'a str> {
    let open = type_name.find('<')?;
    if last_segment(&type_name[..open]) != wrapper || !type_name.ends_with('>') {
        return None;
    }
    Some(&type_name[open + 1..type_name.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_scalars_and_wrappers() {
        assert_eq!(DataType::classify("String"), DataType::String);
        assert_eq!(DataType::classify("i64"), DataType::Long);
        assert_eq!(DataType::classify("Option<i32>"), DataType::Integer);
        assert_eq!(DataType::classify("chrono::DateTime<Utc>"), DataType::Timestamp);
        assert_eq!(DataType::classify("serde_json::Value"), DataType::Json);
        assert_eq!(DataType::classify("Vec<u8>"), DataType::ByteArray);
        assert_eq!(DataType::classify("Author"), DataType::Object);
    }

    #[test]
    fn parses_names() {
        assert_eq!("json".parse::<DataType>().unwrap(), DataType::Json);
        assert!("nope".parse::<DataType>().is_err());
    }
}
