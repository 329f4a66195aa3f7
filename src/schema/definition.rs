//! Core schema definition types.
//!
//! Describes the columns, indexes and relationships of one collection. These
//! types are deserialized straight from the configuration file and are
//! read-only once the [`Schema`](super::Schema) is built.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value as JsonValue};

use crate::error::{ApiError, Result};

/// Column data type; decides how RQL literals are bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// String/text data
    #[default]
    String,
    /// Integer data
    Int,
    /// Floating point or decimal data
    #[serde(alias = "float", alias = "decimal")]
    Number,
    /// Boolean data
    Bool,
    /// Timestamp, bound as an RFC 3339 string
    Date,
}

impl DataType {
    pub fn name(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Int => "int",
            DataType::Number => "number",
            DataType::Bool => "bool",
            DataType::Date => "date",
        }
    }

    /// Convert a raw RQL literal into a typed bind value.
    pub fn bind(&self, property: &str, raw: &str) -> Result<JsonValue> {
        let invalid = || ApiError::InvalidValue {
            property: property.to_string(),
            value: raw.to_string(),
            expected: self.name(),
        };
        match self {
            DataType::String => Ok(JsonValue::String(raw.to_string())),
            DataType::Int => raw.trim().parse::<i64>().map(JsonValue::from).map_err(|_| invalid()),
            DataType::Number => {
                let raw = raw.trim();
                if let Ok(n) = raw.parse::<i64>() {
                    return Ok(JsonValue::from(n));
                }
                raw.parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(JsonValue::Number)
                    .ok_or_else(invalid)
            }
            DataType::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(JsonValue::Bool(true)),
                "false" | "0" => Ok(JsonValue::Bool(false)),
                _ => Err(invalid()),
            },
            DataType::Date => parse_date(raw)
                .map(|d| JsonValue::String(d.to_rfc3339_opts(SecondsFormat::Secs, true)))
                .ok_or_else(invalid),
        }
    }
}

/// Parse the date shapes accepted in RQL: RFC 3339, `YYYY-MM-DDTHH:MM[:SS]`, or `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(d) = DateTime::parse_from_rfc3339(raw) {
        return Some(d.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(d) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(d.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
}

/// A property of a collection, mapped onto one physical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Logical name used in RQL and documents (e.g. "shipCountry")
    pub name: String,

    /// Physical column name; defaults to `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,

    #[serde(rename = "type", default)]
    pub data_type: DataType,
}

impl Property {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Property {
            name: name.into(),
            column: None,
            data_type,
        }
    }

    pub fn column(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }

    pub fn bind(&self, raw: &str) -> Result<JsonValue> {
        self.data_type.bind(&self.name, raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    Primary,
    Unique,
    #[default]
    Other,
}

/// An ordered list of property names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,

    #[serde(default)]
    pub kind: IndexKind,

    pub columns: Vec<String>,
}

impl Index {
    pub fn new(name: impl Into<String>, kind: IndexKind, columns: &[&str]) -> Self {
        Index {
            name: name.into(),
            kind,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn is_unique(&self) -> bool {
        matches!(self.kind, IndexKind::Primary | IndexKind::Unique)
    }
}

/// A foreign-key style link from this collection to another.
///
/// `columns` are properties of this collection holding the related entity's key,
/// in the order of the related collection's primary index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub name: String,
    pub related: String,
    pub columns: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(DataType::String, "10248", json!("10248"))]
    #[case(DataType::Int, "42", json!(42))]
    #[case(DataType::Number, "10", json!(10))]
    #[case(DataType::Number, "3.67", json!(3.67))]
    #[case(DataType::Bool, "TRUE", json!(true))]
    #[case(DataType::Bool, "0", json!(false))]
    #[case(DataType::Date, "2024-01-05", json!("2024-01-05T00:00:00Z"))]
    #[case(DataType::Date, "2024-01-05T10:30", json!("2024-01-05T10:30:00Z"))]
    #[case(DataType::Date, "2024-01-05T10:30:00+02:00", json!("2024-01-05T08:30:00Z"))]
    fn test_bind_typed_values(#[case] data_type: DataType, #[case] raw: &str, #[case] expected: JsonValue) {
        assert_eq!(data_type.bind("p", raw).unwrap(), expected);
    }

    #[rstest]
    #[case(DataType::Int, "4.5")]
    #[case(DataType::Number, "ten")]
    #[case(DataType::Bool, "yes")]
    #[case(DataType::Date, "05/01/2024")]
    fn test_bind_rejects_malformed(#[case] data_type: DataType, #[case] raw: &str) {
        let err = data_type.bind("freight", raw).unwrap_err();
        assert_eq!(err.status().code(), 400);
        assert!(err.to_string().contains("freight"));
    }

    #[test]
    fn test_property_column_defaults_to_name() {
        let plain = Property::new("shipCity", DataType::String);
        assert_eq!(plain.column(), "shipCity");

        let mapped: Property = serde_json::from_str(r#"{"name":"city","column":"ship_city"}"#).unwrap();
        assert_eq!(mapped.column(), "ship_city");
        assert_eq!(mapped.data_type, DataType::String);
    }

    #[test]
    fn test_index_kind_deserialization() {
        let index: Index = serde_json::from_str(r#"{"name":"pk","kind":"primary","columns":["a","b"]}"#).unwrap();
        assert!(index.is_unique());
        let index: Index = serde_json::from_str(r#"{"name":"PartitionKey","columns":["a"]}"#).unwrap();
        assert_eq!(index.kind, IndexKind::Other);
        assert!(!index.is_unique());
    }

    #[test]
    fn test_number_type_aliases() {
        let t: DataType = serde_json::from_str(r#""float""#).unwrap();
        assert_eq!(t, DataType::Number);
    }
}
