/// Cell values and record row maps.
///
/// Every cell in the engine is a `Value`. The focal dataset only carries
/// text, integers, and nulls; floats and booleans appear when arbitrary
/// uploaded files are ingested.

use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// A single table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Null,
}

/// One row of a table, keyed by column name.
pub type Record = HashMap<String, Value>;

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// The display form used by search, filters, and CSV export.
    /// Null renders as the empty string.
    ///
    /// # Examples
    ///
    /// ```
    /// use podgrid::Value;
    ///
    /// assert_eq!(Value::Int(42).to_display(), "42");
    /// assert_eq!(Value::Text("hello".to_string()).to_display(), "hello");
    /// assert_eq!(Value::Null.to_display(), "");
    /// ```
    pub fn to_display(&self) -> String {
        match self {
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Text(v) => v.clone(),
            Value::Bool(v) => v.to_string(),
            Value::Null => String::new(),
        }
    }

    /// Parse a raw text field into a number when it is fully numeric,
    /// otherwise keep it as text. Used by delimited-text ingestion.
    pub fn parse_scalar(raw: &str) -> Value {
        if let Ok(n) = raw.parse::<i64>() {
            return Value::Int(n);
        }
        if let Ok(f) = raw.parse::<f64>() {
            if f.is_finite() {
                return Value::Float(f);
            }
        }
        Value::Text(raw.to_string())
    }

    /// Convert a JSON value into a cell. Nested arrays and objects are kept
    /// as their compact JSON text so no uploaded field is silently dropped.
    pub fn from_json(value: &JsonValue) -> Value {
        match value {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Value::Float(f)
                } else {
                    Value::Null
                }
            }
            JsonValue::String(s) => Value::Text(s.clone()),
            other => Value::Text(other.to_string()),
        }
    }

    /// Convert a cell into a JSON value.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Int(v) => JsonValue::Number((*v).into()),
            Value::Float(v) => serde_json::Number::from_f64(*v)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::Text(v) => JsonValue::String(v.clone()),
            Value::Bool(v) => JsonValue::Bool(*v),
            Value::Null => JsonValue::Null,
        }
    }
}

/// The unique integer identity of a record, when it has one.
///
/// Rows from tables without an `id` column are displayable but not editable.
pub fn record_id(record: &Record) -> Option<i64> {
    match record.get("id") {
        Some(Value::Int(n)) => Some(*n),
        Some(Value::Float(f)) if f.fract() == 0.0 => Some(*f as i64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_forms() {
        assert_eq!(Value::Int(-3).to_display(), "-3");
        assert_eq!(Value::Float(1200.0).to_display(), "1200");
        assert_eq!(Value::Float(2.5).to_display(), "2.5");
        assert_eq!(Value::Bool(true).to_display(), "true");
        assert_eq!(Value::Text("a, b".to_string()).to_display(), "a, b");
        assert_eq!(Value::Null.to_display(), "");
    }

    #[test]
    fn test_parse_scalar() {
        assert_eq!(Value::parse_scalar("42"), Value::Int(42));
        assert_eq!(Value::parse_scalar("-7"), Value::Int(-7));
        assert_eq!(Value::parse_scalar("3.5"), Value::Float(3.5));
        assert_eq!(Value::parse_scalar("hello"), Value::Text("hello".to_string()));
        assert_eq!(Value::parse_scalar(""), Value::Text(String::new()));
        // Not treated as numbers even though f64 would parse them
        assert_eq!(Value::parse_scalar("NaN"), Value::Text("NaN".to_string()));
        assert_eq!(Value::parse_scalar("inf"), Value::Text("inf".to_string()));
    }

    #[test]
    fn test_json_round_trip() {
        let cases = vec![
            Value::Int(7),
            Value::Float(2.25),
            Value::Text("x".to_string()),
            Value::Bool(false),
            Value::Null,
        ];
        for case in cases {
            assert_eq!(Value::from_json(&case.to_json()), case);
        }
    }

    #[test]
    fn test_from_json_nested_kept_as_text() {
        let nested: JsonValue = serde_json::json!({"a": [1, 2]});
        match Value::from_json(&nested) {
            Value::Text(s) => assert!(s.contains("\"a\"")),
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_record_id() {
        let mut record = Record::new();
        assert_eq!(record_id(&record), None);

        record.insert("id".to_string(), Value::Int(12));
        assert_eq!(record_id(&record), Some(12));

        record.insert("id".to_string(), Value::Float(9.0));
        assert_eq!(record_id(&record), Some(9));

        record.insert("id".to_string(), Value::Float(9.5));
        assert_eq!(record_id(&record), None);

        record.insert("id".to_string(), Value::Text("12".to_string()));
        assert_eq!(record_id(&record), None);
    }
}
