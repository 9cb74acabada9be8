//! Decoded field values and their type tags.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;

/// Raw strings that mean "no value" on the wire (compared trimmed, case-insensitive).
pub const NULL_SENTINELS: [&str; 8] = [
    "N.A.",
    "N.D.",
    "N.S.",
    "NaN",
    "None",
    "UNSPEC",
    "BEFORE MKT",
    "AFTER MKT",
];

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    /// One-dimensional bulk data, or a historical per-date series.
    List(Vec<Value>),
    /// One row of two-dimensional bulk data.
    Tuple(Vec<Value>),
    /// One row of bulk data with named columns.
    Record(Vec<(String, Value)>),
}

impl Value {
    /// Null-value policy: `Null`, empty or sentinel strings, non-finite floats,
    /// and sequences whose elements are all null. Zero is never null.
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Str(s) => is_null_str(s),
            Value::Float(f) => !f.is_finite(),
            Value::List(items) | Value::Tuple(items) => items.iter().all(Value::is_null),
            Value::Record(items) => items.iter().all(|(_, v)| v.is_null()),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

/// True if a raw token is empty or one of the null sentinels.
pub fn is_null_str(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty()
        || NULL_SENTINELS
            .iter()
            .any(|s| s.eq_ignore_ascii_case(trimmed))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", if *b { "Y" } else { "N" }),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y%m%d")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            Value::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            Value::List(items) | Value::Tuple(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Record(items) => {
                let parts: Vec<String> = items.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Value::Float(_) => serializer.serialize_none(),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
            Value::DateTime(dt) => serializer.collect_str(&dt.format("%Y-%m-%dT%H:%M:%S")),
            Value::Time(t) => serializer.collect_str(&t.format("%H:%M:%S")),
            Value::List(items) | Value::Tuple(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Record(items) => {
                let mut map = serializer.serialize_map(Some(items.len()))?;
                for (k, v) in items {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

/// Container type a field decodes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Bool,
    Bulk,
    Str,
    Date,
    DateTime,
    Int,
    Float,
    Time,
    /// Unknown mnemonic; no declared type.
    Object,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Bool => "bool",
            FieldType::Bulk => "bulk",
            FieldType::Str => "str",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Time => "time",
            FieldType::Object => "object",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_null() {
        for raw in ["", "  ", "N.A.", "N.D.", "N.S.", "NaN", "None", "UNSPEC", "BEFORE MKT", "AFTER MKT"] {
            assert!(is_null_str(raw), "{raw:?} should be null");
        }
        assert!(is_null_str("  n.a.  "));
        assert!(is_null_str("after mkt"));
    }

    #[test]
    fn values_are_not_null() {
        assert!(!is_null_str("123"));
        assert!(!is_null_str("hello"));
        assert!(!Value::Int(0).is_null());
        assert!(!Value::Float(0.0).is_null());
        assert!(!Value::Bool(false).is_null());
    }

    #[test]
    fn sequences() {
        assert!(Value::List(vec![]).is_null());
        assert!(Value::List(vec![Value::Null, Value::Null]).is_null());
        assert!(Value::List(vec![Value::Str("N.A.".into()), Value::Str("N.D.".into())]).is_null());
        assert!(!Value::List(vec![Value::Null, Value::Str("value".into())]).is_null());
        assert!(Value::List(vec![Value::List(vec![Value::Null])]).is_null());
    }

    #[test]
    fn serializes_to_json() {
        let v = Value::List(vec![
            Value::Date(NaiveDate::from_ymd_opt(2007, 11, 1).unwrap()),
            Value::Float(f64::NAN),
            Value::Record(vec![("Call Price".into(), Value::Float(101.5))]),
        ]);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"["2007-11-01",null,{"Call Price":101.5}]"#);
    }
}
