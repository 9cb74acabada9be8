//! Decoded rows, remote per-row errors, and the column registry.

use crate::codec::{FieldType, Value};
use chrono::NaiveDate;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::HashSet;

/// One security (or, in historical mode, one security over all dates).
///
/// Status columns are typed; everything else lives in `fields` in response order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub identifier: Option<String>,
    pub retcode: Option<i64>,
    pub nfields: Option<i64>,
    pub fields: Vec<(String, Value)>,
}

impl Row {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.iter_mut().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Set a field, replacing an existing value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.get_mut(&name) {
            Some(slot) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 3))?;
        map.serialize_entry("IDENTIFIER", &self.identifier)?;
        map.serialize_entry("RETCODE", &self.retcode)?;
        map.serialize_entry("NFIELDS", &self.nfields)?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// A security the remote side rejected with a non-zero return code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct ErrorRow {
    pub identifier: String,
    pub retcode: String,
    pub nfields: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub message: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

/// Everything decoded from one or more response files.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RequestResult {
    pub data: Vec<Row>,
    pub errors: Vec<ErrorRow>,
    columns: Vec<Column>,
    #[serde(skip)]
    seen: HashSet<String>,
}

impl RequestResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_type(&self, name: &str) -> Option<FieldType> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.field_type)
    }

    /// Register a column; later registrations of the same name are ignored.
    pub fn push_column(&mut self, name: &str, field_type: FieldType) {
        if self.seen.insert(name.to_string()) {
            self.columns.push(Column {
                name: name.to_string(),
                field_type,
            });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.errors.is_empty() && self.columns.is_empty()
    }

    /// Append another result, keeping first-seen column order.
    pub fn extend(&mut self, other: RequestResult) {
        self.data.extend(other.data);
        self.errors.extend(other.errors);
        for column in other.columns {
            self.push_column(&column.name, column.field_type);
        }
    }

    /// Collapse sequence values of non-bulk fields to a scalar and null out
    /// non-finite numbers, so historical and reference chunks line up.
    pub fn unwrap_single_element_lists(&mut self) {
        let bulk: HashSet<&str> = self
            .columns
            .iter()
            .filter(|c| c.field_type == FieldType::Bulk)
            .map(|c| c.name.as_str())
            .collect();

        for row in &mut self.data {
            for (name, value) in &mut row.fields {
                if !bulk.contains(name.as_str()) {
                    if let Value::List(items) = value {
                        let first = if items.len() == 1 {
                            items.pop()
                        } else {
                            items.drain(..).find(|v| !v.is_null())
                        };
                        *value = first.unwrap_or(Value::Null);
                    }
                }
                drop_non_finite(value);
            }
        }
    }
}

fn drop_non_finite(value: &mut Value) {
    if matches!(value, Value::Float(f) if !f.is_finite()) {
        *value = Value::Null;
        return;
    }
    match value {
        Value::List(items) | Value::Tuple(items) => items.iter_mut().for_each(drop_non_finite),
        Value::Record(pairs) => pairs.iter_mut().for_each(|(_, v)| drop_non_finite(v)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, fields: Vec<(&str, Value)>) -> Row {
        Row {
            identifier: Some(id.into()),
            retcode: Some(0),
            nfields: Some(fields.len() as i64),
            fields: fields
                .into_iter()
                .map(|(n, v)| (n.to_string(), v))
                .collect(),
        }
    }

    #[test]
    fn extend_with_empty_is_noop() {
        let mut result = RequestResult::new();
        result.data.push(row("IBM US Equity", vec![("PX_LAST", Value::Float(1.5))]));
        result.push_column("PX_LAST", FieldType::Float);
        let before = result.clone();

        result.extend(RequestResult::new());
        assert_eq!(result.data, before.data);
        assert_eq!(result.columns(), before.columns());
    }

    #[test]
    fn extend_dedupes_columns() {
        let mut a = RequestResult::new();
        a.push_column("IDENTIFIER", FieldType::Str);
        a.push_column("PX_LAST", FieldType::Float);
        let mut b = RequestResult::new();
        b.push_column("IDENTIFIER", FieldType::Str);
        b.push_column("NAME", FieldType::Str);
        b.errors.push(ErrorRow {
            identifier: "XYZ Equity".into(),
            retcode: "10".into(),
            nfields: Some(0),
            date: None,
            message: None,
        });

        a.extend(b);
        let names: Vec<&str> = a.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["IDENTIFIER", "PX_LAST", "NAME"]);
        assert_eq!(a.errors.len(), 1);
    }

    #[test]
    fn unwrap_collapses_sequences() {
        let mut result = RequestResult::new();
        result.push_column("PX_LAST", FieldType::Float);
        result.push_column("NAME", FieldType::Str);
        result.push_column("CALL_SCHEDULE", FieldType::Bulk);
        result.data.push(row(
            "IBM US Equity",
            vec![
                ("PX_LAST", Value::List(vec![Value::Null, Value::Float(2.0)])),
                ("NAME", Value::List(vec![Value::Str("IBM".into())])),
                ("CALL_SCHEDULE", Value::List(vec![Value::Int(1)])),
                ("YIELD", Value::Float(f64::NAN)),
                ("EMPTY", Value::List(vec![Value::Null, Value::Null])),
            ],
        ));

        result.unwrap_single_element_lists();
        let r = &result.data[0];
        assert_eq!(r.get("PX_LAST"), Some(&Value::Float(2.0)));
        assert_eq!(r.get("NAME"), Some(&Value::Str("IBM".into())));
        assert_eq!(r.get("CALL_SCHEDULE"), Some(&Value::List(vec![Value::Int(1)])));
        assert_eq!(r.get("YIELD"), Some(&Value::Null));
        assert_eq!(r.get("EMPTY"), Some(&Value::Null));
    }

    #[test]
    fn row_serializes_flat() {
        let r = row("IBM US Equity", vec![("PX_LAST", Value::Float(1.5))]);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["IDENTIFIER"], "IBM US Equity");
        assert_eq!(json["RETCODE"], 0);
        assert_eq!(json["PX_LAST"], 1.5);
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut r = Row::default();
        r.insert("A", Value::Int(1));
        r.insert("B", Value::Int(2));
        r.insert("A", Value::Int(3));
        assert_eq!(r.fields[0], ("A".to_string(), Value::Int(3)));
        assert_eq!(r.fields.len(), 2);
    }
}
