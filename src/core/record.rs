/// Read-only named-field view over one fetched row.
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::core::value::Value;
use crate::core::{FluentError, Result};

/// One row of a result set.
///
/// Fields keep the order the columns were fetched in. When a row carries the
/// same column name twice the later value wins and keeps the position of the
/// first occurrence, as an associative fetch does.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    index: usize,
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Builds a record from column/value pairs, tagged with its zero-based
    /// position in the result set.
    pub fn new<I, K>(fields: I, index: usize) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut record = Record {
            index,
            fields: Vec::new(),
        };
        for (name, value) in fields {
            let name = name.into();
            match record.fields.iter_mut().find(|(k, _)| *k == name) {
                Some(slot) => slot.1 = value,
                None => record.fields.push((name, value)),
            }
        }
        record
    }

    /// Zero-based row index within the result set.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Gets a value by column name.
    pub fn get(&self, name: &str) -> Result<&Value> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
            .ok_or_else(|| FluentError::MissingField(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == name)
    }

    /// Column names in fetch order.
    pub fn keys(&self) -> Vec<&str> {
        self.fields.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the row as a plain JSON object, keys in fetch order.
    pub fn to_map(&self) -> serde_json::Map<String, serde_json::Value> {
        self.fields
            .iter()
            .map(|(k, v)| (k.clone(), to_json_value(v)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

fn to_json_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Integer(i) => serde_json::Value::from(*i),
        // NaN and infinities have no JSON form
        Value::Real(r) => serde_json::Number::from_f64(*r)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Blob(b) => serde_json::Value::from(b.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record::new(
            vec![("id", Value::from(1)), ("name", Value::from("Alice"))],
            4,
        )
    }

    #[test]
    fn test_record_get() {
        let record = sample();
        assert_eq!(record.index(), 4);
        assert_eq!(record.get("id").unwrap(), &Value::Integer(1));
        assert_eq!(record.get("name").unwrap().as_str(), Some("Alice"));

        match record.get("missing").unwrap_err() {
            FluentError::MissingField(name) => assert_eq!(name, "missing"),
            other => panic!("Expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn test_keys_keep_fetch_order() {
        let record = Record::new(
            vec![
                ("zeta", Value::Null),
                ("alpha", Value::Null),
                ("mid", Value::Null),
            ],
            0,
        );
        assert_eq!(record.keys(), vec!["zeta", "alpha", "mid"]);
        let map = record.to_map();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_duplicate_column_last_value_wins() {
        let record = Record::new(
            vec![
                ("id", Value::from(1)),
                ("name", Value::from("a")),
                ("id", Value::from(2)),
            ],
            0,
        );
        assert_eq!(record.len(), 2);
        assert_eq!(record.keys(), vec!["id", "name"]);
        assert_eq!(record.get("id").unwrap(), &Value::Integer(2));
    }

    #[test]
    fn test_serialize_matches_to_map() {
        let record = sample();
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"id":1,"name":"Alice"}"#);
        assert_eq!(serde_json::Value::Object(record.to_map()).to_string(), json);
    }
}
