//! Schema-free extraction records
//!
//! Extracted data has no fixed schema: which fields a record carries depends
//! on the extraction strategy and the target page. Values are modeled as a
//! closed union rather than raw JSON so the rest of the pipeline stays
//! type-safe, while the serialized form remains plain JSON objects.

use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// One extracted field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Scalar text (scraped cell contents, titles, error notes).
    Text(String),
    /// Normalized numeric value.
    Number(f64),
    /// Ordered sequence of strings (selector match lists, period headers).
    List(Vec<String>),
    /// Ordered sequence of nested records (statement table rows).
    Rows(Vec<Record>),
    /// Nested mapping (per-section or per-period data).
    Map(Record),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_rows(&self) -> Option<&[Record]> {
        match self {
            Value::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Record> {
        match self {
            Value::Map(record) => Some(record),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

/// One extracted unit of data: an insertion-ordered field → value mapping.
///
/// Insertion order is preserved so the persisted JSON reads in page order
/// (url first, then the extracted fields in the order they were found).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    entries: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, replacing the existing value in place if the key is
    /// already present (last write wins, original position kept).
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Text(s) => serializer.serialize_str(s),
            // Whole numbers serialize without a fractional part, so volumes
            // and counts come out as JSON integers.
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Rows(rows) => {
                let mut seq = serializer.serialize_seq(Some(rows.len()))?;
                for row in rows {
                    seq.serialize_element(row)?;
                }
                seq.end()
            }
            Value::Map(record) => record.serialize(serializer),
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string, number, array, or object")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Text(v.to_string()))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Number(v as f64))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Number(v as f64))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Number(v))
    }

    fn visit_str<E>(self, v: &str) -> Result<Value, E> {
        Ok(Value::Text(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Value, E> {
        Ok(Value::Text(v))
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::Text(String::new()))
    }

    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::Text(String::new()))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items: Vec<Value> = Vec::new();
        while let Some(item) = seq.next_element::<Value>()? {
            items.push(item);
        }
        // A sequence is either rows of nested records or a plain string list;
        // anything mixed is coerced to strings.
        if !items.is_empty() && items.iter().all(|v| matches!(v, Value::Map(_))) {
            let rows = items
                .into_iter()
                .map(|v| match v {
                    Value::Map(record) => record,
                    _ => unreachable!(),
                })
                .collect();
            Ok(Value::Rows(rows))
        } else {
            let strings = items
                .into_iter()
                .map(|v| match v {
                    Value::Text(s) => s,
                    Value::Number(n) => n.to_string(),
                    other => format!("{other:?}"),
                })
                .collect();
            Ok(Value::List(strings))
        }
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut record = Record::new();
        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            record.insert(key, value);
        }
        Ok(Value::Map(record))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = Record;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Record, A::Error> {
                let mut record = Record::new();
                while let Some((key, value)) = map.next_entry::<String, Value>()? {
                    record.insert(key, value);
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_preserves_order_and_overwrites_in_place() {
        let mut record = Record::new();
        record.insert("url", Value::from("http://a"));
        record.insert("title", Value::from("first"));
        record.insert("title", Value::from("second"));

        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(keys, vec!["url", "title"]);
        assert_eq!(record.get("title").unwrap().as_text(), Some("second"));
    }

    #[test]
    fn whole_numbers_serialize_as_integers() {
        let mut record = Record::new();
        record.insert("volume", Value::Number(1_500_000.0));
        record.insert("close", Value::Number(34.57));

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"volume":1500000,"close":34.57}"#);
    }

    #[test]
    fn round_trips_nested_rows() {
        let mut row = Record::new();
        row.insert("Conta", Value::from("Revenue"));
        row.insert("2023", Value::from("120.000,00"));
        let mut record = Record::new();
        record.insert("url", Value::from("http://x"));
        record.insert("Balance Sheet", Value::Rows(vec![row]));
        record.insert("periodos", Value::List(vec!["2022".into(), "2023".into()]));

        let json = serde_json::to_string_pretty(&record).unwrap();
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
