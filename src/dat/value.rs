// src/dat/value.rs

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// One decoded cell. Array cells hold scalar elements only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Resolved row index in the referenced table.
    Key(u64),
    Array(Vec<Value>),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_key(&self) -> Option<u64> {
        match self {
            Value::Key(k) => Some(*k),
            _ => None,
        }
    }
}

/// One exported row: an ordered field list with a synthetic `_index`
/// column always serialized first. Field order is the header order the
/// row was materialized with, not insertion-order happenstance.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    index: usize,
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new(index: usize, fields: Vec<(String, Value)>) -> Self {
        Self { index, fields }
    }

    /// Zero-based row position in the source table.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Look up a field by column name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry("_index", &self.index)?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
