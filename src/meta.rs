//! Content metadata.
//!
//! [`Meta`] is the flat-looking key/value map every reader produces and every
//! entity carries. Two rules make it behave like front matter users expect:
//!
//! - keys are case-insensitive (stored lowercased, nested maps included)
//! - dotted keys address nested maps: `formats.atom.path` ⇔ `{formats: {atom: {path}}}`
//!
//! Values are `serde_json::Value`, so the map serializes straight into render
//! variables without any reflection step.

use serde::Serialize;
use serde_json::{Map, Value};

/// Case-insensitive metadata map.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Meta(Map<String, Value>);

impl Meta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object; any other value yields an empty map.
    pub fn from_value(value: Value) -> Self {
        let mut meta = Self::new();
        if let Value::Object(map) = value {
            for (k, v) in map {
                meta.insert(&k, v);
            }
        }
        meta
    }

    /// Build from a parsed TOML table.
    pub fn from_toml(table: &toml::Table) -> Self {
        let mut meta = Self::new();
        for (k, v) in table {
            meta.insert(k, toml_to_json(v));
        }
        meta
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Insert a value. A dotted key writes into (and creates) nested maps.
    pub fn insert(&mut self, key: &str, value: Value) {
        let key = key.to_lowercase();
        insert_path(&mut self.0, &key, normalize(value));
    }

    /// Look a key up, trying the literal key first and then dotted traversal.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let key = key.to_lowercase();
        if let Some(v) = self.0.get(&key) {
            return Some(v);
        }
        let mut parts = key.split('.');
        let mut current = self.0.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove a top-level key.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(&key.to_lowercase())
    }

    /// Overlay `other` onto `self`: `other` wins key by key, nested maps merge recursively.
    pub fn merge(&mut self, other: &Meta) {
        for (k, v) in &other.0 {
            merge_value(&mut self.0, k, v);
        }
    }

    /// Non-empty string value. Numbers and booleans are rendered to text.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> bool {
        match self.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1"),
            Some(Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
            _ => false,
        }
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// A single string becomes a one-element list; arrays keep their string-like items.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_owned()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Nested map at `key`, if that value is a map.
    pub fn get_meta(&self, key: &str) -> Option<Meta> {
        match self.get(key)? {
            Value::Object(map) => Some(Meta(map.clone())),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for Meta {
    fn from(map: Map<String, Value>) -> Self {
        Self::from_value(Value::Object(map))
    }
}

fn insert_path(map: &mut Map<String, Value>, key: &str, value: Value) {
    match key.split_once('.') {
        Some((head, rest)) if !head.is_empty() && !rest.is_empty() => {
            let slot = map
                .entry(head.to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(inner) = slot {
                insert_path(inner, rest, value);
            }
        }
        _ => {
            map.insert(key.to_owned(), value);
        }
    }
}

fn merge_value(map: &mut Map<String, Value>, key: &str, value: &Value) {
    match (map.get_mut(key), value) {
        (Some(Value::Object(existing)), Value::Object(incoming)) => {
            for (k, v) in incoming {
                merge_value(existing, k, v);
            }
        }
        _ => {
            map.insert(key.to_owned(), value.clone());
        }
    }
}

/// Lowercase every key of nested maps, expanding dotted keys on the way.
fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                insert_path(&mut out, &k.to_lowercase(), normalize(v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        other => other,
    }
}

/// Convert a TOML value into JSON. Datetimes become their RFC 3339 text.
pub fn toml_to_json(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::from(*i),
        toml::Value::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .iter()
                .map(|(k, v)| (k.to_lowercase(), toml_to_json(v)))
                .collect(),
        ),
    }
}
