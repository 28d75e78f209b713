//! Input record type
//!
//! A `MetadataRecord` is an open-ended map produced upstream (manual entry,
//! spreadsheet import, content generation). The engine reads it and never
//! mutates it during compilation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key holding the stable per-title identifier
pub const BOOK_ID_KEY: &str = "book_id";

/// One title's source metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataRecord {
    fields: Map<String, Value>,
}

impl MetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object; other JSON values are rejected
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Insert under a dotted key, creating intermediate objects
    ///
    /// Returns `false` (and changes nothing) when a path segment already
    /// holds a non-object value.
    pub fn insert_path(&mut self, key: &str, value: impl Into<Value>) -> bool {
        let mut parts: Vec<&str> = key.split('.').collect();
        let Some(last) = parts.pop() else {
            return false;
        };

        let mut current = &mut self.fields;
        for part in parts {
            let entry = current
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            match entry {
                Value::Object(map) => current = map,
                _ => return false,
            }
        }
        current.insert(last.to_string(), value.into());
        true
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get_str(key).is_some()
    }

    /// Stable id across rebuilds; empty when absent
    pub fn book_id(&self) -> String {
        self.get_str(BOOK_ID_KEY).unwrap_or_default()
    }

    /// Field rendered as a trimmed string
    ///
    /// Numbers and booleans are stringified, lists are joined with `"; "`.
    /// Null, empty and whitespace-only values count as absent. A dotted key
    /// (`"contributors.0.name"`) walks nested objects and arrays.
    pub fn get_str(&self, key: &str) -> Option<String> {
        let value = self.lookup_path(key)?;
        value_to_string(value).filter(|s| !s.is_empty())
    }

    /// First present value among several aliases
    pub fn first_of(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|k| self.get_str(k))
    }

    /// Field parsed as a number; tolerates surrounding text such as "256 pages"
    pub fn get_number(&self, key: &str) -> Option<f64> {
        match self.lookup_path(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => leading_number(s),
            _ => None,
        }
    }

    /// Iterate over top-level keys and values
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    fn lookup_path(&self, key: &str) -> Option<&Value> {
        if let Some(v) = self.fields.get(key) {
            return Some(v);
        }
        if !key.contains('.') {
            return None;
        }
        let mut parts = key.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(value_to_string).collect();
            Some(parts.join("; "))
        }
        Value::Object(_) => None,
    }
}

fn leading_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    let end = trimmed
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    trimmed[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_str_normalizes_values() {
        let record = MetadataRecord::from_value(json!({
            "book_id": "bk-001",
            "title": "  The Title  ",
            "page_count": 256,
            "keywords": ["a", "b", "c"],
            "blank": "   ",
            "nothing": null,
        }))
        .unwrap();

        assert_eq!(record.book_id(), "bk-001");
        assert_eq!(record.get_str("title").as_deref(), Some("The Title"));
        assert_eq!(record.get_str("page_count").as_deref(), Some("256"));
        assert_eq!(record.get_str("keywords").as_deref(), Some("a; b; c"));
        assert_eq!(record.get_str("blank"), None);
        assert_eq!(record.get_str("nothing"), None);
        assert_eq!(record.get_str("missing"), None);
    }

    #[test]
    fn test_nested_paths() {
        let record = MetadataRecord::from_value(json!({
            "contributors": [{"name": "Ada Lovelace", "role": "A01"}],
            "llm": {"summary": "Generated"}
        }))
        .unwrap();

        assert_eq!(record.get_str("contributors.0.name").as_deref(), Some("Ada Lovelace"));
        assert_eq!(record.get_str("llm.summary").as_deref(), Some("Generated"));
        assert_eq!(record.get_str("contributors.3.name"), None);
    }

    #[test]
    fn test_get_number() {
        let record = MetadataRecord::new()
            .with("pages", "312 pages")
            .with("price", 19.99)
            .with("bad", "n/a");
        assert_eq!(record.get_number("pages"), Some(312.0));
        assert_eq!(record.get_number("price"), Some(19.99));
        assert_eq!(record.get_number("bad"), None);
    }

    #[test]
    fn test_first_of_aliases() {
        let record = MetadataRecord::new().with("isbn10", "0306406152");
        assert_eq!(
            record.first_of(&["isbn13", "isbn10"]).as_deref(),
            Some("0306406152")
        );
        assert_eq!(record.first_of(&["isbn13"]), None);
    }

    #[test]
    fn test_insert_path_creates_objects() {
        let mut record = MetadataRecord::new().with("title", "T");
        assert!(record.insert_path("llm.short_description", "Generated"));
        assert_eq!(
            record.get_str("llm.short_description").as_deref(),
            Some("Generated")
        );
        // a scalar in the way is left alone
        assert!(!record.insert_path("title.sub", "x"));
        assert_eq!(record.get_str("title").as_deref(), Some("T"));
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(MetadataRecord::from_value(json!([1, 2])).is_none());
    }
}
