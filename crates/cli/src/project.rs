//! `--ignore` projection for JSON documents

use serde_json::Value;
use std::collections::BTreeSet;

/// Drops named top-level fields from JSON objects before comparison
#[derive(Debug, Clone, Default)]
pub struct FieldFilter {
    ignored: BTreeSet<String>,
}

impl FieldFilter {
    /// Create a filter ignoring `fields`
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ignored: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether any field is ignored
    pub fn is_empty(&self) -> bool {
        self.ignored.is_empty()
    }

    /// Ignored field names
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.ignored.iter().map(String::as_str)
    }

    /// Remove ignored fields; non-objects pass through unchanged
    pub fn project(&self, value: Value) -> Value {
        match value {
            Value::Object(mut map) if !self.ignored.is_empty() => {
                map.retain(|key, _| !self.ignored.contains(key));
                Value::Object(map)
            }
            other => other,
        }
    }
}
