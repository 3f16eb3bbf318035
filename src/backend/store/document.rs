/**
 * Documents
 *
 * A document is a JSON object owned by one collection. The id and the two
 * timestamps live outside the body so they can be indexed as columns; the
 * body holds every schema field.
 */

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

/// Stored document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// 32-char hex id
    pub id: String,
    pub body: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// New unsaved document with a fresh id
    pub fn new(body: Map<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            body,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.body.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.body.get(field).and_then(Value::as_str)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.body.insert(field.into(), value);
    }

    pub fn created_at_string(&self) -> String {
        format_timestamp(&self.created_at)
    }

    pub fn updated_at_string(&self) -> String {
        format_timestamp(&self.updated_at)
    }
}

/// Fixed-width RFC 3339 so stored timestamps sort lexicographically
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
