/**
 * Collection Schemas
 *
 * A schema declares the fields a collection accepts and how they are checked
 * before a document is written:
 *
 * - unknown keys are dropped (strict mode)
 * - defaults are filled in for missing fields
 * - string values of number and boolean fields are cast
 * - required, type and enum constraints are validated
 * - `unique` fields are checked against the collection on write
 * - `reference` fields name the collection used for population
 * - `hidden` fields never leave the server (see `Schema::present`)
 */

use serde_json::{Map, Value};

use crate::backend::store::document::Document;
use crate::shared::SharedError;

/// Declared type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
    Object,
    /// RFC 3339 timestamp or `YYYY-MM-DD` date stored as a string
    Date,
}

impl FieldType {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
            FieldType::Date => value
                .as_str()
                .map(|s| {
                    chrono::DateTime::parse_from_rfc3339(s).is_ok()
                        || chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
                })
                .unwrap_or(false),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            FieldType::String => "String",
            FieldType::Number => "Number",
            FieldType::Boolean => "Boolean",
            FieldType::Array => "Array",
            FieldType::Object => "Object",
            FieldType::Date => "Date",
        }
    }

    /// Coerce a raw query-string value into this type
    ///
    /// Values arriving through a URL are always strings; numbers and booleans
    /// need converting before they can match stored JSON.
    pub fn coerce(&self, value: Value) -> Value {
        let Value::String(raw) = &value else {
            return value;
        };
        match self {
            FieldType::Number => raw
                .parse::<i64>()
                .map(Value::from)
                .or_else(|_| raw.parse::<f64>().map(Value::from))
                .unwrap_or(value),
            FieldType::Boolean => match raw.as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => value,
            },
            _ => value,
        }
    }
}

/// A single field declaration
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub kind: FieldType,
    pub required: bool,
    pub unique: bool,
    pub enum_values: Vec<Value>,
    pub default: Option<Value>,
    /// Collection referenced by the id(s) stored in this field
    pub reference: Option<String>,
    pub hidden: bool,
    /// Element type of an array field
    pub items: Option<FieldType>,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldType) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            unique: false,
            enum_values: Vec::new(),
            default: None,
            reference: None,
            hidden: false,
            items: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Number)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    pub fn array(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Array)
    }

    /// Array whose elements must all be `items`
    pub fn array_of(name: impl Into<String>, items: FieldType) -> Self {
        let mut field = Self::new(name, FieldType::Array);
        field.items = Some(items);
        field
    }

    pub fn object(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Object)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Date)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn reference(mut self, collection: impl Into<String>) -> Self {
        self.reference = Some(collection.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

/// Collection schema
#[derive(Debug, Clone)]
pub struct Schema {
    pub name: String,
    pub fields: Vec<Field>,
    /// Drop `createdAt`/`updatedAt` from client output
    pub hide_timestamps: bool,
    /// Fields matched by the `search` query key
    pub searchable: Vec<String>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            hide_timestamps: false,
            searchable: Vec::new(),
        }
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn hide_timestamps(mut self) -> Self {
        self.hide_timestamps = true;
        self
    }

    pub fn searchable<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.searchable = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn unique_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.unique)
    }

    /// Keep only declared fields
    pub fn strip_unknown(&self, body: &mut Map<String, Value>) {
        body.retain(|key, _| self.get(key).is_some());
    }

    /// Cast string values of number and boolean fields, as form posts send them
    pub fn cast(&self, body: &mut Map<String, Value>) {
        for field in &self.fields {
            if !matches!(field.kind, FieldType::Number | FieldType::Boolean) {
                continue;
            }
            if let Some(value) = body.get_mut(&field.name) {
                *value = field.kind.coerce(value.take());
            }
        }
    }

    /// Fill in defaults for absent fields
    pub fn apply_defaults(&self, body: &mut Map<String, Value>) {
        for field in &self.fields {
            if let Some(default) = &field.default {
                if !body.contains_key(&field.name) {
                    body.insert(field.name.clone(), default.clone());
                }
            }
        }
    }

    /// Check required, type and enum constraints
    pub fn validate(&self, body: &Map<String, Value>) -> Result<(), SharedError> {
        for field in &self.fields {
            let value = match body.get(&field.name) {
                None | Some(Value::Null) => {
                    if field.required {
                        return Err(SharedError::validation(
                            &field.name,
                            format!("Path `{}` is required.", field.name),
                        ));
                    }
                    continue;
                }
                Some(value) => value,
            };

            if !field.kind.accepts(value) {
                return Err(SharedError::validation(
                    &field.name,
                    format!("Cast to {} failed for value {}", field.kind.name(), value),
                ));
            }

            if let (Some(items), Value::Array(elements)) = (field.items, value) {
                if let Some(bad) = elements.iter().find(|e| !items.accepts(e)) {
                    return Err(SharedError::validation(
                        &field.name,
                        format!("Cast to [{}] failed for value {}", items.name(), bad),
                    ));
                }
            }

            if field.required {
                let empty = match value {
                    Value::String(s) => s.is_empty(),
                    _ => false,
                };
                if empty {
                    return Err(SharedError::validation(
                        &field.name,
                        format!("Path `{}` is required.", field.name),
                    ));
                }
            }

            if !field.enum_values.is_empty() && !field.enum_values.contains(value) {
                return Err(SharedError::validation(
                    &field.name,
                    format!("{} is not a valid enum value for path `{}`.", value, field.name),
                ));
            }
        }
        Ok(())
    }

    /// Client-facing JSON for a document
    pub fn present(&self, document: &Document) -> Value {
        let mut out = Map::new();
        out.insert("id".to_string(), Value::String(document.id.clone()));
        for (key, value) in &document.body {
            if self.get(key).map(|f| f.hidden).unwrap_or(false) {
                continue;
            }
            out.insert(key.clone(), value.clone());
        }
        if !self.hide_timestamps {
            out.insert("createdAt".to_string(), Value::String(document.created_at_string()));
            out.insert("updatedAt".to_string(), Value::String(document.updated_at_string()));
        }
        Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new("people")
            .field(Field::string("name").required())
            .field(Field::string("role").required().one_of(["admin", "user"]))
            .field(Field::number("age"))
            .field(Field::boolean("online").default_value(false))
            .field(Field::string("password").hidden())
    }

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_strip_unknown_and_defaults() {
        let s = schema();
        let mut b = body(json!({"name": "A", "role": "user", "extra": 1}));
        s.strip_unknown(&mut b);
        s.apply_defaults(&mut b);
        assert!(!b.contains_key("extra"));
        assert_eq!(b["online"], json!(false));
    }

    #[test]
    fn test_validate_required() {
        let err = schema().validate(&body(json!({"role": "user"}))).unwrap_err();
        assert!(err.to_string().contains("`name` is required"));

        let err = schema().validate(&body(json!({"name": "", "role": "user"}))).unwrap_err();
        assert!(err.to_string().contains("`name` is required"));
    }

    #[test]
    fn test_validate_enum_and_type() {
        let err = schema()
            .validate(&body(json!({"name": "A", "role": "owner"})))
            .unwrap_err();
        assert!(err.to_string().contains("not a valid enum value"));

        let err = schema()
            .validate(&body(json!({"name": "A", "role": "user", "age": "ten"})))
            .unwrap_err();
        assert!(err.to_string().contains("Cast to Number"));
    }

    #[test]
    fn test_coerce_query_values() {
        assert_eq!(FieldType::Number.coerce(json!("42")), json!(42));
        assert_eq!(FieldType::Number.coerce(json!("4.5")), json!(4.5));
        assert_eq!(FieldType::Number.coerce(json!("x")), json!("x"));
        assert_eq!(FieldType::Boolean.coerce(json!("true")), json!(true));
        assert_eq!(FieldType::String.coerce(json!("42")), json!("42"));
    }

    #[test]
    fn test_present_hides_fields() {
        let s = schema().hide_timestamps();
        let doc = Document::new(body(json!({"name": "A", "password": "hash"})));
        let out = s.present(&doc);
        assert_eq!(out["id"], json!(doc.id));
        assert!(out.get("password").is_none());
        assert!(out.get("createdAt").is_none());
    }

    #[test]
    fn test_date_field() {
        let s = Schema::new("events").field(Field::date("at"));
        assert!(s.validate(&body(json!({"at": "2024-01-01T00:00:00Z"}))).is_ok());
        assert!(s.validate(&body(json!({"at": "1990-05-12"}))).is_ok());
        assert!(s.validate(&body(json!({"at": "yesterday"}))).is_err());
    }

    #[test]
    fn test_cast_form_values() {
        let s = schema();
        let mut b = body(json!({"name": "A", "role": "user", "age": "30", "online": "true"}));
        s.cast(&mut b);
        assert_eq!(b["age"], json!(30));
        assert_eq!(b["online"], json!(true));
        assert_eq!(b["name"], json!("A"));
        assert!(s.validate(&b).is_ok());
    }

    #[test]
    fn test_array_items() {
        let s = Schema::new("inbox").field(Field::array_of("subs", FieldType::Object));
        assert!(s.validate(&body(json!({"subs": [{"endpoint": "x"}, {}]}))).is_ok());
        assert!(s.validate(&body(json!({"subs": []}))).is_ok());
        let err = s.validate(&body(json!({"subs": [{"endpoint": "x"}, 3]}))).unwrap_err();
        assert!(err.to_string().contains("Cast to [Object]"));
        assert!(s.validate(&body(json!({"subs": {"endpoint": "x"}}))).is_err());
    }
}
