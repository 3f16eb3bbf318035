/**
 * Query Translation
 *
 * Handlers describe what they want with a `FindQuery`: fixed filters set by
 * the code, the raw query map sent by the client, the set of client keys the
 * handler allows, and pagination/population options. `translate` turns that
 * description into conditions, sort keys and paging the SQL layer executes.
 *
 * # Client Query Keys
 *
 * - `sortBy=field:asc|desc` - sort (default `createdAt` descending)
 * - `page`, `limit` - pagination (defaults 1 and 10)
 * - `search` - substring match over the schema's searchable fields
 * - `id` - document id
 * - any other allowed key - equality filter; a value shaped like a JSON
 *   object (`{"$gt":5}`) is parsed and its `$` keys used as operators
 */

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::backend::store::document::Document;
use crate::backend::store::error::StoreError;
use crate::backend::store::schema::Schema;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 1_000;
pub const MAX_PAGE: u64 = 1_000_000;

/// Reference resolution for a field holding one id or an array of ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Populate {
    pub path: String,
    /// Space-separated list of fields to keep on the referenced documents
    pub select: Option<String>,
}

impl Populate {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            select: None,
        }
    }

    pub fn select(mut self, fields: impl Into<String>) -> Self {
        self.select = Some(fields.into());
        self
    }

    pub fn selected_fields(&self) -> Option<Vec<&str>> {
        self.select
            .as_deref()
            .map(|s| s.split_whitespace().collect::<Vec<_>>())
            .filter(|fields| !fields.is_empty())
    }
}

/// Comparison operators accepted in `{"$op": value}` filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
}

impl Operator {
    fn parse(key: &str) -> Option<Self> {
        match key {
            "$eq" => Some(Operator::Eq),
            "$ne" => Some(Operator::Ne),
            "$gt" => Some(Operator::Gt),
            "$gte" => Some(Operator::Gte),
            "$lt" => Some(Operator::Lt),
            "$lte" => Some(Operator::Lte),
            "$in" => Some(Operator::In),
            "$nin" => Some(Operator::Nin),
            _ => None,
        }
    }

    /// SQL comparison for the scalar operators
    pub fn sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::In => "IN",
            Operator::Nin => "NOT IN",
        }
    }
}

/// One `field op value` predicate
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: Operator,
    pub value: Value,
}

/// Conjunction of conditions plus an optional free-text term
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub conditions: Vec<Condition>,
    pub search: Option<String>,
}

impl Filter {
    /// Build a filter from a `{field: value}` map
    pub fn from_map(map: &Map<String, Value>, schema: &Schema) -> Result<Self, StoreError> {
        let mut conditions = Vec::new();
        for (field, value) in map {
            let field = if field == "_id" { "id" } else { field.as_str() };
            if !is_valid_path(field) {
                return Err(StoreError::InvalidQuery(format!("invalid field name `{}`", field)));
            }
            let kind = schema.get(field).map(|f| f.kind);
            let coerce = |v: Value| match kind {
                Some(kind) => kind.coerce(v),
                None => v,
            };

            match value {
                Value::Object(ops) if !ops.is_empty() && ops.keys().all(|k| k.starts_with('$')) => {
                    for (key, operand) in ops {
                        let op = Operator::parse(key).ok_or_else(|| {
                            StoreError::InvalidQuery(format!("unsupported operator `{}`", key))
                        })?;
                        let operand = match (op, operand) {
                            (Operator::In | Operator::Nin, Value::Array(items)) => {
                                Value::Array(items.iter().cloned().map(coerce).collect())
                            }
                            (Operator::In | Operator::Nin, _) => {
                                return Err(StoreError::InvalidQuery(format!(
                                    "`{}` expects an array",
                                    key
                                )))
                            }
                            (_, other) => coerce(other.clone()),
                        };
                        conditions.push(Condition {
                            field: field.to_string(),
                            op,
                            value: operand,
                        });
                    }
                }
                other => conditions.push(Condition {
                    field: field.to_string(),
                    op: Operator::Eq,
                    value: coerce(other.clone()),
                }),
            }
        }
        Ok(Self {
            conditions,
            search: None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.search.is_none()
    }
}

/// Field paths end up inside a JSON path literal, so only plain names pass
pub fn is_valid_path(field: &str) -> bool {
    !field.is_empty()
        && !field.starts_with('.')
        && !field.ends_with('.')
        && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

impl Sort {
    /// Parse `field:order`; anything other than `desc` sorts ascending
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let mut parts = raw.splitn(2, ':');
        let field = parts.next().unwrap_or_default().trim();
        if !is_valid_path(field) {
            return Err(StoreError::InvalidQuery(format!("invalid sortBy `{}`", raw)));
        }
        let order = match parts.next().map(str::trim) {
            Some("desc") => SortOrder::Desc,
            _ => SortOrder::Asc,
        };
        Ok(Self {
            field: field.to_string(),
            order,
        })
    }
}

/// Description of a `find` call
#[derive(Debug, Clone)]
pub struct FindQuery {
    /// Filters fixed by the calling code
    pub filter: Map<String, Value>,
    /// Client keys permitted in `query`
    pub allowed_query: HashSet<String>,
    pub paginate: bool,
    pub populate: Option<Populate>,
    /// Raw client query
    pub query: Map<String, Value>,
}

impl Default for FindQuery {
    fn default() -> Self {
        Self {
            filter: Map::new(),
            allowed_query: HashSet::new(),
            paginate: true,
            populate: None,
            query: Map::new(),
        }
    }
}

impl FindQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_query.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter.insert(field.into(), value.into());
        self
    }

    pub fn query(mut self, query: Map<String, Value>) -> Self {
        self.query = query;
        self
    }

    pub fn paginate(mut self, paginate: bool) -> Self {
        self.paginate = paginate;
        self
    }

    pub fn populate(mut self, populate: Populate) -> Self {
        self.populate = Some(populate);
        self
    }

    /// Validate the client query and resolve it against a schema
    pub fn translate(self, schema: &Schema) -> Result<TranslatedQuery, StoreError> {
        if let Some(key) = self.query.keys().find(|k| !self.allowed_query.contains(*k)) {
            return Err(StoreError::QueryNotAllowed(key.clone()));
        }

        let mut filter_map = self.filter;
        let mut sort = Vec::new();
        let mut page = DEFAULT_PAGE;
        let mut limit = DEFAULT_LIMIT;
        let mut search = None;

        for (key, value) in self.query {
            let value = parse_json_object(value);
            match key.as_str() {
                "sortBy" => {
                    let raw = value.as_str().ok_or_else(|| {
                        StoreError::InvalidQuery("sortBy must be a string".to_string())
                    })?;
                    sort.push(Sort::parse(raw)?);
                }
                "page" => page = parse_positive("page", &value, MAX_PAGE)?.unwrap_or(DEFAULT_PAGE),
                "limit" => {
                    limit = parse_positive("limit", &value, MAX_LIMIT)?.unwrap_or(DEFAULT_LIMIT)
                }
                "search" => {
                    search = value
                        .as_str()
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string);
                }
                "id" => {
                    filter_map.insert("id".to_string(), value);
                }
                _ => {
                    filter_map.insert(key, value);
                }
            }
        }

        if sort.is_empty() {
            sort.push(Sort {
                field: "createdAt".to_string(),
                order: SortOrder::Desc,
            });
        }

        let mut filter = Filter::from_map(&filter_map, schema)?;
        filter.search = search;

        Ok(TranslatedQuery {
            filter,
            sort,
            page,
            limit,
            paginate: self.paginate,
            populate: self.populate,
        })
    }
}

/// Output of `FindQuery::translate`
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedQuery {
    pub filter: Filter,
    pub sort: Vec<Sort>,
    pub page: u64,
    pub limit: u64,
    pub paginate: bool,
    pub populate: Option<Populate>,
}

impl TranslatedQuery {
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

/// Strings shaped like a JSON object are decoded; everything else is kept
fn parse_json_object(value: Value) -> Value {
    match &value {
        Value::String(raw) if raw.starts_with("{\"") && raw.ends_with('}') => {
            serde_json::from_str(raw).unwrap_or(value)
        }
        _ => value,
    }
}

/// Zero is treated as "not set", matching the paginate defaults
fn parse_positive(key: &str, value: &Value, max: u64) -> Result<Option<u64>, StoreError> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    match parsed {
        Some(0) => Ok(None),
        Some(n) if n <= max => Ok(Some(n)),
        Some(_) => Err(StoreError::InvalidQuery(format!("`{}` must not exceed {}", key, max))),
        None => Err(StoreError::InvalidQuery(format!("`{}` must be a positive integer", key))),
    }
}

/// Paginated result set
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub docs: Vec<T>,
    pub total_docs: u64,
    pub limit: u64,
    pub page: u64,
    pub total_pages: u64,
    pub paging_counter: u64,
    pub has_prev_page: bool,
    pub has_next_page: bool,
    pub prev_page: Option<u64>,
    pub next_page: Option<u64>,
}

impl<T> Page<T> {
    pub fn new(docs: Vec<T>, total_docs: u64, page: u64, limit: u64) -> Self {
        let total_pages = total_docs.div_ceil(limit).max(1);
        let has_prev_page = page > 1;
        let has_next_page = page < total_pages;
        Self {
            docs,
            total_docs,
            limit,
            page,
            total_pages,
            paging_counter: page.saturating_sub(1).saturating_mul(limit).saturating_add(1),
            has_prev_page,
            has_next_page,
            prev_page: has_prev_page.then(|| page - 1),
            next_page: has_next_page.then(|| page.saturating_add(1)),
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            docs: self.docs.into_iter().map(f).collect(),
            total_docs: self.total_docs,
            limit: self.limit,
            page: self.page,
            total_pages: self.total_pages,
            paging_counter: self.paging_counter,
            has_prev_page: self.has_prev_page,
            has_next_page: self.has_next_page,
            prev_page: self.prev_page,
            next_page: self.next_page,
        }
    }
}

/// Result of `find`
#[derive(Debug, Clone, PartialEq)]
pub enum FindResult {
    All(Vec<Document>),
    Page(Page<Document>),
}

impl FindResult {
    pub fn documents(&self) -> &[Document] {
        match self {
            FindResult::All(docs) => docs,
            FindResult::Page(page) => &page.docs,
        }
    }

    /// Client-facing JSON: an array, or the page object
    pub fn present(self, schema: &Schema) -> Value {
        match self {
            FindResult::All(docs) => Value::Array(docs.iter().map(|d| schema.present(d)).collect()),
            FindResult::Page(page) => {
                serde_json::to_value(page.map(|d| schema.present(&d))).unwrap_or(Value::Null)
            }
        }
    }
}
