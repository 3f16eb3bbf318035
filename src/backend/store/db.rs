/**
 * SQL Layer for the Document Store
 *
 * Every collection lives in the single `documents` table. Document fields are
 * addressed with `json_extract(body, '$.<path>')`; the id and timestamps are
 * real columns. Field paths are checked by `query::is_valid_path` before they
 * are inlined, values are always bound.
 */

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::backend::store::document::{format_timestamp, Document};
use crate::backend::store::error::StoreError;
use crate::backend::store::query::{is_valid_path, Condition, Filter, Operator, Sort, SortOrder};
use crate::backend::store::schema::{FieldType, Schema};

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: String,
    body: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<DocumentRow> for Document {
    type Error = StoreError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let body: Map<String, Value> = serde_json::from_str(&row.body)?;
        Ok(Document {
            id: row.id,
            body,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| StoreError::Database(sqlx::Error::Decode(format!("bad timestamp {}: {}", raw, e).into())))
}

/// SQL expression for a document field
fn column(field: &str) -> String {
    match field {
        "id" => "id".to_string(),
        "createdAt" => "created_at".to_string(),
        "updatedAt" => "updated_at".to_string(),
        path => format!("json_extract(body, '$.{}')", path),
    }
}

fn push_value(qb: &mut QueryBuilder<'_, Sqlite>, value: &Value) {
    match value {
        Value::String(s) => {
            qb.push_bind(s.clone());
        }
        Value::Bool(b) => {
            qb.push_bind(i64::from(*b));
        }
        Value::Number(n) => match n.as_i64() {
            Some(i) => {
                qb.push_bind(i);
            }
            None => {
                qb.push_bind(n.as_f64().unwrap_or_default());
            }
        },
        Value::Null => {
            qb.push("NULL");
        }
        other => {
            qb.push("json(");
            qb.push_bind(other.to_string());
            qb.push(")");
        }
    }
}

fn push_list(qb: &mut QueryBuilder<'_, Sqlite>, items: &[Value]) {
    qb.push("(");
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        push_value(qb, item);
    }
    qb.push(")");
}

fn push_comparison(qb: &mut QueryBuilder<'_, Sqlite>, expr: &str, op: Operator, value: &Value) {
    match (op, value) {
        (Operator::Eq, Value::Null) => {
            qb.push(format!("{} IS NULL", expr));
        }
        (Operator::Ne, Value::Null) => {
            qb.push(format!("{} IS NOT NULL", expr));
        }
        (Operator::Ne, _) => {
            qb.push(format!("({0} IS NULL OR {0} <> ", expr));
            push_value(qb, value);
            qb.push(")");
        }
        (Operator::In, Value::Array(items)) if items.is_empty() => {
            qb.push("0 = 1");
        }
        (Operator::Nin, Value::Array(items)) if items.is_empty() => {
            qb.push("1 = 1");
        }
        (Operator::In, Value::Array(items)) => {
            qb.push(format!("{} IN ", expr));
            push_list(qb, items);
        }
        (Operator::Nin, Value::Array(items)) => {
            qb.push(format!("({0} IS NULL OR {0} NOT IN ", expr));
            push_list(qb, items);
            qb.push(")");
        }
        (op, value) => {
            qb.push(format!("{} {} ", expr, op.sql()));
            push_value(qb, value);
        }
    }
}

/// Array fields match when any element matches, like a document database does
fn push_condition(qb: &mut QueryBuilder<'_, Sqlite>, condition: &Condition, schema: &Schema) {
    let array_field = schema
        .get(&condition.field)
        .map(|f| f.kind == FieldType::Array)
        .unwrap_or(false);
    let element_match = array_field
        && match condition.op {
            Operator::In | Operator::Nin => true,
            _ => !condition.value.is_array(),
        };

    if !element_match {
        push_comparison(qb, &column(&condition.field), condition.op, &condition.value);
        return;
    }

    let (negated, op) = match condition.op {
        Operator::Ne => (true, Operator::Eq),
        Operator::Nin => (true, Operator::In),
        op => (false, op),
    };
    qb.push(if negated { "NOT EXISTS " } else { "EXISTS " });
    qb.push(format!(
        "(SELECT 1 FROM json_each(body, '$.{}') WHERE ",
        condition.field
    ));
    push_comparison(qb, "value", op, &condition.value);
    qb.push(")");
}

fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn push_where(qb: &mut QueryBuilder<'_, Sqlite>, schema: &Schema, filter: &Filter) {
    qb.push(" WHERE collection = ");
    qb.push_bind(schema.name.clone());

    for condition in &filter.conditions {
        qb.push(" AND ");
        push_condition(qb, condition, schema);
    }

    if let Some(term) = &filter.search {
        let fields: Vec<&String> = schema.searchable.iter().filter(|f| is_valid_path(f)).collect();
        if !fields.is_empty() {
            let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
            qb.push(" AND (");
            for (i, field) in fields.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push(format!("LOWER({}) LIKE ", column(field)));
                qb.push_bind(pattern.clone());
                qb.push(" ESCAPE '\\'");
            }
            qb.push(")");
        }
    }
}

fn push_order(qb: &mut QueryBuilder<'_, Sqlite>, sort: &[Sort]) {
    let direction = |order: SortOrder| match order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    qb.push(" ORDER BY ");
    for s in sort {
        qb.push(format!("{} {}, ", column(&s.field), direction(s.order)));
    }
    // insertion order breaks ties
    let tie = sort.first().map(|s| s.order).unwrap_or(SortOrder::Asc);
    qb.push(format!("rowid {}", direction(tie)));
}

/// Documents matching `filter`, sorted, optionally windowed by `(limit, offset)`
pub async fn select(
    pool: &SqlitePool,
    schema: &Schema,
    filter: &Filter,
    sort: &[Sort],
    window: Option<(u64, u64)>,
) -> Result<Vec<Document>, StoreError> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT id, body, created_at, updated_at FROM documents");
    push_where(&mut qb, schema, filter);
    push_order(&mut qb, sort);
    if let Some((limit, offset)) = window {
        qb.push(" LIMIT ");
        qb.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        qb.push(" OFFSET ");
        qb.push_bind(i64::try_from(offset).unwrap_or(i64::MAX));
    }

    let rows = qb.build_query_as::<DocumentRow>().fetch_all(pool).await?;
    rows.into_iter().map(Document::try_from).collect()
}

pub async fn count(pool: &SqlitePool, schema: &Schema, filter: &Filter) -> Result<u64, StoreError> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM documents");
    push_where(&mut qb, schema, filter);
    let (total,): (i64,) = qb.build_query_as().fetch_one(pool).await?;
    Ok(u64::try_from(total).unwrap_or_default())
}

/// Fetch documents of one collection by id, in no particular order
pub async fn select_by_ids(
    pool: &SqlitePool,
    collection: &str,
    ids: &[String],
) -> Result<Vec<Document>, StoreError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT id, body, created_at, updated_at FROM documents WHERE collection = ",
    );
    qb.push_bind(collection.to_string());
    qb.push(" AND id IN (");
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(id.clone());
    }
    separated.push_unseparated(")");

    let rows = qb.build_query_as::<DocumentRow>().fetch_all(pool).await?;
    rows.into_iter().map(Document::try_from).collect()
}

/// Insert or replace a document
pub async fn upsert(pool: &SqlitePool, collection: &str, document: &Document) -> Result<(), StoreError> {
    let body = serde_json::to_string(&document.body)?;
    sqlx::query(
        r#"
        INSERT INTO documents (collection, id, body, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT (collection, id) DO UPDATE SET
            body = excluded.body,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(collection)
    .bind(&document.id)
    .bind(body)
    .bind(format_timestamp(&document.created_at))
    .bind(format_timestamp(&document.updated_at))
    .execute(pool)
    .await?;
    Ok(())
}

pub fn unique_index_name(collection: &str, field: &str) -> String {
    let sanitize = |raw: &str| -> String {
        raw.chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect()
    };
    format!("uniq_{}_{}", sanitize(collection), sanitize(field))
}

/// Partial unique index over one field of one collection
///
/// DDL cannot take bound parameters, so the collection name is inlined as an
/// escaped literal and the field path must pass `is_valid_path`.
pub async fn ensure_unique_index(pool: &SqlitePool, collection: &str, field: &str) -> Result<(), StoreError> {
    if !is_valid_path(field) {
        return Err(StoreError::InvalidQuery(format!("invalid unique field `{}`", field)));
    }
    let sql = format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS \"{}\" ON documents (collection, {}) WHERE collection = '{}'",
        unique_index_name(collection, field),
        column(field),
        collection.replace('\'', "''"),
    );
    sqlx::query(&sql).execute(pool).await?;
    Ok(())
}

/// True when another document already holds `value` in `field`
pub async fn value_taken(
    pool: &SqlitePool,
    collection: &str,
    field: &str,
    value: &Value,
    except_id: &str,
) -> Result<bool, StoreError> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM documents WHERE collection = ");
    qb.push_bind(collection.to_string());
    qb.push(" AND id <> ");
    qb.push_bind(except_id.to_string());
    qb.push(format!(" AND {} = ", column(field)));
    push_value(&mut qb, value);
    let (taken,): (i64,) = qb.build_query_as().fetch_one(pool).await?;
    Ok(taken > 0)
}

pub async fn delete_by_id(pool: &SqlitePool, collection: &str, id: &str) -> Result<u64, StoreError> {
    let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
        .bind(collection)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete_matching(pool: &SqlitePool, schema: &Schema, filter: &Filter) -> Result<u64, StoreError> {
    let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM documents");
    push_where(&mut qb, schema, filter);
    let result = qb.build().execute(pool).await?;
    Ok(result.rows_affected())
}
