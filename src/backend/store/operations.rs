/**
 * Collection Operations
 *
 * Generic CRUD over a `Collection`. Writes go through the schema (strict
 * keys, defaults, validation, unique fields) before they reach SQLite.
 */

use std::collections::HashMap;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::debug;

use crate::backend::store::db;
use crate::backend::store::document::Document;
use crate::backend::store::error::StoreError;
use crate::backend::store::query::{Filter, FindQuery, FindResult, Page, Populate, Sort, SortOrder};
use crate::backend::store::{Collection, DeleteResult};

impl Collection {
    /// Find many documents, paginated unless `query.paginate` is false
    pub async fn find(&self, query: FindQuery) -> Result<FindResult, StoreError> {
        let translated = query.translate(self.schema())?;

        if !translated.paginate {
            let mut docs =
                db::select(self.pool(), self.schema(), &translated.filter, &translated.sort, None).await?;
            if let Some(populate) = &translated.populate {
                self.populate(&mut docs, populate).await?;
            }
            return Ok(FindResult::All(docs));
        }

        let total = db::count(self.pool(), self.schema(), &translated.filter).await?;
        let mut docs = db::select(
            self.pool(),
            self.schema(),
            &translated.filter,
            &translated.sort,
            Some((translated.limit, translated.offset())),
        )
        .await?;
        if let Some(populate) = &translated.populate {
            self.populate(&mut docs, populate).await?;
        }

        debug!(collection = self.name(), total, page = translated.page, "find");
        Ok(FindResult::Page(Page::new(docs, total, translated.page, translated.limit)))
    }

    /// First document matching `filter`; an empty filter matches nothing
    pub async fn find_one(
        &self,
        filter: Map<String, Value>,
        populate: Option<&Populate>,
    ) -> Result<Option<Document>, StoreError> {
        if filter.is_empty() {
            return Ok(None);
        }
        let filter = Filter::from_map(&filter, self.schema())?;
        let sort = [Sort {
            field: "createdAt".to_string(),
            order: SortOrder::Asc,
        }];
        let mut docs = db::select(self.pool(), self.schema(), &filter, &sort, Some((1, 0))).await?;
        if let Some(populate) = populate {
            self.populate(&mut docs, populate).await?;
        }
        Ok(docs.pop())
    }

    pub async fn create(
        &self,
        mut body: Map<String, Value>,
        populate: Option<&Populate>,
    ) -> Result<Document, StoreError> {
        self.schema().strip_unknown(&mut body);
        self.schema().apply_defaults(&mut body);
        self.schema().cast(&mut body);
        self.schema().validate(&body)?;

        let document = Document::new(body);
        self.write(&document).await?;
        debug!(collection = self.name(), id = %document.id, "created");

        self.populated(document, populate).await
    }

    /// Assign every declared key of `body` to the first match and save it
    pub async fn update(
        &self,
        filter: Map<String, Value>,
        mut body: Map<String, Value>,
        populate: Option<&Populate>,
    ) -> Result<Option<Document>, StoreError> {
        let Some(mut document) = self.find_one(filter, None).await? else {
            return Ok(None);
        };
        self.schema().strip_unknown(&mut body);
        for (key, value) in body {
            document.set(key, value);
        }
        self.save(&mut document).await?;

        self.populated(document, populate).await.map(Some)
    }

    /// Delete the first match and hand it back
    pub async fn remove(&self, filter: Map<String, Value>) -> Result<Option<Document>, StoreError> {
        let Some(document) = self.find_one(filter, None).await? else {
            return Ok(None);
        };
        db::delete_by_id(self.pool(), self.name(), &document.id).await?;
        debug!(collection = self.name(), id = %document.id, "removed");
        Ok(Some(document))
    }

    pub async fn remove_all(&self, filter: Map<String, Value>) -> Result<DeleteResult, StoreError> {
        let filter = Filter::from_map(&filter, self.schema())?;
        let deleted_count = db::delete_matching(self.pool(), self.schema(), &filter).await?;
        Ok(DeleteResult { deleted_count })
    }

    /// Validate and persist an in-memory document
    pub async fn save(&self, document: &mut Document) -> Result<(), StoreError> {
        self.schema().strip_unknown(&mut document.body);
        self.schema().cast(&mut document.body);
        self.schema().validate(&document.body)?;
        document.updated_at = Utc::now().max(document.created_at);
        self.write(document).await
    }

    /// Replace reference ids at `populate.path` with the referenced documents
    pub async fn populate(&self, docs: &mut [Document], populate: &Populate) -> Result<(), StoreError> {
        let target = self
            .schema()
            .get(&populate.path)
            .and_then(|f| f.reference.clone())
            .ok_or_else(|| {
                StoreError::InvalidQuery(format!("`{}` is not a reference field", populate.path))
            })?;
        let target = self.store().collection(&target)?;

        let mut ids: Vec<String> = Vec::new();
        for doc in docs.iter() {
            match doc.get(&populate.path) {
                Some(Value::String(id)) => ids.push(id.clone()),
                Some(Value::Array(items)) => {
                    ids.extend(items.iter().filter_map(Value::as_str).map(str::to_string))
                }
                _ => {}
            }
        }
        ids.sort();
        ids.dedup();

        let selected = populate.selected_fields();
        let resolved: HashMap<String, Value> = db::select_by_ids(self.pool(), target.name(), &ids)
            .await?
            .iter()
            .map(|doc| {
                let mut value = target.schema().present(doc);
                if let (Some(fields), Value::Object(map)) = (&selected, &mut value) {
                    map.retain(|key, _| key == "id" || fields.contains(&key.as_str()));
                }
                (doc.id.clone(), value)
            })
            .collect();

        for doc in docs.iter_mut() {
            let replacement = match doc.get(&populate.path) {
                Some(Value::String(id)) => resolved.get(id).cloned().unwrap_or(Value::Null),
                Some(Value::Array(items)) => Value::Array(
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .filter_map(|id| resolved.get(id).cloned())
                        .collect(),
                ),
                _ => continue,
            };
            doc.set(populate.path.clone(), replacement);
        }
        Ok(())
    }

    async fn populated(&self, document: Document, populate: Option<&Populate>) -> Result<Document, StoreError> {
        let Some(populate) = populate else {
            return Ok(document);
        };
        let mut docs = [document];
        self.populate(&mut docs, populate).await?;
        let [document] = docs;
        Ok(document)
    }

    /// Upsert behind the unique checks
    ///
    /// The lookup gives the common case a clean error; the unique index
    /// settles concurrent writers.
    async fn write(&self, document: &Document) -> Result<(), StoreError> {
        self.ensure_unique_indexes().await?;
        self.check_unique(document).await?;
        db::upsert(self.pool(), self.name(), document)
            .await
            .map_err(|e| self.unique_violation(e))
    }

    fn unique_violation(&self, err: StoreError) -> StoreError {
        let StoreError::Database(sqlx::Error::Database(db_err)) = &err else {
            return err;
        };
        if !db_err.is_unique_violation() {
            return err;
        }
        let message = db_err.message().to_string();
        let field = self
            .schema()
            .unique_fields()
            .find(|f| message.contains(&db::unique_index_name(self.name(), &f.name)))
            .or_else(|| self.schema().unique_fields().next());
        match field {
            Some(field) => StoreError::Duplicate {
                field: field.name.clone(),
            },
            None => err,
        }
    }

    async fn check_unique(&self, document: &Document) -> Result<(), StoreError> {
        for field in self.schema().unique_fields() {
            let Some(value) = document.get(&field.name) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            if db::value_taken(self.pool(), self.name(), &field.name, value, &document.id).await? {
                return Err(StoreError::Duplicate {
                    field: field.name.clone(),
                });
            }
        }
        Ok(())
    }
}
