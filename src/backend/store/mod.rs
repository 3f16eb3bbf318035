//! Document store
//!
//! JSON documents grouped in collections, persisted in SQLite through `sqlx`.
//! A `Store` owns the pool and the registry of collection schemas; a
//! `Collection` is a cheap handle bound to one schema exposing the CRUD
//! operations (`find`, `find_one`, `create`, `update`, `remove`, `remove_all`,
//! `save`).

pub mod db;
pub mod document;
pub mod error;
pub mod operations;
pub mod query;
pub mod schema;

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

pub use document::Document;
pub use error::StoreError;
pub use query::{FindQuery, FindResult, Page, Populate};
pub use schema::{Field, FieldType, Schema};

/// Outcome of `remove_all`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub deleted_count: u64,
}

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    schemas: Arc<RwLock<HashMap<String, Arc<Schema>>>>,
    /// Collections whose unique indexes exist in the database
    indexed: Arc<RwLock<HashSet<String>>>,
}

impl Store {
    /// Open (creating if needed) the database and run migrations
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = Self::from_pool(pool);
        store.migrate().await?;
        info!("=> Database connected");
        Ok(store)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            schemas: Arc::new(RwLock::new(HashMap::new())),
            indexed: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!().run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Register a schema, replacing any previous one with the same name
    pub fn register(&self, schema: Schema) -> Collection {
        let schema = Arc::new(schema);
        let mut schemas = self.schemas.write().unwrap_or_else(|e| e.into_inner());
        schemas.insert(schema.name.clone(), schema.clone());
        drop(schemas);
        self.indexed
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&schema.name);
        Collection {
            store: self.clone(),
            schema,
        }
    }

    pub fn schema(&self, name: &str) -> Option<Arc<Schema>> {
        let schemas = self.schemas.read().unwrap_or_else(|e| e.into_inner());
        schemas.get(name).cloned()
    }

    pub fn collection(&self, name: &str) -> Result<Collection, StoreError> {
        let schema = self
            .schema(name)
            .ok_or_else(|| StoreError::UnknownCollection(name.to_string()))?;
        Ok(Collection {
            store: self.clone(),
            schema,
        })
    }
}

/// Store handle bound to one schema
#[derive(Clone)]
pub struct Collection {
    store: Store,
    schema: Arc<Schema>,
}

impl Collection {
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub(crate) fn store(&self) -> &Store {
        &self.store
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.store.pool
    }

    /// Create the unique indexes of this schema once per registration
    pub(crate) async fn ensure_unique_indexes(&self) -> Result<(), StoreError> {
        let ready = self
            .store
            .indexed
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(self.name());
        if ready {
            return Ok(());
        }
        for field in self.schema.unique_fields() {
            db::ensure_unique_index(self.pool(), self.name(), &field.name).await?;
        }
        self.store
            .indexed
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(self.name().to_string());
        Ok(())
    }
}
