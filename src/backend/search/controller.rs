/**
 * Search Controller
 *
 * Owns one `SearchIndex` per schema key, each in its own tantivy directory
 * at `<search_dir>/<key>/`. Indexes are reopened on `start` and committed
 * again on shutdown.
 */

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::backend::search::index::{SearchIndex, SearchParams, SearchResults, SearchSchema};
use crate::backend::search::SearchError;

pub struct SearchCtrl {
    data_path: PathBuf,
    schemas: Vec<SearchSchema>,
    instances: RwLock<HashMap<String, SearchIndex>>,
}

impl SearchCtrl {
    pub fn new(data_path: impl Into<PathBuf>, schemas: Vec<SearchSchema>) -> Self {
        Self {
            data_path: data_path.into(),
            schemas,
            instances: RwLock::new(HashMap::new()),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.schemas.iter().map(|s| s.key.clone()).collect()
    }

    pub fn dir_for(&self, key: &str) -> PathBuf {
        self.data_path.join(key)
    }

    /// Restore every index from disk or create it fresh, then persist all
    pub async fn start(&self) -> Result<(), SearchError> {
        tokio::fs::create_dir_all(&self.data_path).await?;

        {
            let mut instances = self.instances.write().await;
            for schema in &self.schemas {
                let dir = self.dir_for(&schema.key);
                let index = match self.restore(&dir).await {
                    Some(index) if index.schema() == schema => index,
                    Some(index) => {
                        warn!(key = %schema.key, "Search schema changed, rebuilding empty index");
                        drop(index);
                        SearchIndex::create(&dir, schema.clone())?
                    }
                    None => SearchIndex::create(&dir, schema.clone())?,
                };
                instances.insert(schema.key.clone(), index);
            }
        }

        self.save(None).await?;
        info!("=> Search controller started");
        Ok(())
    }

    /// Open a persisted index; any failure yields `None`
    pub async fn restore(&self, path: impl AsRef<Path>) -> Option<SearchIndex> {
        let path = path.as_ref();
        if !path.join("meta.json").exists() {
            return None;
        }
        match SearchIndex::open(path) {
            Ok(index) => Some(index),
            Err(e) => {
                warn!(path = %path.display(), "Failed to restore search index: {}", e);
                None
            }
        }
    }

    /// Commit the given keys, or every index when `keys` is `None`
    pub async fn save(&self, keys: Option<&[String]>) -> Result<(), SearchError> {
        let keys = match keys {
            Some(keys) => keys.to_vec(),
            None => self.keys(),
        };
        let mut instances = self.instances.write().await;
        for key in keys {
            let index = instances
                .get_mut(&key)
                .ok_or_else(|| SearchError::UnknownIndex(key.clone()))?;
            index.commit()?;
            debug!(key = %key, docs = index.len(), "Search index saved");
        }
        Ok(())
    }

    pub async fn insert(&self, key: &str, value: Value) -> Result<String, SearchError> {
        let mut instances = self.instances.write().await;
        let index = instances
            .get_mut(key)
            .ok_or_else(|| SearchError::UnknownIndex(key.to_string()))?;
        index.insert(value)
    }

    /// Remove a document; failures are logged and swallowed
    pub async fn remove(&self, key: &str, id: &str) {
        let mut instances = self.instances.write().await;
        match instances.get_mut(key).map(|index| index.remove(id)) {
            Some(Ok(true)) => {}
            Some(Ok(false)) => debug!(key, id, "Search remove: no such document"),
            Some(Err(e)) => warn!(key, id, "Search remove failed: {}", e),
            None => warn!(key, "Search remove: unknown index"),
        }
    }

    pub async fn search(&self, key: &str, params: SearchParams) -> Result<SearchResults, SearchError> {
        let instances = self.instances.read().await;
        let index = instances
            .get(key)
            .ok_or_else(|| SearchError::UnknownIndex(key.to_string()))?;
        index.search(&params)
    }
}
