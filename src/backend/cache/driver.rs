/**
 * Driver Cache
 *
 * Small JSON map kept in memory while the server runs and written to
 * `<cache_dir>/drivers.json` on shutdown.
 */

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub const CACHE_FILE: &str = "drivers.json";

pub struct DriverCache {
    full_path: PathBuf,
    drivers: RwLock<BTreeMap<String, Value>>,
}

impl DriverCache {
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        Self {
            full_path: cache_dir.as_ref().join(CACHE_FILE),
            drivers: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.full_path
    }

    /// Create the cache file if missing and load its contents
    pub async fn born(&self) -> std::io::Result<()> {
        if let Some(dir) = self.full_path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        if !tokio::fs::try_exists(&self.full_path).await? {
            tokio::fs::write(&self.full_path, "{}").await?;
        }

        let raw = tokio::fs::read(&self.full_path).await?;
        let loaded: BTreeMap<String, Value> = match serde_json::from_slice(&raw) {
            Ok(map) => map,
            Err(e) => {
                warn!(path = %self.full_path.display(), "Driver cache unreadable, starting empty: {}", e);
                BTreeMap::new()
            }
        };
        let count = loaded.len();
        *self.drivers.write().await = loaded;
        info!(drivers = count, "=> Driver cache loaded");
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Option<Value> {
        self.drivers.read().await.get(id).cloned()
    }

    pub async fn all(&self) -> BTreeMap<String, Value> {
        self.drivers.read().await.clone()
    }

    pub async fn add(&self, id: impl Into<String>, value: Value) {
        self.drivers.write().await.insert(id.into(), value);
    }

    pub async fn remove(&self, id: &str) -> Option<Value> {
        self.drivers.write().await.remove(id)
    }

    /// Write the map back to disk
    pub async fn die(&self) -> std::io::Result<()> {
        let encoded = serde_json::to_vec(&*self.drivers.read().await)?;
        tokio::fs::write(&self.full_path, encoded).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_born_creates_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DriverCache::new(dir.path().join("cache"));
        cache.born().await.unwrap();
        assert_eq!(std::fs::read_to_string(cache.path()).unwrap(), "{}");
        assert!(cache.all().await.is_empty());
    }

    #[tokio::test]
    async fn test_die_persists_and_born_restores() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DriverCache::new(dir.path());
        cache.born().await.unwrap();
        cache.add("d1", json!({"lat": 1.5, "lng": 2.5})).await;
        cache.add("d2", json!("idle")).await;
        assert_eq!(cache.remove("d2").await, Some(json!("idle")));
        cache.die().await.unwrap();

        let reborn = DriverCache::new(dir.path());
        reborn.born().await.unwrap();
        assert_eq!(reborn.get("d1").await, Some(json!({"lat": 1.5, "lng": 2.5})));
        assert_eq!(reborn.get("d2").await, None);
    }
}
