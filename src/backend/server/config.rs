/**
 * Boot Dependencies
 *
 * Everything that has to be ready before the application router is built:
 * the static client directory and the document store.
 *
 * Unlike the optional services (mailer, rate limiter), a failure here stops
 * startup.
 */

use std::path::Path;

use tracing::{error, info};

use crate::backend::error::BackendError;
use crate::backend::store::Store;
use crate::shared::Settings;

/// The static client directory is served as fallback and must exist
pub async fn ensure_client_dir(dir: &Path) -> Result<(), BackendError> {
    if !tokio::fs::try_exists(dir).await? {
        tokio::fs::create_dir_all(dir).await?;
        info!(path = %dir.display(), "Created client directory");
    }
    Ok(())
}

/// Connect to the database and run migrations
pub async fn load_database(settings: &Settings) -> Result<Store, BackendError> {
    info!("Connecting to database...");
    Store::connect(&settings.database_url).await.map_err(|e| {
        error!("Failed to connect to database: {}", e);
        BackendError::from(e)
    })
}
