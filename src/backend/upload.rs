/**
 * Image Upload
 *
 * Copies an already-received image file into the images directory under a
 * random name, keeping its extension. Only files inside the uploads
 * directory (written there by the multipart payload reader) are accepted.
 */

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, warn};

const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "svg", "gif", "avif", "webp"];

#[derive(Debug, Error)]
#[error("Failed to save image.")]
pub struct UploadError;

/// Store the image at `link`; returns its path relative to the data dir
pub async fn image_up(
    uploads_dir: &Path,
    images_dir: &Path,
    link: Option<&str>,
) -> Result<Option<String>, UploadError> {
    let Some(link) = link.filter(|l| !l.is_empty()) else {
        return Ok(None);
    };

    let ext = link
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.contains('/') && !ext.contains('\\'))
        .ok_or_else(|| {
            error!(link, "Link does not contain a file extension.");
            UploadError
        })?;
    if !IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()) {
        error!(link, ext, "Invalid file extension.");
        return Err(UploadError);
    }

    let source = uploaded_file(uploads_dir, link).await?;

    let file_name = format!("{}.{}", uuid::Uuid::new_v4().simple(), ext);
    tokio::fs::create_dir_all(images_dir).await.map_err(|e| {
        error!("Failed to create images dir: {}", e);
        UploadError
    })?;
    tokio::fs::copy(&source, images_dir.join(&file_name))
        .await
        .map_err(|e| {
            error!(link, "Failed to copy image: {}", e);
            UploadError
        })?;

    Ok(Some(format!("images/{}", file_name)))
}

/// Resolve `link` and require it to sit inside `uploads_dir`
async fn uploaded_file(uploads_dir: &Path, link: &str) -> Result<PathBuf, UploadError> {
    let root = tokio::fs::canonicalize(uploads_dir).await.map_err(|e| {
        error!(link, "Uploads dir unavailable: {}", e);
        UploadError
    })?;
    let source = tokio::fs::canonicalize(link).await.map_err(|e| {
        error!(link, "Failed to resolve image: {}", e);
        UploadError
    })?;
    if !source.starts_with(&root) {
        warn!(link, "Image outside the uploads dir rejected");
        return Err(UploadError);
    }
    Ok(source)
}
