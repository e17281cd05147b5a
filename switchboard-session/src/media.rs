//! Media storage and uploads.

use crate::error::{SessionError, SessionResult};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use rand::RngCore;
use serde::Serialize;
use std::path::Path;
use switchboard_core::{MediaType, UserId, classify_mime, validate_media_size};

/// Binary object storage returning a public URL per object
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Store `data` under `key` and return its URL.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> SessionResult<String>;
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedMedia {
    pub url: String,
    pub key: String,
    pub mime_type: String,
    pub size: u64,
    pub filename: String,
    pub media_type: MediaType,
}

/// Validate and store a media payload for `user_id`.
///
/// The size is checked before the type and both before storage is touched.
pub async fn upload(
    storage: &dyn MediaStorage,
    user_id: UserId,
    data: Bytes,
    filename: &str,
    mime_type: &str,
    max_size: u64,
) -> SessionResult<UploadedMedia> {
    let size = data.len() as u64;
    validate_media_size(size, max_size)?;
    let media_type = classify_mime(mime_type)?;

    let stored_name = unique_filename(filename);
    let key = format!("user_{user_id}/media/{stored_name}");
    let url = storage.put(&key, data, mime_type).await?;

    tracing::debug!(user_id, key = %key, size, "Media stored");

    Ok(UploadedMedia {
        url,
        key,
        mime_type: mime_type.to_string(),
        size,
        filename: stored_name,
        media_type,
    })
}

/// `<base>-<16 hex>.<ext>` with the random suffix preventing enumeration
fn unique_filename(filename: &str) -> String {
    let mut suffix = [0u8; 8];
    rand::rng().fill_bytes(&mut suffix);
    let suffix = hex::encode(suffix);

    // Only the final path component of a caller-supplied name is kept
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("media");
    let path = Path::new(name);
    let base = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("media");

    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{base}-{suffix}.{ext}"),
        None => format!("{base}-{suffix}"),
    }
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
}

/// In-process object storage.
#[derive(Debug)]
pub struct InMemoryMediaStorage {
    base_url: String,
    objects: DashMap<String, StoredObject>,
}

impl Default for InMemoryMediaStorage {
    fn default() -> Self {
        Self::new("memory://media")
    }
}

impl InMemoryMediaStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: DashMap::new(),
        }
    }

    /// Stored bytes and content type of `key`
    pub fn get(&self, key: &str) -> Option<(Bytes, String)> {
        self.objects
            .get(key)
            .map(|o| (o.data.clone(), o.content_type.clone()))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl MediaStorage for InMemoryMediaStorage {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> SessionResult<String> {
        if key.is_empty() {
            return Err(SessionError::Storage("empty object key".to_string()));
        }
        self.objects.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(format!("{}/{}", self.base_url, key))
    }
}
