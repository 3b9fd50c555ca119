//! Cache-aside delivery of file payloads.
//!
//! A file is read from the `file:` cache when its metadata allows caching,
//! otherwise from the metadata row plus the blob store. Files whose `cache` flag
//! is off never enter the cache.

use std::sync::Arc;
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use bytes::Bytes;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::application::error::{Missing, ResolveError};
use crate::application::repos::FilesRepo;
use crate::application::upstream;
use crate::cache::{CacheAside, CacheKey};
use crate::infra::blob::{BlobError, BlobFetcher};

const SOURCE: &str = "application::content";

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
pub const UNCACHED_FILE_METRIC: &str = "narnia_file_uncached_total";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    #[default]
    ReadWrite,
    /// Skip the file cache for both read and write.
    Bypass,
}

impl CacheMode {
    pub fn from_bypass_flag(bypass: bool) -> Self {
        if bypass {
            CacheMode::Bypass
        } else {
            CacheMode::ReadWrite
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePayload {
    pub file_id: String,
    pub content_type: String,
    pub file_name: String,
    pub bytes: Bytes,
    pub hash: Option<String>,
    pub cacheable: bool,
}

/// Shape of a `file:` cache entry.
#[derive(Debug, Serialize, Deserialize)]
struct CachedFile {
    #[serde(rename = "contentType")]
    content_type: Option<String>,
    /// Base64 of the file bytes.
    content: String,
    #[serde(rename = "fileName")]
    file_name: String,
    cache: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hash: Option<String>,
}

impl CachedFile {
    fn from_payload(payload: &FilePayload) -> Self {
        Self {
            content_type: Some(payload.content_type.clone()),
            content: BASE64.encode(&payload.bytes),
            file_name: payload.file_name.clone(),
            cache: payload.cacheable,
            hash: payload.hash.clone(),
        }
    }

    fn into_payload(self, file_id: &str) -> Result<FilePayload, base64::DecodeError> {
        let bytes = BASE64.decode(self.content.as_bytes())?;
        Ok(FilePayload {
            file_id: file_id.to_string(),
            content_type: self
                .content_type
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            file_name: self.file_name,
            bytes: Bytes::from(bytes),
            hash: self.hash,
            cacheable: self.cache,
        })
    }
}

pub struct ContentService {
    files: Arc<dyn FilesRepo>,
    blobs: BlobFetcher,
    cache: CacheAside,
    timeout: Duration,
}

impl ContentService {
    pub fn new(
        files: Arc<dyn FilesRepo>,
        blobs: BlobFetcher,
        cache: CacheAside,
        timeout: Duration,
    ) -> Self {
        Self {
            files,
            blobs,
            cache,
            timeout,
        }
    }

    pub async fn deliver(&self, file_id: &str, mode: CacheMode) -> Result<FilePayload, ResolveError> {
        let key = CacheKey::file(file_id);

        if mode == CacheMode::ReadWrite
            && let Some(cached) = self.cache.lookup::<CachedFile>(&key).await
        {
            match cached.into_payload(file_id) {
                Ok(payload) => return Ok(payload),
                Err(err) => warn!(
                    target = SOURCE,
                    file_id,
                    error = %err,
                    "cached file content is not valid base64; refetching"
                ),
            }
        }

        let file = upstream::database(self.timeout, "find_file", self.files.find_file(file_id))
            .await?
            .ok_or(ResolveError::NotFound(Missing::File))?;

        let object = self.blobs.fetch(&file.storage_path).await.map_err(|err| {
            match &err {
                BlobError::NotFound(key) => warn!(
                    target = SOURCE,
                    file_id,
                    key = %key,
                    "file metadata points at a missing blob"
                ),
                other => error!(
                    target = SOURCE,
                    file_id,
                    error = %other,
                    "blob fetch failed"
                ),
            }
            ResolveError::from(err)
        })?;

        let payload = FilePayload {
            file_id: file.id,
            content_type: file
                .content_type
                .or(object.content_type)
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            file_name: file.file_name,
            bytes: object.bytes,
            hash: file.hash.filter(|hash| !hash.is_empty()),
            cacheable: file.cacheable,
        };

        if !payload.cacheable {
            counter!(UNCACHED_FILE_METRIC).increment(1);
            info!(
                target = SOURCE,
                file_id,
                "uncached_file: served without caching"
            );
        } else if mode == CacheMode::ReadWrite {
            self.cache
                .store(&key, &CachedFile::from_payload(&payload))
                .await;
        }

        Ok(payload)
    }

    /// Drops the cached payload so the next delivery reflects fresh metadata.
    pub async fn forget(&self, file_id: &str) {
        if let Err(err) = self.cache.invalidate(&CacheKey::file(file_id)).await {
            warn!(
                target = SOURCE,
                file_id,
                error = %err,
                "failed to drop cached file"
            );
        }
    }
}
