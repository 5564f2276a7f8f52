//! Object storage for uploaded images and documents
//!
//! Provides:
//! - The `BlobStore` abstraction with an S3 implementation
//! - An in-memory store for tests and local runs
//! - Object key derivation from entity category and file name

use crate::config::StorageConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use std::sync::Mutex;

/// A file received from a multipart form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Key prefix family of an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadCategory {
    News,
    Personnel,
    Roadmap,
    CourseStructure,
}

impl UploadCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadCategory::News => "news",
            UploadCategory::Personnel => "personnel",
            // Course documents share one prefix
            UploadCategory::Roadmap | UploadCategory::CourseStructure => "course",
        }
    }
}

/// `images/<category>/<file name>` with directory parts dropped and spaces
/// replaced by underscores
pub fn object_key(category: UploadCategory, file_name: &str) -> Result<String> {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if base.is_empty() || base == "." || base == ".." {
        return Err(AppError::InvalidFormat {
            message: format!("unusable upload file name '{}'", file_name),
        });
    }

    Ok(format!("images/{}/{}", category.as_str(), base.replace(' ', "_")))
}

/// Trait for blob storage backends
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `file` under `key` and return its public URL
    async fn put(&self, key: &str, file: &UploadedFile) -> Result<String>;
}

/// Upload one file and return its public URL
pub async fn upload(
    store: &dyn BlobStore,
    category: UploadCategory,
    file: &UploadedFile,
) -> Result<String> {
    let key = object_key(category, &file.file_name)?;

    match store.put(&key, file).await {
        Ok(url) => {
            metrics::record_upload(category.as_str(), file.bytes.len(), true);
            tracing::info!(key = %key, bytes = file.bytes.len(), "File uploaded");
            Ok(url)
        }
        Err(e) => {
            metrics::record_upload(category.as_str(), file.bytes.len(), false);
            Err(e)
        }
    }
}

/// Upload files concurrently; URLs come back in input order and the first
/// failure fails the batch
pub async fn upload_all(
    store: &dyn BlobStore,
    category: UploadCategory,
    files: &[UploadedFile],
) -> Result<Vec<String>> {
    futures::future::try_join_all(files.iter().map(|f| upload(store, category, f))).await
}

/// S3-backed blob store
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    config: StorageConfig,
}

impl S3BlobStore {
    /// Build a client from configuration. Static credentials are used when
    /// both keys are set; otherwise the default provider chain applies.
    pub async fn from_config(config: &StorageConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let (Some(key_id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(
                key_id.clone(),
                secret.clone(),
                None,
                None,
                "cpsu-static",
            ));
        }

        let shared = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            config: config.clone(),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, file: &UploadedFile) -> Result<String> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .body(ByteStream::from(file.bytes.clone()));

        if let Some(content_type) = &file.content_type {
            request = request.content_type(content_type);
        }

        request.send().await.map_err(|e| AppError::Storage {
            message: format!("upload of {} failed: {}", key, e),
        })?;

        Ok(self.config.object_url(key))
    }
}

/// In-memory blob store for tests and local development
pub struct MemoryBlobStore {
    base_url: String,
    objects: Mutex<Vec<(String, usize)>>,
    fail: bool,
}

impl MemoryBlobStore {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            objects: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// A store whose every upload fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("memory://")
        }
    }

    /// Keys stored so far, in upload order
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .map(|objects| objects.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, file: &UploadedFile) -> Result<String> {
        if self.fail {
            return Err(AppError::Storage {
                message: format!("upload of {} rejected", key),
            });
        }

        self.objects
            .lock()
            .map_err(|_| AppError::Internal {
                message: "memory store poisoned".to_string(),
            })?
            .push((key.to_string(), file.bytes.len()));

        Ok(format!("{}/{}", self.base_url, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            content_type: Some("image/jpeg".to_string()),
            bytes: vec![1, 2, 3],
        }
    }

    #[test]
    fn test_object_key_replaces_spaces() {
        assert_eq!(
            object_key(UploadCategory::News, "open house 2024.jpg").unwrap(),
            "images/news/open_house_2024.jpg"
        );
        assert_eq!(
            object_key(UploadCategory::CourseStructure, "plan.pdf").unwrap(),
            "images/course/plan.pdf"
        );
    }

    #[test]
    fn test_object_key_drops_directories() {
        assert_eq!(
            object_key(UploadCategory::Personnel, "../../etc/my photo.png").unwrap(),
            "images/personnel/my_photo.png"
        );
        assert_eq!(
            object_key(UploadCategory::Roadmap, "C:\\Users\\a\\road map.pdf").unwrap(),
            "images/course/road_map.pdf"
        );
    }

    #[test]
    fn test_object_key_rejects_empty_name() {
        assert!(object_key(UploadCategory::News, "   ").is_err());
        assert!(object_key(UploadCategory::News, "dir/").is_err());
    }

    #[tokio::test]
    async fn test_upload_all_preserves_order() {
        let store = MemoryBlobStore::new("https://cdn.test/");
        let urls = upload_all(
            &store,
            UploadCategory::News,
            &[file("u1.jpg"), file("u2.jpg"), file("u3.jpg")],
        )
        .await
        .unwrap();

        assert_eq!(
            urls,
            vec![
                "https://cdn.test/images/news/u1.jpg",
                "https://cdn.test/images/news/u2.jpg",
                "https://cdn.test/images/news/u3.jpg",
            ]
        );
        assert_eq!(store.keys().len(), 3);
    }

    #[tokio::test]
    async fn test_upload_failure_is_storage_error() {
        let store = MemoryBlobStore::failing();
        let err = upload(&store, UploadCategory::News, &file("a.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Storage { .. }));
    }
}
