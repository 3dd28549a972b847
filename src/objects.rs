//! Object-storage collaborator for uploaded images.
//!
//! The service hands files to an `ObjectStore` and gets back a publicly
//! resolvable URL rooted at the configured storage domain. The same store
//! backs the `/api/image/*` proxy so panorama sources stay same-origin.
//! The default implementation keeps objects on the local filesystem; a
//! remote S3-compatible store slots in behind the same trait.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

#[derive(Error, Debug)]
pub enum ObjectError {
    #[error("object not found")]
    NotFound,

    #[error("invalid object key")]
    InvalidKey,

    #[error("object io error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key` and return the public URL for it.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, ObjectError>;

    /// Fetch an object's bytes plus its content type.
    async fn get(&self, key: &str) -> Result<(Vec<u8>, String), ObjectError>;
}

/// Filesystem-backed store issuing URLs under a fixed public base.
pub struct LocalObjectStore {
    root: PathBuf,
    public_base: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into(),
        }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, ObjectError> {
        if key.is_empty() || key.split('/').any(|part| part.is_empty() || part == "..") {
            return Err(ObjectError::InvalidKey);
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, ObjectError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(format!("{}/{}", self.public_base.trim_end_matches('/'), key))
    }

    async fn get(&self, key: &str) -> Result<(Vec<u8>, String), ObjectError> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok((bytes, content_type_for(&path).to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ObjectError::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Strip everything but `[a-zA-Z0-9.-]` from an uploaded file name.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '-')
        .collect()
}

/// Object key for a fresh upload: `{owner}/{timestamp}-{random}-{name}`.
pub fn upload_key(owner_id: &str, file_name: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp_millis();
    let random = Uuid::new_v4().simple().to_string();
    let sanitized = sanitize_file_name(file_name);
    format!("{owner_id}/{timestamp}-{}-{sanitized}", &random[..6])
}

/// Reject uploads that are empty, oversized, or not an allowed image type.
pub fn validate_upload(
    file_name: &str,
    content_type: &str,
    size: usize,
    max_bytes: usize,
) -> Result<(), String> {
    if file_name.is_empty() || size == 0 {
        return Err("No file provided".to_string());
    }
    if size > max_bytes {
        return Err("File size exceeds limit".to_string());
    }
    if !ALLOWED_IMAGE_TYPES.contains(&content_type) {
        return Err("Invalid file type".to_string());
    }
    Ok(())
}
