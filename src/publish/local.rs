//! Filesystem object store
//!
//! Buckets are directories under a root; keys are relative paths.

use super::{ObjectLocation, ObjectStore};
use crate::error::{ReportError, ReportResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, location: &ObjectLocation) -> ReportResult<PathBuf> {
        let mut path = self.root.join(&location.bucket);
        for segment in location.key.split('/').filter(|s| !s.is_empty()) {
            if segment == ".." {
                return Err(ReportError::storage_write(
                    location,
                    "key must not leave the bucket",
                    Vec::new(),
                ));
            }
            path.push(segment);
        }
        Ok(path)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put_object(&self, location: &ObjectLocation, body: Vec<u8>) -> ReportResult<String> {
        let path = self.path_for(location)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ReportError::storage_write(location, e, Vec::new()))?;
        }
        fs::write(&path, body)
            .await
            .map_err(|e| ReportError::storage_write(location, e, Vec::new()))?;

        let absolute = fs::canonicalize(&path).await.unwrap_or(path);
        debug!("Wrote {}", absolute.display());
        Ok(format!("file://{}", absolute.display()))
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        limit: usize,
    ) -> ReportResult<Vec<String>> {
        let bucket_dir = self.root.join(bucket);
        if !fs::try_exists(&bucket_dir).await? {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        let mut pending = vec![bucket_dir.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                    continue;
                }
                let Ok(relative) = path.strip_prefix(&bucket_dir) else {
                    continue;
                };
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }

        keys.sort();
        keys.truncate(limit);
        Ok(keys)
    }
}
