//! In-memory object store

use super::{ObjectLocation, ObjectStore};
use crate::error::{ReportError, ReportResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Object store kept in memory, with optional write failures for tests
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<(String, String), Vec<u8>>>,
    failing_keys: RwLock<Option<String>>,
    transient_failures: RwLock<u32>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every write whose key contains `pattern`
    pub async fn fail_writes_matching(&self, pattern: impl Into<String>) {
        *self.failing_keys.write().await = Some(pattern.into());
    }

    /// Make the next `count` writes fail as unavailable
    pub async fn inject_failures(&self, count: u32) {
        *self.transient_failures.write().await = count;
    }

    pub async fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(&self, location: &ObjectLocation, body: Vec<u8>) -> ReportResult<String> {
        {
            let mut remaining = self.transient_failures.write().await;
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ReportError::unavailable("put_object", "injected failure"));
            }
        }
        if let Some(pattern) = self.failing_keys.read().await.as_deref() {
            if location.key.contains(pattern) {
                return Err(ReportError::storage_write(
                    location,
                    "injected write failure",
                    Vec::new(),
                ));
            }
        }

        self.objects
            .write()
            .await
            .insert((location.bucket.clone(), location.key.clone()), body);
        Ok(format!("memory://{}", location))
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        limit: usize,
    ) -> ReportResult<Vec<String>> {
        Ok(self
            .objects
            .read()
            .await
            .keys()
            .filter(|(b, key)| b == bucket && key.starts_with(prefix))
            .map(|(_, key)| key.clone())
            .take(limit)
            .collect())
    }
}
