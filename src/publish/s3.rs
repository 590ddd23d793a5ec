//! S3 object store

use super::{ObjectLocation, ObjectStore};
use crate::error::{ReportError, ReportResult};
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::types::ServerSideEncryption;
use aws_sdk_s3::Client;
use std::sync::Arc;
use tracing::{debug, info};

/// Object store backed by S3; objects are written with AES256 encryption
pub struct S3ObjectStore {
    client: Arc<Client>,
}

impl S3ObjectStore {
    pub async fn from_env() -> Self {
        info!("Initializing S3 object store");
        let aws_config = aws_config::load_from_env().await;
        Self::new(Client::new(&aws_config))
    }

    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, location: &ObjectLocation, body: Vec<u8>) -> ReportResult<String> {
        debug!("Uploading s3://{}", location);

        self.client
            .put_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .server_side_encryption(ServerSideEncryption::Aes256)
            .body(body.into())
            .send()
            .await
            .map_err(|e| ReportError::unavailable("put_object", DisplayErrorContext(&e)))?;

        Ok(format!("s3://{}", location))
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        limit: usize,
    ) -> ReportResult<Vec<String>> {
        let max_keys = i32::try_from(limit).unwrap_or(i32::MAX);
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .max_keys(max_keys)
            .send()
            .await
            .map_err(|e| ReportError::unavailable("list_objects_v2", e))?;

        Ok(output
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_string))
            .collect())
    }
}
