//! Artifact persistence and notification dispatch
//!
//! The [`Publisher`] writes the two report documents to an [`ObjectStore`]
//! and sends a summary through a [`NotificationChannel`]. The two writes are
//! not transactional: when the second write fails the first artifact stays
//! in place and is named in the returned error.

pub mod local;
pub mod memory;
pub mod notice;
#[cfg(feature = "aws")]
pub mod s3;
#[cfg(feature = "aws")]
pub mod sns;

pub use local::LocalObjectStore;
pub use memory::MemoryObjectStore;
pub use notice::{compose_body, compose_subject, Notice, RunType, UpstreamSource};

use crate::backend::retry::with_retry;
use crate::backend::Topic;
use crate::config::RetryPolicy;
use crate::error::{ReportError, ReportResult};
use crate::report::formatter::{FAILURE_DOCUMENT_NAME, MODULE_DOCUMENT_NAME};
use crate::report::ReportDocuments;
use async_trait::async_trait;
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Most keys returned by an upstream listing
pub const MAX_LISTED_OBJECTS: usize = 1000;

/// Bucket and key of a stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Where a run's artifacts are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub bucket: String,
    pub prefix: String,
}

impl Destination {
    pub fn new(bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    /// Location of `name` under this destination's prefix
    pub fn location(&self, name: &str) -> ObjectLocation {
        let prefix = self.prefix.trim_matches('/');
        let key = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", prefix, name)
        };
        ObjectLocation::new(self.bucket.clone(), key)
    }
}

/// Addressable locations of the written documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedArtifacts {
    pub module_uri: String,
    pub failure_uri: String,
}

/// Durable object storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `body` at `location`, replacing any existing object, and return its URI
    async fn put_object(&self, location: &ObjectLocation, body: Vec<u8>) -> ReportResult<String>;

    /// Keys in `bucket` starting with `prefix`, at most `limit`
    async fn list_objects(&self, bucket: &str, prefix: &str, limit: usize)
        -> ReportResult<Vec<String>>;
}

/// Topic-based notification service
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn list_topics(&self) -> ReportResult<Vec<Topic>>;

    async fn publish(&self, topic_handle: &str, subject: &str, body: &str) -> ReportResult<()>;
}

/// Writes report artifacts and dispatches notifications
pub struct Publisher {
    store: Arc<dyn ObjectStore>,
    channel: Arc<dyn NotificationChannel>,
    topic_substring: String,
    troubleshooting_url: Option<String>,
    retry: RetryPolicy,
}

impl Publisher {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        channel: Arc<dyn NotificationChannel>,
        topic_substring: impl Into<String>,
    ) -> Self {
        Self {
            store,
            channel,
            topic_substring: topic_substring.into(),
            troubleshooting_url: None,
            retry: RetryPolicy::none(),
        }
    }

    /// Retry transient store and channel failures with `policy`
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn with_troubleshooting_url(mut self, url: Option<String>) -> Self {
        self.troubleshooting_url = url;
        self
    }

    /// Write both documents under `destination`
    ///
    /// A failure names the artifacts already written.
    pub async fn publish(
        &self,
        documents: &ReportDocuments,
        destination: &Destination,
    ) -> ReportResult<PublishedArtifacts> {
        let mut written = Vec::new();

        let module_uri = self
            .write(
                &destination.location(MODULE_DOCUMENT_NAME),
                &documents.module_document,
                &written,
            )
            .await?;
        info!("Uploaded module report: {}", module_uri);
        written.push(module_uri.clone());

        let failure_uri = self
            .write(
                &destination.location(FAILURE_DOCUMENT_NAME),
                &documents.failure_document,
                &written,
            )
            .await?;
        info!("Uploaded failure report: {}", failure_uri);

        Ok(PublishedArtifacts {
            module_uri,
            failure_uri,
        })
    }

    async fn write(
        &self,
        location: &ObjectLocation,
        document: &str,
        written: &[String],
    ) -> ReportResult<String> {
        debug!("Writing {} bytes to {}", document.len(), location);
        with_retry(&self.retry, "put_object", || {
            self.store.put_object(location, document.as_bytes().to_vec())
        })
        .await
        .map_err(|err| match err {
            ReportError::StorageWriteFailure {
                location, message, ..
            } => ReportError::storage_write(location, message, written.to_vec()),
            other => ReportError::storage_write(location, other, written.to_vec()),
        })
    }

    /// Handle of the first topic whose handle contains the configured substring
    pub async fn find_topic(&self) -> ReportResult<Option<Topic>> {
        let topics = with_retry(&self.retry, "list_topics", || self.channel.list_topics()).await?;
        debug!("Searching {} topics for '{}'", topics.len(), self.topic_substring);
        Ok(topics
            .into_iter()
            .find(|topic| topic.handle.contains(&self.topic_substring)))
    }

    /// Compose and send the run notification
    ///
    /// Returns `false` without sending when no topic matches.
    pub async fn notify(&self, notice: &Notice<'_>) -> ReportResult<bool> {
        let Some(topic) = self.find_topic().await? else {
            error!(
                "No notification topic matching '{}' was found; notification not sent",
                self.topic_substring
            );
            return Ok(false);
        };

        let subject = compose_subject(notice.success, Utc::now());
        let body = compose_body(notice, self.troubleshooting_url.as_deref());
        with_retry(&self.retry, "publish", || {
            self.channel.publish(&topic.handle, &subject, &body)
        })
        .await?;
        info!("Notification sent to: {}", topic.handle);
        Ok(true)
    }

    /// Render the upstream artifact listing for the notification body
    ///
    /// Listing is informational: missing inputs or a failed listing yield `None`.
    pub async fn upstream_listing(&self, source: Option<&UpstreamSource>) -> Option<String> {
        let Some(source) = source else {
            warn!("No source bucket, run type or version; skipping upstream listing");
            return None;
        };

        let prefix = source.prefix();
        let listing = with_retry(&self.retry, "list_objects", || {
            self.store
                .list_objects(&source.bucket, &prefix, MAX_LISTED_OBJECTS)
        })
        .await;
        match listing {
            Ok(keys) => {
                debug!("Found {} upstream objects under {}", keys.len(), prefix);
                Some(source.render(&keys))
            }
            Err(err) => {
                warn!("Could not list s3://{}/{}: {}", source.bucket, prefix, err);
                None
            }
        }
    }
}
