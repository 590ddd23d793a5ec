//! SNS notification channel

use super::NotificationChannel;
use crate::backend::Topic;
use crate::error::{ReportError, ReportResult};
use async_trait::async_trait;
use aws_sdk_sns::Client;
use std::sync::Arc;
use tracing::debug;

pub struct SnsChannel {
    client: Arc<Client>,
}

impl SnsChannel {
    pub async fn from_env() -> Self {
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
impl NotificationChannel for SnsChannel {
    async fn list_topics(&self) -> ReportResult<Vec<Topic>> {
        let mut topics = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_topics()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| ReportError::unavailable("list_topics", e))?;

            for topic in output.topics() {
                if let Some(arn) = topic.topic_arn() {
                    topics.push(Topic {
                        name: arn.rsplit(':').next().unwrap_or(arn).to_string(),
                        handle: arn.to_string(),
                    });
                }
            }

            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        debug!("Listed {} SNS topics", topics.len());
        Ok(topics)
    }

    async fn publish(&self, topic_handle: &str, subject: &str, body: &str) -> ReportResult<()> {
        self.client
            .publish()
            .topic_arn(topic_handle)
            .subject(subject)
            .message(body)
            .send()
            .await
            .map_err(|e| ReportError::unavailable("publish", e))?;
        Ok(())
    }
}
