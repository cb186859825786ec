//! HTTP client for the remote authority.
//!
//! Endpoints, relative to `remote.base_url`:
//! - `POST sync/push` with a [`PushRequest`] body
//! - `GET sync/pull?since=<cursor>`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use tracing::debug;

use super::pull::{parse_pull_response, PullAdapter, PullOutcome};
use super::push::{classify_push_response, PushAdapter, PushOutcome, PushRequest};
use crate::config::{RemoteConfig, SyncSettings};
use crate::error::SyncError;
use crate::sync::QueueItem;

/// Push and pull adapters backed by one HTTP client.
#[derive(Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
    push_timeout: Duration,
    pull_timeout: Duration,
}

impl HttpRemote {
    /// Build the client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(remote: &RemoteConfig, settings: &SyncSettings) -> Result<Self, SyncError> {
        let client = Client::builder()
            .user_agent(concat!("leadsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: remote.base_url.trim_end_matches('/').to_string(),
            auth_token: remote.auth_token.clone(),
            push_timeout: settings.push_timeout(),
            pull_timeout: settings.pull_timeout(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl PushAdapter for HttpRemote {
    async fn push_one(&self, item: &QueueItem) -> PushOutcome {
        let request = self.authorize(
            self.client
                .post(self.endpoint("sync/push"))
                .timeout(self.push_timeout)
                .json(&PushRequest::from(item)),
        );

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return PushOutcome::Failed(SyncError::from(e).to_string()),
        };

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return PushOutcome::Failed(SyncError::from(e).to_string()),
        };

        debug!(item_id = item.id, status, "Push answered");
        classify_push_response(status, &body)
    }
}

#[async_trait]
impl PullAdapter for HttpRemote {
    async fn pull_changes(&self, cursor: Option<&str>) -> Result<PullOutcome, SyncError> {
        let mut request = self
            .client
            .get(self.endpoint("sync/pull"))
            .timeout(self.pull_timeout);
        if let Some(cursor) = cursor {
            request = request.query(&[("since", cursor)]);
        }

        let response = self.authorize(request).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        debug!(status, bytes = body.len(), "Pull answered");
        parse_pull_response(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(base_url: &str) -> HttpRemote {
        let config = RemoteConfig {
            base_url: base_url.to_string(),
            auth_token: Some("secret".to_string()),
        };
        HttpRemote::new(&config, &SyncSettings::default()).unwrap()
    }

    #[test]
    fn test_endpoint_joins_cleanly() {
        assert_eq!(
            remote("https://crm.example.com/api/").endpoint("sync/push"),
            "https://crm.example.com/api/sync/push"
        );
        assert_eq!(
            remote("https://crm.example.com/api").endpoint("sync/pull"),
            "https://crm.example.com/api/sync/pull"
        );
    }

    #[tokio::test]
    async fn test_unreachable_push_is_transient() {
        let item = QueueItem {
            id: 1,
            operation: crate::sync::Operation::Create,
            entity_type: "lead".to_string(),
            record_id: "L-1".to_string(),
            payload: "{}".to_string(),
            owner_id: "u-1".to_string(),
            retry_count: 0,
            conflict_count: 0,
            last_error: None,
            created_at: chrono::Utc::now(),
            synced_at: None,
        };

        let outcome = remote("http://127.0.0.1:9").push_one(&item).await;
        assert!(matches!(outcome, PushOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_unreachable_pull_errors() {
        let err = remote("http://127.0.0.1:9")
            .pull_changes(Some("c-1"))
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }
}
