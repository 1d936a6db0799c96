//! services/sync/src/adapters/store.rs
//!
//! This module contains the document database adapter, the concrete
//! implementation of the `DocumentStore` port from the `core` crate. One
//! logical document lives under the project's REST endpoint; `save` is a
//! full-document upsert and `subscribe` delivers the document whenever its
//! server-side revision changes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use schedule_core::{AppData, DocumentPatch, DocumentStore, PortError, PortResult, PortStream};
use serde::Deserialize;

use crate::config::BackendConfig;

/// A document database adapter that implements the `DocumentStore` port.
#[derive(Clone)]
pub struct RestDocumentStore {
    http: reqwest::Client,
    document_url: String,
    api_key: String,
    poll_interval: Duration,
}

/// The wire envelope the backend wraps the document in.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentEnvelope {
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    data: DocumentPatch,
}

impl RestDocumentStore {
    /// Creates a new `RestDocumentStore` for the configured project.
    pub fn new(backend: &BackendConfig, poll_interval: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            document_url: format!(
                "https://{}/v1/projects/{}/documents/app-data",
                backend.auth_domain, backend.project_id
            ),
            api_key: backend.api_key.clone(),
            poll_interval,
        }
    }

    /// Fetches the document and its revision. A missing document reads as an
    /// empty patch, which merges to the static defaults downstream.
    async fn fetch(&self) -> PortResult<(Option<String>, DocumentPatch)> {
        let response = self
            .http
            .get(&self.document_url)
            .header("apikey", &self.api_key)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok((None, DocumentPatch::default())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(PortError::Unauthorized),
            status if status.is_success() => {
                let envelope: DocumentEnvelope = response
                    .json()
                    .await
                    .map_err(|e| PortError::Unexpected(e.to_string()))?;
                Ok((envelope.updated_at, envelope.data))
            }
            status => Err(PortError::Unexpected(format!(
                "document fetch failed with status {status}"
            ))),
        }
    }
}

#[async_trait]
impl DocumentStore for RestDocumentStore {
    /// Emits the current document immediately, then again whenever the
    /// server revision changes. Any fetch error is surfaced through the
    /// stream and ends the subscription; the caller falls back to defaults.
    async fn subscribe(&self) -> PortResult<PortStream<PortResult<DocumentPatch>>> {
        let this = self.clone();
        let stream = async_stream::stream! {
            let mut last_revision: Option<String> = None;
            let mut delivered_first = false;
            loop {
                match this.fetch().await {
                    Ok((revision, patch)) => {
                        if !delivered_first || revision != last_revision {
                            delivered_first = true;
                            last_revision = revision;
                            yield Ok(patch);
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
                tokio::time::sleep(this.poll_interval).await;
            }
        };
        Ok(Box::pin(stream))
    }

    async fn save(&self, data: &AppData) -> PortResult<()> {
        let response = self
            .http
            .put(&self.document_url)
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "data": data }))
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(PortError::Unauthorized),
            status if status.is_success() => Ok(()),
            status => Err(PortError::Unexpected(format!(
                "document upsert failed with status {status}"
            ))),
        }
    }
}
