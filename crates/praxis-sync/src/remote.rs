//! REST backend access. The engine only ever fetches whole collections and
//! pushes batches of locally edited records; everything else about the API is
//! someone else's problem.

use async_trait::async_trait;
use praxis_proto::EntityKind;
use serde_json::Value;

use crate::error::TransportError;

/// Request/response surface of the backend, kept as a trait so tests can
/// substitute an in-memory fake for the HTTP client.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch the full remote collection for one kind.
    async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Value>, TransportError>;

    /// Upload locally edited records. The server treats the batch as
    /// last-write-wins upserts; a success response confirms acceptance of the
    /// whole batch.
    async fn push_batch(&self, kind: EntityKind, records: &[Value]) -> Result<(), TransportError>;
}

pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpRemote {
    pub fn new(base_url: &str, api_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        }
    }

    fn collection_url(&self, kind: EntityKind) -> String {
        format!("{}/api/{}", self.base_url, kind.endpoint())
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl RemoteSource for HttpRemote {
    async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Value>, TransportError> {
        let url = self.collection_url(kind);
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url,
                status: status.as_u16(),
            });
        }

        response
            .json::<Vec<Value>>()
            .await
            .map_err(|source| TransportError::Request { url, source })
    }

    async fn push_batch(&self, kind: EntityKind, records: &[Value]) -> Result<(), TransportError> {
        if records.is_empty() {
            return Ok(());
        }

        let url = format!("{}/batch", self.collection_url(kind));
        let response = self
            .authorize(self.client.post(&url))
            .json(records)
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url,
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
