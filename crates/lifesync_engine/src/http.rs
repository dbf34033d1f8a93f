//! HTTP remote client.
//!
//! The actual HTTP client is abstracted via a trait so different
//! implementations (reqwest, hyper, a platform bridge) can be plugged in.
//! Bodies are JSON; every response is an [`ApiEnvelope`].

use crate::error::{SyncError, SyncResult};
use crate::remote::{RecordPatch, RemoteClient};
use async_trait::async_trait;
use lifesync_protocol::{ApiEnvelope, Record, RemoteFailure};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::time::Duration;

/// HTTP methods used by the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

/// An outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Method.
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: String,
    /// JSON body, if any.
    pub body: Option<String>,
}

/// A received response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw body.
    pub body: String,
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual transport. An `Err` means the
/// request never produced a response (connection refused, DNS, TLS).
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends a request and returns the response.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, String>;
}

/// [`RemoteClient`] over a JSON/HTTP API.
///
/// Routes, relative to `base_url`:
/// - `GET /{resource}`: list
/// - `POST /{resource}`: create
/// - `PUT /{resource}/{id}`: update
/// - `DELETE /{resource}/{id}`: delete
pub struct HttpRemoteClient<C, R> {
    base_url: String,
    resource: String,
    client: C,
    timeout: Duration,
    last_error: RwLock<Option<String>>,
    _marker: PhantomData<fn() -> R>,
}

impl<C: HttpClient, R: Record> HttpRemoteClient<C, R> {
    /// Creates a client for `resource` under `base_url`.
    pub fn new(base_url: impl Into<String>, resource: impl Into<String>, client: C) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            resource: resource.into().trim_matches('/').to_string(),
            client,
            timeout: crate::config::DEFAULT_REMOTE_TIMEOUT,
            last_error: RwLock::new(None),
            _marker: PhantomData,
        }
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the last error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.base_url, self.resource)
    }

    fn record_url(&self, id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            self.resource,
            urlencoding::encode(id)
        )
    }

    async fn call<T: DeserializeOwned>(&self, request: HttpRequest) -> SyncResult<Option<T>> {
        let result = self.exchange(request).await;
        match &result {
            Ok(_) => *self.last_error.write() = None,
            Err(e) => *self.last_error.write() = Some(e.to_string()),
        }
        result
    }

    async fn exchange<T: DeserializeOwned>(&self, request: HttpRequest) -> SyncResult<Option<T>> {
        tracing::debug!(method = ?request.method, url = %request.url, "remote request");
        let response = tokio::time::timeout(self.timeout, self.client.send(request))
            .await
            .map_err(|_| SyncError::Timeout)?
            .map_err(SyncError::network_retryable)?;

        let status = response.status;
        let envelope: ApiEnvelope<T> = match serde_json::from_str(&response.body) {
            Ok(envelope) => envelope,
            Err(_) if !(200..300).contains(&status) => {
                return Err(SyncError::from_failure(RemoteFailure::new(
                    Some(status),
                    None,
                    response.body,
                )));
            }
            Err(e) => {
                return Err(SyncError::Protocol(format!(
                    "failed to decode response envelope: {e}"
                )));
            }
        };

        if !(200..300).contains(&status) && envelope.is_success() {
            return Err(SyncError::from_failure(RemoteFailure::new(
                Some(status),
                Some(envelope.code),
                envelope.message,
            )));
        }
        envelope
            .into_result(Some(status))
            .map_err(SyncError::from_failure)
    }

    fn encode<T: serde::Serialize>(&self, value: &T) -> SyncResult<String> {
        serde_json::to_string(value).map_err(|e| SyncError::codec(R::KIND, e))
    }
}

#[async_trait]
impl<C: HttpClient, R: Record> RemoteClient<R> for HttpRemoteClient<C, R> {
    async fn list(&self) -> SyncResult<Vec<R>> {
        let request = HttpRequest {
            method: HttpMethod::Get,
            url: self.collection_url(),
            body: None,
        };
        Ok(self.call::<Vec<R>>(request).await?.unwrap_or_default())
    }

    async fn create(&self, record: &R) -> SyncResult<R> {
        let request = HttpRequest {
            method: HttpMethod::Post,
            url: self.collection_url(),
            body: Some(self.encode(record)?),
        };
        Ok(self
            .call::<R>(request)
            .await?
            .unwrap_or_else(|| record.clone()))
    }

    async fn update(&self, id: &str, patch: &RecordPatch) -> SyncResult<R> {
        let request = HttpRequest {
            method: HttpMethod::Put,
            url: self.record_url(id),
            body: Some(self.encode(patch)?),
        };
        self.call::<R>(request)
            .await?
            .ok_or_else(|| SyncError::Protocol(format!("update of {id} returned no record")))
    }

    async fn delete(&self, id: &str) -> SyncResult<()> {
        let request = HttpRequest {
            method: HttpMethod::Delete,
            url: self.record_url(id),
            body: None,
        };
        self.call::<serde_json::Value>(request).await?;
        Ok(())
    }
}
