//! HTTP transport contract (spec.md §6) and a default `reqwest`-backed implementation.
//!
//! spec.md's Non-goals exclude a concrete transport as a *feature* — only the trait contract
//! is required. A `reqwest`-backed implementation is still provided here as ambient plumbing
//! (the same way `cloudllm::clients::common` ships one shared, tuned client) so tests, doctests,
//! and provider adapters have something concrete to run against; callers remain free to supply
//! their own `Transport`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::Stream;
use lazy_static::lazy_static;
use serde_json::Value;
use std::pin::Pin;

use crate::core::cancel::CancelToken;
use crate::core::error::{Error, Result};

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// The HTTP transport contract providers build requests against (spec.md §6).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(&self, endpoint: &str, headers: &HashMap<String, String>, body: Value, cancel: &CancelToken) -> Result<Value>;
    async fn get_json(&self, endpoint: &str, headers: &HashMap<String, String>, query: &HashMap<String, String>, cancel: &CancelToken) -> Result<Value>;
    async fn post_form(&self, endpoint: &str, headers: &HashMap<String, String>, form: &HashMap<String, String>, cancel: &CancelToken) -> Result<Value>;
    async fn post_raw_bytes(&self, endpoint: &str, headers: &HashMap<String, String>, body: Vec<u8>, cancel: &CancelToken) -> Result<Vec<u8>>;
    async fn post_stream(&self, endpoint: &str, headers: &HashMap<String, String>, body: Value, cancel: &CancelToken) -> Result<ByteStream>;
}

lazy_static! {
    /// Persistent-connection-pooled client shared by every `ReqwestTransport`, mirroring
    /// `cloudllm::clients::common::SHARED_HTTP_CLIENT`'s tuning.
    static ref SHARED_HTTP_CLIENT: reqwest::Client = reqwest::ClientBuilder::new()
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .pool_max_idle_per_host(10)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .timeout(Duration::from_secs(300))
        .connect_timeout(Duration::from_secs(30))
        .build()
        .expect("failed to build shared HTTP client");
}

/// Default `Transport` implementation, backed by the shared pooled `reqwest::Client`.
#[derive(Clone, Default)]
pub struct ReqwestTransport;

impl ReqwestTransport {
    pub fn new() -> Self {
        ReqwestTransport
    }

    fn client(&self) -> &'static reqwest::Client {
        &SHARED_HTTP_CLIENT
    }

    fn apply_headers(mut builder: reqwest::RequestBuilder, headers: &HashMap<String, String>) -> reqwest::RequestBuilder {
        for (k, v) in headers {
            builder = builder.header(k, v);
        }
        builder
    }

    async fn map_response_error(response: reqwest::Response) -> Error {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let quota = status == 429 && (body.contains("insufficient_quota") || body.contains("quota"));
        Error::from_status(status, body, quota)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post_json(&self, endpoint: &str, headers: &HashMap<String, String>, body: Value, cancel: &CancelToken) -> Result<Value> {
        cancel.check()?;
        let builder = Self::apply_headers(self.client().post(endpoint), headers).json(&body);
        let response = tokio::select! {
            res = builder.send() => res.map_err(|e| Error::generic(e.to_string()))?,
            _ = cancel.cancelled() => return Err(Error::cancelled("request cancelled")),
        };
        if !response.status().is_success() {
            return Err(Self::map_response_error(response).await);
        }
        response.json::<Value>().await.map_err(|e| Error::response_format(e.to_string()))
    }

    async fn get_json(&self, endpoint: &str, headers: &HashMap<String, String>, query: &HashMap<String, String>, cancel: &CancelToken) -> Result<Value> {
        cancel.check()?;
        let builder = Self::apply_headers(self.client().get(endpoint), headers).query(query);
        let response = tokio::select! {
            res = builder.send() => res.map_err(|e| Error::generic(e.to_string()))?,
            _ = cancel.cancelled() => return Err(Error::cancelled("request cancelled")),
        };
        if !response.status().is_success() {
            return Err(Self::map_response_error(response).await);
        }
        response.json::<Value>().await.map_err(|e| Error::response_format(e.to_string()))
    }

    async fn post_form(&self, endpoint: &str, headers: &HashMap<String, String>, form: &HashMap<String, String>, cancel: &CancelToken) -> Result<Value> {
        cancel.check()?;
        let builder = Self::apply_headers(self.client().post(endpoint), headers).form(form);
        let response = tokio::select! {
            res = builder.send() => res.map_err(|e| Error::generic(e.to_string()))?,
            _ = cancel.cancelled() => return Err(Error::cancelled("request cancelled")),
        };
        if !response.status().is_success() {
            return Err(Self::map_response_error(response).await);
        }
        response.json::<Value>().await.map_err(|e| Error::response_format(e.to_string()))
    }

    async fn post_raw_bytes(&self, endpoint: &str, headers: &HashMap<String, String>, body: Vec<u8>, cancel: &CancelToken) -> Result<Vec<u8>> {
        cancel.check()?;
        let builder = Self::apply_headers(self.client().post(endpoint), headers).body(body);
        let response = tokio::select! {
            res = builder.send() => res.map_err(|e| Error::generic(e.to_string()))?,
            _ = cancel.cancelled() => return Err(Error::cancelled("request cancelled")),
        };
        if !response.status().is_success() {
            return Err(Self::map_response_error(response).await);
        }
        response.bytes().await.map(|b| b.to_vec()).map_err(|e| Error::response_format(e.to_string()))
    }

    async fn post_stream(&self, endpoint: &str, headers: &HashMap<String, String>, body: Value, cancel: &CancelToken) -> Result<ByteStream> {
        use futures_util::StreamExt;

        cancel.check()?;
        let builder = Self::apply_headers(self.client().post(endpoint), headers).json(&body);
        let response = tokio::select! {
            res = builder.send() => res.map_err(|e| Error::generic(e.to_string()))?,
            _ = cancel.cancelled() => return Err(Error::cancelled("request cancelled")),
        };
        if !response.status().is_success() {
            return Err(Self::map_response_error(response).await);
        }
        let cancel = cancel.clone();
        let stream = response.bytes_stream().map(move |chunk| match chunk {
            Ok(bytes) => {
                if cancel.is_cancelled() {
                    Err(Error::cancelled("stream cancelled"))
                } else {
                    Ok(bytes.to_vec())
                }
            }
            Err(e) => Err(Error::generic(e.to_string())),
        });
        Ok(Box::pin(stream))
    }
}
