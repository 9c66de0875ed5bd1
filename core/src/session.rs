//! Session and transport seam.
//!
//! # Design
//! A `Connector` opens a session; the session is a `Transport` that executes
//! prepared `HttpRequest`s and is closed exactly once when the owning scope
//! ends. The default connector wraps a `ureq::Agent`, which pools and reuses
//! connections for every request issued during the session. Status codes are
//! returned as data so the client decides what counts as an error.

use std::sync::Arc;

use tracing::debug;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// An open connection session.
pub trait Transport: Send + Sync {
    /// Execute one request. Any HTTP status is a successful round-trip.
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;

    /// Called once when the owning scope ends. The transport itself, and any
    /// pooled connections it holds, are freed when the client drops its
    /// `Arc` right after this call.
    fn close(&self) {}
}

/// Factory for sessions.
pub trait Connector: Send + Sync {
    fn connect(&self) -> Arc<dyn Transport>;
}

/// Opens `ureq`-backed sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqConnector;

impl Connector for UreqConnector {
    fn connect(&self) -> Arc<dyn Transport> {
        Arc::new(UreqTransport::new())
    }
}

/// A session backed by one `ureq::Agent` and its connection pool.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = request.url.as_str();
        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => with_headers(self.agent.get(url), &request.headers).call(),
            (HttpMethod::Delete, _) => with_headers(self.agent.delete(url), &request.headers).call(),
            (HttpMethod::Post, Some(body)) => {
                with_headers(self.agent.post(url), &request.headers).send(body.as_bytes())
            }
            (HttpMethod::Post, None) => with_headers(self.agent.post(url), &request.headers).send_empty(),
            (HttpMethod::Put, Some(body)) => {
                with_headers(self.agent.put(url), &request.headers).send(body.as_bytes())
            }
            (HttpMethod::Put, None) => with_headers(self.agent.put(url), &request.headers).send_empty(),
        };
        let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn close(&self) {
        debug!("closing ureq session");
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}
