//! Description of a single API call before it is bound to a base URL and
//! credentials.

use serde::Serialize;

use crate::error::ApiError;
use crate::http::{CustomHeaders, HttpMethod};
use crate::query::Query;

/// Method, path, query, JSON body and header overlay for one call.
///
/// Calls require the bearer token unless built with `without_token`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCall {
    pub method: HttpMethod,
    pub path: String,
    pub query: Query,
    pub body: Option<String>,
    pub headers: CustomHeaders,
    pub require_token: bool,
}

impl ApiCall {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Query::new(),
            body: None,
            headers: CustomHeaders::new(),
            require_token: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    /// Serialize `body` as the JSON request body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let encoded = serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        self.body = Some(encoded);
        Ok(self)
    }

    pub fn headers(mut self, headers: CustomHeaders) -> Self {
        self.headers = headers;
        self
    }

    pub fn without_token(mut self) -> Self {
        self.require_token = false;
        self
    }

    /// The JSON body parsed back into a value, if there is one.
    pub fn body_json(&self) -> Option<serde_json::Value> {
        self.body.as_deref().and_then(|body| serde_json::from_str(body).ok())
    }
}
