//! Response checking and decoding.
//!
//! # Design
//! A call picks exactly one `DecodeMode`; the successful result comes back as
//! the matching `Decoded` variant. Status checking always runs first, and an
//! empty body short-circuits to `None` whatever the mode.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::HttpResponse;

/// How a successful response body should be interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodeMode {
    /// Hand back the response untouched.
    Response,
    /// Parse the body as arbitrary JSON.
    Json,
    /// Return the body text. Used when no schema applies.
    #[default]
    Text,
    /// Decode a JSON array of the target schema.
    List,
    /// Decode a single instance of the target schema.
    Record,
}

/// A decoded successful response.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<T> {
    Response(HttpResponse),
    Json(Value),
    Text(String),
    List(Vec<T>),
    Record(T),
}

impl<T> Decoded<T> {
    pub fn into_record(self) -> Result<T, ApiError> {
        match self {
            Decoded::Record(record) => Ok(record),
            other => Err(mismatch("record", &other)),
        }
    }

    pub fn into_list(self) -> Result<Vec<T>, ApiError> {
        match self {
            Decoded::List(items) => Ok(items),
            other => Err(mismatch("list", &other)),
        }
    }

    pub fn into_text(self) -> Result<String, ApiError> {
        match self {
            Decoded::Text(text) => Ok(text),
            other => Err(mismatch("text", &other)),
        }
    }

    pub fn into_json(self) -> Result<Value, ApiError> {
        match self {
            Decoded::Json(value) => Ok(value),
            other => Err(mismatch("json", &other)),
        }
    }

    pub fn into_response(self) -> Result<HttpResponse, ApiError> {
        match self {
            Decoded::Response(response) => Ok(response),
            other => Err(mismatch("response", &other)),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Decoded::Response(_) => "response",
            Decoded::Json(_) => "json",
            Decoded::Text(_) => "text",
            Decoded::List(_) => "list",
            Decoded::Record(_) => "record",
        }
    }
}

fn mismatch<T>(wanted: &str, got: &Decoded<T>) -> ApiError {
    ApiError::Validation(format!("expected a {wanted} result, got {}", got.kind()))
}

/// Turn a status >= 400 into `ApiError::Api`.
///
/// The message is the body's `description` when the body is a JSON object
/// carrying one, the JSON itself rendered as text for any other JSON body,
/// and otherwise the raw body or `HTTP <status>` when the body is empty.
pub fn check_response(response: &HttpResponse) -> Result<(), ApiError> {
    if !response.is_error() {
        return Ok(());
    }
    Err(ApiError::Api {
        status_code: response.status,
        message: error_message(response),
    })
}

fn error_message(response: &HttpResponse) -> String {
    match serde_json::from_str::<Value>(&response.body) {
        Ok(value) => match value.get("description") {
            Some(Value::String(description)) => description.clone(),
            Some(description) if !description.is_null() => description.to_string(),
            _ => value
                .as_str()
                .map_or_else(|| value.to_string(), str::to_string),
        },
        Err(_) => {
            let raw = response.body.trim();
            if raw.is_empty() {
                format!("HTTP {}", response.status)
            } else {
                raw.to_string()
            }
        }
    }
}

/// Check status, then decode the body according to `mode`.
pub fn decode_response<T: DeserializeOwned>(
    response: HttpResponse,
    mode: DecodeMode,
) -> Result<Option<Decoded<T>>, ApiError> {
    check_response(&response)?;
    if response.body.is_empty() {
        return Ok(None);
    }
    let decoded = match mode {
        DecodeMode::Response => Decoded::Response(response),
        DecodeMode::Json => Decoded::Json(parse(&response.body)?),
        DecodeMode::Text => Decoded::Text(response.body),
        DecodeMode::List => match parse::<Option<Vec<T>>>(&response.body)? {
            Some(items) => Decoded::List(items),
            None => return Ok(None),
        },
        DecodeMode::Record => Decoded::Record(parse(&response.body)?),
    };
    Ok(Some(decoded))
}

fn parse<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Validation(e.to_string()))
}
