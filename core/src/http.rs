//! HTTP data types shared by the client and its transports.
//!
//! # Design
//! Requests and responses are plain data. `LearnifyClient` builds an
//! `HttpRequest`, hands it to the session's `Transport`, and decodes the
//! `HttpResponse` it gets back. Keeping the wire shapes as values lets tests
//! inspect every request without a network and lets spy transports replay
//! canned responses.

use std::fmt;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully prepared HTTP request: absolute URL, final header set, JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response as returned by a `Transport`.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Headers sent with every request, before auth and custom overlays.
///
/// The ureq transport only decodes gzip and brotli bodies; a server that
/// answers with `deflate` yields a body that fails to decode.
pub const BASE_HEADERS: [(&str, &str); 5] = [
    ("Content-Type", "application/json"),
    ("Accept", "application/json, text/plain, */*"),
    ("Accept-Language", "ru-RU,ru;q=0.8,en-US;q=0.5,en;q=0.3"),
    ("Accept-Encoding", "gzip, deflate, br"),
    ("Connection", "keep-alive"),
];

/// Caller-supplied headers overlaid on the base set.
///
/// Entries inserted with a `None` value are kept here but dropped when the
/// final header set is built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomHeaders {
    entries: Vec<(String, Option<String>)>,
}

impl CustomHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header; any `Display` value is stringified.
    pub fn insert(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.entries.push((name.into(), Some(value.to_string())));
        self
    }

    pub fn insert_opt<V: fmt::Display>(mut self, name: impl Into<String>, value: Option<V>) -> Self {
        self.entries.push((name.into(), value.map(|v| v.to_string())));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply the overlay: a present value replaces a header of the same name
    /// (case-insensitive) or is appended; `None` entries are skipped.
    pub fn apply_to(&self, headers: &mut Vec<(String, String)>) {
        for (name, value) in &self.entries {
            let Some(value) = value else {
                continue;
            };
            match headers.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(name)) {
                Some(existing) => existing.1 = value.clone(),
                None => headers.push((name.clone(), value.clone())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Vec<(String, String)> {
        BASE_HEADERS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn custom_headers_drop_none_and_stringify() {
        let mut headers = base();
        CustomHeaders::new()
            .insert("X-Retry", 3)
            .insert_opt("X-Skipped", None::<&str>)
            .apply_to(&mut headers);

        assert_eq!(find_header(&headers, "x-retry"), Some("3"));
        assert_eq!(find_header(&headers, "X-Skipped"), None);
        assert_eq!(headers.len(), BASE_HEADERS.len() + 1);
    }

    #[test]
    fn custom_headers_replace_base_case_insensitively() {
        let mut headers = base();
        CustomHeaders::new()
            .insert("accept-language", "en-US")
            .apply_to(&mut headers);

        assert_eq!(headers.len(), BASE_HEADERS.len());
        assert_eq!(find_header(&headers, "Accept-Language"), Some("en-US"));
    }

    #[test]
    fn base_headers_advertise_fixed_encodings() {
        assert_eq!(find_header(&base(), "accept-encoding"), Some("gzip, deflate, br"));
    }

    #[test]
    fn response_error_threshold_is_400() {
        assert!(!HttpResponse::new(399, "").is_error());
        assert!(HttpResponse::new(400, "").is_error());
    }

    #[test]
    fn method_renders_uppercase() {
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
    }
}
