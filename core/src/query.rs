//! Query-string construction.
//!
//! Keys and values are rendered as-is, then bytes that are not legal in a URI
//! (whitespace, quotes, `+`, `%`, non-ASCII) are percent-encoded. The query
//! delimiters `&`, `=` and `#` are left alone, so callers must keep them out
//! of parameter values.

use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Escaped in query keys and values. `+` and `%` are included because
/// servers decode them as space and as an escape prefix.
const QUERY_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'%')
    .add(b'+')
    .add(b'<')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// A single query parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Text(s) => f.write_str(s),
            QueryValue::Int(n) => write!(f, "{n}"),
            // Debug keeps the fractional part: 1.0 renders as "1.0".
            QueryValue::Float(n) => write!(f, "{n:?}"),
            QueryValue::Bool(true) => f.write_str("true"),
            QueryValue::Bool(false) => f.write_str("false"),
            QueryValue::Null => f.write_str("null"),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Text(value)
    }
}

impl From<&String> for QueryValue {
    fn from(value: &String) -> Self {
        QueryValue::Text(value.clone())
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Int(value)
    }
}

impl From<i32> for QueryValue {
    fn from(value: i32) -> Self {
        QueryValue::Int(i64::from(value))
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        QueryValue::Int(i64::from(value))
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        QueryValue::Float(value)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

impl<T: Into<QueryValue>> From<Option<T>> for QueryValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(QueryValue::Null, Into::into)
    }
}

/// Ordered parameter mapping. Setting a key twice replaces the earlier value
/// in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    params: Vec<(String, QueryValue)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => self.params.push((key, value)),
        }
        self
    }

    /// Set `key` only when `value` is present.
    pub fn set_opt<V: Into<QueryValue>>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.set(key, value),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Append `?k=v&...` to `url` when `query` is non-empty.
pub fn encode_query(url: &str, query: &Query) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    let pairs: Vec<String> = query
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                utf8_percent_encode(k, QUERY_ESCAPE),
                utf8_percent_encode(&v.to_string(), QUERY_ESCAPE)
            )
        })
        .collect();
    format!("{url}?{}", pairs.join("&"))
}
