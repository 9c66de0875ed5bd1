//! Client configuration.
//!
//! Everything the client needs to reach the API: base URL, bearer token and
//! the UTC offset used when a timestamp defaults to "now". Values can be set
//! in code or read from `LEARNIFY_*` environment variables.

use std::fmt;

use chrono::{FixedOffset, Offset, Utc};

use crate::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "https://learnify.mag329.tech/api/v1";

/// Moscow time, the API's home zone.
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 3;

pub const ENV_TOKEN: &str = "LEARNIFY_TOKEN";
pub const ENV_BASE_URL: &str = "LEARNIFY_BASE_URL";
pub const ENV_UTC_OFFSET_HOURS: &str = "LEARNIFY_UTC_OFFSET_HOURS";

#[derive(Clone)]
pub struct ClientConfig {
    base_url: String,
    token: Option<String>,
    utc_offset: FixedOffset,
}

impl ClientConfig {
    /// Configuration for the default host with the given bearer token.
    pub fn new(token: impl Into<String>) -> Self {
        Self::anonymous().with_token(token)
    }

    /// Configuration without a token; only no-auth calls will succeed.
    pub fn anonymous() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            utc_offset: default_offset(),
        }
    }

    /// Read configuration from `LEARNIFY_*` environment variables.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Unset keys keep
    /// their defaults; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::anonymous();
        if let Some(token) = get(ENV_TOKEN) {
            config = config.with_token(token);
        }
        if let Some(base_url) = get(ENV_BASE_URL) {
            config = config.with_base_url(&base_url);
        }
        if let Some(raw) = get(ENV_UTC_OFFSET_HOURS) {
            let hours: i32 = raw.trim().parse().map_err(|_| {
                ApiError::Configuration(format!("{ENV_UTC_OFFSET_HOURS} must be an integer, got {raw:?}"))
            })?;
            config = config.with_utc_offset_hours(hours)?;
        }
        Ok(config)
    }

    /// Override the base URL. A trailing slash is stripped.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.is_empty()).then_some(token);
        self
    }

    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    pub fn with_utc_offset_hours(self, hours: i32) -> Result<Self, ApiError> {
        let offset = hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| ApiError::Configuration(format!("UTC offset out of range: {hours} hours")))?;
        Ok(self.with_utc_offset(offset))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("utc_offset", &self.utc_offset)
            .finish()
    }
}

fn default_offset() -> FixedOffset {
    FixedOffset::east_opt(DEFAULT_UTC_OFFSET_HOURS * 3600).unwrap_or_else(|| Utc.fix())
}
