//! The Learnify API client.
//!
//! # Design
//! `LearnifyClient` holds configuration, a `Connector`, and the currently
//! open session, if any. Every resource operation is split into a pure
//! `build_*` method that produces an `ApiCall` and a method that runs it
//! through `request`, which prepares the final `HttpRequest`, executes it on
//! the session and decodes the response with the requested `DecodeMode`.
//!
//! Sessions are scoped: `open` returns a guard that closes the session when
//! dropped, and `scoped` runs a closure inside one. Request methods take
//! `&self`, so threads can share an open client.

use std::ops::Deref;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::call::ApiCall;
use crate::config::ClientConfig;
use crate::decode::{decode_response, DecodeMode, Decoded};
use crate::error::ApiError;
use crate::http::{CustomHeaders, HttpRequest, BASE_HEADERS};
use crate::query::{encode_query, Query};
use crate::session::{Connector, Transport, UreqConnector};
use crate::time::{date_to_string, datetime_to_string};
use crate::types::{
    Book, BookDetails, BookLookup, BookUpdate, CreateBook, CreateUser, GdzAnswer, GdzQuery, Subscribe, User,
    UserUpdate,
};

pub struct LearnifyClient {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    session: Option<Arc<dyn Transport>>,
}

/// An open session. Dereferences to the client; closes the session on drop.
pub struct Session<'a> {
    client: &'a mut LearnifyClient,
}

impl Deref for Session<'_> {
    type Target = LearnifyClient;

    fn deref(&self) -> &LearnifyClient {
        &*self.client
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.client.close();
    }
}

impl LearnifyClient {
    /// Client that talks HTTP through `ureq`.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_connector(config, UreqConnector)
    }

    pub fn with_connector(config: ClientConfig, connector: impl Connector + 'static) -> Self {
        Self {
            config,
            connector: Arc::new(connector),
            session: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Open a session for the lifetime of the returned guard.
    pub fn open(&mut self) -> Session<'_> {
        if self.session.is_none() {
            debug!(base_url = %self.config.base_url(), "opening session");
            self.session = Some(self.connector.connect());
        }
        Session { client: self }
    }

    /// Run `f` with an open session; the session is closed when `f` returns
    /// or unwinds.
    pub fn scoped<R>(&mut self, f: impl FnOnce(&LearnifyClient) -> R) -> R {
        let session = self.open();
        f(&*session)
    }

    fn close(&mut self) {
        if let Some(transport) = self.session.take() {
            debug!("closing session");
            transport.close();
        }
    }

    /// Current time at the configured offset as `YYYY-MM-DDTHH:MM:SS`.
    pub fn now_string(&self) -> String {
        datetime_to_string(None, &self.config.utc_offset())
    }

    /// Today's date at the configured offset as `YYYY-MM-DD`.
    pub fn today_string(&self) -> String {
        date_to_string(None, &self.config.utc_offset())
    }

    pub fn format_datetime(&self, dt: NaiveDateTime) -> String {
        datetime_to_string(Some(dt), &self.config.utc_offset())
    }

    pub fn format_date(&self, date: NaiveDate) -> String {
        date_to_string(Some(date), &self.config.utc_offset())
    }

    /// Base headers, then `Authorization` when required, then `custom`.
    pub fn headers(
        &self,
        require_token: bool,
        custom: &CustomHeaders,
    ) -> Result<Vec<(String, String)>, ApiError> {
        let mut headers: Vec<(String, String)> = BASE_HEADERS
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        if require_token {
            let token = self
                .config
                .token()
                .ok_or_else(|| ApiError::Configuration("Token is required!".to_string()))?;
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        custom.apply_to(&mut headers);
        Ok(headers)
    }

    /// Bind `call` to the base URL and credentials without sending it.
    pub fn prepare(&self, call: &ApiCall) -> Result<HttpRequest, ApiError> {
        let headers = self.headers(call.require_token, &call.headers)?;
        let url = encode_query(&format!("{}{}", self.config.base_url(), call.path), &call.query);
        Ok(HttpRequest {
            method: call.method,
            url,
            headers,
            body: call.body.clone(),
        })
    }

    /// Execute `call` on the open session and decode the result.
    ///
    /// Returns `Ok(None)` for an empty body (or a JSON `null` in list mode).
    pub fn request<T: DeserializeOwned>(
        &self,
        call: ApiCall,
        mode: DecodeMode,
    ) -> Result<Option<Decoded<T>>, ApiError> {
        let transport = self.session.as_ref().ok_or(ApiError::SessionNotActive)?;
        let request = self.prepare(&call)?;

        debug!(method = %request.method, url = %request.url, "sending request");
        let response = transport.execute(&request)?;
        debug!(status = response.status, bytes = response.body.len(), "received response");

        let decoded = decode_response(response, mode);
        if let Err(ApiError::Api { status_code, message }) = &decoded {
            warn!(status_code, %message, url = %request.url, "API error");
        }
        decoded
    }

    fn fetch_record<T: DeserializeOwned>(&self, call: ApiCall) -> Result<T, ApiError> {
        self.request::<T>(call, DecodeMode::Record)?
            .ok_or_else(|| ApiError::Validation("response body is empty".to_string()))?
            .into_record()
    }

    fn fetch_nothing(&self, call: ApiCall) -> Result<(), ApiError> {
        self.request::<serde_json::Value>(call, DecodeMode::Text)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    pub fn build_create_user(
        &self,
        user_id: i64,
        expires_at: Option<NaiveDate>,
        plan_type: Option<&str>,
    ) -> Result<ApiCall, ApiError> {
        ApiCall::post("/premium/users").json(&CreateUser {
            user_id,
            expires_at,
            plan_type,
        })
    }

    pub fn create_user(
        &self,
        user_id: i64,
        expires_at: Option<NaiveDate>,
        plan_type: Option<&str>,
    ) -> Result<User, ApiError> {
        self.fetch_record(self.build_create_user(user_id, expires_at, plan_type)?)
    }

    pub fn build_get_user(&self, user_id: i64) -> ApiCall {
        ApiCall::get(format!("/premium/users/{user_id}"))
    }

    pub fn get_user(&self, user_id: i64) -> Result<User, ApiError> {
        self.fetch_record(self.build_get_user(user_id))
    }

    /// Fails with `ApiError::Configuration` when `update` sets nothing.
    pub fn build_update_user(&self, user_id: i64, update: &UserUpdate) -> Result<ApiCall, ApiError> {
        if update.is_empty() {
            return Err(ApiError::Configuration("No fields provided for update".to_string()));
        }
        ApiCall::put(format!("/premium/users/{user_id}")).json(update)
    }

    pub fn update_user(&self, user_id: i64, update: &UserUpdate) -> Result<User, ApiError> {
        self.fetch_record(self.build_update_user(user_id, update)?)
    }

    pub fn build_delete_user(&self, user_id: i64) -> ApiCall {
        ApiCall::delete(format!("/premium/users/{user_id}"))
    }

    pub fn delete_user(&self, user_id: i64) -> Result<(), ApiError> {
        self.fetch_nothing(self.build_delete_user(user_id))
    }

    pub fn build_activate_subscription(&self, user_id: i64, plan: &str) -> Result<ApiCall, ApiError> {
        ApiCall::post(format!("/premium/users/{user_id}/subscribe")).json(&Subscribe { plan })
    }

    pub fn activate_subscription(&self, user_id: i64, plan: &str) -> Result<User, ApiError> {
        self.fetch_record(self.build_activate_subscription(user_id, plan)?)
    }

    pub fn build_deactivate_subscription(&self, user_id: i64) -> ApiCall {
        ApiCall::post(format!("/premium/users/{user_id}/unsubscribe"))
    }

    pub fn deactivate_subscription(&self, user_id: i64) -> Result<User, ApiError> {
        self.fetch_record(self.build_deactivate_subscription(user_id))
    }

    pub fn build_check_subscription(&self, user_id: i64) -> ApiCall {
        ApiCall::get(format!("/premium/users/{user_id}/subscription"))
    }

    /// Raw subscription status text as sent by the server.
    pub fn check_subscription(&self, user_id: i64) -> Result<Option<String>, ApiError> {
        self.request::<serde_json::Value>(self.build_check_subscription(user_id), DecodeMode::Text)?
            .map(Decoded::into_text)
            .transpose()
    }

    /// `check_subscription` read as a boolean.
    pub fn has_active_subscription(&self, user_id: i64) -> Result<bool, ApiError> {
        let status = self
            .check_subscription(user_id)?
            .ok_or_else(|| ApiError::Validation("subscription status is empty".to_string()))?;
        parse_flag(&status)
    }

    // -----------------------------------------------------------------------
    // Books and answers
    // -----------------------------------------------------------------------

    pub fn build_create_book(&self, user_id: i64, url: &str, details: &BookDetails) -> Result<ApiCall, ApiError> {
        ApiCall::post("/premium/gdz/books").json(&CreateBook { user_id, url, details })
    }

    pub fn create_book(&self, user_id: i64, url: &str, details: &BookDetails) -> Result<Book, ApiError> {
        self.fetch_record(self.build_create_book(user_id, url, details)?)
    }

    pub fn build_get_book_by_id(&self, book_id: i64) -> ApiCall {
        ApiCall::get(format!("/premium/gdz/book/{book_id}"))
    }

    pub fn get_book_by_id(&self, book_id: i64) -> Result<Book, ApiError> {
        self.fetch_record(self.build_get_book_by_id(book_id))
    }

    pub fn build_get_book(&self, user_id: i64, lookup: &BookLookup) -> ApiCall {
        let query = Query::new()
            .set("user_id", user_id)
            .set_opt("book_id", lookup.book_id)
            .set_opt("subject_id", lookup.subject_id)
            .set_opt("subject_name", lookup.subject_name.as_deref());
        ApiCall::get("/premium/gdz/books/search").query(query)
    }

    pub fn get_book(&self, user_id: i64, lookup: &BookLookup) -> Result<Book, ApiError> {
        self.fetch_record(self.build_get_book(user_id, lookup))
    }

    /// Fails with `ApiError::Configuration` when `update` sets nothing.
    pub fn build_update_book(&self, user_id: i64, book_id: i64, update: &BookUpdate) -> Result<ApiCall, ApiError> {
        if update.is_empty() {
            return Err(ApiError::Configuration("No fields provided for update".to_string()));
        }
        ApiCall::put(format!("/premium/gdz/books/{book_id}"))
            .query(Query::new().set("user_id", user_id))
            .json(update)
    }

    pub fn update_book(&self, user_id: i64, book_id: i64, update: &BookUpdate) -> Result<Book, ApiError> {
        self.fetch_record(self.build_update_book(user_id, book_id, update)?)
    }

    pub fn build_delete_book(&self, user_id: i64, book_id: i64) -> ApiCall {
        ApiCall::delete(format!("/premium/gdz/books/{book_id}")).query(Query::new().set("user_id", user_id))
    }

    pub fn delete_book(&self, user_id: i64, book_id: i64) -> Result<(), ApiError> {
        self.fetch_nothing(self.build_delete_book(user_id, book_id))
    }

    pub fn build_get_gdz_answers(&self, task_text: &str, filter: &GdzQuery) -> ApiCall {
        let query = Query::new()
            .set("task_text", task_text)
            .set_opt("user_id", filter.user_id)
            .set_opt("book_id", filter.book_id)
            .set_opt("subject_id", filter.subject_id)
            .set_opt("subject_name", filter.subject_name.as_deref())
            .set_opt("book_url", filter.book_url.as_deref())
            .set_opt("search_by", filter.search_by.as_deref());
        ApiCall::get("/premium/gdz/books/gdz").query(query)
    }

    pub fn get_gdz_answers(&self, task_text: &str, filter: &GdzQuery) -> Result<GdzAnswer, ApiError> {
        self.fetch_record(self.build_get_gdz_answers(task_text, filter))
    }
}

fn parse_flag(raw: &str) -> Result<bool, ApiError> {
    let flag = raw.trim().trim_matches('"');
    if flag.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if flag.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ApiError::Validation(format!("expected true or false, got {raw:?}")))
    }
}
