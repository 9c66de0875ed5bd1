//! In-memory stand-in for the Learnify premium API.
//!
//! Mirrors the remote contract closely enough for client integration tests:
//! bearer auth on every route, `{"description": ...}` error bodies, plain-text
//! subscription status. Answer lookups are synthesized from the book URL and
//! task text.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub user_id: i64,
    pub payed_at: Option<String>,
    pub expires_at: Option<String>,
    pub is_active: bool,
    pub plan_type: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Book {
    pub id: i64,
    pub user_id: i64,
    pub subject_id: Option<i64>,
    pub subject_name: Option<String>,
    pub url: String,
    pub search_by: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GdzSolution {
    pub page_number: i64,
    pub answer_url: String,
    pub image_urls: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GdzAnswer {
    pub user_id: Option<i64>,
    pub book_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub subject_name: Option<String>,
    pub book_url: String,
    pub task_text: String,
    pub solutions: Vec<GdzSolution>,
}

#[derive(Deserialize)]
pub struct CreateUser {
    pub user_id: i64,
    pub expires_at: Option<String>,
    pub plan_type: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateUser {
    pub expires_at: Option<String>,
    pub plan_type: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize)]
pub struct Subscribe {
    pub plan: String,
}

#[derive(Deserialize)]
pub struct CreateBook {
    pub user_id: i64,
    pub url: String,
    pub subject_id: Option<i64>,
    pub subject_name: Option<String>,
    pub search_by: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateBook {
    pub url: Option<String>,
    pub subject_id: Option<i64>,
    pub subject_name: Option<String>,
    pub search_by: Option<String>,
}

#[derive(Deserialize)]
pub struct BookSearch {
    pub user_id: i64,
    pub book_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub subject_name: Option<String>,
}

#[derive(Deserialize)]
pub struct Owner {
    pub user_id: i64,
}

#[derive(Deserialize)]
pub struct AnswerSearch {
    pub task_text: String,
    pub user_id: Option<i64>,
    pub book_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub subject_name: Option<String>,
    pub book_url: Option<String>,
    pub search_by: Option<String>,
}

#[derive(Default)]
pub struct Store {
    users: HashMap<i64, User>,
    books: HashMap<i64, Book>,
    next_user_row: i64,
    next_book_id: i64,
}

impl Store {
    /// First of `user_id`'s books (lowest id) matching the optional filters.
    fn find_book(
        &self,
        user_id: i64,
        book_id: Option<i64>,
        subject_id: Option<i64>,
        subject_name: Option<&str>,
    ) -> Option<&Book> {
        self.books
            .values()
            .filter(|b| b.user_id == user_id)
            .filter(|b| book_id.map_or(true, |id| b.id == id))
            .filter(|b| subject_id.map_or(true, |id| b.subject_id == Some(id)))
            .filter(|b| subject_name.map_or(true, |name| b.subject_name.as_deref() == Some(name)))
            .min_by_key(|b| b.id)
    }
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone)]
pub struct AppState {
    db: Db,
    token: Arc<str>,
}

/// Error response in the API's `{"description": ...}` shape.
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    description: String,
}

impl ApiFailure {
    fn new(status: StatusCode, description: impl Into<String>) -> Self {
        Self {
            status,
            description: description.into(),
        }
    }

    fn user_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "User not found")
    }

    fn book_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Book not found")
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "description": self.description })),
        )
            .into_response()
    }
}

pub fn app(token: impl Into<String>) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(Store::default())),
        token: Arc::from(token.into()),
    };
    Router::new()
        .route("/premium/users", post(create_user))
        .route(
            "/premium/users/{user_id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/premium/users/{user_id}/subscribe", post(subscribe))
        .route("/premium/users/{user_id}/unsubscribe", post(unsubscribe))
        .route("/premium/users/{user_id}/subscription", get(subscription_status))
        .route("/premium/gdz/books", post(create_book))
        .route("/premium/gdz/book/{book_id}", get(get_book_by_id))
        .route("/premium/gdz/books/search", get(search_book))
        .route("/premium/gdz/books/gdz", get(find_answers))
        .route("/premium/gdz/books/{book_id}", put(update_book).delete(delete_book))
        .layer(middleware::from_fn_with_state(state.clone(), require_bearer))
        .with_state(state)
}

pub async fn run(listener: TcpListener, token: impl Into<String>) -> Result<(), std::io::Error> {
    axum::serve(listener, app(token)).await
}

async fn require_bearer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let expected = format!("Bearer {}", state.token);
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if presented != Some(expected.as_str()) {
        debug!(path = %request.uri().path(), "rejecting request without valid token");
        return ApiFailure::new(StatusCode::UNAUTHORIZED, "Invalid token").into_response();
    }
    next.run(request).await
}

fn timestamp_now() -> String {
    Utc::now().naive_utc().format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Accept a `YYYY-MM-DD` expiry and store it as midnight.
fn expiry(raw: &str) -> Result<String, ApiFailure> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| format!("{date}T00:00:00"))
        .map_err(|_| ApiFailure::new(StatusCode::BAD_REQUEST, format!("Invalid expires_at: {raw}")))
}

async fn create_user(
    State(state): State<AppState>,
    Json(input): Json<CreateUser>,
) -> Result<(StatusCode, Json<User>), ApiFailure> {
    let expires_at = input.expires_at.as_deref().map(expiry).transpose()?;
    let mut db = state.db.write().await;
    if db.users.contains_key(&input.user_id) {
        return Err(ApiFailure::new(StatusCode::CONFLICT, "User already exists"));
    }
    db.next_user_row += 1;
    let user = User {
        id: db.next_user_row,
        user_id: input.user_id,
        payed_at: None,
        is_active: expires_at.is_some(),
        expires_at,
        plan_type: input.plan_type.unwrap_or_else(|| "free".to_string()),
    };
    db.users.insert(user.user_id, user.clone());
    info!(user_id = user.user_id, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(State(state): State<AppState>, Path(user_id): Path<i64>) -> Result<Json<User>, ApiFailure> {
    let db = state.db.read().await;
    db.users.get(&user_id).cloned().map(Json).ok_or_else(ApiFailure::user_not_found)
}

async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(input): Json<UpdateUser>,
) -> Result<Json<User>, ApiFailure> {
    if input.expires_at.is_none() && input.plan_type.is_none() && input.is_active.is_none() {
        return Err(ApiFailure::new(StatusCode::BAD_REQUEST, "No fields provided for update"));
    }
    let expires_at = input.expires_at.as_deref().map(expiry).transpose()?;
    let mut db = state.db.write().await;
    let user = db.users.get_mut(&user_id).ok_or_else(ApiFailure::user_not_found)?;
    if let Some(expires_at) = expires_at {
        user.expires_at = Some(expires_at);
    }
    if let Some(plan_type) = input.plan_type {
        user.plan_type = plan_type;
    }
    if let Some(is_active) = input.is_active {
        user.is_active = is_active;
    }
    Ok(Json(user.clone()))
}

async fn delete_user(State(state): State<AppState>, Path(user_id): Path<i64>) -> Result<StatusCode, ApiFailure> {
    let mut db = state.db.write().await;
    db.users
        .remove(&user_id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(ApiFailure::user_not_found)
}

async fn subscribe(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(input): Json<Subscribe>,
) -> Result<Json<User>, ApiFailure> {
    let days = match input.plan.as_str() {
        "month" => 30,
        "year" => 365,
        other => {
            return Err(ApiFailure::new(StatusCode::BAD_REQUEST, format!("Unknown plan: {other}")));
        }
    };
    let mut db = state.db.write().await;
    let user = db.users.get_mut(&user_id).ok_or_else(ApiFailure::user_not_found)?;
    let now = Utc::now().naive_utc();
    user.payed_at = Some(timestamp_now());
    user.expires_at = Some((now + Duration::days(days)).format("%Y-%m-%dT%H:%M:%S").to_string());
    user.is_active = true;
    user.plan_type = input.plan;
    Ok(Json(user.clone()))
}

async fn unsubscribe(State(state): State<AppState>, Path(user_id): Path<i64>) -> Result<Json<User>, ApiFailure> {
    let mut db = state.db.write().await;
    let user = db.users.get_mut(&user_id).ok_or_else(ApiFailure::user_not_found)?;
    user.is_active = false;
    Ok(Json(user.clone()))
}

async fn subscription_status(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<&'static str, ApiFailure> {
    let db = state.db.read().await;
    let user = db.users.get(&user_id).ok_or_else(ApiFailure::user_not_found)?;
    Ok(if user.is_active { "true" } else { "false" })
}

async fn create_book(
    State(state): State<AppState>,
    Json(input): Json<CreateBook>,
) -> Result<(StatusCode, Json<Book>), ApiFailure> {
    let mut db = state.db.write().await;
    if !db.users.contains_key(&input.user_id) {
        return Err(ApiFailure::user_not_found());
    }
    db.next_book_id += 1;
    let book = Book {
        id: db.next_book_id,
        user_id: input.user_id,
        subject_id: input.subject_id,
        subject_name: input.subject_name,
        url: input.url,
        search_by: input.search_by.unwrap_or_else(|| "url".to_string()),
    };
    db.books.insert(book.id, book.clone());
    info!(book_id = book.id, user_id = book.user_id, "book created");
    Ok((StatusCode::CREATED, Json(book)))
}

async fn get_book_by_id(State(state): State<AppState>, Path(book_id): Path<i64>) -> Result<Json<Book>, ApiFailure> {
    let db = state.db.read().await;
    db.books.get(&book_id).cloned().map(Json).ok_or_else(ApiFailure::book_not_found)
}

async fn search_book(State(state): State<AppState>, Query(search): Query<BookSearch>) -> Result<Json<Book>, ApiFailure> {
    let db = state.db.read().await;
    db.find_book(
        search.user_id,
        search.book_id,
        search.subject_id,
        search.subject_name.as_deref(),
    )
    .cloned()
    .map(Json)
    .ok_or_else(ApiFailure::book_not_found)
}

async fn update_book(
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
    Query(owner): Query<Owner>,
    Json(input): Json<UpdateBook>,
) -> Result<Json<Book>, ApiFailure> {
    let mut db = state.db.write().await;
    let book = db
        .books
        .get_mut(&book_id)
        .filter(|b| b.user_id == owner.user_id)
        .ok_or_else(ApiFailure::book_not_found)?;
    if let Some(url) = input.url {
        book.url = url;
    }
    if let Some(subject_id) = input.subject_id {
        book.subject_id = Some(subject_id);
    }
    if let Some(subject_name) = input.subject_name {
        book.subject_name = Some(subject_name);
    }
    if let Some(search_by) = input.search_by {
        book.search_by = search_by;
    }
    Ok(Json(book.clone()))
}

async fn delete_book(
    State(state): State<AppState>,
    Path(book_id): Path<i64>,
    Query(owner): Query<Owner>,
) -> Result<StatusCode, ApiFailure> {
    let mut db = state.db.write().await;
    match db.books.get(&book_id) {
        Some(book) if book.user_id == owner.user_id => {
            db.books.remove(&book_id);
            Ok(StatusCode::NO_CONTENT)
        }
        _ => Err(ApiFailure::book_not_found()),
    }
}

async fn find_answers(
    State(state): State<AppState>,
    Query(search): Query<AnswerSearch>,
) -> Result<Json<GdzAnswer>, ApiFailure> {
    let task_text = search.task_text.trim().to_string();
    if task_text.is_empty() {
        return Err(ApiFailure::new(StatusCode::BAD_REQUEST, "task_text is required"));
    }
    let db = state.db.read().await;
    let book = match (search.book_id, search.user_id) {
        (Some(book_id), _) => Some(db.books.get(&book_id).ok_or_else(ApiFailure::book_not_found)?),
        (None, Some(user_id)) if search.book_url.is_none() => Some(
            db.find_book(user_id, None, search.subject_id, search.subject_name.as_deref())
                .ok_or_else(ApiFailure::book_not_found)?,
        ),
        _ => None,
    };
    let book_url = book
        .map(|b| b.url.clone())
        .or(search.book_url)
        .ok_or_else(ApiFailure::book_not_found)?;
    let book_url = book_url.trim_end_matches('/').to_string();

    let page_number = task_text
        .chars()
        .take_while(char::is_ascii_digit)
        .collect::<String>()
        .parse::<i64>()
        .map_or(1, |n| n / 10 + 1);
    let answer_url = format!("{book_url}/{task_text}");
    let solutions = vec![GdzSolution {
        page_number,
        image_urls: vec![format!("{answer_url}/1.png"), format!("{answer_url}/2.png")],
        answer_url,
    }];

    Ok(Json(GdzAnswer {
        user_id: book.map(|b| b.user_id).or(search.user_id),
        book_id: book.map(|b| b.id),
        subject_id: book.and_then(|b| b.subject_id).or(search.subject_id),
        subject_name: book.and_then(|b| b.subject_name.clone()).or(search.subject_name),
        book_url,
        task_text,
        solutions,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_serializes_to_json() {
        let user = User {
            id: 1,
            user_id: 42,
            payed_at: None,
            expires_at: Some("2025-01-31T00:00:00".to_string()),
            is_active: true,
            plan_type: "month".to_string(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["user_id"], 42);
        assert!(json["payed_at"].is_null());
        assert_eq!(json["expires_at"], "2025-01-31T00:00:00");
    }

    #[test]
    fn expiry_accepts_dates_only() {
        assert_eq!(expiry("2025-02-03").unwrap(), "2025-02-03T00:00:00");
        assert!(expiry("03.02.2025").is_err());
    }

    #[test]
    fn create_user_optional_fields() {
        let input: CreateUser = serde_json::from_str(r#"{"user_id":5}"#).unwrap();
        assert_eq!(input.user_id, 5);
        assert!(input.expires_at.is_none());
        assert!(input.plan_type.is_none());
    }

    #[test]
    fn create_book_rejects_missing_url() {
        let result: Result<CreateBook, _> = serde_json::from_str(r#"{"user_id":5}"#);
        assert!(result.is_err());
    }

    #[test]
    fn find_book_picks_lowest_matching_id() {
        let mut store = Store::default();
        for (id, subject) in [(3, "math"), (1, "math"), (2, "geo")] {
            store.books.insert(
                id,
                Book {
                    id,
                    user_id: 9,
                    subject_id: None,
                    subject_name: Some(subject.to_string()),
                    url: format!("https://gdz.example/{id}"),
                    search_by: "url".to_string(),
                },
            );
        }
        assert_eq!(store.find_book(9, None, None, Some("math")).map(|b| b.id), Some(1));
        assert_eq!(store.find_book(9, Some(2), None, None).map(|b| b.id), Some(2));
        assert!(store.find_book(10, None, None, None).is_none());
    }
}
