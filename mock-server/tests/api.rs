use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Book, GdzAnswer, User};
use tower::ServiceExt;

const TOKEN: &str = "test-token";

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn authed(method: &str, uri: &str) -> http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, format!("Bearer {TOKEN}"))
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    authed(method, uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    authed(method, uri).body(String::new()).unwrap()
}

// --- auth ---

#[tokio::test]
async fn missing_token_returns_401_with_description() {
    let resp = app(TOKEN)
        .oneshot(Request::builder().uri("/premium/users/1").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["description"], "Invalid token");
}

#[tokio::test]
async fn wrong_token_returns_401() {
    let resp = app(TOKEN)
        .oneshot(
            Request::builder()
                .uri("/premium/users/1")
                .header(http::header::AUTHORIZATION, "Bearer nope")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- users ---

#[tokio::test]
async fn create_user_returns_201() {
    let resp = app(TOKEN)
        .oneshot(json_request(
            "POST",
            "/premium/users",
            r#"{"user_id":42,"expires_at":"2025-03-04","plan_type":"month"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let user: User = body_json(resp).await;
    assert_eq!(user.user_id, 42);
    assert_eq!(user.expires_at.as_deref(), Some("2025-03-04T00:00:00"));
    assert!(user.is_active);
    assert_eq!(user.plan_type, "month");
}

#[tokio::test]
async fn create_user_bad_expiry_returns_400() {
    let resp = app(TOKEN)
        .oneshot(json_request(
            "POST",
            "/premium/users",
            r#"{"user_id":42,"expires_at":"tomorrow"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_user_malformed_json_returns_422() {
    let resp = app(TOKEN)
        .oneshot(json_request("POST", "/premium/users", r#"{"plan_type":"month"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn get_user_not_found_has_description() {
    let resp = app(TOKEN)
        .oneshot(empty_request("GET", "/premium/users/404"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["description"], "User not found");
}

#[tokio::test]
async fn subscribe_unknown_plan_returns_400() {
    let resp = app(TOKEN)
        .oneshot(json_request("POST", "/premium/users/1/subscribe", r#"{"plan":"forever"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- books ---

#[tokio::test]
async fn create_book_for_unknown_user_returns_404() {
    let resp = app(TOKEN)
        .oneshot(json_request(
            "POST",
            "/premium/gdz/books",
            r#"{"user_id":1,"url":"https://gdz.example/a"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn answers_without_book_returns_404() {
    let resp = app(TOKEN)
        .oneshot(empty_request("GET", "/premium/gdz/books/gdz?task_text=12"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn answers_by_book_url() {
    let resp = app(TOKEN)
        .oneshot(empty_request(
            "GET",
            "/premium/gdz/books/gdz?task_text=125&book_url=https://gdz.example/a/",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let answer: GdzAnswer = body_json(resp).await;
    assert_eq!(answer.book_url, "https://gdz.example/a");
    assert!(answer.book_id.is_none());
    assert_eq!(answer.solutions.len(), 1);
    assert_eq!(answer.solutions[0].page_number, 13);
    assert_eq!(answer.solutions[0].answer_url, "https://gdz.example/a/125");
    assert_eq!(answer.solutions[0].image_urls.len(), 2);
}

// --- full lifecycle ---

#[tokio::test]
async fn user_and_book_lifecycle() {
    use tower::Service;

    let mut app = app(TOKEN).into_service();

    // create user
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/premium/users", r#"{"user_id":7}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: User = body_json(resp).await;
    assert!(!created.is_active);
    assert_eq!(created.plan_type, "free");

    // duplicate
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/premium/users", r#"{"user_id":7}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // subscribe
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/premium/users/7/subscribe", r#"{"plan":"year"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let subscribed: User = body_json(resp).await;
    assert!(subscribed.is_active);
    assert!(subscribed.payed_at.is_some());
    assert_eq!(subscribed.plan_type, "year");

    // subscription status is plain text
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/premium/users/7/subscription"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await.as_ref(), b"true");

    // create book
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/premium/gdz/books",
            r#"{"user_id":7,"url":"https://gdz.example/alg","subject_name":"algebra"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let book: Book = body_json(resp).await;
    assert_eq!(book.search_by, "url");
    let book_id = book.id;

    // search
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request(
            "GET",
            "/premium/gdz/books/search?user_id=7&subject_name=algebra",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let found: Book = body_json(resp).await;
    assert_eq!(found, book);

    // update as another user is rejected
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PUT",
            &format!("/premium/gdz/books/{book_id}?user_id=8"),
            r#"{"url":"https://gdz.example/other"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // update as owner
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PUT",
            &format!("/premium/gdz/books/{book_id}?user_id=7"),
            r#"{"search_by":"subject"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Book = body_json(resp).await;
    assert_eq!(updated.search_by, "subject");
    assert_eq!(updated.url, "https://gdz.example/alg"); // unchanged

    // answers by book id
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request(
            "GET",
            &format!("/premium/gdz/books/gdz?task_text=3&book_id={book_id}"),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let answer: GdzAnswer = body_json(resp).await;
    assert_eq!(answer.book_id, Some(book_id));
    assert_eq!(answer.user_id, Some(7));
    assert_eq!(answer.subject_name.as_deref(), Some("algebra"));

    // delete book
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("DELETE", &format!("/premium/gdz/books/{book_id}?user_id=7")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    // get after delete is a 404
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", &format!("/premium/gdz/book/{book_id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // delete user
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("DELETE", "/premium/users/7"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}
