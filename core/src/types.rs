//! Resource records and request payloads for the Learnify API.
//!
//! # Design
//! Records (`User`, `Book`, `GdzAnswer`, `GdzSolution`) are only ever built
//! by deserializing a response body; a missing or mistyped required field is
//! a decode failure. Payload types carry the optional arguments of the
//! resource operations and serialize only the fields that are present.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::time::{serialize_date_opt, timestamp_opt};

/// A premium user with subscription state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub user_id: i64,
    #[serde(default, with = "timestamp_opt")]
    pub payed_at: Option<DateTime<FixedOffset>>,
    #[serde(default, with = "timestamp_opt")]
    pub expires_at: Option<DateTime<FixedOffset>>,
    pub is_active: bool,
    pub plan_type: String,
}

/// A textbook registered by a user for answer lookups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Book {
    pub id: i64,
    pub user_id: i64,
    pub subject_id: Option<i64>,
    pub subject_name: Option<String>,
    pub url: String,
    pub search_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GdzSolution {
    pub page_number: i64,
    pub answer_url: String,
    pub image_urls: Vec<String>,
}

/// Solutions found for one task in one book.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GdzAnswer {
    pub user_id: Option<i64>,
    pub book_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub subject_name: Option<String>,
    pub book_url: String,
    pub task_text: String,
    pub solutions: Vec<GdzSolution>,
}

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateUser<'a> {
    pub user_id: i64,
    #[serde(serialize_with = "serialize_date_opt", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_type: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Subscribe<'a> {
    pub plan: &'a str,
}

/// Fields to change on a user. Only the fields that are set are sent.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct UserUpdate {
    #[serde(serialize_with = "serialize_date_opt", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.expires_at.is_none() && self.plan_type.is_none() && self.is_active.is_none()
    }
}

/// Optional attributes of a new book.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct BookDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_by: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateBook<'a> {
    pub user_id: i64,
    pub url: &'a str,
    #[serde(flatten)]
    pub details: &'a BookDetails,
}

/// Filters for finding one of a user's books.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookLookup {
    pub book_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub subject_name: Option<String>,
}

/// Fields to change on a book. Only the fields that are set are sent.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct BookUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_by: Option<String>,
}

impl BookUpdate {
    pub fn is_empty(&self) -> bool {
        self.url.is_none()
            && self.subject_id.is_none()
            && self.subject_name.is_none()
            && self.search_by.is_none()
    }
}

/// Optional narrowing for an answer lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GdzQuery {
    pub user_id: Option<i64>,
    pub book_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub subject_name: Option<String>,
    pub book_url: Option<String>,
    pub search_by: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_decodes_with_optional_timestamps() {
        let user: User = serde_json::from_str(
            r#"{"id":1,"user_id":77,"payed_at":"2024-09-01T12:00:00","expires_at":null,"is_active":true,"plan_type":"month"}"#,
        )
        .unwrap();
        assert_eq!(user.user_id, 77);
        assert!(user.payed_at.is_some());
        assert!(user.expires_at.is_none());

        let bare: User =
            serde_json::from_str(r#"{"id":2,"user_id":78,"is_active":false,"plan_type":"free"}"#).unwrap();
        assert!(bare.payed_at.is_none());
    }

    #[test]
    fn user_rejects_missing_required_field() {
        let result: Result<User, _> =
            serde_json::from_str(r#"{"id":1,"user_id":77,"is_active":true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn book_rejects_mistyped_field() {
        let result: Result<Book, _> = serde_json::from_str(
            r#"{"id":"one","user_id":1,"subject_id":null,"subject_name":null,"url":"u","search_by":"url"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn gdz_answer_keeps_solution_and_image_order() {
        let answer: GdzAnswer = serde_json::from_str(
            r#"{"user_id":null,"book_id":3,"subject_id":null,"subject_name":"algebra",
                "book_url":"https://gdz.example/b/3","task_text":"12",
                "solutions":[
                  {"page_number":5,"answer_url":"a5","image_urls":["x","y","z"]},
                  {"page_number":6,"answer_url":"a6","image_urls":[]}
                ]}"#,
        )
        .unwrap();
        assert_eq!(answer.solutions.len(), 2);
        assert_eq!(answer.solutions[0].page_number, 5);
        assert_eq!(answer.solutions[0].image_urls, vec!["x", "y", "z"]);
        assert_eq!(answer.solutions[1].answer_url, "a6");
    }

    #[test]
    fn user_update_serializes_only_present_fields() {
        let update = UserUpdate {
            expires_at: NaiveDate::from_ymd_opt(2025, 2, 3),
            is_active: Some(false),
            ..Default::default()
        };
        let body = serde_json::to_value(&update).unwrap();
        assert_eq!(body, serde_json::json!({"expires_at": "2025-02-03", "is_active": false}));
        assert!(UserUpdate::default().is_empty());
    }

    #[test]
    fn create_book_flattens_details() {
        let details = BookDetails {
            subject_name: Some("physics".to_string()),
            ..Default::default()
        };
        let body = serde_json::to_value(CreateBook {
            user_id: 9,
            url: "https://gdz.example/b",
            details: &details,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"user_id": 9, "url": "https://gdz.example/b", "subject_name": "physics"})
        );
    }
}
