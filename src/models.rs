use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

// --- Validation ---

/// Validate
///
/// Implemented by every inbound payload. Collects all problems first so the
/// caller sees every missing field at once, not just the first.
pub trait Validate {
    fn problems(&self) -> Vec<String>;

    fn validate(&self) -> Result<(), ApiError> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(problems.join("; ")))
        }
    }
}

fn require(problems: &mut Vec<String>, label: &str, value: &str) {
    if value.trim().is_empty() {
        problems.push(format!("{} is required", label));
    }
}

// Present-but-empty is rejected on partial updates; absent is fine.
fn reject_empty(problems: &mut Vec<String>, label: &str, value: Option<&str>) {
    if let Some(value) = value {
        if value.trim().is_empty() {
            problems.push(format!("{} cannot be empty", label));
        }
    }
}

fn check_date(problems: &mut Vec<String>, label: &str, value: &str) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }
    let parses = NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
        || DateTime::parse_from_rfc3339(value).is_ok();
    if !parses {
        problems.push(format!("{} must be a valid date", label));
    }
}

fn check_rating(problems: &mut Vec<String>, rating: i64) {
    if !(1..=5).contains(&rating) {
        problems.push("Rating must be between 1 and 5".to_string());
    }
}

// --- Movies ---

/// Movie
///
/// A movie as returned to callers. `description` is a sensitive field: stored
/// encrypted, always returned decrypted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Movie {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: String,
}

/// CreateMovieRequest
///
/// Input payload for POST /api/v1/movies. Missing fields deserialize as empty
/// strings and are reported by validation; unknown fields are rejected.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct CreateMovieRequest {
    pub name: String,
    pub description: String,
    pub price: String,
}

impl Validate for CreateMovieRequest {
    fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        require(&mut problems, "Name", &self.name);
        require(&mut problems, "Description", &self.description);
        require(&mut problems, "Price", &self.price);
        problems
    }
}

/// UpdateMovieRequest
///
/// Partial update: `None` fields are omitted from the serialized change set and
/// left untouched in storage.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateMovieRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
}

impl Validate for UpdateMovieRequest {
    fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        reject_empty(&mut problems, "Name", self.name.as_deref());
        reject_empty(&mut problems, "Description", self.description.as_deref());
        reject_empty(&mut problems, "Price", self.price.as_deref());
        problems
    }
}

// --- Promotions ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Promotion {
    pub id: String,
    pub title: String,
    pub description: String,
    pub discount: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct CreatePromotionRequest {
    pub title: String,
    pub description: String,
    pub discount: String,
    pub start_date: String,
    pub end_date: String,
}

impl Validate for CreatePromotionRequest {
    fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        require(&mut problems, "Title", &self.title);
        require(&mut problems, "Description", &self.description);
        require(&mut problems, "Discount", &self.discount);
        require(&mut problems, "Start Date", &self.start_date);
        require(&mut problems, "End Date", &self.end_date);
        check_date(&mut problems, "Start Date", &self.start_date);
        check_date(&mut problems, "End Date", &self.end_date);
        problems
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdatePromotionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl Validate for UpdatePromotionRequest {
    fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        reject_empty(&mut problems, "Title", self.title.as_deref());
        reject_empty(&mut problems, "Description", self.description.as_deref());
        reject_empty(&mut problems, "Discount", self.discount.as_deref());
        reject_empty(&mut problems, "Start Date", self.start_date.as_deref());
        reject_empty(&mut problems, "End Date", self.end_date.as_deref());
        if let Some(start) = &self.start_date {
            check_date(&mut problems, "Start Date", start);
        }
        if let Some(end) = &self.end_date {
            check_date(&mut problems, "End Date", end);
        }
        problems
    }
}

// --- Reviews ---

/// Review
///
/// A review of a movie. `comment` is the sensitive field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Review {
    pub id: String,
    pub movie_id: String,
    pub reviewer: String,
    pub rating: i64,
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct CreateReviewRequest {
    pub movie_id: String,
    pub reviewer: String,
    // 0 when absent, which fails the range check.
    pub rating: i64,
    pub comment: String,
}

impl Validate for CreateReviewRequest {
    fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        require(&mut problems, "Movie ID", &self.movie_id);
        require(&mut problems, "Reviewer name", &self.reviewer);
        check_rating(&mut problems, self.rating);
        require(&mut problems, "Comment", &self.comment);
        problems
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateReviewRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movie_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Validate for UpdateReviewRequest {
    fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        reject_empty(&mut problems, "Movie ID", self.movie_id.as_deref());
        reject_empty(&mut problems, "Reviewer name", self.reviewer.as_deref());
        if let Some(rating) = self.rating {
            check_rating(&mut problems, rating);
        }
        reject_empty(&mut problems, "Comment", self.comment.as_deref());
        problems
    }
}

// --- Response Envelope ---

/// ApiResponse
///
/// Success body shared by every resource endpoint:
/// `{ "message": ..., "data": ..., "status": "success" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            status: Some("success".to_string()),
        }
    }

    /// A success body without a payload (used by DELETE).
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
            status: Some("success".to_string()),
        }
    }
}

/// HealthResponse
///
/// Body of GET /api/v1/health.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime: f64,
    pub timestamp: String,
    pub version: String,
}
