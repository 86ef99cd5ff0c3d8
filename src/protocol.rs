//! Public protocol structs for the HTTP API (serde ready), the response
//! envelope, and the extractors that turn body/query rejections into
//! envelope errors.

use axum::extract::{FromRequest, FromRequestParts};
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{TestCase, UserProfile};
use crate::error::AppError;

/// Wrapper used by every response: `{success, data|error, message?, pagination?}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None, message: None, pagination: None }
    }

    pub fn paginated(data: T, pagination: Pagination) -> Self {
        Self { pagination: Some(pagination), ..Self::ok(data) }
    }
}

impl Envelope<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self { success: true, data: None, error: None, message: Some(message.into()), pagination: None }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(error.into()), message: None, pagination: None }
    }
}

//
// Extractors
//

/// `Json<T>` whose rejection is an `AppError` (400 envelope instead of plain text).
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// `Query<T>` whose rejection is an `AppError`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

//
// Users
//

// Required fields are optional here and checked in the handler so a missing
// field yields the same message as a blank one.
#[derive(Debug, Deserialize)]
pub struct RegisterIn {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginIn {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileUpdateIn {
    pub username: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthOut {
    pub user: UserProfile,
    pub token: String,
}

//
// Problems
//

/// Query parameters are kept as text; blank values fall back to defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ProblemListQuery {
    pub difficulty: Option<String>,
    pub category: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemIn {
    pub title: Option<String>,
    pub description: Option<String>,
    pub difficulty: Option<String>,
    pub category: Option<String>,
    pub test_cases: Option<Vec<TestCase>>,
    pub solution_template: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemUpdateIn {
    pub title: Option<String>,
    pub description: Option<String>,
    pub difficulty: Option<String>,
    pub category: Option<String>,
    pub test_cases: Option<Vec<TestCase>>,
    /// Absent: untouched. `null`: cleared.
    #[serde(default, deserialize_with = "present")]
    pub solution_template: Option<Option<String>>,
}

fn present<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(d).map(Some)
}

//
// AI
//

#[derive(Debug, Deserialize)]
pub struct GenerateProblemIn {
    pub topic: Option<String>,
    pub difficulty: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateSolutionIn {
    pub problem_id: Option<String>,
    pub solution_code: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintIn {
    pub problem_id: Option<String>,
    /// Interpolated as-is, so `3` and `"3"` are both accepted.
    #[serde(default, deserialize_with = "number_or_string")]
    pub current_attempt: Option<String>,
}

fn number_or_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<serde_json::Value>::deserialize(d)? {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplanationIn {
    pub problem_id: Option<String>,
    pub solution_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QuizIn {
    pub topic: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SupplementaryIn {
    pub topic: Option<String>,
    pub difficulty: Option<String>,
}

//
// Health
//

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthOut {
    pub status: String,
    pub timestamp: String,
    /// Seconds since the process started.
    pub uptime: f64,
}
