// src/models/exam.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Upper bound on typed text accepted by the API.
pub const MAX_TYPED_CHARS: u64 = 20_000;

/// DTO for starting an exam.
#[derive(Debug, Deserialize, Validate)]
pub struct StartExamRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name length must be between 1 and 100 characters."
    ))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub category: String,
}

/// Returned once an exam has started.
#[derive(Debug, Serialize)]
pub struct StartExamResponse {
    pub session_id: Uuid,
    pub paragraph: String,
    pub duration_secs: u64,
    /// Bearer token for the draft, status and submit calls.
    pub exam_token: String,
}

/// DTO carrying the student's text, for drafts and the final submission.
#[derive(Debug, Deserialize, Validate)]
pub struct TypedTextRequest {
    #[validate(length(max = MAX_TYPED_CHARS))]
    pub typed: String,
}

/// DTO for admin login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Exam settings visible to students before they start.
#[derive(Debug, Serialize)]
pub struct ExamInfo {
    pub categories: Vec<String>,
    pub duration_secs: u64,
}
