// src/handlers/exam.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, ExamError},
    exam::{ExamRegistry, RESULT_RETENTION},
    models::exam::{ExamInfo, StartExamRequest, StartExamResponse, TypedTextRequest},
    paragraph::ParagraphStore,
    utils::jwt::{Claims, ROLE_STUDENT, sign_jwt},
};

/// Lists the categories a student can pick and the exam duration.
pub async fn exam_info(State(config): State<Config>) -> impl IntoResponse {
    Json(ExamInfo {
        categories: config.categories.clone(),
        duration_secs: config.exam_duration.as_secs(),
    })
}

/// Starts a timed exam on today's paragraph.
///
/// * Rejects unknown categories and names that already have a result.
/// * Fails with 404 until the administrator has uploaded a paragraph.
/// * Returns the paragraph and an exam token scoped to the new session.
pub async fn start_exam(
    State(config): State<Config>,
    State(paragraphs): State<ParagraphStore>,
    State(exams): State<ExamRegistry>,
    Json(payload): Json<StartExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name must not be blank.".to_string()));
    }
    if !config.categories.contains(&payload.category) {
        return Err(ExamError::UnknownCategory(payload.category).into());
    }

    let paragraph = paragraphs
        .current()
        .await?
        .ok_or(ExamError::MissingReferenceText)?;

    let session_id = exams.open(name, &payload.category, paragraph.clone()).await?;
    let duration_secs = exams.duration().as_secs();
    let exam_token = sign_jwt(
        &session_id.to_string(),
        ROLE_STUDENT,
        &config.jwt_secret,
        duration_secs + RESULT_RETENTION.as_secs(),
    )?;

    Ok((
        StatusCode::CREATED,
        Json(StartExamResponse {
            session_id,
            paragraph,
            duration_secs,
            exam_token,
        }),
    ))
}

/// Session ID carried by a student exam token.
fn session_id(claims: &Claims) -> Result<Uuid, AppError> {
    if claims.role != ROLE_STUDENT {
        return Err(AppError::AuthError("Exam token required".to_string()));
    }
    Uuid::parse_str(&claims.sub).map_err(|_| ExamError::SessionNotFound.into())
}

/// Remaining time, or the result once the exam is over.
pub async fn exam_status(
    State(exams): State<ExamRegistry>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let status = exams.status(session_id(&claims)?).await?;
    Ok(Json(status))
}

/// Saves the text typed so far. Scored as-is if time runs out.
pub async fn save_draft(
    State(exams): State<ExamRegistry>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<TypedTextRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = req.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    exams.save_draft(session_id(&claims)?, req.typed).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Submits the exam: scores the text and stores the result.
pub async fn submit_exam(
    State(exams): State<ExamRegistry>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<TypedTextRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = req.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let outcome = exams.submit(session_id(&claims)?, req.typed).await?;
    Ok(Json(outcome))
}
