// src/handlers/admin.rs

use axum::{
    Json,
    body::Body,
    extract::{Extension, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    error::{AppError, ExamError},
    ledger::{self, SharedLedger, csv},
    paragraph::ParagraphStore,
    utils::jwt::Claims,
};

/// Returns today's reference paragraph.
/// Admin only.
pub async fn get_paragraph(
    State(paragraphs): State<ParagraphStore>,
) -> Result<impl IntoResponse, AppError> {
    let paragraph = paragraphs
        .current()
        .await?
        .ok_or(ExamError::MissingReferenceText)?;

    Ok(Json(json!({ "paragraph": paragraph })))
}

/// Replaces the reference paragraph with the raw request body.
/// Exams already running keep the paragraph they started with.
/// Admin only.
pub async fn upload_paragraph(
    State(paragraphs): State<ParagraphStore>,
    Extension(claims): Extension<Claims>,
    body: String,
) -> Result<impl IntoResponse, AppError> {
    if body.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Paragraph must not be empty.".to_string(),
        ));
    }

    paragraphs.replace(&body).await?;
    tracing::info!(
        "Admin '{}' uploaded a {}-character paragraph",
        claims.sub,
        body.chars().count()
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Lists every stored attempt in insertion order.
/// Admin only.
pub async fn list_results(
    State(ledger): State<SharedLedger>,
) -> Result<impl IntoResponse, AppError> {
    let records = ledger.list_all().await.map_err(|e| {
        tracing::error!("Failed to list results: {}", e);
        AppError::from(e)
    })?;

    Ok(Json(records))
}

/// Downloads all attempts as a CSV file.
/// Admin only.
pub async fn export_results(State(ledger): State<SharedLedger>) -> Result<Response, AppError> {
    let records = ledger.list_all().await?;
    let body = csv::encode(&records);

    let mut response = Response::new(Body::from(body));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    response.headers_mut().insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment; filename=\"results.csv\""),
    );

    Ok(response)
}

/// Loads a previously exported (or legacy) results file.
///
/// The whole file is parsed before anything is stored, so a malformed row
/// rejects the upload without a partial import. Names already present are
/// skipped and counted.
/// Admin only.
pub async fn import_results(
    State(ledger): State<SharedLedger>,
    Extension(claims): Extension<Claims>,
    body: String,
) -> Result<impl IntoResponse, AppError> {
    let records = csv::decode(&body)?;
    let summary = ledger::import(ledger.as_ref(), records).await?;

    tracing::info!(
        "Admin '{}' imported results: {} added, {} skipped",
        claims.sub,
        summary.imported,
        summary.skipped
    );
    Ok(Json(summary))
}
