// src/handlers/auth.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, ExamError},
    exam::flow::{Event, Page},
    models::exam::LoginRequest,
    state::AdminCredentials,
    utils::jwt::{ROLE_ADMIN, sign_jwt},
};

/// Authenticates the administrator and returns a JWT token.
///
/// Checks the static credential pair from configuration.
/// No lockout or rate limiting is applied to failures.
pub async fn login(
    State(config): State<Config>,
    State(admin): State<AdminCredentials>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if !admin.verify(&payload.username, &payload.password)? {
        tracing::warn!("Failed admin login for '{}'", payload.username);
        return Err(ExamError::InvalidCredentials.into());
    }

    let page = Page::Login.on(Event::AdminAuthenticated)?;
    let token = sign_jwt(
        admin.username(),
        ROLE_ADMIN,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    tracing::info!("Admin '{}' logged in", admin.username());
    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "page": page,
    })))
}
