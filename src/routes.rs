// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, exam},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, exam, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (config, ledger, paragraph store, exam registry).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_routes = Router::new().route("/login", post(auth::login));

    let exam_routes = Router::new()
        .route("/categories", get(exam::exam_info))
        .route("/start", post(exam::start_exam))
        // Routes bound to a running session (student exam token)
        .merge(
            Router::new()
                .route("/status", get(exam::exam_status))
                .route("/draft", put(exam::save_draft))
                .route("/submit", post(exam::submit_exam))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let admin_routes = Router::new()
        .route(
            "/paragraph",
            get(admin::get_paragraph).put(admin::upload_paragraph),
        )
        .route("/results", get(admin::list_results))
        .route("/results/export", get(admin::export_results))
        .route("/results/import", post(admin::import_results))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/exam", exam_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
