use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{modules, web::AppState};

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;
const LIVENESS_BODY: &str = "SERVER IS RUNNING";

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.settings().max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/test", get(liveness))
        .route("/healthz", get(healthz))
        .merge(modules::chat::router())
        .merge(modules::summarizer::router())
        .merge(modules::flashcards::router())
        .merge(modules::mentors::router())
        .merge(modules::quiz::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn liveness() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        LIVENESS_BODY,
    )
}

async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}
