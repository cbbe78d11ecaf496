use std::{path::PathBuf, sync::Arc};

use axum::{
    Router,
    body::Body,
    http::Request,
    response::Response,
};
use tempfile::{TempDir, tempdir};

use crate::{AppState, config::Settings, llm::testing::StubModel, web::router::build_router};

/// Router over stub models, with uploads landing in a fresh temp dir.
pub fn app_with(chat: Arc<StubModel>, completion: Arc<StubModel>) -> (Router, TempDir) {
    let dir = tempdir().expect("temp dir");
    let app = app_with_upload_dir(chat, completion, dir.path().to_path_buf());
    (app, dir)
}

pub fn app_with_upload_dir(
    chat: Arc<StubModel>,
    completion: Arc<StubModel>,
    upload_dir: PathBuf,
) -> Router {
    let settings = Settings {
        upload_dir,
        ..Settings::default()
    };
    build_router(AppState::with_models(settings, chat, completion))
}

pub fn unused_model() -> Arc<StubModel> {
    Arc::new(StubModel::failing("model must not be called"))
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// POST with an arbitrary body and optional content type.
pub fn raw_post(uri: &str, content_type: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header("content-type", content_type);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn json_body(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
