use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use notesync_web::backend::Backend;
use notesync_web::config::WebConfig;
use notesync_web::router::build_app_router;
use notesync_web::state::AppState;

pub const BOUNDARY: &str = "notesync-test-boundary";

/// Default configuration: memory backend with the demo account.
pub fn test_config() -> WebConfig {
    WebConfig::from_lookup(|_| None).expect("defaults are valid")
}

/// Build the full application router over a fresh in-memory backend.
pub async fn build_test_app() -> (Router, AppState) {
    let config = test_config();
    let backend = Backend::memory(&config).await;
    let state = AppState {
        client: backend.client.clone(),
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state.clone(), &config, backend.files.as_ref()).expect("router builds");
    (app, state)
}

/// Same as [`build_test_app`], signed in as the demo user.
pub async fn signed_in_app() -> (Router, AppState) {
    let (app, state) = build_test_app().await;
    let config = test_config();
    state
        .client
        .session
        .sign_in(&config.demo.email, &config.demo.password)
        .await
        .expect("demo sign-in");
    (app, state)
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn send_json(app: &Router, method: Method, uri: &str, body: Value) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response<Body> {
    send_json(app, Method::POST, uri, body).await
}

pub async fn post_empty(app: &Router, uri: &str) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

/// POST a single-file multipart form under field `file`.
pub async fn post_file(app: &Router, uri: &str, file_name: &str, bytes: &[u8]) -> Response<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    app.clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Create a folder through the API and return its id.
pub async fn create_folder(app: &Router, name: &str) -> String {
    let response = post_json(app, "/folders", serde_json::json!({ "name": name })).await;
    let json = body_json(response).await;
    assert_eq!(json["accepted"], true, "folder {name} not created: {json}");
    json["id"].as_str().unwrap().to_string()
}

/// Create a note in the given folder through the API and return its id.
pub async fn create_note(app: &Router, folder_id: &str, title: &str, is_public: bool) -> String {
    let response = post_json(
        app,
        "/add-note",
        serde_json::json!({
            "folder_id": folder_id,
            "title": title,
            "content": format!("{title} body"),
            "is_public": is_public,
        }),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["accepted"], true, "note {title} not created: {json}");
    json["id"].as_str().unwrap().to_string()
}

/// A minimal PNG: signature plus an IHDR header.
pub fn png_bytes() -> Vec<u8> {
    vec![
        0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13, b'I', b'H', b'D', b'R',
    ]
}
