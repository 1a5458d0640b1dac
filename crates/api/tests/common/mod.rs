//! Shared helpers for API integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;

use axum::body::Body;
use axum::extract::Query;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::routing;
use axum::{Json, Router};
use http_body_util::BodyExt;
use licmon_api::config::ServerConfig;
use licmon_api::router::build_app_router;
use licmon_api::state::AppState;
use licmon_controller::ArubaClient;
use licmon_core::config::MonitorConfig;
use serde_json::{json, Value};
use tower::ServiceExt;

/// Build a test `ServerConfig` whose data directory and lock live in `dir`.
pub fn test_config(dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout_secs: 30,
        data_dir: dir.join("data"),
        lock_path: Some(dir.join("poller.lock")),
    }
}

/// Application state over a default (empty) monitor configuration.
pub fn test_state(dir: &Path) -> AppState {
    AppState::new(test_config(dir), MonitorConfig::default(), ArubaClient::default())
}

/// Build the full application router with all middleware layers.
pub fn build_test_app(state: AppState) -> Router {
    build_app_router(state)
}

pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Fake controller
// ---------------------------------------------------------------------------

const UID: &str = "api-test-uid";

async fn login() -> Json<Value> {
    Json(json!({"_global_result": {"status": "0", "UIDARUBA": UID}}))
}

async fn show(Query(params): Query<HashMap<String, String>>) -> Result<Json<Value>, StatusCode> {
    match params.get("command").map(String::as_str) {
        Some("show license-usage") => Ok(Json(json!({
            "License Clients License Usage for pool default": [
                {"Hostname": "ap-01", "AP": "12"},
                {"Hostname": "TOTAL", "AP": "12"}
            ]
        }))),
        Some("show license summary") => Ok(Json(json!({"_data": [
            {"License": {"Type": "AP", "Used": "12", "Total": "48", "Available": "36"}}
        ]}))),
        _ => Err(StatusCode::BAD_REQUEST),
    }
}

async fn logout() -> Json<Value> {
    Json(json!({"_global_result": {"status": "0"}}))
}

/// Spawn a fake controller and return its origin, e.g. `http://127.0.0.1:1234`.
pub async fn spawn_fake_controller() -> String {
    let app = Router::new()
        .route("/v1/api/login", routing::post(login))
        .route("/v1/configuration/showcommand", routing::get(show))
        .route("/v1/api/logout", routing::get(logout));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}
