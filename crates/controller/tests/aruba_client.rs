//! Integration tests for [`ArubaClient`] against an in-process fake
//! controller built with axum.

use std::collections::HashMap;
use std::net::SocketAddr;

use assert_matches::assert_matches;
use axum::extract::Query;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use licmon_controller::{
    collect_license_usage, ArubaClient, ControllerError, ControllerTarget, DeviceSessionClient,
    PRIMARY_COMMAND,
};

const UID: &str = "c0ffee-uid";

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login(Form(form): Form<LoginForm>) -> Json<Value> {
    if form.username == "admin" && form.password == "secret" {
        Json(json!({"_global_result": {"status": "0", "status_str": "You've logged in successfully.", "UIDARUBA": UID}}))
    } else {
        Json(json!({"_global_result": {"status": "1", "status_str": "Authentication failed"}}))
    }
}

async fn show(Query(params): Query<HashMap<String, String>>) -> Result<Json<Value>, axum::http::StatusCode> {
    if params.get("UIDARUBA").map(String::as_str) != Some(UID) {
        return Err(axum::http::StatusCode::UNAUTHORIZED);
    }
    match params.get("command").map(String::as_str) {
        Some("show license-usage") => Ok(Json(json!({
            "License Clients License Usage for pool default": [
                {"Hostname": "ap-01", "AP": "12"},
                {"Hostname": "TOTAL", "AP": "12"}
            ]
        }))),
        Some("show license summary") => Err(axum::http::StatusCode::INTERNAL_SERVER_ERROR),
        _ => Err(axum::http::StatusCode::BAD_REQUEST),
    }
}

async fn logout() -> Json<Value> {
    Json(json!({"_global_result": {"status": "0", "status_str": "You've logged out successfully."}}))
}

/// Spawn the fake controller and return its origin, e.g. `http://127.0.0.1:1234`.
async fn spawn_fake_controller() -> String {
    let app = Router::new()
        .route("/v1/api/login", post(login))
        .route("/v1/configuration/showcommand", get(show))
        .route("/v1/api/logout", get(logout));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn full_sequence_against_fake_controller() {
    let origin = spawn_fake_controller().await;
    let client = ArubaClient::default();
    let target = ControllerTarget {
        address: origin.clone(),
        username: "admin".to_string(),
        password: "secret".to_string(),
    };

    let snapshot = collect_license_usage(&client, &target).await.unwrap();

    assert_eq!(snapshot.controller, origin);
    let (_, rows) = snapshot.usage_pools().next().unwrap();
    assert_eq!(rows.len(), 2);
    // The summary endpoint answers 500, which degrades to an empty summary.
    assert_eq!(snapshot.license_summary, json!({}));
}

#[tokio::test]
async fn wrong_password_is_an_authentication_error() {
    let origin = spawn_fake_controller().await;
    let client = ArubaClient::default();

    let result = client.authenticate(&origin, "admin", "wrong").await;

    assert_matches!(result, Err(ControllerError::Authentication(reason)) if reason == "Authentication failed");
}

#[tokio::test]
async fn command_errors_name_the_command() {
    let origin = spawn_fake_controller().await;
    let client = ArubaClient::default();
    let session = licmon_controller::Session::new(origin, "not-the-uid");

    let result = client.execute_command(&session, PRIMARY_COMMAND).await;

    assert_matches!(result, Err(ControllerError::Command { command, .. }) if command == PRIMARY_COMMAND);
}

#[tokio::test]
async fn unreachable_controller_is_a_request_error() {
    let client = ArubaClient::default();
    let result = client
        .authenticate("http://127.0.0.1:9", "admin", "secret")
        .await;

    assert_matches!(result, Err(ControllerError::Request(_)));
}
