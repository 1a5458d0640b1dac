//! Integration tests for configuration and alert rule endpoints.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get, post_json, test_state};
use licmon_poller::ConfigStore;
use serde_json::json;

#[tokio::test]
async fn config_is_returned_redacted() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(test_state(dir.path()));

    let response = post_json(
        app.clone(),
        "/api/config",
        json!({"username": "admin", "password": "secret", "polling_interval": 30}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let applied = body_json(response).await;
    assert_eq!(applied["data"]["poller"], "not_started");
    assert_eq!(applied["data"]["config"]["password"], "********");

    let json = body_json(get(app, "/api/config").await).await;
    assert_eq!(json["data"]["username"], "admin");
    assert_eq!(json["data"]["password"], "********");
    assert_eq!(json["data"]["polling_interval"], 30);
    assert_eq!(json["data"]["smtp_port"], 587);
}

#[tokio::test]
async fn applied_config_is_saved_with_real_secrets() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());
    let app = build_test_app(state.clone());

    post_json(
        app.clone(),
        "/api/config",
        json!({"username": "admin", "password": "secret"}),
    )
    .await;
    // Echoing the redacted placeholder keeps the stored password.
    post_json(
        app,
        "/api/config",
        json!({"username": "operator", "password": "********"}),
    )
    .await;

    let stored = ConfigStore::new(&state.config.data_dir).load().await;
    assert_eq!(stored.username, "operator");
    assert_eq!(stored.password, "secret");
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(test_state(dir.path()));

    let response = post_json(
        app.clone(),
        "/api/config",
        json!({"smtp_enabled": true, "smtp_to": "ops@example.com"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");

    let config = body_json(get(app, "/api/config").await).await;
    assert_eq!(config["data"]["smtp_enabled"], false);
}

#[tokio::test]
async fn alert_rules_survive_config_updates() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(test_state(dir.path()));

    let response = post_json(
        app.clone(),
        "/api/alert-settings",
        json!({"hostname": "ap-01", "threshold": 10, "email_enabled": true}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let rules = body_json(response).await;
    assert_eq!(rules["data"]["ap-01"]["threshold"], 10);
    assert_eq!(rules["data"]["ap-01"]["syslog_enabled"], false);

    // A configuration update that carries no rules keeps the saved ones.
    post_json(
        app.clone(),
        "/api/config",
        json!({"polling_interval": 60, "alert_settings": {}}),
    )
    .await;

    let json = body_json(get(app, "/api/alert-settings").await).await;
    assert_eq!(json["data"]["ap-01"]["email_enabled"], true);
}

#[tokio::test]
async fn alert_rule_requires_hostname() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(test_state(dir.path()));

    let response = post_json(app, "/api/alert-settings", json!({"hostname": "  ", "threshold": 5})).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn failed_save_leaves_the_active_config_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path());
    // A regular file where the data directory should be.
    std::fs::write(&state.config.data_dir, "").unwrap();
    let app = build_test_app(state);

    let response = post_json(
        app.clone(),
        "/api/config",
        json!({"username": "new-admin", "polling_interval": 7}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["code"], "INTERNAL_ERROR");

    let config = body_json(get(app.clone(), "/api/config").await).await;
    assert_eq!(config["data"]["username"], "");
    assert_ne!(config["data"]["polling_interval"], 7);

    let response = post_json(
        app.clone(),
        "/api/alert-settings",
        json!({"hostname": "ap-01", "threshold": 10, "syslog_enabled": true}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let rules = body_json(get(app, "/api/alert-settings").await).await;
    assert!(rules["data"].get("ap-01").is_none());
}
