// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the daemon HTTP client.

use super::{ClientError, DaemonClient};
use serde_json::json;
use serial_test::serial;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_for(server: &MockServer) -> DaemonClient {
    std::env::set_var("FLEET_ADDR", server.uri());
    let client = DaemonClient::new();
    std::env::remove_var("FLEET_ADDR");
    client
}

#[tokio::test]
#[serial]
async fn list_tools_returns_the_daemon_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tools"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tools": ["process.start"]})))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let result = client.list_tools().await.unwrap();
    assert_eq!(result, json!({"tools": ["process.start"]}));
}

#[tokio::test]
#[serial]
async fn call_tool_posts_args_and_returns_the_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tools/process.start"))
        .and(body_json(json!({"command": ["echo", "hi"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "p1"})))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let result = client.call_tool("process.start", json!({"command": ["echo", "hi"]})).await.unwrap();
    assert_eq!(result, json!({"id": "p1"}));
}

#[tokio::test]
#[serial]
async fn call_tool_surfaces_a_daemon_error_body_as_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tools/process.stop"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "not found"})))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.call_tool("process.stop", json!({})).await.unwrap_err();
    assert!(matches!(err, ClientError::Daemon(_)));
}

#[tokio::test]
#[serial]
async fn unreachable_daemon_surfaces_as_unreachable_error() {
    std::env::set_var("FLEET_ADDR", "http://127.0.0.1:1");
    let client = DaemonClient::new();
    std::env::remove_var("FLEET_ADDR");

    let err = client.list_tools().await.unwrap_err();
    assert!(matches!(err, ClientError::Unreachable(_, _)));
}
