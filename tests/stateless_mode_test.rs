//! Stateless HTTP Mode Tests

use serde_json::{json, Value};

use mcp_test_helpers::{McpTestClient, McpTestServer, ADMIN_TOKEN};

#[tokio::test]
async fn test_stateless_calls_leave_no_sessions() {
    let server = McpTestServer::start_stateless().await.unwrap();
    let mut events = server.server.subscribe();
    let mut client = McpTestClient::new(&server);

    for i in 0..5 {
        let message = format!("call {i}");
        let response = client.call_tool("echo", json!({ "message": message })).await.unwrap();
        assert_eq!(response["result"]["content"][0]["text"], message);
        assert_eq!(server.server.session_count(), 0);
    }

    assert!(client.session_id.is_none());
    assert!(events.try_recv().is_err(), "stateless sessions emit no events");

    server.stop().await;
}

#[tokio::test]
async fn test_stateless_has_no_session_header() {
    let server = McpTestServer::start_stateless().await.unwrap();
    let client = McpTestClient::new(&server);

    let response = client
        .post(&json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.headers().get("mcp-session-id").is_none());

    server.stop().await;
}

#[tokio::test]
async fn test_stateless_authenticates_every_request() {
    let server = McpTestServer::start_stateless().await.unwrap();

    let mut admin = McpTestClient::new(&server).with_token(ADMIN_TOKEN);
    let response = admin.call_tool("admin_stats", json!({})).await.unwrap();
    assert_eq!(response["result"]["content"][0]["text"], "role=admin");

    let mut public = McpTestClient::new(&server);
    let response = public.call_tool("admin_stats", json!({})).await.unwrap();
    assert_eq!(response["error"]["code"], -32601);

    let rejected = McpTestClient::new(&server)
        .with_token("wrong")
        .post(&json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}))
        .await
        .unwrap();
    assert_eq!(rejected.status(), 401);

    server.stop().await;
}

#[tokio::test]
async fn test_stateless_rejects_stream_and_delete() {
    let server = McpTestServer::start_stateless().await.unwrap();
    let client = McpTestClient::new(&server);

    let get = client.request_builder(reqwest::Method::GET).send().await.unwrap();
    assert_eq!(get.status(), 405);
    let delete = client.request_builder(reqwest::Method::DELETE).send().await.unwrap();
    assert_eq!(delete.status(), 405);

    server.stop().await;
}

#[tokio::test]
async fn test_stateless_readiness() {
    let server = McpTestServer::start_stateless().await.unwrap();

    let response = reqwest::get(format!("{}/ready", server.base_url())).await.unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"mode": "stateless", "ready": 1, "total": 1, "status": "ready"}));

    server.stop().await;
}
