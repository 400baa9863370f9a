//! Health Check Tests
//!
//! Liveness, readiness and OAuth discovery routes.

use mcpframe::{HealthConfig, OAuthConfig};
use serde_json::{json, Value};
use std::time::Duration;

use mcp_test_helpers::*;

/// Test basic health check endpoint
#[tokio::test]
async fn test_health_endpoint_default() -> TestResult<()> {
    init_test_tracing();
    let server = McpTestServer::start().await?;

    let response = reqwest::get(format!("{}/health", server.base_url())).await?;
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await?, "✓ Ok");

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_health_endpoint_custom() -> TestResult<()> {
    let builder = fixture_builder().with_health(HealthConfig {
        enabled: true,
        path: "/livez".to_string(),
        status: 202,
        message: "alive".to_string(),
    });
    let server = McpTestServer::start_with(builder, false).await?;

    let response = reqwest::get(format!("{}/livez", server.base_url())).await?;
    assert_eq!(response.status(), 202);
    assert_eq!(response.text().await?, "alive");

    // The default path is no longer special
    let response = reqwest::get(format!("{}/health", server.base_url())).await?;
    assert_eq!(response.status(), 404);

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_readiness_tracks_sessions() -> TestResult<()> {
    let server = McpTestServer::start().await?;
    let ready_url = format!("{}/ready", server.base_url());

    let response = reqwest::get(&ready_url).await?;
    assert_eq!(response.status(), 503);
    let body: Value = response.json().await?;
    assert_eq!(body, json!({"status": "no_sessions", "ready": 0, "total": 0}));

    let mut client = McpTestClient::new(&server);
    client.initialize().await?;

    let mut body = Value::Null;
    for _ in 0..20 {
        let response = reqwest::get(&ready_url).await?;
        body = response.json().await?;
        if body["status"] == "ready" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(body, json!({"status": "ready", "ready": 1, "total": 1}));

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_unknown_path_is_bare_404() -> TestResult<()> {
    let server = McpTestServer::start().await?;

    let response = reqwest::get(format!("{}/nope", server.base_url())).await?;
    assert_eq!(response.status(), 404);
    assert!(response.text().await?.is_empty());

    // OAuth documents are absent unless configured
    let response = reqwest::get(format!(
        "{}/.well-known/oauth-authorization-server",
        server.base_url()
    ))
    .await?;
    assert_eq!(response.status(), 404);

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_oauth_documents_use_snake_case() -> TestResult<()> {
    let oauth = OAuthConfig::new()
        .authorization_server(json!({
            "issuer": "https://auth.example.com",
            "authorizationEndpoint": "https://auth.example.com/authorize",
            "tokenEndpoint": "https://auth.example.com/token",
            "responseTypesSupported": ["code"]
        }))
        .protected_resource(json!({
            "resource": "https://mcp.example.com",
            "authorizationServers": ["https://auth.example.com"]
        }));
    let server = McpTestServer::start_with(fixture_builder().with_oauth(oauth), false).await?;

    let response = reqwest::get(format!(
        "{}/.well-known/oauth-authorization-server",
        server.base_url()
    ))
    .await?;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(body["issuer"], "https://auth.example.com");
    assert_eq!(body["token_endpoint"], "https://auth.example.com/token");
    assert_eq!(body["authorization_endpoint"], "https://auth.example.com/authorize");
    assert_eq!(body["response_types_supported"], json!(["code"]));
    assert!(body.get("tokenEndpoint").is_none());

    let response = reqwest::get(format!(
        "{}/.well-known/oauth-protected-resource",
        server.base_url()
    ))
    .await?;
    let body: Value = response.json().await?;
    assert_eq!(body["authorization_servers"], json!(["https://auth.example.com"]));

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_disabled_oauth_is_404() -> TestResult<()> {
    let oauth = OAuthConfig {
        enabled: false,
        authorization_server: Some(json!({"issuer": "https://auth.example.com"})),
        protected_resource: None,
    };
    let server = McpTestServer::start_with(fixture_builder().with_oauth(oauth), false).await?;

    let response = reqwest::get(format!(
        "{}/.well-known/oauth-authorization-server",
        server.base_url()
    ))
    .await?;
    assert_eq!(response.status(), 404);

    server.stop().await;
    Ok(())
}
