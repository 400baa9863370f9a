//! Resource System Basic Tests

use serde_json::json;

use mcp_test_helpers::{McpTestClient, McpTestServer};

#[tokio::test]
async fn test_capabilities_advertise_resources_and_prompts() {
    let server = McpTestServer::start().await.unwrap();
    let mut client = McpTestClient::new(&server);

    let init = client.initialize().await.unwrap();
    let caps = &init["result"]["capabilities"];
    assert!(caps["tools"].is_object());
    assert!(caps["resources"].is_object());
    assert!(caps["prompts"].is_object());
    assert!(caps["logging"].is_object());

    server.stop().await;
}

#[tokio::test]
async fn test_bare_server_omits_unused_capabilities() {
    let builder = mcpframe::McpServerBuilder::<String>::new("bare", "0.0.1");
    let server = McpTestServer::start_with(builder, false).await.unwrap();
    let mut client = McpTestClient::new(&server);

    let init = client.initialize().await.unwrap();
    let caps = &init["result"]["capabilities"];
    assert!(caps.get("resources").is_none());
    assert!(caps.get("prompts").is_none());
    assert!(caps["tools"].is_object());

    server.stop().await;
}

#[tokio::test]
async fn test_list_resources_and_templates() {
    let server = McpTestServer::start().await.unwrap();
    let mut client = McpTestClient::new(&server);
    client.initialize().await.unwrap();

    let resources = client.request("resources/list", json!({})).await.unwrap();
    assert_eq!(
        resources["result"]["resources"],
        json!([{"uri": "memo://greeting", "name": "Greeting", "mimeType": "text/plain"}])
    );

    let templates = client.request("resources/templates/list", json!({})).await.unwrap();
    let template = &templates["result"]["resourceTemplates"][0];
    assert_eq!(template["uriTemplate"], "file:///logs/{name}.log");
    assert_eq!(template["name"], "Logs");

    server.stop().await;
}

#[tokio::test]
async fn test_read_fixed_resource() {
    let server = McpTestServer::start().await.unwrap();
    let mut client = McpTestClient::new(&server);
    client.initialize().await.unwrap();

    let response = client
        .request("resources/read", json!({"uri": "memo://greeting"}))
        .await
        .unwrap();
    let contents = &response["result"]["contents"];
    assert_eq!(contents[0]["uri"], "memo://greeting");
    assert_eq!(contents[0]["text"], "hello");
    assert_eq!(contents[0]["mimeType"], "text/plain");

    server.stop().await;
}

#[tokio::test]
async fn test_read_through_template() {
    let server = McpTestServer::start().await.unwrap();
    let mut client = McpTestClient::new(&server);
    client.initialize().await.unwrap();

    let response = client
        .request("resources/read", json!({"uri": "file:///logs/app.log"}))
        .await
        .unwrap();
    assert_eq!(response["result"]["contents"][0]["uri"], "file:///logs/app.log");
    assert_eq!(response["result"]["contents"][0]["text"], "log for app");

    server.stop().await;
}

#[tokio::test]
async fn test_unknown_resource_is_protocol_error() {
    let server = McpTestServer::start().await.unwrap();
    let mut client = McpTestClient::new(&server);
    client.initialize().await.unwrap();

    let response = client
        .request("resources/read", json!({"uri": "file:///etc/passwd"}))
        .await
        .unwrap();
    assert!(response.get("result").is_none());
    let message = response["error"]["message"].as_str().unwrap();
    assert!(message.contains("Unknown resource: file:///etc/passwd"), "{message}");
    assert!(message.contains("memo://greeting"), "{message}");

    server.stop().await;
}

#[tokio::test]
async fn test_template_completion_uses_enumeration() {
    let server = McpTestServer::start().await.unwrap();
    let mut client = McpTestClient::new(&server);
    client.initialize().await.unwrap();

    let response = client
        .request(
            "completion/complete",
            json!({
                "ref": {"type": "ref/resource", "uri": "file:///logs/{name}.log"},
                "argument": {"name": "name", "value": "acc"}
            }),
        )
        .await
        .unwrap();
    assert_eq!(response["result"]["completion"]["values"][0], "access");

    server.stop().await;
}
