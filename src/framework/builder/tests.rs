//! Tests for the framework builder.

use {
    super::McpServerBuilder,
    crate::{
        framework::{
            providers::{Argument, Prompt, Resource, ResourceTemplate},
            tool::Tool,
        },
        limits::ResourceLimits,
        server::McpServer,
    },
    schemars::JsonSchema,
    serde::Deserialize,
    serde_json::json,
};

#[derive(Debug, Deserialize, JsonSchema)]
struct EchoInput {
    message: String,
}

#[test]
fn test_builder_basic_creation() {
    let server: anyhow::Result<McpServer<()>> = McpServerBuilder::new("test-server", "1.0.0").build();
    assert!(server.is_ok(), "Server creation should succeed");
}

#[test]
fn test_builder_registers_everything() {
    let server: McpServer<()> = McpServerBuilder::new("test-server", "1.0.0")
        .with_instructions("Use echo to test connectivity")
        .with_tool("echo", "Echo input back", |input: EchoInput, _ctx| async move {
            Ok(input.message)
        })
        .with_raw_tool(Tool::new("noop", |_, _| async { Ok(()) }))
        .with_resource(Resource::new("memo://greeting", "Greeting", |_| async { Ok("hello") }))
        .with_resource_template(
            ResourceTemplate::new("file:///logs/{name}.log", "Logs", |args, _| async move {
                Ok(format!("log {}", args["name"]))
            })
            .argument(Argument::new("name")),
        )
        .with_prompt(Prompt::new("greet", |_, _| async { Ok("Say hi") }))
        .build()
        .unwrap();

    let registry = server.registry();
    assert_eq!(registry.tools().len(), 2);
    assert_eq!(registry.resources().len(), 1);
    assert_eq!(registry.resource_templates().len(), 1);
    assert_eq!(registry.prompts().len(), 1);
    assert_eq!(
        server.options().instructions.as_deref(),
        Some("Use echo to test connectivity")
    );

    let echo = registry.tool("echo").unwrap();
    assert_eq!(echo.definition()["inputSchema"]["required"], json!(["message"]));
}

#[test]
fn test_duplicate_tool_replaces_earlier() {
    let server: McpServer<()> = McpServerBuilder::new("test-server", "1.0.0")
        .with_raw_tool(Tool::new("dup", |_, _| async { Ok("first") }).description("first"))
        .with_raw_tool(Tool::new("dup", |_, _| async { Ok("second") }).description("second"))
        .build()
        .unwrap();
    assert_eq!(server.registry().tools().len(), 1);
    assert_eq!(
        server.registry().tool("dup").unwrap().description.as_deref(),
        Some("second")
    );
}

#[test]
fn test_build_enforces_registry_limits() {
    let limits = ResourceLimits {
        max_tools: Some(1),
        ..Default::default()
    };
    let result: anyhow::Result<McpServer<()>> = McpServerBuilder::new("test-server", "1.0.0")
        .with_limits(limits)
        .with_raw_tool(Tool::new("a", |_, _| async { Ok(()) }))
        .with_raw_tool(Tool::new("b", |_, _| async { Ok(()) }))
        .build();
    let err = result.unwrap_err().to_string();
    assert!(err.contains("tool limit exceeded"), "unexpected error: {err}");
}
