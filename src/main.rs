//! MCP Server Example
//!
//! Demo server wiring every kind of capability. The transport comes from the
//! command line or environment, e.g. `--transport=http-stream --port=3000`.

use {
    anyhow::Result,
    mcpframe::{
        error::AuthRejection, logging, Argument, CallToolResult, McpServer, McpServerBuilder, Prompt, Resource,
        ResourceTemplate, StartOptions, Tool, UserError,
    },
    schemars::JsonSchema,
    serde::Deserialize,
    serde_json::json,
    std::time::Duration,
    tracing::info,
};

#[derive(Debug, Deserialize, JsonSchema)]
struct EchoInput {
    /// Text to send back
    message: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct AddInput {
    a: f64,
    b: f64,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CountdownInput {
    steps: u32,
}

fn build() -> Result<McpServer<String>> {
    McpServerBuilder::new("mcpframe-demo", env!("CARGO_PKG_VERSION"))
        .with_instructions("Demo server: echo, add and countdown tools plus a log template")
        .with_authenticate(|request| async move {
            let Some(request) = request else {
                return Ok("local".to_string());
            };
            match request.bearer_token() {
                None => Ok("public".to_string()),
                Some("admin-token") => Ok("admin".to_string()),
                Some(_) => Err(AuthRejection::unauthorized("Unknown token")),
            }
        })
        .with_tool("echo", "Echo a message back", |input: EchoInput, _ctx| async move {
            Ok(input.message)
        })
        .with_tool("add", "Add two numbers", |input: AddInput, _ctx| async move {
            let sum = input.a + input.b;
            Ok(CallToolResult::text(sum.to_string()).with_structured_content(json!({ "sum": sum })))
        })
        .with_tool("countdown", "Count down with progress updates", |input: CountdownInput, ctx| async move {
            if input.steps == 0 {
                return Err(UserError::new("steps must be at least 1").into());
            }
            for step in 0..input.steps {
                ctx.report_progress(f64::from(step), Some(f64::from(input.steps))).await?;
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            ctx.info("Countdown finished")?;
            Ok(format!("Counted {} steps", input.steps))
        })
        .with_raw_tool(
            Tool::new("session_count", |_, ctx| async move {
                Ok(format!("Caller role: {}", ctx.session().map(String::as_str).unwrap_or("none")))
            })
            .description("Admin only: report the caller role")
            .can_access(|auth: Option<&String>| auth.is_some_and(|role| role == "admin")),
        )
        .with_resource(
            Resource::new("memo://readme", "Readme", |_| async {
                Ok("This server is a demo of the mcpframe crate.")
            })
            .mime_type("text/plain"),
        )
        .with_resource_template(
            ResourceTemplate::new("file:///logs/{name}.log", "Application logs", |args, _| async move {
                let name = args.get("name").cloned().unwrap_or_default();
                Ok(format!("[{name}] started\n[{name}] ready\n"))
            })
            .mime_type("text/plain")
            .argument(Argument::new("name").enumeration(["app", "access", "error"])),
        )
        .with_prompt(
            Prompt::new("review", |args, _| async move {
                let language = args.get("language").cloned().unwrap_or_else(|| "rust".into());
                Ok(format!("Review the following {language} code for correctness."))
            })
            .description("Ask for a code review")
            .argument(
                Argument::new("language")
                    .description("Source language")
                    .required()
                    .enumeration(["rust", "python", "typescript", "go"]),
            ),
        )
        .build()
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing();

    let server = build()?;
    let config = server.start(StartOptions::default()).await?;
    info!(transport = %config.transport, "🚀 Demo server running");

    tokio::select! {
        _ = server.closed() => {}
        _ = tokio::signal::ctrl_c() => server.stop().await,
    }
    Ok(())
}
