//! High-level API for building MCP servers.
//!
//! Tools, resources, resource templates and prompts are plain values built
//! with closures and collected by `McpServerBuilder` into a `Registry`.
//! `CapabilityHandler` answers protocol requests against that registry for
//! one session.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use mcpframe::{McpServerBuilder, StartOptions};
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//!
//! #[derive(JsonSchema, Deserialize)]
//! struct CalculateInput {
//!     a: f64,
//!     b: f64,
//!     operation: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = McpServerBuilder::<()>::new("calculator", "1.0.0")
//!         .with_tool("calculate", "Perform basic arithmetic", |input: CalculateInput, ctx| async move {
//!             ctx.info(format!("Calculating {} {} {}", input.a, input.operation, input.b))?;
//!             let result = match input.operation.as_str() {
//!                 "add" => input.a + input.b,
//!                 "subtract" => input.a - input.b,
//!                 "multiply" => input.a * input.b,
//!                 "divide" => input.a / input.b,
//!                 _ => return Err(anyhow::anyhow!("Unknown operation")),
//!             };
//!             Ok(result.to_string())
//!         })
//!         .build()?;
//!
//!     server.start(StartOptions::http(3000)).await?;
//!     server.closed().await;
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod handler;
pub mod notification;
pub mod providers;
pub mod registry;
pub mod tool;

pub use {
    builder::McpServerBuilder,
    handler::CapabilityHandler,
    notification::ToolContext,
    providers::{Argument, Prompt, Resource, ResourceTemplate},
    registry::Registry,
    tool::{Tool, ToolAnnotations},
};
