//! MCP (Model Context Protocol) Server Framework
//!
//! Build a server from tools, resources, resource templates and prompts with
//! `McpServerBuilder`, then serve it over stdio or streamable HTTP. Each
//! connection becomes a `Session` that negotiates capabilities, fetches the
//! client's roots and answers requests against the shared registry.

pub mod codec;
pub mod completion;
pub mod config;
pub mod content_types;
pub mod error;
pub mod events;
pub mod framework;
pub mod health;
pub mod http;
pub mod limits;
pub mod logging;
pub mod oauth;
pub mod protocol;
pub mod schema;
pub mod server;
pub mod session;
pub mod stdio;

// Re-export key types
pub use {
    codec::{audio_content, image_content, ContentSource},
    config::{KeepAliveConfig, RootsConfig, ServerOptions, StartOptions, TransportType},
    content_types::{CallToolResult, McpContent, PromptMessage, ResourceContent},
    error::{AuthRejection, McpError, McpResult, UserError},
    events::{ServerEvent, SessionEvent},
    framework::{
        Argument, McpServerBuilder, Prompt, Resource, ResourceTemplate, Tool, ToolAnnotations,
        ToolContext,
    },
    health::HealthConfig,
    limits::ResourceLimits,
    oauth::OAuthConfig,
    protocol::{LoggingLevel, Root},
    schema::{Field, Schema},
    server::{Authenticator, HttpRequest, McpServer},
    session::{ConnectionState, Session, TransportKind},
};
