//! MCP Debug Logging Module
//!
//! Structured logging for the framework using the tracing crate. Output goes
//! to stderr so the stdio transport keeps stdout for protocol frames only.

use {
    crate::protocol::LoggingLevel,
    std::time::Duration,
    tracing::{debug, error, info, span, trace, warn, Level, Span},
    tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter},
    uuid::Uuid,
};

/// Install the global subscriber. `RUST_LOG` filters, `LOG_FORMAT=json` switches
/// to JSON lines. Calling this more than once is a no-op.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mcpframe=info,warp=info"));

    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    if json_format {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(std::io::stderr);

        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_level(true)
            .with_ansi(false)
            .with_writer(std::io::stderr);

        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init();
    }

    debug!(json = json_format, "Tracing ready");
}

/// Identifier for one client connection (and the session bound to it).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct McpConnectionId(pub String);

impl McpConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for McpConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for McpConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Create a span for tracking a request
pub fn request_span(method: &str, session_id: &str) -> Span {
    span!(
        Level::INFO,
        "mcp_request",
        method = %method,
        session_id = %session_id,
    )
}

/// Emit a message at the tracing level matching an MCP logging level.
///
/// Used for diagnostics whose severity is configured by the host, such as
/// keep-alive failures.
pub fn log_at(level: LoggingLevel, session_id: &str, message: &str) {
    match level {
        LoggingLevel::Debug => debug!(session_id = %session_id, "{}", message),
        LoggingLevel::Info | LoggingLevel::Notice => {
            info!(session_id = %session_id, "{}", message)
        }
        LoggingLevel::Warning => warn!(session_id = %session_id, "{}", message),
        _ => error!(session_id = %session_id, "{}", message),
    }
}

pub fn log_message_received(transport: &str, message_size: usize) {
    trace!(transport = %transport, bytes = message_size, event = "frame_in", "📥 Frame received");
}

pub fn log_handler_error(method: &str, error: &str, duration: Duration) {
    warn!(
        method = %method,
        error = %error,
        elapsed_ms = duration.as_millis(),
        event = "request_failed",
        "❌ Request failed"
    );
}

pub fn log_tool_call(tool: &str, args: &serde_json::Value) {
    info!(tool = %tool, arguments = %args, event = "tool_invoked", "🔧 Invoking tool");
}

pub fn log_unknown_tool(tool: &str) {
    warn!(tool = %tool, event = "tool_missing", "Tool not found or not visible");
}

/// Only the first 256 characters of the raw input are logged.
pub fn log_parse_error(error: &str, raw_message: &str) {
    let preview: String = raw_message.chars().take(256).collect();
    error!(error = %error, preview = %preview, event = "invalid_json", "Could not parse JSON-RPC input");
}

pub fn log_unknown_method(method: &str) {
    warn!(method = %method, event = "method_missing", "No handler for method");
}

pub fn log_session_connected(session_id: &str, transport: &str) {
    info!(session_id = %session_id, transport = %transport, event = "session_open", "🔌 Session opened");
}

pub fn log_session_disconnected(session_id: &str) {
    info!(session_id = %session_id, event = "session_closed", "👋 Session closed");
}

pub fn log_server_startup(transport: &str) {
    info!(transport = %transport, event = "server_starting", "🚀 Starting server");
}

pub fn log_server_ready(addr: &str) {
    info!(address = %addr, event = "server_listening", "✅ Listening");
}

pub fn log_server_shutdown() {
    info!(event = "server_stopping", "🛑 Stopping server");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_ids_are_unique() {
        let a = McpConnectionId::new();
        let b = McpConnectionId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string(), a.as_str());
    }

    #[test]
    fn test_init_tracing_twice_is_harmless() {
        init_tracing();
        init_tracing();
        log_at(LoggingLevel::Warning, "s-1", "ping failed");
    }
}
