//! Error taxonomy for the framework.
//!
//! `McpError` is the protocol-level failure that travels back to the client as
//! a JSON-RPC error object. Tool execution failures never use it: they are
//! folded into a flagged `CallToolResult` instead (see `UserError`).

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpError {
    // Protocol Errors
    #[error("Method not found: {0}")]
    UnknownMethod(String),

    #[error("{0}")]
    InvalidParams(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Not initialized")]
    NotInitialized,

    // Capability Errors
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("{0}")]
    UnknownResource(String),

    #[error("Unknown prompt: {0}")]
    UnknownPrompt(String),

    // Limit Errors
    #[error("Too many sessions (max: {0})")]
    TooManySessions(usize),

    #[error("Message too large: {0} bytes (max: {1})")]
    MessageTooLarge(usize, usize),

    // JSON Errors
    #[error("Parse error: {0}")]
    Json(#[from] serde_json::Error),

    // Internal Errors
    #[error("{0}")]
    Internal(String),
}

impl McpError {
    /// Convert to JSON-RPC error code
    pub fn error_code(&self) -> i32 {
        match self {
            Self::Json(_) => -32700,
            Self::InvalidRequest(_) => -32600,
            Self::UnknownMethod(_)
            | Self::UnknownTool(_)
            | Self::UnknownResource(_)
            | Self::UnknownPrompt(_) => -32601,
            Self::InvalidParams(_) => -32602,
            Self::NotInitialized => -32002,
            Self::TooManySessions(_) | Self::MessageTooLarge(_, _) => -32000,
            Self::Internal(_) => -32603,
        }
    }

    /// Create JSON-RPC error response
    pub fn to_json_rpc_error(&self, id: Option<Value>) -> Value {
        serde_json::json!({
            "jsonrpc": "2.0",
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            },
            "id": id,
        })
    }
}

// Result type alias for convenience
pub type McpResult<T> = Result<T, McpError>;

/// A deliberate, user-facing failure raised from inside a tool.
///
/// Returning this (through `anyhow`) from a tool produces a result flagged as
/// an error whose single text item is exactly the message, without the
/// "execution failed" prefix used for unexpected failures.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct UserError {
    pub message: String,
    pub extras: Option<Value>,
}

impl UserError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            extras: None,
        }
    }

    pub fn with_extras(mut self, extras: Value) -> Self {
        self.extras = Some(extras);
        self
    }
}

/// Rejection produced by an authentication hook.
///
/// HTTP transports answer the connection attempt with `status`; the stdio
/// transport logs it and continues unauthenticated.
#[derive(Debug, Clone, Error)]
#[error("Authentication failed ({status}): {message}")]
pub struct AuthRejection {
    pub status: u16,
    pub message: String,
}

impl AuthRejection {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(401, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(403, message)
    }
}
