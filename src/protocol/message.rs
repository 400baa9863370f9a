//! JSON-RPC message classification and typed MCP request parameters.
//!
//! Inbound messages are classified once into `IncomingMessage`; request
//! parameters are then parsed into the typed structs below so dispatch never
//! reaches into raw JSON by hand.

use {
    crate::error::{McpError, McpResult},
    serde::{de::DeserializeOwned, Deserialize, Serialize},
    serde_json::Value,
    std::collections::HashMap,
    std::fmt,
};

/// A classified inbound JSON-RPC message.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    Request {
        id: Value,
        method: String,
        params: Option<Value>,
    },
    Notification {
        method: String,
        params: Option<Value>,
    },
    Response {
        id: Value,
        result: Value,
    },
    ErrorResponse {
        id: Value,
        code: i64,
        message: String,
    },
}

impl IncomingMessage {
    /// Classify a raw JSON value.
    pub fn parse(message: &Value) -> McpResult<Self> {
        let obj = message
            .as_object()
            .ok_or_else(|| McpError::InvalidRequest("Message must be a JSON object".into()))?;

        match obj.get("jsonrpc").and_then(Value::as_str) {
            Some("2.0") => {}
            Some(other) => {
                return Err(McpError::InvalidRequest(format!(
                    "Invalid jsonrpc version: {other}"
                )))
            }
            None => {
                return Err(McpError::InvalidRequest(
                    "Missing or invalid 'jsonrpc' field".into(),
                ))
            }
        }

        let id = obj.get("id").filter(|v| !v.is_null()).cloned();

        if let Some(method) = obj.get("method") {
            let method = method
                .as_str()
                .filter(|m| !m.is_empty())
                .ok_or_else(|| McpError::InvalidRequest("Invalid 'method' field".into()))?
                .to_string();
            let params = obj.get("params").cloned();
            return Ok(match id {
                Some(id) => Self::Request { id, method, params },
                None => Self::Notification { method, params },
            });
        }

        let id = id.ok_or_else(|| {
            McpError::InvalidRequest("Message has neither 'method' nor 'id'".into())
        })?;

        if let Some(error) = obj.get("error") {
            return Ok(Self::ErrorResponse {
                id,
                code: error.get("code").and_then(Value::as_i64).unwrap_or(-32603),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }

        Ok(Self::Response {
            id,
            result: obj.get("result").cloned().unwrap_or(Value::Null),
        })
    }

    pub fn is_request(&self) -> bool {
        matches!(self, Self::Request { .. })
    }
}

/// Parse request params into a typed struct, mapping failures to invalid params.
pub fn parse_params<T: DeserializeOwned>(method: &str, params: Option<Value>) -> McpResult<T> {
    let params = params.unwrap_or_else(|| Value::Object(Default::default()));
    serde_json::from_value(params)
        .map_err(|e| McpError::InvalidParams(format!("Invalid {method} params: {e}")))
}

/// Name/version pair exchanged during `initialize`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Implementation {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootsCapability {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

/// Features the client declared during the handshake.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCapabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roots: Option<RootsCapability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elicitation: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experimental: Option<Value>,
}

impl ClientCapabilities {
    pub fn supports_roots_list_changed(&self) -> bool {
        self.roots
            .as_ref()
            .and_then(|r| r.list_changed)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    #[serde(default)]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub capabilities: ClientCapabilities,
    #[serde(default)]
    pub client_info: Option<Implementation>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMeta {
    #[serde(default)]
    pub progress_token: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
    #[serde(default, rename = "_meta")]
    pub meta: Option<RequestMeta>,
}

impl CallToolParams {
    pub fn progress_token(&self) -> Option<Value> {
        self.meta
            .as_ref()
            .and_then(|m| m.progress_token.clone())
            .filter(|t| !t.is_null())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReadResourceParams {
    pub uri: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GetPromptParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<HashMap<String, String>>,
}

/// What a `completion/complete` request is completing.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum CompletionReference {
    #[serde(rename = "ref/prompt")]
    Prompt { name: String },
    #[serde(rename = "ref/resource")]
    Resource { uri: String },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompletionArgument {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompleteParams {
    #[serde(rename = "ref")]
    pub reference: CompletionReference,
    pub argument: CompletionArgument,
}

/// MCP logging levels, ordered from least to most severe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingLevel {
    Debug,
    #[default]
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl fmt::Display for LoggingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Notice => "notice",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
            Self::Alert => "alert",
            Self::Emergency => "emergency",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SetLevelParams {
    pub level: LoggingLevel,
}

/// A filesystem-like location the client shares with the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Root {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Content carried by a sampling message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SamplingContent {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Audio {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingMessage {
    pub role: Role,
    pub content: SamplingContent,
}

/// Server-initiated `sampling/createMessage` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    pub messages: Vec<SamplingMessage>,
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_preferences: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// The client's answer to a sampling request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageResult {
    pub role: Role,
    pub content: SamplingContent,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_request_and_notification() {
        let req = IncomingMessage::parse(&json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})).unwrap();
        assert!(req.is_request());

        let note = IncomingMessage::parse(&json!({"jsonrpc": "2.0", "method": "notifications/initialized"})).unwrap();
        assert!(matches!(note, IncomingMessage::Notification { ref method, .. } if method == "notifications/initialized"));
    }

    #[test]
    fn test_classify_responses() {
        let ok = IncomingMessage::parse(&json!({"jsonrpc": "2.0", "id": "srv-1", "result": {}})).unwrap();
        assert!(matches!(ok, IncomingMessage::Response { .. }));

        let err = IncomingMessage::parse(&json!({
            "jsonrpc": "2.0", "id": "srv-2", "error": {"code": -32601, "message": "nope"}
        }))
        .unwrap();
        assert!(matches!(err, IncomingMessage::ErrorResponse { code: -32601, .. }));
    }

    #[test]
    fn test_reject_bad_version() {
        let err = IncomingMessage::parse(&json!({"jsonrpc": "1.0", "id": 1, "method": "x"})).unwrap_err();
        assert_eq!(err.error_code(), -32600);
    }

    #[test]
    fn test_completion_reference_tagging() {
        let params: CompleteParams = serde_json::from_value(json!({
            "ref": {"type": "ref/resource", "uri": "file:///logs/{name}.log"},
            "argument": {"name": "name", "value": "ap"}
        }))
        .unwrap();
        assert_eq!(
            params.reference,
            CompletionReference::Resource { uri: "file:///logs/{name}.log".into() }
        );
        assert_eq!(params.argument.value, "ap");

        let bad: Result<CompleteParams, _> = serde_json::from_value(json!({
            "ref": {"type": "ref/unknown"},
            "argument": {"name": "x", "value": ""}
        }));
        assert!(bad.is_err());
    }

    #[test]
    fn test_logging_level_ordering() {
        assert!(LoggingLevel::Debug < LoggingLevel::Info);
        assert!(LoggingLevel::Emergency > LoggingLevel::Error);
        let parsed: SetLevelParams = serde_json::from_value(json!({"level": "warning"})).unwrap();
        assert_eq!(parsed.level, LoggingLevel::Warning);
        assert!(serde_json::from_value::<SetLevelParams>(json!({"level": "loud"})).is_err());
    }

    #[test]
    fn test_client_capabilities_roots() {
        let caps: ClientCapabilities = serde_json::from_value(json!({"roots": {"listChanged": true}})).unwrap();
        assert!(caps.supports_roots_list_changed());
        assert!(!ClientCapabilities::default().supports_roots_list_changed());
    }
}
