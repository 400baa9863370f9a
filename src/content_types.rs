//! Type-safe MCP content types
//!
//! Typed wrappers for everything the framework hands back to a client: tool
//! call results, resource bodies and prompt messages. Tool handlers may return
//! anything convertible into `ToolOutput`; the dispatcher normalises it into a
//! `CallToolResult` envelope.
//!
//! ```rust
//! use mcpframe::content_types::{McpContent, ToolOutput};
//!
//! let out: ToolOutput = "done".into();
//! let result = out.into_call_tool_result().unwrap();
//! assert_eq!(result.content, vec![McpContent::text("done")]);
//! ```

use {
    crate::{
        error::{McpError, McpResult},
        protocol::Role,
    },
    base64::{engine::general_purpose::STANDARD as BASE64, Engine as _},
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

/// A single content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum McpContent {
    #[serde(rename = "text")]
    Text { text: String },

    /// Base64 encoded image data
    #[serde(rename = "image")]
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },

    /// Base64 encoded audio data
    #[serde(rename = "audio")]
    Audio {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },

    /// Embedded resource body
    #[serde(rename = "resource")]
    Resource { resource: ResourceContents },

    /// Reference to a resource the client can read separately
    #[serde(rename = "resource_link")]
    ResourceLink {
        uri: String,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, rename = "mimeType", skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
}

impl McpContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::Image {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn audio(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::Audio {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn embedded(resource: ResourceContents) -> Self {
        Self::Resource { resource }
    }

    pub fn resource_link(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self::ResourceLink {
            uri: uri.into(),
            name: name.into(),
            description: None,
            mime_type: None,
        }
    }
}

/// The envelope every `tools/call` produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    pub content: Vec<McpContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl CallToolResult {
    pub fn new(content: Vec<McpContent>) -> Self {
        Self {
            content,
            ..Default::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(vec![McpContent::text(text)])
    }

    /// A flagged error result carrying one text item.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![McpContent::text(message)],
            structured_content: None,
            is_error: true,
        }
    }

    pub fn with_structured_content(mut self, data: Value) -> Self {
        self.structured_content = Some(data);
        self
    }
}

/// What a tool handler may return.
#[derive(Debug, Clone)]
pub enum ToolOutput {
    Text(String),
    Content(McpContent),
    Result(CallToolResult),
    /// Raw JSON that must already have the envelope shape
    Value(Value),
    Empty,
}

impl ToolOutput {
    /// Normalise into the result envelope.
    pub fn into_call_tool_result(self) -> McpResult<CallToolResult> {
        match self {
            Self::Text(text) => Ok(CallToolResult::text(text)),
            Self::Content(item) => Ok(CallToolResult::new(vec![item])),
            Self::Result(result) => Ok(result),
            Self::Empty => Ok(CallToolResult::default()),
            Self::Value(Value::Null) => Ok(CallToolResult::default()),
            Self::Value(Value::String(text)) => Ok(CallToolResult::text(text)),
            Self::Value(value) => serde_json::from_value(value).map_err(|e| {
                McpError::Internal(format!("Tool result does not match the content envelope: {e}"))
            }),
        }
    }
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ToolOutput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<McpContent> for ToolOutput {
    fn from(item: McpContent) -> Self {
        Self::Content(item)
    }
}

impl From<CallToolResult> for ToolOutput {
    fn from(result: CallToolResult) -> Self {
        Self::Result(result)
    }
}

impl From<Value> for ToolOutput {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<()> for ToolOutput {
    fn from(_: ()) -> Self {
        Self::Empty
    }
}

/// One body of a `resources/read` response, as sent on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResourceBody {
    Text(String),
    /// Base64 encoded bytes
    Blob(String),
}

/// A body produced by a resource or template loader.
///
/// `uri` and `mime_type` override the registered values when set.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceContent {
    pub body: ResourceBody,
    pub mime_type: Option<String>,
    pub uri: Option<String>,
}

impl ResourceContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            body: ResourceBody::Text(text.into()),
            mime_type: None,
            uri: None,
        }
    }

    /// From an already base64 encoded payload.
    pub fn blob(base64: impl Into<String>) -> Self {
        Self {
            body: ResourceBody::Blob(base64.into()),
            mime_type: None,
            uri: None,
        }
    }

    pub fn bytes(bytes: &[u8]) -> Self {
        Self::blob(BASE64.encode(bytes))
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Render for the wire, filling in the requested URI and registered MIME type.
    pub fn into_contents(self, uri: &str, default_mime: Option<&str>) -> ResourceContents {
        let (text, blob) = match self.body {
            ResourceBody::Text(text) => (Some(text), None),
            ResourceBody::Blob(blob) => (None, Some(blob)),
        };
        ResourceContents {
            uri: self.uri.unwrap_or_else(|| uri.to_string()),
            mime_type: self.mime_type.or_else(|| default_mime.map(str::to_string)),
            text,
            blob,
        }
    }
}

impl From<String> for ResourceContent {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

impl From<&str> for ResourceContent {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

/// What a resource loader may return: one body or several.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceOutput(pub Vec<ResourceContent>);

impl From<ResourceContent> for ResourceOutput {
    fn from(content: ResourceContent) -> Self {
        Self(vec![content])
    }
}

impl From<Vec<ResourceContent>> for ResourceOutput {
    fn from(contents: Vec<ResourceContent>) -> Self {
        Self(contents)
    }
}

impl From<String> for ResourceOutput {
    fn from(text: String) -> Self {
        Self(vec![ResourceContent::text(text)])
    }
}

impl From<&str> for ResourceOutput {
    fn from(text: &str) -> Self {
        Self(vec![ResourceContent::text(text)])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: McpContent,
}

impl PromptMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: McpContent::text(text),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: McpContent::text(text),
        }
    }
}

/// What a prompt loader may return.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptOutput {
    /// Wrapped as a single user message
    Text(String),
    Messages(Vec<PromptMessage>),
}

impl PromptOutput {
    pub fn into_messages(self) -> Vec<PromptMessage> {
        match self {
            Self::Text(text) => vec![PromptMessage::user(text)],
            Self::Messages(messages) => messages,
        }
    }
}

impl From<String> for PromptOutput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for PromptOutput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<PromptMessage>> for PromptOutput {
    fn from(messages: Vec<PromptMessage>) -> Self {
        Self::Messages(messages)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetPromptResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_output_round_trip() {
        let result = ToolOutput::from("hello").into_call_tool_result().unwrap();
        let wire = serde_json::to_value(&result).unwrap();
        assert_eq!(wire, json!({"content": [{"type": "text", "text": "hello"}]}));
    }

    #[test]
    fn test_single_item_is_wrapped() {
        let result = ToolOutput::from(McpContent::image("AAAA", "image/png"))
            .into_call_tool_result()
            .unwrap();
        assert_eq!(result.content.len(), 1);
        let wire = serde_json::to_value(&result.content[0]).unwrap();
        assert_eq!(wire["mimeType"], "image/png");
    }

    #[test]
    fn test_unit_is_empty() {
        let result = ToolOutput::from(()).into_call_tool_result().unwrap();
        assert!(result.content.is_empty());
        assert!(!result.is_error);
    }

    #[test]
    fn test_value_must_match_envelope() {
        let ok = ToolOutput::from(json!({"content": [{"type": "text", "text": "x"}], "isError": true}))
            .into_call_tool_result()
            .unwrap();
        assert!(ok.is_error);

        let bad = ToolOutput::from(json!({"answer": 42})).into_call_tool_result();
        assert!(bad.is_err());
    }

    #[test]
    fn test_resource_content_defaults() {
        let contents = ResourceContent::bytes(b"hi").into_contents("mem://a", Some("application/octet-stream"));
        assert_eq!(contents.uri, "mem://a");
        assert_eq!(contents.blob.as_deref(), Some("aGk="));
        assert!(contents.text.is_none());

        let overridden = ResourceContent::text("x")
            .with_uri("mem://b")
            .with_mime_type("text/plain")
            .into_contents("mem://a", None);
        assert_eq!(overridden.uri, "mem://b");
        assert_eq!(overridden.mime_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn test_prompt_text_becomes_user_message() {
        let messages = PromptOutput::from("Summarise this").into_messages();
        assert_eq!(messages, vec![PromptMessage::user("Summarise this")]);
        let wire = serde_json::to_value(&messages[0]).unwrap();
        assert_eq!(wire["role"], "user");
        assert_eq!(wire["content"]["type"], "text");
    }
}
