//! MCP protocol versioning and JSON-RPC envelopes.
//!
//! This module contains the protocol version negotiation logic and the
//! builders for JSON-RPC success/error/notification/request messages.

pub mod message;

pub use message::{
    CallToolParams, ClientCapabilities, CompleteParams, CompletionArgument, CompletionReference,
    CreateMessageRequest, CreateMessageResult, GetPromptParams, Implementation, IncomingMessage,
    InitializeParams, LoggingLevel, ReadResourceParams, Role, Root, SamplingContent,
    SamplingMessage, SetLevelParams,
};

// Re-export the main protocol struct
pub use self::protocol::{McpProtocol, LATEST_PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS};

mod protocol {
    use {
        serde_json::{json, Value},
        tracing::{debug, warn},
    };

    /// Newest protocol revision this framework speaks.
    pub const LATEST_PROTOCOL_VERSION: &str = "2025-06-18";

    /// Every revision accepted during `initialize`.
    pub const SUPPORTED_PROTOCOL_VERSIONS: [&str; 3] = ["2024-11-05", "2025-03-26", "2025-06-18"];

    #[derive(Debug, Clone)]
    pub struct McpProtocol {
        server_name: String,
        server_version: String,
    }

    impl McpProtocol {
        pub fn new(server_name: impl Into<String>, server_version: impl Into<String>) -> Self {
            Self {
                server_name: server_name.into(),
                server_version: server_version.into(),
            }
        }

        /// Get server name
        pub fn server_name(&self) -> &str {
            &self.server_name
        }

        /// Get server version
        pub fn server_version(&self) -> &str {
            &self.server_version
        }

        /// Pick the revision to answer with: the client's when we support it,
        /// otherwise our latest.
        pub fn negotiate_version(&self, requested: Option<&str>) -> &'static str {
            match requested {
                Some(v) => match SUPPORTED_PROTOCOL_VERSIONS.iter().find(|s| **s == v) {
                    Some(found) => {
                        debug!("🔍 Protocol version negotiated: {}", found);
                        found
                    }
                    None => {
                        warn!(
                            requested = %v,
                            answered = LATEST_PROTOCOL_VERSION,
                            "Unsupported protocol version requested, answering with latest"
                        );
                        LATEST_PROTOCOL_VERSION
                    }
                },
                None => LATEST_PROTOCOL_VERSION,
            }
        }

        /// Create initialization response
        pub fn create_initialize_response(
            &self,
            protocol_version: &str,
            capabilities: Value,
            instructions: Option<&str>,
        ) -> Value {
            let mut response = json!({
                "protocolVersion": protocol_version,
                "capabilities": capabilities,
                "serverInfo": {
                    "name": self.server_name,
                    "version": self.server_version
                }
            });
            if let Some(instructions) = instructions {
                response["instructions"] = json!(instructions);
            }
            response
        }

        /// Create error response
        pub fn create_error_response(&self, id: Value, code: i32, message: &str) -> Value {
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {
                    "code": code,
                    "message": message
                }
            })
        }

        /// Create success response
        pub fn create_success_response(&self, id: Value, result: Value) -> Value {
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": result
            })
        }
    }

    /// Build a JSON-RPC notification.
    pub fn notification(method: &str, params: Value) -> Value {
        json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params
        })
    }

    /// Build a JSON-RPC request.
    pub fn request(id: Value, method: &str, params: Option<Value>) -> Value {
        let mut message = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method
        });
        if let Some(params) = params {
            message["params"] = params;
        }
        message
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use serde_json::json;

        #[test]
        fn test_initialize_response() {
            let proto = McpProtocol::new("demo", "1.2.3");
            let resp = proto.create_initialize_response("2025-03-26", json!({"tools": {}}), Some("be nice"));
            assert_eq!(resp["protocolVersion"], "2025-03-26");
            assert_eq!(resp["serverInfo"]["name"], "demo");
            assert_eq!(resp["serverInfo"]["version"], "1.2.3");
            assert_eq!(resp["instructions"], "be nice");
        }

        #[test]
        fn test_negotiate_version() {
            let proto = McpProtocol::new("demo", "1.0.0");
            assert_eq!(proto.negotiate_version(Some("2024-11-05")), "2024-11-05");
            assert_eq!(proto.negotiate_version(Some("1999-01-01")), LATEST_PROTOCOL_VERSION);
            assert_eq!(proto.negotiate_version(None), LATEST_PROTOCOL_VERSION);
        }

        #[test]
        fn test_error_response() {
            let proto = McpProtocol::new("demo", "1.0.0");
            let err = proto.create_error_response(json!(42), -1, "fail");
            assert_eq!(err["id"], 42);
            assert_eq!(err["error"]["code"], -1);
            assert_eq!(err["error"]["message"], "fail");
        }

        #[test]
        fn test_request_without_params() {
            let req = request(json!("srv-1"), "ping", None);
            assert_eq!(req["method"], "ping");
            assert!(req.get("params").is_none());
        }
    }
}

pub use self::protocol::{notification, request};
