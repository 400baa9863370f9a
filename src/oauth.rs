//! OAuth discovery documents.

use {
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
};

pub const AUTHORIZATION_SERVER_PATH: &str = "/.well-known/oauth-authorization-server";
pub const PROTECTED_RESOURCE_PATH: &str = "/.well-known/oauth-protected-resource";

/// Metadata is accepted in camelCase and served in snake_case.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub enabled: bool,
    pub authorization_server: Option<Value>,
    pub protected_resource: Option<Value>,
}

impl OAuthConfig {
    pub fn new() -> Self {
        Self {
            enabled: true,
            ..Default::default()
        }
    }

    pub fn authorization_server(mut self, metadata: Value) -> Self {
        self.authorization_server = Some(metadata);
        self
    }

    pub fn protected_resource(mut self, metadata: Value) -> Self {
        self.protected_resource = Some(metadata);
        self
    }

    /// Document served at `path`, if it is a well-known path and configured.
    pub fn document_for(&self, path: &str) -> Option<Value> {
        if !self.enabled {
            return None;
        }
        let metadata = match path {
            AUTHORIZATION_SERVER_PATH => self.authorization_server.as_ref()?,
            PROTECTED_RESOURCE_PATH => self.protected_resource.as_ref()?,
            _ => return None,
        };
        Some(snake_case_keys(metadata))
    }
}

pub fn camel_to_snake(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Rewrite the top-level keys of an object to snake_case. Values, including
/// nested objects, pass through untouched.
pub fn snake_case_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (camel_to_snake(k), v.clone()))
                .collect::<Map<_, _>>(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn test_camel_to_snake() {
        assert_eq!(camel_to_snake("tokenEndpoint"), "token_endpoint");
        assert_eq!(camel_to_snake("issuer"), "issuer");
        assert_eq!(
            camel_to_snake("codeChallengeMethodsSupported"),
            "code_challenge_methods_supported"
        );
    }

    #[test]
    fn test_document_keys_rewritten() {
        let config = OAuthConfig::new().authorization_server(json!({
            "issuer": "https://auth.example.com",
            "tokenEndpoint": "https://auth.example.com/token",
            "grantTypesSupported": ["authorizationCode"],
            "serviceDocumentation": {"apiReference": "https://auth.example.com/docs"}
        }));
        let doc = config.document_for(AUTHORIZATION_SERVER_PATH).unwrap();
        assert_eq!(doc["issuer"], "https://auth.example.com");
        assert_eq!(doc["token_endpoint"], "https://auth.example.com/token");
        assert_eq!(doc["grant_types_supported"], json!(["authorizationCode"]));
        assert_eq!(
            doc["service_documentation"],
            json!({"apiReference": "https://auth.example.com/docs"})
        );
        assert!(config.document_for(PROTECTED_RESOURCE_PATH).is_none());
    }

    #[test]
    fn test_disabled_serves_nothing() {
        let mut config = OAuthConfig::new().protected_resource(json!({"resource": "x"}));
        config.enabled = false;
        assert!(config.document_for(PROTECTED_RESOURCE_PATH).is_none());
    }
}
