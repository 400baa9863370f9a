//! Request dispatch against the capability registry.
//!
//! `CapabilityHandler` is built once per session. It applies tool access
//! predicates to the session's auth value up front, then answers list, call,
//! read, get and complete requests.

use {
    super::{
        notification::ToolContext,
        providers::Argument,
        registry::Registry,
        tool::Tool,
    },
    crate::{
        completion::{fuzzy_match, CompletionResult},
        content_types::{CallToolResult, GetPromptResult, ResourceContents},
        error::{McpError, McpResult, UserError},
        logging,
        protocol::{CompleteParams, CompletionReference, GetPromptParams},
        schema::SchemaIssue,
    },
    serde_json::{json, Value},
    std::{
        sync::{atomic::Ordering, Arc},
        time::{Duration, Instant},
    },
    tracing::{debug, warn},
};

/// Builds the message of an invalid-params error from the tool name and issues.
pub type InvalidParamsFormatter = Arc<dyn Fn(&str, &[SchemaIssue]) -> String + Send + Sync>;

/// Grace period before the final result so trailing notifications flush first.
const NOTIFICATION_FLUSH_DELAY: Duration = Duration::from_millis(10);

pub fn default_invalid_params_message(tool: &str, issues: &[SchemaIssue]) -> String {
    let details = issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Tool '{tool}' parameter validation failed: {details}. Please check the parameter types and values according to the tool's schema."
    )
}

pub struct CapabilityHandler<A> {
    registry: Arc<Registry<A>>,
    visible_tools: Vec<Tool<A>>,
    auth: Option<A>,
    formatter: Option<InvalidParamsFormatter>,
}

impl<A> CapabilityHandler<A> {
    pub fn auth(&self) -> Option<&A> {
        self.auth.as_ref()
    }

    pub fn visible_tools(&self) -> &[Tool<A>] {
        &self.visible_tools
    }

    pub fn registry(&self) -> &Registry<A> {
        &self.registry
    }
}

impl<A: Clone + Send + Sync + 'static> CapabilityHandler<A> {
    pub fn new(registry: Arc<Registry<A>>, auth: Option<A>, formatter: Option<InvalidParamsFormatter>) -> Self {
        let visible_tools: Vec<Tool<A>> = registry
            .tools()
            .iter()
            .filter(|t| t.is_visible_to(auth.as_ref()))
            .cloned()
            .collect();
        debug!(
            visible = visible_tools.len(),
            registered = registry.tools().len(),
            "🔐 Computed visible tool set"
        );
        Self {
            registry,
            visible_tools,
            auth,
            formatter,
        }
    }

    pub fn list_tools(&self) -> Value {
        json!({
            "tools": self.visible_tools.iter().map(Tool::definition).collect::<Vec<_>>()
        })
    }

    /// Run a tool. Execution failures come back as flagged results; only an
    /// unknown tool or invalid arguments are protocol errors.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Value>,
        ctx: ToolContext<A>,
    ) -> McpResult<CallToolResult> {
        let Some(tool) = self.visible_tools.iter().find(|t| t.name == name) else {
            logging::log_unknown_tool(name);
            return Err(McpError::UnknownTool(name.to_string()));
        };

        let raw = arguments.unwrap_or_else(|| json!({}));
        logging::log_tool_call(name, &raw);

        let input = match &tool.parameters {
            Some(schema) => schema.validate(&raw).map_err(|issues| {
                let message = match &self.formatter {
                    Some(format) => format(name, &issues),
                    None => default_invalid_params_message(name, &issues),
                };
                McpError::InvalidParams(message)
            })?,
            None => raw,
        };

        let emitted = ctx.emitted_flag();
        let started = Instant::now();
        let handle = tokio::spawn((tool.execute)(input, ctx));

        let joined = match tool.timeout {
            Some(limit) => match tokio::time::timeout(limit, handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    // The spawned task keeps running; its result is discarded.
                    warn!(tool = %name, timeout_ms = limit.as_millis(), "⏰ Tool timed out");
                    return Ok(CallToolResult::error(format!(
                        "Tool '{name}' timed out after {}ms. Consider increasing timeoutMs or optimizing the tool implementation.",
                        limit.as_millis()
                    )));
                }
            },
            None => handle.await,
        };

        let result = match joined {
            Ok(Ok(output)) => match output.into_call_tool_result() {
                Ok(result) => result,
                Err(e) => CallToolResult::error(format!("{name} execution failed: {e}")),
            },
            Ok(Err(err)) => {
                logging::log_handler_error(name, &err.to_string(), started.elapsed());
                match err.downcast_ref::<UserError>() {
                    Some(user) => {
                        let mut result = CallToolResult::error(user.message.clone());
                        result.structured_content = user.extras.clone();
                        result
                    }
                    None => CallToolResult::error(format!("{name} execution failed: {err}")),
                }
            }
            Err(join_err) => {
                logging::log_handler_error(name, &join_err.to_string(), started.elapsed());
                CallToolResult::error(format!("{name} execution failed: {join_err}"))
            }
        };

        if emitted.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
            tokio::time::sleep(NOTIFICATION_FLUSH_DELAY).await;
        }

        debug!(tool = %name, duration_ms = started.elapsed().as_millis(), is_error = result.is_error, "🔧 Tool finished");
        Ok(result)
    }

    pub fn list_resources(&self) -> Value {
        json!({
            "resources": self.registry.resources().iter().map(|r| r.definition()).collect::<Vec<_>>()
        })
    }

    pub fn list_resource_templates(&self) -> Value {
        json!({
            "resourceTemplates": self
                .registry
                .resource_templates()
                .iter()
                .map(|t| t.definition())
                .collect::<Vec<_>>()
        })
    }

    pub async fn read_resource(&self, uri: &str) -> McpResult<Vec<ResourceContents>> {
        if let Some(resource) = self.registry.resource(uri) {
            let output = (resource.load)(self.auth.clone()).await.map_err(|e| {
                McpError::Internal(format!(
                    "Failed to load resource '{}' ({}): {}",
                    resource.name, resource.uri, e
                ))
            })?;
            return Ok(output
                .0
                .into_iter()
                .map(|c| c.into_contents(uri, resource.mime_type.as_deref()))
                .collect());
        }

        for template in self.registry.resource_templates() {
            if let Some(args) = template.matches(uri) {
                debug!(uri = %uri, template = %template.uri_template, "📄 Matched resource template");
                let output = (template.load)(args, self.auth.clone()).await.map_err(|e| {
                    McpError::Internal(format!(
                        "Failed to load resource '{}' ({}): {}",
                        template.name, uri, e
                    ))
                })?;
                return Ok(output
                    .0
                    .into_iter()
                    .map(|c| c.into_contents(uri, template.mime_type.as_deref()))
                    .collect());
            }
        }

        let available = self
            .registry
            .resources()
            .iter()
            .map(|r| r.uri.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Err(McpError::UnknownResource(format!(
            "Unknown resource: {uri}. Available resources: {available}"
        )))
    }

    pub fn list_prompts(&self) -> Value {
        json!({
            "prompts": self.registry.prompts().iter().map(|p| p.definition()).collect::<Vec<_>>()
        })
    }

    pub async fn get_prompt(&self, params: GetPromptParams) -> McpResult<GetPromptResult> {
        let prompt = self
            .registry
            .prompt(&params.name)
            .ok_or_else(|| McpError::UnknownPrompt(params.name.clone()))?;
        let args = params.arguments.unwrap_or_default();

        if let Some(missing) = prompt
            .arguments
            .iter()
            .find(|a| a.required && !args.contains_key(&a.name))
        {
            return Err(McpError::InvalidRequest(format!(
                "Prompt '{}' requires argument '{}'",
                prompt.name, missing.name
            )));
        }

        let output = (prompt.load)(args, self.auth.clone())
            .await
            .map_err(|e| McpError::Internal(format!("Failed to load prompt '{}': {}", prompt.name, e)))?;

        Ok(GetPromptResult {
            description: prompt.description.clone(),
            messages: output.into_messages(),
        })
    }

    pub async fn complete(&self, params: CompleteParams) -> McpResult<CompletionResult> {
        let arguments: &[Argument] = match &params.reference {
            CompletionReference::Prompt { name } => {
                &self
                    .registry
                    .prompt(name)
                    .ok_or_else(|| McpError::UnknownPrompt(name.clone()))?
                    .arguments
            }
            CompletionReference::Resource { uri } => {
                &self
                    .registry
                    .resource_template(uri)
                    .ok_or_else(|| McpError::UnknownResource(format!("Unknown resource template: {uri}")))?
                    .arguments
            }
        };

        let Some(argument) = arguments.iter().find(|a| a.name == params.argument.name) else {
            return Ok(CompletionResult::empty());
        };

        if let Some(complete) = &argument.complete {
            let result = complete(params.argument.value.clone()).await.map_err(|e| {
                McpError::Internal(format!(
                    "Completion for argument '{}' failed: {}",
                    argument.name, e
                ))
            })?;
            return Ok(result.capped());
        }

        if let Some(values) = &argument.enum_values {
            return Ok(CompletionResult::from_values(fuzzy_match(
                &params.argument.value,
                values,
            )));
        }

        Ok(CompletionResult::empty())
    }
}


#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            framework::providers::{Prompt, Resource},
            protocol::LoggingLevel,
        },
        anyhow::anyhow,
        std::sync::RwLock,
        tokio::sync::mpsc,
    };

    fn handler() -> CapabilityHandler<()> {
        let mut registry = Registry::new();
        registry.register_tool(Tool::new("explode", |_, _| async {
            Err::<(), _>(anyhow!("disk on fire"))
        }));
        registry.register_tool(Tool::new("structured", |_, _| async {
            Err::<(), _>(UserError::new("quota exceeded").into())
        }));
        registry.register_tool(
            Tool::new("secret", |_, _| async { Ok("classified") }).can_access(|_: Option<&()>| false),
        );
        registry.register_resource(Resource::new("memo://broken", "Broken memo", |_| async {
            Err::<String, _>(anyhow!("disk offline"))
        }));
        registry.register_prompt(Prompt::new("flaky", |_, _| async {
            Err::<String, _>(anyhow!("template missing"))
        }));
        CapabilityHandler::new(Arc::new(registry), None, None)
    }

    fn ctx(tool: &str) -> ToolContext<()> {
        let (tx, _rx) = mpsc::unbounded_channel();
        let level = Arc::new(RwLock::new(LoggingLevel::Info));
        ToolContext::new(None, "s-1", json!(1), tool, None, tx, level)
    }

    #[tokio::test]
    async fn test_plain_error_becomes_flagged_result() {
        let result = handler().call_tool("explode", None, ctx("explode")).await.unwrap();
        assert!(result.is_error);
        assert_eq!(
            serde_json::to_value(&result.content[0]).unwrap()["text"],
            "explode execution failed: disk on fire"
        );
    }

    #[tokio::test]
    async fn test_user_error_keeps_its_message() {
        let result = handler().call_tool("structured", None, ctx("structured")).await.unwrap();
        assert!(result.is_error);
        assert_eq!(serde_json::to_value(&result.content[0]).unwrap()["text"], "quota exceeded");
    }

    #[tokio::test]
    async fn test_failing_resource_load_is_internal_error() {
        let err = handler().read_resource("memo://broken").await.unwrap_err();
        assert_eq!(err.error_code(), -32603);
        let message = err.to_string();
        assert!(message.contains("Broken memo"), "{message}");
        assert!(message.contains("memo://broken"), "{message}");
        assert!(message.contains("disk offline"), "{message}");
    }

    #[tokio::test]
    async fn test_failing_prompt_load_is_internal_error() {
        let params = GetPromptParams {
            name: "flaky".into(),
            arguments: None,
        };
        let err = handler().get_prompt(params).await.unwrap_err();
        assert_eq!(err.error_code(), -32603);
        assert_eq!(err.to_string(), "Failed to load prompt 'flaky': template missing");
    }

    #[tokio::test]
    async fn test_unknown_and_hidden_tools_look_the_same() {
        let handler = handler();
        assert!(handler.visible_tools().iter().all(|t| t.name != "secret"));

        let unknown = handler.call_tool("nope", None, ctx("nope")).await.unwrap_err();
        let hidden = handler.call_tool("secret", None, ctx("secret")).await.unwrap_err();
        assert_eq!(unknown.error_code(), -32601);
        assert_eq!(hidden.error_code(), -32601);
        assert_eq!(hidden.to_string(), "Unknown tool: secret");
    }
}
