//! Tool definitions.

use {
    super::notification::ToolContext,
    crate::{content_types::ToolOutput, schema::Schema},
    anyhow::Context as _,
    futures_util::future::BoxFuture,
    schemars::JsonSchema,
    serde::{de::DeserializeOwned, Deserialize, Serialize},
    serde_json::{json, Value},
    std::{fmt, future::Future, sync::Arc, time::Duration},
};

/// Boxed async tool body: validated arguments plus execution context.
pub type ToolFunction<A> =
    Arc<dyn Fn(Value, ToolContext<A>) -> BoxFuture<'static, anyhow::Result<ToolOutput>> + Send + Sync>;

/// Decides whether an auth value may see a capability.
pub type AccessPredicate<A> = Arc<dyn Fn(Option<&A>) -> bool + Send + Sync>;

/// Behavioural hints shown to clients in `tools/list`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotent_hint: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_world_hint: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streaming_hint: Option<bool>,
}

pub struct Tool<A> {
    pub name: String,
    pub description: Option<String>,
    pub parameters: Option<Schema>,
    pub timeout: Option<Duration>,
    pub annotations: Option<ToolAnnotations>,
    pub(crate) can_access: Option<AccessPredicate<A>>,
    pub(crate) execute: ToolFunction<A>,
}

impl<A> Clone for Tool<A> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
            timeout: self.timeout,
            annotations: self.annotations.clone(),
            can_access: self.can_access.clone(),
            execute: Arc::clone(&self.execute),
        }
    }
}

impl<A> fmt::Debug for Tool<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .field("restricted", &self.can_access.is_some())
            .finish()
    }
}

impl<A: Send + Sync + 'static> Tool<A> {
    /// Create a tool over raw JSON arguments.
    ///
    /// The handler receives arguments already validated against `parameters`
    /// (when set) with unknown keys stripped.
    pub fn new<F, Fut, O>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value, ToolContext<A>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
        O: Into<ToolOutput>,
    {
        let handler = Arc::new(handler);
        let execute: ToolFunction<A> = Arc::new(move |args, ctx| {
            let handler = Arc::clone(&handler);
            Box::pin(async move { handler(args, ctx).await.map(Into::into) })
        });
        Self {
            name: name.into(),
            description: None,
            parameters: None,
            timeout: None,
            annotations: None,
            can_access: None,
            execute,
        }
    }

    /// Create a tool whose input is a typed struct.
    ///
    /// The parameter contract is derived from `I`'s JSON Schema; arguments
    /// that pass validation are deserialized into `I` before the handler runs.
    pub fn typed<I, O, F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        I: JsonSchema + DeserializeOwned + Send + 'static,
        O: Into<ToolOutput> + Send + 'static,
        F: Fn(I, ToolContext<A>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        Self::new(name, move |args, ctx: ToolContext<A>| {
            let handler = Arc::clone(&handler);
            async move {
                let input: I = serde_json::from_value(args)
                    .with_context(|| format!("Invalid arguments for {}", ctx.tool_name()))?;
                handler(input, ctx).await
            }
        })
        .parameters(Schema::for_type::<I>())
    }
}

impl<A> Tool<A> {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn parameters(mut self, schema: Schema) -> Self {
        self.parameters = Some(schema);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout_ms(self, millis: u64) -> Self {
        self.timeout(Duration::from_millis(millis))
    }

    pub fn annotations(mut self, annotations: ToolAnnotations) -> Self {
        self.annotations = Some(annotations);
        self
    }

    /// Restrict visibility to auth values accepted by `predicate`.
    pub fn can_access<P>(mut self, predicate: P) -> Self
    where
        P: Fn(Option<&A>) -> bool + Send + Sync + 'static,
    {
        self.can_access = Some(Arc::new(predicate));
        self
    }

    /// Tools without a predicate are visible to everyone.
    pub fn is_visible_to(&self, auth: Option<&A>) -> bool {
        self.can_access.as_ref().map_or(true, |p| p(auth))
    }

    /// Entry for `tools/list`.
    pub fn definition(&self) -> Value {
        let input_schema = self
            .parameters
            .as_ref()
            .map(Schema::to_json_schema)
            .unwrap_or_else(|| json!({ "type": "object", "properties": {} }));

        let mut def = json!({
            "name": self.name,
            "inputSchema": input_schema,
        });
        if let Some(description) = &self.description {
            def["description"] = json!(description);
        }
        if let Some(annotations) = &self.annotations {
            def["annotations"] = json!(annotations);
        }
        def
    }
}
