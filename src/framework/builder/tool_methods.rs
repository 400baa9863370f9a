//! Tool registration methods for McpServerBuilder.

use {
    crate::{
        content_types::ToolOutput,
        framework::{builder::McpServerBuilder, notification::ToolContext, tool::Tool},
    },
    anyhow::Result,
    schemars::JsonSchema,
    serde::de::DeserializeOwned,
    std::future::Future,
};

impl<A: Clone + Send + Sync + 'static> McpServerBuilder<A> {
    /// Register a tool whose input is a typed struct.
    ///
    /// The parameter contract is derived from `I`'s JSON Schema, so clients
    /// see it in `tools/list` and bad arguments are rejected before the
    /// handler runs. The handler may return anything convertible into a tool
    /// output: a string, a content item, a full result or nothing.
    ///
    /// # Examples
    /// ```rust,ignore
    /// #[derive(JsonSchema, Deserialize)]
    /// struct SearchInput {
    ///     query: String,
    ///     limit: Option<u32>,
    /// }
    ///
    /// let builder = McpServerBuilder::<()>::new("search-server", "1.0.0")
    ///     .with_tool("search", "Search the knowledge base", |input: SearchInput, ctx| async move {
    ///         ctx.info(format!("Searching for: {}", input.query))?;
    ///         Ok(format!("no results for {}", input.query))
    ///     });
    /// ```
    pub fn with_tool<I, O, F, Fut>(mut self, name: &str, description: &str, handler: F) -> Self
    where
        I: JsonSchema + DeserializeOwned + Send + 'static,
        O: Into<ToolOutput> + Send + 'static,
        F: Fn(I, ToolContext<A>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
    {
        self.registry.register_typed_tool(name, description, handler);
        self
    }

    /// Register a fully configured tool: custom schema, timeout, access
    /// predicate or annotations.
    pub fn with_raw_tool(mut self, tool: Tool<A>) -> Self {
        self.registry.register_tool(tool);
        self
    }
}
