//! Tool registration methods for Registry.

use {
    crate::{
        content_types::ToolOutput,
        framework::{notification::ToolContext, registry::Registry, tool::Tool},
    },
    anyhow::Result,
    schemars::JsonSchema,
    serde::de::DeserializeOwned,
    std::future::Future,
    tracing::warn,
};

impl<A: Send + Sync + 'static> Registry<A> {
    /// Register a fully configured tool.
    pub fn register_tool(&mut self, tool: Tool<A>) {
        let name = tool.name.clone();
        if super::upsert(&mut self.tools, tool, |t| t.name == name) {
            warn!(tool = %name, "Tool registered twice, replacing earlier definition");
        }
    }

    /// Register a tool whose input is a typed struct.
    ///
    /// # Examples
    /// ```rust,ignore
    /// #[derive(JsonSchema, Deserialize)]
    /// struct SearchInput {
    ///     query: String,
    ///     limit: Option<u32>,
    /// }
    ///
    /// registry.register_typed_tool("search", "Search the knowledge base", |input: SearchInput, ctx| async move {
    ///     ctx.info(format!("Searching for: {}", input.query))?;
    ///     Ok(format!("no results for {}", input.query))
    /// });
    /// ```
    pub fn register_typed_tool<I, O, F, Fut>(&mut self, name: &str, description: &str, handler: F)
    where
        I: JsonSchema + DeserializeOwned + Send + 'static,
        O: Into<ToolOutput> + Send + 'static,
        F: Fn(I, ToolContext<A>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
    {
        self.register_tool(Tool::typed(name, handler).description(description));
    }
}
