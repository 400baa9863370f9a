//! Resource and prompt registration methods for McpServerBuilder.

use crate::framework::{
    builder::McpServerBuilder,
    providers::{Prompt, Resource, ResourceTemplate},
};

impl<A: Clone + Send + Sync + 'static> McpServerBuilder<A> {
    /// Expose data at a fixed URI.
    ///
    /// # Examples
    /// ```rust,ignore
    /// let builder = McpServerBuilder::<()>::new("docs", "1.0.0").with_resource(
    ///     Resource::new("file:///readme.md", "Readme", |_auth| async {
    ///         Ok(tokio::fs::read_to_string("README.md").await?)
    ///     })
    ///     .mime_type("text/markdown"),
    /// );
    /// ```
    pub fn with_resource(mut self, resource: Resource<A>) -> Self {
        self.registry.register_resource(resource);
        self
    }

    /// Expose a family of resources addressed by a URI pattern such as
    /// `file:///logs/{name}.log`.
    pub fn with_resource_template(mut self, template: ResourceTemplate<A>) -> Self {
        self.registry.register_resource_template(template);
        self
    }

    pub fn with_prompt(mut self, prompt: Prompt<A>) -> Self {
        self.registry.register_prompt(prompt);
        self
    }
}
