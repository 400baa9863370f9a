//! Server builder for creating MCP servers with minimal boilerplate.
//!
//! `McpServerBuilder` collects tools, resources, templates and prompts into a
//! registry, together with the server options and authentication hook, and
//! produces an `McpServer`.

mod provider_methods;
mod tool_methods;

#[cfg(test)]
mod tests;

use {
    super::{handler::InvalidParamsFormatter, registry::Registry},
    crate::{
        config::{KeepAliveConfig, RootsConfig, ServerOptions},
        error::AuthRejection,
        health::HealthConfig,
        limits::ResourceLimits,
        oauth::OAuthConfig,
        schema::SchemaIssue,
        server::{Authenticator, FnAuthenticator, HttpRequest, McpServer},
    },
    anyhow::Result,
    std::{future::Future, sync::Arc, time::Duration},
};

/// Fluent builder for an `McpServer`.
///
/// `A` is the auth value produced by the authentication hook and handed to
/// every tool, resource and prompt of the session it was resolved for.
///
/// # Examples
/// ```rust,ignore
/// #[derive(Deserialize, JsonSchema)]
/// struct AddInput {
///     a: f64,
///     b: f64,
/// }
///
/// let server: McpServer<()> = McpServerBuilder::new("calculator", "1.0.0")
///     .with_instructions("Arithmetic helpers")
///     .with_tool("add", "Add two numbers", |input: AddInput, _ctx| async move {
///         Ok(format!("{}", input.a + input.b))
///     })
///     .build()?;
///
/// server.start(StartOptions::http(3000)).await?;
/// server.closed().await;
/// ```
pub struct McpServerBuilder<A> {
    pub(super) options: ServerOptions,
    pub(super) registry: Registry<A>,
    authenticator: Option<Arc<dyn Authenticator<A>>>,
}

impl<A: Clone + Send + Sync + 'static> McpServerBuilder<A> {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            options: ServerOptions::new(name, version),
            registry: Registry::new(),
            authenticator: None,
        }
    }

    /// Text returned to clients from `initialize`.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.options.instructions = Some(instructions.into());
        self
    }

    /// Authenticate each connection with an async closure.
    ///
    /// HTTP transports reject the connection with the rejection's status;
    /// stdio logs the rejection and carries on unauthenticated.
    pub fn with_authenticate<F, Fut>(self, authenticate: F) -> Self
    where
        F: Fn(Option<HttpRequest>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<A, AuthRejection>> + Send + 'static,
    {
        self.with_authenticator(FnAuthenticator(authenticate))
    }

    pub fn with_authenticator(mut self, authenticator: impl Authenticator<A> + 'static) -> Self {
        self.authenticator = Some(Arc::new(authenticator));
        self
    }

    /// Configure resource limits for the server.
    ///
    /// # Examples
    /// ```rust,ignore
    /// let server = McpServerBuilder::<()>::new("server", "1.0.0")
    ///     .with_limits(ResourceLimits {
    ///         max_sessions: Some(1000),
    ///         max_message_size: 1024 * 1024, // 1MB
    ///         ..Default::default()
    ///     })
    ///     .build()?;
    /// ```
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.options.limits = limits;
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: KeepAliveConfig) -> Self {
        self.options.keep_alive = keep_alive;
        self
    }

    pub fn with_roots(mut self, roots: RootsConfig) -> Self {
        self.options.roots = roots;
        self
    }

    pub fn with_health(mut self, health: HealthConfig) -> Self {
        self.options.health = health;
        self
    }

    pub fn with_oauth(mut self, oauth: OAuthConfig) -> Self {
        self.options.oauth = oauth;
        self
    }

    /// Bound on server-initiated requests such as roots, ping and sampling.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.options.request_timeout = timeout;
        self
    }

    /// Replace the message of invalid-params errors.
    pub fn with_invalid_params_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&str, &[SchemaIssue]) -> String + Send + Sync + 'static,
    {
        let formatter: InvalidParamsFormatter = Arc::new(formatter);
        self.options.invalid_params_formatter = Some(formatter);
        self
    }

    /// Check registry sizes against the configured limits and build.
    pub fn build(self) -> Result<McpServer<A>> {
        self.options.limits.check_registry(
            self.registry.tools().len(),
            self.registry.resources().len() + self.registry.resource_templates().len(),
            self.registry.prompts().len(),
        )?;
        Ok(McpServer::new(self.options, self.registry, self.authenticator))
    }
}
