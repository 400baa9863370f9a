//! Resource, template and prompt registration methods for Registry.

use {
    crate::framework::{
        providers::{Prompt, Resource, ResourceTemplate},
        registry::Registry,
    },
    tracing::warn,
};

impl<A> Registry<A> {
    /// Register a resource addressed by an exact URI.
    pub fn register_resource(&mut self, resource: Resource<A>) {
        let uri = resource.uri.clone();
        if super::upsert(&mut self.resources, resource, |r| r.uri == uri) {
            warn!(uri = %uri, "Resource registered twice, replacing earlier definition");
        }
    }

    /// Register a parameterised family of resources.
    ///
    /// Templates are consulted only after exact URI lookup fails, in
    /// registration order.
    pub fn register_resource_template(&mut self, template: ResourceTemplate<A>) {
        let pattern = template.uri_template.clone();
        if super::upsert(&mut self.templates, template, |t| t.uri_template == pattern) {
            warn!(uri_template = %pattern, "Resource template registered twice, replacing earlier definition");
        }
    }

    pub fn register_prompt(&mut self, prompt: Prompt<A>) {
        let name = prompt.name.clone();
        if super::upsert(&mut self.prompts, prompt, |p| p.name == name) {
            warn!(prompt = %name, "Prompt registered twice, replacing earlier definition");
        }
    }
}
