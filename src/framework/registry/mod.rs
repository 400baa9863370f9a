//! Capability registry.
//!
//! Holds every tool, resource, resource template and prompt a server offers.
//! The registry is shared by reference across all sessions of one server and
//! is treated as read-only once the server starts.

mod provider_registration;
mod tool_registration;

use super::{
    providers::{Prompt, Resource, ResourceTemplate},
    tool::Tool,
};

/// Registry for tools, resources, templates and prompts.
///
/// Names (and URIs / URI templates) are unique within their own collection;
/// registering an existing key replaces the earlier entry. Listing order is
/// registration order.
pub struct Registry<A> {
    pub(crate) tools: Vec<Tool<A>>,
    pub(crate) resources: Vec<Resource<A>>,
    pub(crate) templates: Vec<ResourceTemplate<A>>,
    pub(crate) prompts: Vec<Prompt<A>>,
}

impl<A> Default for Registry<A> {
    fn default() -> Self {
        Self {
            tools: Vec::new(),
            resources: Vec::new(),
            templates: Vec::new(),
            prompts: Vec::new(),
        }
    }
}

impl<A> Registry<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tools(&self) -> &[Tool<A>] {
        &self.tools
    }

    pub fn resources(&self) -> &[Resource<A>] {
        &self.resources
    }

    pub fn resource_templates(&self) -> &[ResourceTemplate<A>] {
        &self.templates
    }

    pub fn prompts(&self) -> &[Prompt<A>] {
        &self.prompts
    }

    pub fn tool(&self, name: &str) -> Option<&Tool<A>> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn resource(&self, uri: &str) -> Option<&Resource<A>> {
        self.resources.iter().find(|r| r.uri == uri)
    }

    pub fn prompt(&self, name: &str) -> Option<&Prompt<A>> {
        self.prompts.iter().find(|p| p.name == name)
    }

    pub fn resource_template(&self, uri_template: &str) -> Option<&ResourceTemplate<A>> {
        self.templates.iter().find(|t| t.uri_template == uri_template)
    }
}

/// Insert or replace by key, preserving the position of a replaced entry.
fn upsert<T>(items: &mut Vec<T>, item: T, same: impl Fn(&T) -> bool) -> bool {
    match items.iter().position(same) {
        Some(index) => {
            items[index] = item;
            true
        }
        None => {
            items.push(item);
            false
        }
    }
}
