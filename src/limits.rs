//! Resource limits for MCP servers.
//!
//! Session and message limits are enforced by the transports; registry
//! limits are checked once when the server is built.

use {
    serde::{Deserialize, Serialize},
    thiserror::Error,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Maximum number of tracked HTTP sessions
    pub max_sessions: Option<usize>,

    /// Maximum inbound message size in bytes
    pub max_message_size: usize,

    pub max_tools: Option<usize>,

    /// Covers both fixed resources and templates
    pub max_resources: Option<usize>,

    pub max_prompts: Option<usize>,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_sessions: Some(10_000),
            max_message_size: 2 * 1024 * 1024, // 2MB
            max_tools: Some(1_000),
            max_resources: Some(10_000),
            max_prompts: Some(1_000),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LimitError {
    #[error("{kind} limit exceeded: {count} registered, at most {max} allowed")]
    TooMany {
        kind: &'static str,
        count: usize,
        max: usize,
    },
}

impl ResourceLimits {
    /// No limits at all (use with caution)
    pub fn unlimited() -> Self {
        Self {
            max_sessions: None,
            max_message_size: usize::MAX,
            max_tools: None,
            max_resources: None,
            max_prompts: None,
        }
    }

    /// Tight limits for tests or restricted environments
    pub fn strict() -> Self {
        Self {
            max_sessions: Some(100),
            max_message_size: 256 * 1024, // 256KB
            max_tools: Some(50),
            max_resources: Some(100),
            max_prompts: Some(50),
        }
    }

    pub fn allows_new_session(&self, current: usize) -> bool {
        self.max_sessions.map_or(true, |max| current < max)
    }

    pub fn allows_message(&self, size: usize) -> bool {
        size <= self.max_message_size
    }

    pub fn check_registry(&self, tools: usize, resources: usize, prompts: usize) -> Result<(), LimitError> {
        check("tool", tools, self.max_tools)?;
        check("resource", resources, self.max_resources)?;
        check("prompt", prompts, self.max_prompts)
    }
}

fn check(kind: &'static str, count: usize, max: Option<usize>) -> Result<(), LimitError> {
    match max {
        Some(max) if count > max => Err(LimitError::TooMany { kind, count, max }),
        _ => Ok(()),
    }
}
