//! Resource, resource template and prompt definitions.
//!
//! Loaders are async closures returning `anyhow::Result`; the session's auth
//! value (if any) is passed by clone.

use {
    crate::{
        completion::CompletionResult,
        content_types::{PromptOutput, ResourceOutput},
    },
    futures_util::future::BoxFuture,
    serde_json::{json, Value},
    std::{collections::HashMap, fmt, future::Future, sync::Arc},
};

pub type ResourceLoader<A> =
    Arc<dyn Fn(Option<A>) -> BoxFuture<'static, anyhow::Result<ResourceOutput>> + Send + Sync>;

pub type TemplateLoader<A> = Arc<
    dyn Fn(HashMap<String, String>, Option<A>) -> BoxFuture<'static, anyhow::Result<ResourceOutput>>
        + Send
        + Sync,
>;

pub type PromptLoader<A> = Arc<
    dyn Fn(HashMap<String, String>, Option<A>) -> BoxFuture<'static, anyhow::Result<PromptOutput>>
        + Send
        + Sync,
>;

/// Async completer over the partially typed value.
pub type Completer =
    Arc<dyn Fn(String) -> BoxFuture<'static, anyhow::Result<CompletionResult>> + Send + Sync>;

fn boxed_completer<F, Fut, R>(complete: F) -> Completer
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    R: Into<CompletionResult>,
{
    let complete = Arc::new(complete);
    Arc::new(move |value| {
        let complete = Arc::clone(&complete);
        Box::pin(async move { complete(value).await.map(Into::into) })
    })
}

/// A named argument of a prompt or resource template.
#[derive(Clone, Default)]
pub struct Argument {
    pub name: String,
    pub description: Option<String>,
    pub required: bool,
    pub enum_values: Option<Vec<String>>,
    pub(crate) complete: Option<Completer>,
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Argument")
            .field("name", &self.name)
            .field("required", &self.required)
            .field("enum_values", &self.enum_values)
            .field("completable", &self.complete.is_some())
            .finish()
    }
}

impl Argument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Offer a fixed set of values; completion fuzzy-matches against them.
    pub fn enumeration<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn complete<F, Fut, R>(mut self, complete: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: Into<CompletionResult>,
    {
        self.complete = Some(boxed_completer(complete));
        self
    }

    fn definition(&self) -> Value {
        let mut def = json!({ "name": self.name, "required": self.required });
        if let Some(description) = &self.description {
            def["description"] = json!(description);
        }
        def
    }
}

pub struct Resource<A> {
    pub uri: String,
    pub name: String,
    pub description: Option<String>,
    pub mime_type: Option<String>,
    pub(crate) load: ResourceLoader<A>,
}

impl<A> Clone for Resource<A> {
    fn clone(&self) -> Self {
        Self {
            uri: self.uri.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            mime_type: self.mime_type.clone(),
            load: Arc::clone(&self.load),
        }
    }
}

impl<A: Send + 'static> Resource<A> {
    pub fn new<F, Fut, O>(uri: impl Into<String>, name: impl Into<String>, load: F) -> Self
    where
        F: Fn(Option<A>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
        O: Into<ResourceOutput>,
    {
        let load = Arc::new(load);
        Self {
            uri: uri.into(),
            name: name.into(),
            description: None,
            mime_type: None,
            load: Arc::new(move |auth| {
                let load = Arc::clone(&load);
                Box::pin(async move { load(auth).await.map(Into::into) })
            }),
        }
    }
}

impl<A> Resource<A> {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn definition(&self) -> Value {
        let mut def = json!({ "uri": self.uri, "name": self.name });
        if let Some(description) = &self.description {
            def["description"] = json!(description);
        }
        if let Some(mime_type) = &self.mime_type {
            def["mimeType"] = json!(mime_type);
        }
        def
    }
}

pub struct ResourceTemplate<A> {
    pub uri_template: String,
    pub name: String,
    pub description: Option<String>,
    pub mime_type: Option<String>,
    pub arguments: Vec<Argument>,
    pub(crate) load: TemplateLoader<A>,
}

impl<A> Clone for ResourceTemplate<A> {
    fn clone(&self) -> Self {
        Self {
            uri_template: self.uri_template.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            mime_type: self.mime_type.clone(),
            arguments: self.arguments.clone(),
            load: Arc::clone(&self.load),
        }
    }
}

impl<A: Send + 'static> ResourceTemplate<A> {
    pub fn new<F, Fut, O>(uri_template: impl Into<String>, name: impl Into<String>, load: F) -> Self
    where
        F: Fn(HashMap<String, String>, Option<A>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
        O: Into<ResourceOutput>,
    {
        let load = Arc::new(load);
        Self {
            uri_template: uri_template.into(),
            name: name.into(),
            description: None,
            mime_type: None,
            arguments: Vec::new(),
            load: Arc::new(move |args, auth| {
                let load = Arc::clone(&load);
                Box::pin(async move { load(args, auth).await.map(Into::into) })
            }),
        }
    }
}

impl<A> ResourceTemplate<A> {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn argument(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn definition(&self) -> Value {
        let mut def = json!({ "uriTemplate": self.uri_template, "name": self.name });
        if let Some(description) = &self.description {
            def["description"] = json!(description);
        }
        if let Some(mime_type) = &self.mime_type {
            def["mimeType"] = json!(mime_type);
        }
        def
    }

    /// Match a concrete URI, returning placeholder values on success.
    pub fn matches(&self, uri: &str) -> Option<HashMap<String, String>> {
        match_template(&self.uri_template, uri)
    }
}

pub struct Prompt<A> {
    pub name: String,
    pub description: Option<String>,
    pub arguments: Vec<Argument>,
    pub(crate) load: PromptLoader<A>,
}

impl<A> Clone for Prompt<A> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            description: self.description.clone(),
            arguments: self.arguments.clone(),
            load: Arc::clone(&self.load),
        }
    }
}

impl<A: Send + 'static> Prompt<A> {
    pub fn new<F, Fut, O>(name: impl Into<String>, load: F) -> Self
    where
        F: Fn(HashMap<String, String>, Option<A>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
        O: Into<PromptOutput>,
    {
        let load = Arc::new(load);
        Self {
            name: name.into(),
            description: None,
            arguments: Vec::new(),
            load: Arc::new(move |args, auth| {
                let load = Arc::clone(&load);
                Box::pin(async move { load(args, auth).await.map(Into::into) })
            }),
        }
    }
}

impl<A> Prompt<A> {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn argument(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn definition(&self) -> Value {
        let mut def = json!({
            "name": self.name,
            "arguments": self.arguments.iter().map(Argument::definition).collect::<Vec<_>>(),
        });
        if let Some(description) = &self.description {
            def["description"] = json!(description);
        }
        def
    }
}

enum Token<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

fn tokenize(segment: &str) -> Option<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut rest = segment;
    while !rest.is_empty() {
        match rest.find('{') {
            Some(0) => {
                let close = rest.find('}')?;
                tokens.push(Token::Placeholder(&rest[1..close]));
                rest = &rest[close + 1..];
            }
            Some(open) => {
                tokens.push(Token::Literal(&rest[..open]));
                rest = &rest[open..];
            }
            None => {
                tokens.push(Token::Literal(rest));
                rest = "";
            }
        }
    }
    Some(tokens)
}

fn match_segment(tokens: &[Token<'_>], input: &str, out: &mut Vec<(String, String)>) -> bool {
    match tokens.split_first() {
        None => input.is_empty(),
        Some((Token::Literal(lit), rest)) => input
            .strip_prefix(lit)
            .is_some_and(|remaining| match_segment(rest, remaining, out)),
        Some((Token::Placeholder(name), rest)) => {
            if input.is_empty() {
                return false;
            }
            // Shortest non-empty capture that lets the remainder match.
            for (end, _) in input.char_indices().skip(1).chain(std::iter::once((input.len(), ' '))) {
                let mark = out.len();
                if match_segment(rest, &input[end..], out) {
                    out.insert(mark, (name.to_string(), input[..end].to_string()));
                    return true;
                }
                out.truncate(mark);
            }
            false
        }
    }
}

/// Match `uri` against a `{placeholder}` template.
///
/// The literal prefix before the first placeholder must match exactly; the
/// remainder is aligned segment by segment on `/`.
pub fn match_template(template: &str, uri: &str) -> Option<HashMap<String, String>> {
    let prefix_end = template.find('{')?;
    let prefix = &template[..prefix_end];
    let uri_rest = uri.strip_prefix(prefix)?;
    let template_rest = &template[prefix_end..];

    let template_segments: Vec<&str> = template_rest.split('/').collect();
    let uri_segments: Vec<&str> = uri_rest.split('/').collect();
    if template_segments.len() != uri_segments.len() {
        return None;
    }

    let mut captured = Vec::new();
    for (t, u) in template_segments.iter().zip(&uri_segments) {
        let tokens = tokenize(t)?;
        if !match_segment(&tokens, u, &mut captured) {
            return None;
        }
    }
    Some(captured.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_match_log_template() {
        assert_eq!(
            match_template("file:///logs/{name}.log", "file:///logs/app.log"),
            Some(args(&[("name", "app")]))
        );
        assert_eq!(match_template("file:///logs/{name}.log", "file:///logs/app.txt"), None);
        assert_eq!(match_template("file:///logs/{name}.log", "file:///other/app.log"), None);
    }

    #[test]
    fn test_match_multiple_segments() {
        assert_eq!(
            match_template("repo://{owner}/{repo}/issues", "repo://acme/widgets/issues"),
            Some(args(&[("owner", "acme"), ("repo", "widgets")]))
        );
        assert_eq!(match_template("repo://{owner}/{repo}/issues", "repo://acme/widgets"), None);
    }

    #[test]
    fn test_placeholder_must_be_non_empty() {
        assert_eq!(match_template("file:///logs/{name}.log", "file:///logs/.log"), None);
    }

    #[test]
    fn test_template_without_placeholders_never_matches() {
        assert_eq!(match_template("file:///static", "file:///static"), None);
    }

    #[test]
    fn test_prompt_definition_lists_arguments() {
        let prompt: Prompt<()> = Prompt::new("greet", |_, _| async { Ok("hi") })
            .description("Say hello")
            .argument(Argument::new("name").required().description("Who"));
        let def = prompt.definition();
        assert_eq!(def["arguments"][0]["name"], "name");
        assert_eq!(def["arguments"][0]["required"], true);
    }
}
