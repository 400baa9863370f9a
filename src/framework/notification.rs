//! Execution context handed to every tool invocation.
//!
//! `ToolContext` carries the session's auth value and identifiers, and lets a
//! tool emit log messages, progress updates and partial content to the client
//! while it runs.

use {
    crate::{
        content_types::McpContent,
        protocol::{notification, LoggingLevel},
    },
    anyhow::{anyhow, Result},
    serde_json::{json, Value},
    std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc, RwLock,
    },
    tokio::sync::mpsc,
    tracing::trace,
};

/// Ergonomic context for tools.
///
/// # Examples
///
/// ```rust,ignore
/// async fn import(input: ImportInput, ctx: ToolContext<Auth>) -> anyhow::Result<String> {
///     ctx.info("Import started")?;
///     for (i, batch) in input.batches.iter().enumerate() {
///         ctx.report_progress(i as f64, Some(input.batches.len() as f64)).await?;
///         ctx.stream_text(format!("imported batch {i}")).await?;
///     }
///     Ok("done".into())
/// }
/// ```
pub struct ToolContext<A> {
    session: Option<A>,
    session_id: String,
    request_id: Value,
    tool_name: String,
    progress_token: Option<Value>,
    sink: mpsc::UnboundedSender<Value>,
    level: Arc<RwLock<LoggingLevel>>,
    emitted: Arc<AtomicBool>,
}

impl<A: Clone> Clone for ToolContext<A> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            session_id: self.session_id.clone(),
            request_id: self.request_id.clone(),
            tool_name: self.tool_name.clone(),
            progress_token: self.progress_token.clone(),
            sink: self.sink.clone(),
            level: Arc::clone(&self.level),
            emitted: Arc::clone(&self.emitted),
        }
    }
}

impl<A> ToolContext<A> {
    pub(crate) fn new(
        session: Option<A>,
        session_id: impl Into<String>,
        request_id: Value,
        tool_name: impl Into<String>,
        progress_token: Option<Value>,
        sink: mpsc::UnboundedSender<Value>,
        level: Arc<RwLock<LoggingLevel>>,
    ) -> Self {
        Self {
            session,
            session_id: session_id.into(),
            request_id,
            tool_name: tool_name.into(),
            progress_token,
            sink,
            level,
            emitted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The auth value resolved when the session was created.
    pub fn session(&self) -> Option<&A> {
        self.session.as_ref()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn request_id(&self) -> &Value {
        &self.request_id
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn progress_token(&self) -> Option<&Value> {
        self.progress_token.as_ref()
    }

    pub(crate) fn emitted_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.emitted)
    }

    fn send(&self, method: &str, params: Value) -> Result<()> {
        self.sink
            .send(notification(method, params))
            .map_err(|_| anyhow!("Notification channel closed"))?;
        self.emitted.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Send a log message if `level` passes the session's logging level.
    pub fn log(&self, level: LoggingLevel, message: impl Into<String>, context: Option<Value>) -> Result<()> {
        let threshold = self.level.read().map(|l| *l).unwrap_or_default();
        if level < threshold {
            trace!(level = %level, threshold = %threshold, "Dropping client log below session level");
            return Ok(());
        }
        let mut data = json!({ "message": message.into() });
        if let Some(context) = context {
            data["context"] = context;
        }
        self.send(
            "notifications/message",
            json!({ "level": level, "logger": self.tool_name, "data": data }),
        )
    }

    pub fn debug(&self, message: impl Into<String>) -> Result<()> {
        self.log(LoggingLevel::Debug, message, None)
    }

    pub fn info(&self, message: impl Into<String>) -> Result<()> {
        self.log(LoggingLevel::Info, message, None)
    }

    pub fn warn(&self, message: impl Into<String>) -> Result<()> {
        self.log(LoggingLevel::Warning, message, None)
    }

    pub fn error(&self, message: impl Into<String>) -> Result<()> {
        self.log(LoggingLevel::Error, message, None)
    }

    /// Report progress. A no-op when the caller did not supply a progress token.
    ///
    /// Yields after sending so the update reaches the transport before the
    /// tool's next step.
    pub async fn report_progress(&self, progress: f64, total: Option<f64>) -> Result<()> {
        let Some(token) = self.progress_token.clone() else {
            trace!(tool = %self.tool_name, "No progress token, skipping progress update");
            return Ok(());
        };
        let mut params = json!({ "progressToken": token, "progress": progress });
        if let Some(total) = total {
            params["total"] = json!(total);
        }
        self.send("notifications/progress", params)?;
        tokio::task::yield_now().await;
        Ok(())
    }

    /// Stream partial content ahead of the final result.
    pub async fn stream_content(&self, content: Vec<McpContent>) -> Result<()> {
        self.send(
            "notifications/tool/streamContent",
            json!({ "toolName": self.tool_name, "content": content }),
        )?;
        tokio::task::yield_now().await;
        Ok(())
    }

    pub async fn stream_text(&self, text: impl Into<String>) -> Result<()> {
        self.stream_content(vec![McpContent::text(text)]).await
    }
}
