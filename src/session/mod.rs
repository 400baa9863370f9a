//! Per-connection session.
//!
//! A `Session` owns everything one client connection needs: its auth value,
//! the tool set visible to that auth value, negotiated client capabilities,
//! roots, logging level and the outbound channel used for server-initiated
//! requests. The connection state only moves forward:
//! `Connecting -> Ready | Error`, and any state can be closed.

pub mod peer;

pub use peer::{Peer, PeerError};

use {
    crate::{
        config::ServerOptions,
        error::{McpError, McpResult},
        events::{EventBus, SessionEvent},
        framework::{handler::CapabilityHandler, notification::ToolContext, registry::Registry},
        logging,
        protocol::{
            message::parse_params, CallToolParams, ClientCapabilities, CompleteParams,
            CreateMessageRequest, CreateMessageResult, GetPromptParams, Implementation,
            IncomingMessage, InitializeParams, LoggingLevel, McpProtocol, ReadResourceParams, Root,
            SetLevelParams,
        },
    },
    once_cell::sync::OnceCell,
    serde_json::{json, Value},
    std::{
        fmt,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc, Mutex, RwLock, Weak,
        },
        time::{Duration, Instant},
    },
    thiserror::Error,
    tokio::{
        sync::{mpsc, watch},
        task::JoinHandle,
    },
    tracing::{debug, error, info, trace, warn, Instrument},
};

const CAPABILITY_POLL_ATTEMPTS: u32 = 10;
const CAPABILITY_POLL_INTERVAL: Duration = Duration::from_millis(100);
const READY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Stdio,
    Http,
    HttpStateless,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Http => "http",
            Self::HttpStateless => "http-stateless",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Ready,
    Error(String),
    Closed,
}

impl ConnectionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error(_) | Self::Closed)
    }

    fn can_become(&self, next: &ConnectionState) -> bool {
        match (self, next) {
            (Self::Connecting, Self::Ready | Self::Error(_) | Self::Closed) => true,
            (Self::Ready, Self::Closed) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SessionError {
    #[error("Session not ready after {0:?}")]
    ReadyTimeout(Duration),

    #[error("Session failed: {0}")]
    Failed(String),

    #[error("Session closed")]
    Closed,
}

pub struct Session<A> {
    inner: Arc<SessionInner<A>>,
}

struct SessionInner<A> {
    id: String,
    kind: TransportKind,
    handler: CapabilityHandler<A>,
    options: Arc<ServerOptions>,
    protocol: McpProtocol,
    state: watch::Sender<ConnectionState>,
    client_capabilities: OnceCell<ClientCapabilities>,
    client_info: OnceCell<Implementation>,
    protocol_version: OnceCell<&'static str>,
    roots: RwLock<Vec<Root>>,
    level: Arc<RwLock<LoggingLevel>>,
    peer: Peer,
    keep_alive: Mutex<Option<JoinHandle<()>>>,
    connect_started: AtomicBool,
    events: EventBus<SessionEvent>,
}

impl<A> Clone for Session<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> fmt::Debug for Session<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}

impl<A> Session<A> {
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn kind(&self) -> TransportKind {
        self.inner.kind
    }

    pub fn auth(&self) -> Option<&A> {
        self.inner.handler.auth()
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ConnectionState::Ready
    }

    pub fn client_capabilities(&self) -> Option<&ClientCapabilities> {
        self.inner.client_capabilities.get()
    }

    pub fn client_info(&self) -> Option<&Implementation> {
        self.inner.client_info.get()
    }

    pub fn protocol_version(&self) -> Option<&'static str> {
        self.inner.protocol_version.get().copied()
    }

    pub fn roots(&self) -> Vec<Root> {
        self.inner.roots.read().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn logging_level(&self) -> LoggingLevel {
        self.inner.level.read().map(|l| *l).unwrap_or_default()
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Move to `next` if allowed, emitting the matching event.
    fn transition(&self, next: ConnectionState) -> bool {
        let changed = self.inner.state.send_if_modified(|current| {
            if current.can_become(&next) {
                *current = next.clone();
                true
            } else {
                false
            }
        });
        if changed {
            debug!(session_id = %self.inner.id, state = ?next, "🔄 Session state changed");
            self.inner.events.emit(match next {
                ConnectionState::Ready => SessionEvent::Ready,
                ConnectionState::Error(reason) => SessionEvent::Error(reason),
                ConnectionState::Closed => SessionEvent::Closed,
                ConnectionState::Connecting => return changed,
            });
        }
        changed
    }

    pub(crate) fn mark_ready(&self) {
        self.transition(ConnectionState::Ready);
    }

    /// Record a transport failure. Ignored once the session is terminal.
    pub(crate) fn fail(&self, reason: impl Into<String>) {
        let reason = reason.into();
        if self.transition(ConnectionState::Error(reason.clone())) {
            error!(session_id = %self.inner.id, error = %reason, "❌ Session failed");
        }
    }

    /// Block until the handshake has finished.
    pub async fn wait_until_ready(&self) -> Result<(), SessionError> {
        let mut rx = self.inner.state.subscribe();
        let wait = async {
            loop {
                let state = rx.borrow_and_update().clone();
                match state {
                    ConnectionState::Ready => return Ok(()),
                    ConnectionState::Error(reason) => return Err(SessionError::Failed(reason)),
                    ConnectionState::Closed => return Err(SessionError::Closed),
                    ConnectionState::Connecting => {}
                }
                if rx.changed().await.is_err() {
                    return Err(SessionError::Closed);
                }
            }
        };
        tokio::time::timeout(READY_TIMEOUT, wait)
            .await
            .map_err(|_| SessionError::ReadyTimeout(READY_TIMEOUT))?
    }

    /// Stop keep-alive, fail pending outbound requests and mark closed.
    /// Safe to call more than once.
    pub fn close(&self) {
        if let Ok(mut slot) = self.inner.keep_alive.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
        self.inner.peer.close();
        if self.transition(ConnectionState::Closed) {
            logging::log_session_disconnected(&self.inner.id);
        }
    }

    /// Open the server-to-client stream. Returns `None` while another
    /// stream is still attached.
    pub fn attach_stream(&self) -> Option<mpsc::UnboundedReceiver<Value>> {
        if self.inner.peer.is_attached() {
            return None;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.peer.bind(tx);
        debug!(session_id = %self.inner.id, "📡 Server-to-client stream attached");
        Some(rx)
    }

    /// Sender for the attached server-to-client stream, if any.
    pub fn stream_sender(&self) -> Option<mpsc::UnboundedSender<Value>> {
        self.inner.peer.sender().filter(|tx| !tx.is_closed())
    }

    pub fn peer(&self) -> &Peer {
        &self.inner.peer
    }

    /// Forward a message to the attached stream, dropping it when no
    /// stream is open.
    pub fn forward_to_stream(&self, message: Value) {
        match self.stream_sender() {
            Some(tx) => {
                let _ = tx.send(message);
            }
            None => trace!(session_id = %self.inner.id, "No stream attached, dropping message"),
        }
    }
}

impl<A: Clone + Send + Sync + 'static> Session<A> {
    pub fn new(
        kind: TransportKind,
        auth: Option<A>,
        registry: Arc<Registry<A>>,
        options: Arc<ServerOptions>,
    ) -> Self {
        let id = logging::McpConnectionId::new().to_string();
        let handler = CapabilityHandler::new(registry, auth, options.invalid_params_formatter.clone());
        let (state, _) = watch::channel(ConnectionState::Connecting);
        let protocol = McpProtocol::new(options.name.clone(), options.version.clone());
        let peer = Peer::new(options.request_timeout);
        logging::log_session_connected(&id, kind.as_str());
        Self {
            inner: Arc::new(SessionInner {
                id,
                kind,
                handler,
                protocol,
                state,
                client_capabilities: OnceCell::new(),
                client_info: OnceCell::new(),
                protocol_version: OnceCell::new(),
                roots: RwLock::new(Vec::new()),
                level: Arc::new(RwLock::new(LoggingLevel::default())),
                peer,
                keep_alive: Mutex::new(None),
                connect_started: AtomicBool::new(false),
                events: EventBus::new(),
                options,
            }),
        }
    }

    pub fn handler(&self) -> &CapabilityHandler<A> {
        &self.inner.handler
    }

    /// Run the handshake once `initialize` has been answered.
    pub(crate) fn spawn_connect(&self) {
        if self.inner.client_capabilities.get().is_none()
            || self.inner.kind == TransportKind::HttpStateless
            || self.inner.connect_started.load(Ordering::SeqCst)
        {
            return;
        }
        let session = self.clone();
        tokio::spawn(async move { session.connect().await });
    }

    /// Handshake: wait for client capabilities, fetch roots, start
    /// keep-alive, then become ready. Only the first call does anything.
    pub async fn connect(&self) {
        if self.inner.connect_started.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut capabilities = None;
        for _ in 0..CAPABILITY_POLL_ATTEMPTS {
            if let Some(caps) = self.inner.client_capabilities.get() {
                capabilities = Some(caps.clone());
                break;
            }
            tokio::time::sleep(CAPABILITY_POLL_INTERVAL).await;
        }

        match capabilities {
            Some(caps) => {
                if self.inner.options.roots.enabled && caps.supports_roots_list_changed() {
                    self.refresh_roots(false).await;
                }
                if self.keep_alive_enabled() {
                    self.start_keep_alive();
                }
            }
            None => warn!(
                session_id = %self.inner.id,
                "⚠️ Client capabilities not received after {} attempts, continuing without them",
                CAPABILITY_POLL_ATTEMPTS
            ),
        }

        if self.transition(ConnectionState::Ready) {
            info!(session_id = %self.inner.id, event = "session_ready", "✅ Session ready");
        }
    }

    fn keep_alive_enabled(&self) -> bool {
        self.inner
            .options
            .keep_alive
            .enabled
            .unwrap_or(self.inner.kind != TransportKind::Stdio)
    }

    fn start_keep_alive(&self) {
        let weak: Weak<SessionInner<A>> = Arc::downgrade(&self.inner);
        let interval = self.inner.options.keep_alive.interval;
        let level = self.inner.options.keep_alive.log_level;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                if inner.state.borrow().is_terminal() {
                    break;
                }
                match inner.peer.request("ping", None).await {
                    Ok(_) => trace!(session_id = %inner.id, "🏓 Keep-alive ping answered"),
                    Err(e) => logging::log_at(level, &inner.id, &format!("Keep-alive ping failed: {e}")),
                }
            }
        });
        if let Ok(mut slot) = self.inner.keep_alive.lock() {
            if let Some(previous) = slot.replace(handle) {
                previous.abort();
            }
        }
    }

    /// Re-fetch the client's roots and replace the stored list.
    async fn refresh_roots(&self, emit: bool) {
        let fetched = self
            .inner
            .peer
            .request("roots/list", None)
            .await
            .and_then(|result| {
                let roots = result.get("roots").cloned().unwrap_or_else(|| json!([]));
                serde_json::from_value::<Vec<Root>>(roots).map_err(|e| PeerError::Decode(e.to_string()))
            });

        match fetched {
            Ok(roots) => {
                debug!(session_id = %self.inner.id, count = roots.len(), "📁 Roots updated");
                if let Ok(mut slot) = self.inner.roots.write() {
                    *slot = roots.clone();
                }
                if emit {
                    self.inner.events.emit(SessionEvent::RootsChanged(roots));
                }
            }
            Err(e) if e.is_method_not_found() => {
                debug!(session_id = %self.inner.id, "Client does not support roots/list");
            }
            Err(e) => {
                error!(session_id = %self.inner.id, error = %e, "❌ Failed to fetch roots");
            }
        }
    }

    /// Ask the client to sample from its model.
    pub async fn request_sampling(&self, request: CreateMessageRequest) -> Result<CreateMessageResult, PeerError> {
        let params = serde_json::to_value(&request).map_err(|e| PeerError::Decode(e.to_string()))?;
        let result = self
            .inner
            .peer
            .request("sampling/createMessage", Some(params))
            .await?;
        serde_json::from_value(result).map_err(|e| PeerError::Decode(e.to_string()))
    }

    /// Handle a single message or a batch. Returns the reply, if any.
    pub async fn handle_payload(&self, payload: Value, sink: mpsc::UnboundedSender<Value>) -> Option<Value> {
        match payload {
            Value::Array(messages) => {
                if messages.is_empty() {
                    return Some(McpError::InvalidRequest("Empty batch".into()).to_json_rpc_error(None));
                }
                let mut replies = Vec::new();
                for message in messages {
                    if let Some(reply) = self.handle_message(message, sink.clone()).await {
                        replies.push(reply);
                    }
                }
                (!replies.is_empty()).then(|| Value::Array(replies))
            }
            message => self.handle_message(message, sink).await,
        }
    }

    /// Handle one JSON-RPC message. Notifications emitted while a request
    /// runs go to `sink`.
    pub async fn handle_message(&self, message: Value, sink: mpsc::UnboundedSender<Value>) -> Option<Value> {
        let parsed = match IncomingMessage::parse(&message) {
            Ok(parsed) => parsed,
            Err(e) => {
                logging::log_parse_error(&e.to_string(), &message.to_string());
                return Some(e.to_json_rpc_error(message.get("id").cloned()));
            }
        };

        match parsed {
            IncomingMessage::Request { id, method, params } => {
                let span = logging::request_span(&method, &self.inner.id);
                Some(self.handle_request(id, method, params, sink).instrument(span).await)
            }
            IncomingMessage::Notification { method, params } => {
                self.handle_notification(&method, params);
                None
            }
            IncomingMessage::Response { id, result } => {
                self.inner.peer.resolve(&id, Ok(result));
                None
            }
            IncomingMessage::ErrorResponse { id, code, message } => {
                self.inner.peer.resolve(&id, Err(PeerError::Rpc { code, message }));
                None
            }
        }
    }

    async fn handle_request(
        &self,
        id: Value,
        method: String,
        params: Option<Value>,
        sink: mpsc::UnboundedSender<Value>,
    ) -> Value {
        let started = Instant::now();
        match self.dispatch(&id, &method, params, sink).await {
            Ok(result) => {
                trace!(method = %method, duration_ms = started.elapsed().as_millis(), "Request handled");
                self.inner.protocol.create_success_response(id, result)
            }
            Err(e) => {
                logging::log_handler_error(&method, &e.to_string(), started.elapsed());
                e.to_json_rpc_error(Some(id))
            }
        }
    }

    async fn dispatch(
        &self,
        id: &Value,
        method: &str,
        params: Option<Value>,
        sink: mpsc::UnboundedSender<Value>,
    ) -> McpResult<Value> {
        let handler = &self.inner.handler;

        if !matches!(method, "initialize" | "ping")
            && self.inner.kind != TransportKind::HttpStateless
            && self.inner.client_capabilities.get().is_none()
        {
            return Err(McpError::NotInitialized);
        }

        match method {
            "initialize" => self.initialize(params),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(handler.list_tools()),
            "tools/call" => {
                let call: CallToolParams = parse_params(method, params)?;
                let ctx = ToolContext::new(
                    handler.auth().cloned(),
                    self.inner.id.clone(),
                    id.clone(),
                    call.name.clone(),
                    call.progress_token(),
                    sink,
                    Arc::clone(&self.inner.level),
                );
                let result = handler.call_tool(&call.name, call.arguments, ctx).await?;
                Ok(serde_json::to_value(result)?)
            }
            "resources/list" => Ok(handler.list_resources()),
            "resources/templates/list" => Ok(handler.list_resource_templates()),
            "resources/read" => {
                let read: ReadResourceParams = parse_params(method, params)?;
                let contents = handler.read_resource(&read.uri).await?;
                Ok(json!({ "contents": contents }))
            }
            "prompts/list" => Ok(handler.list_prompts()),
            "prompts/get" => {
                let get: GetPromptParams = parse_params(method, params)?;
                Ok(serde_json::to_value(handler.get_prompt(get).await?)?)
            }
            "logging/setLevel" => {
                let set: SetLevelParams = parse_params(method, params)?;
                if let Ok(mut level) = self.inner.level.write() {
                    *level = set.level;
                }
                debug!(session_id = %self.inner.id, level = %set.level, "📝 Logging level set");
                Ok(json!({}))
            }
            "completion/complete" => {
                let complete: CompleteParams = parse_params(method, params)?;
                let completion = handler.complete(complete).await?;
                Ok(json!({ "completion": completion }))
            }
            other => {
                logging::log_unknown_method(other);
                Err(McpError::UnknownMethod(other.to_string()))
            }
        }
    }

    fn initialize(&self, params: Option<Value>) -> McpResult<Value> {
        let init: InitializeParams = parse_params("initialize", params)?;
        let version = self
            .inner
            .protocol
            .negotiate_version(init.protocol_version.as_deref());

        if self.inner.client_capabilities.set(init.capabilities).is_err() {
            warn!(session_id = %self.inner.id, "Client sent initialize twice, keeping first capabilities");
        }
        if let Some(info) = init.client_info {
            debug!(session_id = %self.inner.id, client = %info.name, client_version = %info.version, "🤝 Client connected");
            let _ = self.inner.client_info.set(info);
        }
        let _ = self.inner.protocol_version.set(version);

        Ok(self.inner.protocol.create_initialize_response(
            version,
            self.server_capabilities(),
            self.inner.options.instructions.as_deref(),
        ))
    }

    fn server_capabilities(&self) -> Value {
        let registry = self.inner.handler.registry();
        let mut caps = json!({
            "tools": {},
            "logging": {},
            "completions": {},
        });
        if !registry.resources().is_empty() || !registry.resource_templates().is_empty() {
            caps["resources"] = json!({});
        }
        if !registry.prompts().is_empty() {
            caps["prompts"] = json!({});
        }
        caps
    }

    fn handle_notification(&self, method: &str, params: Option<Value>) {
        match method {
            "notifications/initialized" => {
                debug!(session_id = %self.inner.id, "Client finished initialization");
            }
            "notifications/roots/list_changed" => {
                if !self.inner.options.roots.enabled {
                    return;
                }
                let session = self.clone();
                tokio::spawn(async move { session.refresh_roots(true).await });
            }
            "notifications/cancelled" => {
                let params = params.unwrap_or_default();
                info!(
                    session_id = %self.inner.id,
                    request_id = %params.get("requestId").cloned().unwrap_or_default(),
                    reason = params.get("reason").and_then(|v| v.as_str()).unwrap_or(""),
                    "🛑 Client cancelled request, letting it run to completion"
                );
            }
            other => debug!(session_id = %self.inner.id, method = %other, "Ignoring notification"),
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::framework::tool::Tool,
        tokio::sync::mpsc::UnboundedReceiver,
    };

    fn session(kind: TransportKind) -> Session<()> {
        session_with(kind, ServerOptions::new("test", "0.1.0"))
    }

    fn session_with(kind: TransportKind, options: ServerOptions) -> Session<()> {
        let mut registry = Registry::new();
        registry.register_tool(Tool::new("echo", |args: Value, _| async move {
            Ok(args["text"].as_str().unwrap_or_default().to_string())
        }));
        Session::new(kind, None, Arc::new(registry), Arc::new(options))
    }

    fn sink() -> (mpsc::UnboundedSender<Value>, UnboundedReceiver<Value>) {
        mpsc::unbounded_channel()
    }

    async fn initialize(session: &Session<()>, capabilities: Value) -> Value {
        let (tx, _rx) = sink();
        session
            .handle_message(
                json!({
                    "jsonrpc": "2.0",
                    "id": 0,
                    "method": "initialize",
                    "params": {
                        "protocolVersion": "2025-03-26",
                        "capabilities": capabilities,
                        "clientInfo": {"name": "unit", "version": "1.0"}
                    }
                }),
                tx,
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_requests_before_initialize_are_rejected() {
        let session = session(TransportKind::Stdio);
        let (tx, _rx) = sink();
        let reply = session
            .handle_message(json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}), tx)
            .await
            .unwrap();
        assert_eq!(reply["error"]["code"], -32002);
    }

    #[tokio::test]
    async fn test_initialize_and_ready() {
        let session = session(TransportKind::Stdio);
        assert!(session.auth().is_none());
        let reply = initialize(&session, json!({})).await;
        assert_eq!(reply["result"]["protocolVersion"], "2025-03-26");
        assert_eq!(reply["result"]["serverInfo"]["name"], "test");
        assert!(reply["result"]["capabilities"].get("prompts").is_none());

        let mut events = session.subscribe();
        session.connect().await;
        assert!(session.is_ready());
        assert_eq!(events.recv().await, Some(SessionEvent::Ready));
        tokio_test::assert_ok!(session.wait_until_ready().await);
    }

    #[tokio::test]
    async fn test_state_only_moves_forward() {
        let session = session(TransportKind::Stdio);
        session.fail("boom");
        session.mark_ready();
        assert_eq!(session.state(), ConnectionState::Error("boom".into()));
        assert_eq!(
            session.wait_until_ready().await,
            Err(SessionError::Failed("boom".into()))
        );

        let other = self::session(TransportKind::Stdio);
        other.close();
        other.close();
        assert_eq!(other.state(), ConnectionState::Closed);
        assert_eq!(other.wait_until_ready().await, Err(SessionError::Closed));
    }

    #[tokio::test]
    async fn test_roots_fetched_during_connect() {
        let session = session(TransportKind::Stdio);
        let mut stream = session.attach_stream().unwrap();
        initialize(&session, json!({"roots": {"listChanged": true}})).await;

        let client = {
            let session = session.clone();
            tokio::spawn(async move {
                let request = stream.recv().await.unwrap();
                assert_eq!(request["method"], "roots/list");
                let (tx, _rx) = sink();
                session
                    .handle_message(
                        json!({
                            "jsonrpc": "2.0",
                            "id": request["id"],
                            "result": {"roots": [{"uri": "file:///work", "name": "work"}]}
                        }),
                        tx,
                    )
                    .await;
            })
        };

        session.connect().await;
        client.await.unwrap();
        assert_eq!(session.roots().len(), 1);
        assert_eq!(session.roots()[0].uri, "file:///work");
        assert!(session.is_ready());
    }

    #[tokio::test]
    async fn test_roots_not_supported_is_not_fatal() {
        let session = session(TransportKind::Stdio);
        let mut stream = session.attach_stream().unwrap();
        initialize(&session, json!({"roots": {"listChanged": true}})).await;

        let responder = {
            let session = session.clone();
            tokio::spawn(async move {
                let request = stream.recv().await.unwrap();
                let (tx, _rx) = sink();
                session
                    .handle_message(
                        json!({
                            "jsonrpc": "2.0",
                            "id": request["id"],
                            "error": {"code": -32601, "message": "Method not found"}
                        }),
                        tx,
                    )
                    .await;
            })
        };

        session.connect().await;
        responder.await.unwrap();
        assert!(session.roots().is_empty());
        assert!(session.is_ready());
    }

    #[tokio::test]
    async fn test_set_level_and_batch() {
        let session = session(TransportKind::Stdio);
        initialize(&session, json!({})).await;
        let (tx, _rx) = sink();
        let reply = session
            .handle_payload(
                json!([
                    {"jsonrpc": "2.0", "id": 1, "method": "logging/setLevel", "params": {"level": "error"}},
                    {"jsonrpc": "2.0", "method": "notifications/initialized"},
                    {"jsonrpc": "2.0", "id": 2, "method": "tools/call", "params": {"name": "echo", "arguments": {"text": "hi"}}}
                ]),
                tx,
            )
            .await
            .unwrap();
        let replies = reply.as_array().unwrap();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[1]["result"]["content"][0]["text"], "hi");
        assert_eq!(session.logging_level(), LoggingLevel::Error);
    }

    #[tokio::test]
    async fn test_stateless_skips_initialize_gate() {
        let session = session(TransportKind::HttpStateless);
        session.mark_ready();
        let (tx, _rx) = sink();
        let reply = session
            .handle_message(json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}), tx)
            .await
            .unwrap();
        assert_eq!(reply["result"]["tools"][0]["name"], "echo");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_ready_times_out() {
        let session = session(TransportKind::Http);
        let err = session.wait_until_ready().await.unwrap_err();
        assert_eq!(err, SessionError::ReadyTimeout(Duration::from_secs(5)));
        assert_eq!(session.state(), ConnectionState::Connecting);
    }

    #[tokio::test]
    async fn test_failed_pings_keep_session_ready() {
        let mut options = ServerOptions::new("test", "0.1.0");
        options.keep_alive.interval = Duration::from_millis(20);
        let session = session_with(TransportKind::Http, options);
        let mut stream = session.attach_stream().unwrap();
        let mut events = session.subscribe();
        initialize(&session, json!({})).await;

        let responder = {
            let session = session.clone();
            tokio::spawn(async move {
                let mut pings = 0;
                while pings < 3 {
                    let request = stream.recv().await.unwrap();
                    assert_eq!(request["method"], "ping");
                    pings += 1;
                    let (tx, _rx) = sink();
                    session
                        .handle_message(
                            json!({
                                "jsonrpc": "2.0",
                                "id": request["id"],
                                "error": {"code": -32603, "message": "busy"}
                            }),
                            tx,
                        )
                        .await;
                }
            })
        };

        session.connect().await;
        tokio::time::timeout(Duration::from_secs(2), responder)
            .await
            .unwrap()
            .unwrap();

        assert!(session.is_ready());
        assert_eq!(events.recv().await, Some(SessionEvent::Ready));
        assert!(events.try_recv().is_err());
        session.close();
    }

    #[tokio::test]
    async fn test_sampling_round_trip() {
        use crate::protocol::message::{Role, SamplingContent, SamplingMessage};

        let session = session(TransportKind::Stdio);
        let mut stream = session.attach_stream().unwrap();
        initialize(&session, json!({"sampling": {}})).await;

        let client = {
            let session = session.clone();
            tokio::spawn(async move {
                let request = stream.recv().await.unwrap();
                assert_eq!(request["method"], "sampling/createMessage");
                assert_eq!(request["params"]["maxTokens"], 64);
                assert_eq!(request["params"]["messages"][0]["content"]["text"], "Summarize the log");
                let (tx, _rx) = sink();
                session
                    .handle_message(
                        json!({
                            "jsonrpc": "2.0",
                            "id": request["id"],
                            "result": {
                                "role": "assistant",
                                "content": {"type": "text", "text": "All quiet"},
                                "model": "test-model",
                                "stopReason": "endTurn"
                            }
                        }),
                        tx,
                    )
                    .await;
            })
        };

        let result = session
            .request_sampling(CreateMessageRequest {
                messages: vec![SamplingMessage {
                    role: Role::User,
                    content: SamplingContent::Text {
                        text: "Summarize the log".into(),
                    },
                }],
                max_tokens: 64,
                system_prompt: None,
                temperature: None,
                stop_sequences: None,
                include_context: None,
                model_preferences: None,
                metadata: None,
            })
            .await
            .unwrap();
        client.await.unwrap();

        assert_eq!(result.role, Role::Assistant);
        assert_eq!(result.model, "test-model");
        assert_eq!(result.content, SamplingContent::Text { text: "All quiet".into() });
        assert_eq!(result.stop_reason.as_deref(), Some("endTurn"));
    }
}
