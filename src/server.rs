//! MCP server: authentication, session table and transport binding.
//!
//! An `McpServer` is a cheap handle over shared state. The registry it was
//! built with is shared by every session it creates; each session gets its
//! own view of the tools filtered by the auth value resolved for it.

use {
    crate::{
        config::{self, CliArgs, ResolvedConfig, ServerOptions, StartOptions, TransportType},
        error::{AuthRejection, McpError, McpResult},
        events::{EventBus, ServerEvent},
        framework::registry::Registry,
        health::ReadinessReport,
        http, logging,
        session::{ConnectionState, Session, TransportKind},
        stdio,
    },
    anyhow::{Context, Result},
    async_trait::async_trait,
    dashmap::{DashMap, DashSet},
    std::{
        collections::HashMap,
        future::Future,
        net::SocketAddr,
        sync::{Arc, Mutex, Weak},
        time::Duration,
    },
    tokio::{
        sync::{mpsc, oneshot, watch},
        task::JoinHandle,
    },
    tracing::{debug, info, warn},
};

const STOP_GRACE: Duration = Duration::from_secs(5);

/// The parts of an inbound HTTP request an authenticator may inspect.
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    /// Header names are lower-cased.
    pub headers: HashMap<String, String>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.header("authorization")
            .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
            .map(str::trim)
    }
}

/// Resolves the auth value for a connection.
///
/// `request` is `None` for the stdio transport.
#[async_trait]
pub trait Authenticator<A>: Send + Sync {
    async fn authenticate(&self, request: Option<&HttpRequest>) -> Result<A, AuthRejection>;
}

/// Adapts an async closure into an `Authenticator`.
pub struct FnAuthenticator<F>(pub F);

#[async_trait]
impl<A, F, Fut> Authenticator<A> for FnAuthenticator<F>
where
    A: Send + 'static,
    F: Fn(Option<HttpRequest>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<A, AuthRejection>> + Send,
{
    async fn authenticate(&self, request: Option<&HttpRequest>) -> Result<A, AuthRejection> {
        (self.0)(request.cloned()).await
    }
}

struct Running {
    transport: TransportType,
    local_addr: Option<SocketAddr>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

pub(crate) struct ServerInner<A> {
    options: Arc<ServerOptions>,
    registry: Arc<Registry<A>>,
    authenticator: Option<Arc<dyn Authenticator<A>>>,
    sessions: DashMap<String, Session<A>>,
    /// Sessions whose `Connect` event has been emitted.
    connected: DashSet<String>,
    events: EventBus<ServerEvent<A>>,
    running: Mutex<Option<Running>>,
    closed: watch::Sender<bool>,
}

pub struct McpServer<A> {
    inner: Arc<ServerInner<A>>,
}

impl<A> Clone for McpServer<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> std::fmt::Debug for McpServer<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer")
            .field("name", &self.inner.options.name)
            .field("sessions", &self.inner.sessions.len())
            .finish_non_exhaustive()
    }
}

impl<A: Clone + Send + Sync + 'static> McpServer<A> {
    pub(crate) fn new(
        options: ServerOptions,
        registry: Registry<A>,
        authenticator: Option<Arc<dyn Authenticator<A>>>,
    ) -> Self {
        let (closed, _) = watch::channel(false);
        debug!(name = %options.name, "🚀 Initializing MCP Server");
        Self {
            inner: Arc::new(ServerInner {
                options: Arc::new(options),
                registry: Arc::new(registry),
                authenticator,
                sessions: DashMap::new(),
                connected: DashSet::new(),
                events: EventBus::new(),
                running: Mutex::new(None),
                closed,
            }),
        }
    }

    pub fn options(&self) -> &ServerOptions {
        &self.inner.options
    }

    pub fn registry(&self) -> &Registry<A> {
        &self.inner.registry
    }

    /// Tracked sessions. Stateless HTTP sessions never appear here.
    pub fn sessions(&self) -> Vec<Session<A>> {
        self.inner.sessions.iter().map(|e| e.value().clone()).collect()
    }

    pub fn session(&self, id: &str) -> Option<Session<A>> {
        self.inner.sessions.get(id).map(|e| e.value().clone())
    }

    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }

    pub fn readiness(&self) -> ReadinessReport {
        let total = self.inner.sessions.len();
        let ready = self.inner.sessions.iter().filter(|e| e.value().is_ready()).count();
        ReadinessReport::from_counts(ready, total)
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ServerEvent<A>> {
        self.inner.events.subscribe()
    }

    /// Resolve the auth value for a connection. No authenticator means
    /// every connection is unauthenticated.
    pub async fn authenticate(&self, request: Option<&HttpRequest>) -> Result<Option<A>, AuthRejection> {
        match &self.inner.authenticator {
            Some(auth) => auth.authenticate(request).await.map(Some),
            None => Ok(None),
        }
    }

    /// Create a session bound to this server's registry. It is not tracked
    /// until passed to `track`.
    pub fn new_session(&self, auth: Option<A>, kind: TransportKind) -> Session<A> {
        Session::new(
            kind,
            auth,
            Arc::clone(&self.inner.registry),
            Arc::clone(&self.inner.options),
        )
    }

    /// Add a session to the active set. `Connect` is emitted once its
    /// handshake reaches ready; it is untracked automatically once it errors
    /// or closes.
    pub(crate) fn track(&self, session: Session<A>) -> McpResult<()> {
        if !self.inner.options.limits.allows_new_session(self.inner.sessions.len()) {
            let max = self.inner.options.limits.max_sessions.unwrap_or_default();
            warn!(max_sessions = max, "🚫 Session limit reached, rejecting connection");
            return Err(McpError::TooManySessions(max));
        }

        self.inner.sessions.insert(session.id().to_string(), session.clone());

        let server: Weak<ServerInner<A>> = Arc::downgrade(&self.inner);
        let mut state = session.state_watch();
        tokio::spawn(async move {
            loop {
                let current = state.borrow_and_update().clone();
                if current.is_terminal() {
                    break;
                }
                if current == ConnectionState::Ready {
                    let Some(inner) = server.upgrade() else { return };
                    if inner.sessions.contains_key(session.id())
                        && inner.connected.insert(session.id().to_string())
                    {
                        inner.events.emit(ServerEvent::Connect(session.clone()));
                    }
                }
                if state.changed().await.is_err() {
                    break;
                }
            }
            if let Some(inner) = server.upgrade() {
                McpServer { inner }.untrack(session.id());
            }
        });
        Ok(())
    }

    /// Remove a session from the active set and close it. Returns false if
    /// it was not tracked. `Disconnect` is emitted only for sessions that
    /// were announced with `Connect`.
    pub(crate) fn untrack(&self, id: &str) -> bool {
        let Some((_, session)) = self.inner.sessions.remove(id) else {
            return false;
        };
        session.close();
        if self.inner.connected.remove(id).is_some() {
            self.inner.events.emit(ServerEvent::Disconnect(session));
        }
        true
    }

    /// Start serving. Explicit options win over `--transport`/`--port`/...
    /// flags, which win over `MCP_*` environment variables.
    ///
    /// Returns once the transport is accepting input.
    pub async fn start(&self, options: StartOptions) -> Result<ResolvedConfig> {
        let resolved = config::resolve(
            options,
            CliArgs::from_process().into_options(),
            StartOptions::from_env(),
        );
        self.start_resolved(resolved.clone()).await?;
        Ok(resolved)
    }

    pub async fn start_resolved(&self, config: ResolvedConfig) -> Result<()> {
        if self.inner.running.lock().map(|r| r.is_some()).unwrap_or(false) {
            anyhow::bail!("Server already started");
        }
        self.inner.closed.send_replace(false);
        logging::log_server_startup(&config.transport.to_string());

        let running = match config.transport {
            TransportType::Stdio => {
                let server = self.clone();
                let task = tokio::spawn(async move {
                    if let Err(e) = stdio::serve(server.clone(), tokio::io::stdin(), tokio::io::stdout()).await {
                        warn!(error = %e, "stdio transport ended with error");
                    }
                    server.inner.closed.send_replace(true);
                });
                Running {
                    transport: TransportType::Stdio,
                    local_addr: None,
                    shutdown: None,
                    task: Some(task),
                }
            }
            TransportType::HttpStream => {
                let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
                    .await
                    .with_context(|| format!("Could not bind to {}:{}", config.host, config.port))?;
                let addr = listener.local_addr().context("Listener has no local address")?;
                let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

                let routes = http::routes(self.clone(), config.endpoint.clone(), config.stateless);
                let serve = warp::serve(routes).serve_incoming_with_graceful_shutdown(
                    tokio_stream::wrappers::TcpListenerStream::new(listener),
                    async move {
                        let _ = shutdown_rx.await;
                    },
                );
                let server = self.clone();
                let task = tokio::spawn(async move {
                    serve.await;
                    server.inner.closed.send_replace(true);
                });

                info!(
                    addr = %addr,
                    endpoint = %config.endpoint,
                    stateless = config.stateless,
                    "🌐 MCP Server listening on http://{}{}",
                    addr,
                    config.endpoint
                );
                logging::log_server_ready(&addr.to_string());
                Running {
                    transport: TransportType::HttpStream,
                    local_addr: Some(addr),
                    shutdown: Some(shutdown_tx),
                    task: Some(task),
                }
            }
        };

        if let Ok(mut slot) = self.inner.running.lock() {
            *slot = Some(running);
        }
        Ok(())
    }

    /// Bound HTTP address, once started on the HTTP transport.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inner
            .running
            .lock()
            .ok()
            .and_then(|r| r.as_ref().and_then(|r| r.local_addr))
    }

    pub fn transport(&self) -> Option<TransportType> {
        self.inner
            .running
            .lock()
            .ok()
            .and_then(|r| r.as_ref().map(|r| r.transport))
    }

    /// Close every session and shut the transport down.
    pub async fn stop(&self) {
        let ids: Vec<String> = self.inner.sessions.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.untrack(&id);
        }

        let running = self.inner.running.lock().ok().and_then(|mut r| r.take());
        let Some(mut running) = running else {
            return;
        };
        if let Some(shutdown) = running.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(mut task) = running.task.take() {
            if running.transport == TransportType::Stdio {
                task.abort();
            } else if tokio::time::timeout(STOP_GRACE, &mut task).await.is_err() {
                warn!("HTTP transport did not drain in time, aborting");
                task.abort();
            }
        }
        self.inner.closed.send_replace(true);
        logging::log_server_shutdown();
    }

    /// Resolves once the transport has ended.
    pub async fn closed(&self) {
        let mut rx = self.inner.closed.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}
