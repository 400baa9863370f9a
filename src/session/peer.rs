//! Server-to-client requests.
//!
//! A `Peer` writes JSON-RPC requests to the session's outbound channel and
//! parks a oneshot per request id until the transport feeds the matching
//! response back through `resolve`.

use {
    crate::protocol,
    dashmap::DashMap,
    serde_json::{json, Value},
    std::{
        sync::{
            atomic::{AtomicU64, Ordering},
            Mutex,
        },
        time::Duration,
    },
    thiserror::Error,
    tokio::sync::{mpsc, oneshot},
    tracing::{debug, trace},
};

const METHOD_NOT_FOUND: i64 = -32601;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PeerError {
    #[error("Connection closed")]
    Closed,

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Client error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),
}

impl PeerError {
    /// The client does not implement the requested method.
    pub fn is_method_not_found(&self) -> bool {
        matches!(self, Self::Rpc { code, .. } if *code == METHOD_NOT_FOUND)
    }
}

type Pending = oneshot::Sender<Result<Value, PeerError>>;

pub struct Peer {
    outbound: Mutex<Option<mpsc::UnboundedSender<Value>>>,
    pending: DashMap<String, Pending>,
    next_id: AtomicU64,
    timeout: Duration,
}

impl Peer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            outbound: Mutex::new(None),
            pending: DashMap::new(),
            next_id: AtomicU64::new(1),
            timeout,
        }
    }

    pub fn bind(&self, sender: mpsc::UnboundedSender<Value>) {
        if let Ok(mut slot) = self.outbound.lock() {
            *slot = Some(sender);
        }
    }

    /// Drop the outbound channel and fail every in-flight request.
    pub fn close(&self) {
        if let Ok(mut slot) = self.outbound.lock() {
            slot.take();
        }
        let ids: Vec<String> = self.pending.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            if let Some((_, tx)) = self.pending.remove(&id) {
                let _ = tx.send(Err(PeerError::Closed));
            }
        }
    }

    pub fn sender(&self) -> Option<mpsc::UnboundedSender<Value>> {
        self.outbound.lock().ok().and_then(|slot| slot.clone())
    }

    /// A stream is bound and its receiver is still alive.
    pub fn is_attached(&self) -> bool {
        self.sender().is_some_and(|tx| !tx.is_closed())
    }

    fn send(&self, message: Value) -> Result<(), PeerError> {
        let sender = self.sender().ok_or(PeerError::Closed)?;
        sender.send(message).map_err(|_| PeerError::Closed)
    }

    /// Send a request and wait for the client's answer, bounded by the
    /// peer's timeout.
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, PeerError> {
        let id = format!("srv-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id.clone(), tx);

        if let Err(e) = self.send(protocol::request(json!(id), method, params)) {
            self.pending.remove(&id);
            return Err(e);
        }
        trace!(request_id = %id, method = %method, "📤 Sent request to client");

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(PeerError::Closed),
            Err(_) => {
                self.pending.remove(&id);
                Err(PeerError::Timeout(self.timeout))
            }
        }
    }

    /// Deliver a client response. Returns false when no request is waiting
    /// on `id`.
    pub fn resolve(&self, id: &Value, result: Result<Value, PeerError>) -> bool {
        let key = match id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        match self.pending.remove(&key) {
            Some((_, tx)) => {
                let _ = tx.send(result);
                true
            }
            None => {
                debug!(response_id = %key, "Dropping response with no pending request");
                false
            }
        }
    }
}
