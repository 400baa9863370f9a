//! Publish/subscribe for server and session lifecycle events.
//!
//! Every subscriber gets its own unbounded channel, so delivery is in order
//! per emitter and a slow subscriber never blocks the emitter. Subscribers
//! whose receiver was dropped are pruned on the next emit.

use {
    crate::{protocol::Root, session::Session},
    std::sync::Mutex,
    tokio::sync::mpsc,
};

pub struct EventBus<E> {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<E>>>,
}

impl<E: Clone> EventBus<E> {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<E> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }
        rx
    }

    pub fn emit(&self, event: E) {
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl<E: Clone> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Emitted by a `Session`.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Ready,
    Error(String),
    RootsChanged(Vec<Root>),
    Closed,
}

/// Emitted by an `McpServer` as tracked sessions come and go.
///
/// Stateless HTTP sessions never produce these.
#[derive(Debug, Clone)]
pub enum ServerEvent<A> {
    Connect(Session<A>),
    Disconnect(Session<A>),
}

impl<A> ServerEvent<A> {
    pub fn session(&self) -> &Session<A> {
        match self {
            Self::Connect(s) | Self::Disconnect(s) => s,
        }
    }
}
