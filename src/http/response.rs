//! HTTP reply builders.

use {
    crate::error::McpError,
    futures_util::{stream, Stream, StreamExt},
    serde_json::Value,
    std::{collections::VecDeque, convert::Infallible},
    tokio::sync::{mpsc, oneshot},
    tracing::debug,
    warp::{
        http::{HeaderValue, StatusCode},
        reply::{self, Response},
        sse::Event,
        Reply,
    },
};

pub const SESSION_HEADER: &str = "mcp-session-id";

pub fn json(status: StatusCode, body: &Value) -> Response {
    reply::with_status(reply::json(body), status).into_response()
}

pub fn status(status: StatusCode) -> Response {
    reply::with_status(reply::reply(), status).into_response()
}

pub fn text(status: StatusCode, body: String) -> Response {
    reply::with_status(body, status).into_response()
}

/// A JSON-RPC error object carried by a non-200 HTTP status.
pub fn rpc_error(status: StatusCode, error: McpError, id: Option<Value>) -> Response {
    debug!(status = %status, error = %error, "Built error response");
    json(status, &error.to_json_rpc_error(id))
}

pub fn with_session(mut response: Response, session_id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(session_id) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}

fn event(message: &Value) -> Result<Event, Infallible> {
    Ok(Event::default()
        .event("message")
        .data(message.to_string()))
}

/// Server-to-client stream, kept open until the session drops its sender.
pub fn standalone_sse(rx: mpsc::UnboundedReceiver<Value>) -> Response {
    let events = tokio_stream::wrappers::UnboundedReceiverStream::new(rx).map(|m| event(&m));
    warp::sse::reply(warp::sse::keep_alive().stream(events)).into_response()
}

struct RequestStream {
    notifications: mpsc::UnboundedReceiver<Value>,
    reply: Option<oneshot::Receiver<Option<Value>>>,
    queued: VecDeque<Value>,
}

/// Notifications for one POST followed by its reply, then end of stream.
///
/// The stream ends as soon as the reply is out, even if a timed-out tool
/// still holds a notification sender.
pub fn request_events(
    notifications: mpsc::UnboundedReceiver<Value>,
    reply: oneshot::Receiver<Option<Value>>,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    let state = RequestStream {
        notifications,
        reply: Some(reply),
        queued: VecDeque::new(),
    };
    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(message) = state.queued.pop_front() {
                return Some((event(&message), state));
            }
            let mut reply = state.reply.take()?;
            tokio::select! {
                biased;
                Some(message) = state.notifications.recv() => {
                    state.reply = Some(reply);
                    return Some((event(&message), state));
                }
                outcome = &mut reply => {
                    while let Ok(message) = state.notifications.try_recv() {
                        state.queued.push_back(message);
                    }
                    if let Ok(Some(message)) = outcome {
                        state.queued.push_back(message);
                    }
                }
            }
        }
    })
}

pub fn request_sse(
    notifications: mpsc::UnboundedReceiver<Value>,
    reply: oneshot::Receiver<Option<Value>>,
) -> Response {
    warp::sse::reply(request_events(notifications, reply)).into_response()
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn test_session_header() {
        let response = with_session(status(StatusCode::ACCEPTED), "abc");
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers().get(SESSION_HEADER).unwrap(), "abc");
    }

    #[test]
    fn test_rpc_error_status() {
        let response = rpc_error(
            StatusCode::NOT_FOUND,
            McpError::InvalidRequest("Session not found".into()),
            None,
        );
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_request_events_deliver_notifications_before_reply() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(json!({"n": 1})).unwrap();
        tx.send(json!({"n": 2})).unwrap();
        reply_tx.send(Some(json!({"id": 1}))).unwrap();

        // The sender stays alive, like a timed-out tool still holding it.
        let events: Vec<_> = request_events(rx, reply_rx).collect().await;
        assert_eq!(events.len(), 3);
        drop(tx);
    }
}
