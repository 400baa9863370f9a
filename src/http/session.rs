//! Endpoint handlers for session-affinity and stateless HTTP.

use {
    super::{response, HttpState},
    crate::{
        error::{AuthRejection, McpError},
        logging,
        server::HttpRequest,
        session::{Session, TransportKind},
    },
    serde_json::{json, Value},
    tokio::sync::{mpsc, oneshot},
    tracing::{debug, warn},
    warp::{
        http::{header::ACCEPT, HeaderMap, StatusCode},
        hyper::body::Bytes,
        reply::Response,
    },
};

pub(crate) async fn post<A: Clone + Send + Sync + 'static>(
    state: &HttpState<A>,
    request: HttpRequest,
    headers: &HeaderMap,
    body: Bytes,
) -> Response {
    let server = &state.server;
    let limits = &server.options().limits;
    logging::log_message_received("http", body.len());

    if !limits.allows_message(body.len()) {
        return response::rpc_error(
            StatusCode::PAYLOAD_TOO_LARGE,
            McpError::MessageTooLarge(body.len(), limits.max_message_size),
            None,
        );
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            logging::log_parse_error(&e.to_string(), &String::from_utf8_lossy(&body));
            return response::rpc_error(StatusCode::BAD_REQUEST, McpError::Json(e), None);
        }
    };
    let wants_sse = accepts_event_stream(headers);

    if state.stateless {
        return stateless(state, request, payload, wants_sse).await;
    }

    let session = match session_id(headers) {
        Some(id) => match server.session(id) {
            Some(session) => session,
            None => {
                return response::rpc_error(
                    StatusCode::NOT_FOUND,
                    McpError::InvalidRequest(format!("Session not found: {id}")),
                    None,
                )
            }
        },
        None if is_initialize(&payload) => {
            let auth = match server.authenticate(Some(&request)).await {
                Ok(auth) => auth,
                Err(rejection) => return reject(rejection),
            };
            let session = server.new_session(auth, TransportKind::Http);
            if let Err(e) = server.track(session.clone()) {
                session.close();
                return response::rpc_error(StatusCode::SERVICE_UNAVAILABLE, e, None);
            }
            session
        }
        None => {
            return response::rpc_error(
                StatusCode::BAD_REQUEST,
                McpError::InvalidRequest("Missing Mcp-Session-Id header".into()),
                None,
            )
        }
    };

    let reply = respond(&session, payload, wants_sse, false).await;
    response::with_session(reply, session.id())
}

/// One fresh, untracked session per request.
async fn stateless<A: Clone + Send + Sync + 'static>(
    state: &HttpState<A>,
    request: HttpRequest,
    payload: Value,
    wants_sse: bool,
) -> Response {
    let auth = match state.server.authenticate(Some(&request)).await {
        Ok(auth) => auth,
        Err(rejection) => return reject(rejection),
    };
    let session = state.server.new_session(auth, TransportKind::HttpStateless);
    session.mark_ready();
    respond(&session, payload, wants_sse, true).await
}

/// Handle one POST payload. With `single_use` the session is closed once
/// the payload has been handled, which for SSE is inside the spawned task.
async fn respond<A: Clone + Send + Sync + 'static>(
    session: &Session<A>,
    payload: Value,
    wants_sse: bool,
    single_use: bool,
) -> Response {
    let finish = move |session: &Session<A>| {
        if single_use {
            session.close();
        } else {
            session.spawn_connect();
        }
    };

    if !has_requests(&payload) {
        let (tx, _rx) = mpsc::unbounded_channel();
        session.handle_payload(payload, tx).await;
        finish(session);
        return response::status(StatusCode::ACCEPTED);
    }

    if wants_sse {
        let (tx, rx) = mpsc::unbounded_channel();
        let (reply_tx, reply_rx) = oneshot::channel();
        let session = session.clone();
        tokio::spawn(async move {
            let reply = session.handle_payload(payload, tx).await;
            let _ = reply_tx.send(reply);
            finish(&session);
        });
        return response::request_sse(rx, reply_rx);
    }

    // Plain JSON cannot carry notifications; hand them to the open stream.
    let (tx, mut rx) = mpsc::unbounded_channel();
    let reply = session.handle_payload(payload, tx).await;
    while let Ok(message) = rx.try_recv() {
        session.forward_to_stream(message);
    }
    finish(session);
    match reply {
        Some(reply) => response::json(StatusCode::OK, &reply),
        None => response::status(StatusCode::ACCEPTED),
    }
}

pub(crate) fn get<A: Clone + Send + Sync + 'static>(state: &HttpState<A>, headers: &HeaderMap) -> Response {
    if state.stateless {
        return response::status(StatusCode::METHOD_NOT_ALLOWED);
    }
    let Some(id) = session_id(headers) else {
        return response::status(StatusCode::BAD_REQUEST);
    };
    let Some(session) = state.server.session(id) else {
        return response::status(StatusCode::NOT_FOUND);
    };
    match session.attach_stream() {
        Some(rx) => response::with_session(response::standalone_sse(rx), id),
        None => {
            debug!(session_id = %id, "Rejecting second stream for session");
            response::rpc_error(
                StatusCode::CONFLICT,
                McpError::InvalidRequest("Stream already open for this session".into()),
                None,
            )
        }
    }
}

pub(crate) fn delete<A: Clone + Send + Sync + 'static>(state: &HttpState<A>, headers: &HeaderMap) -> Response {
    if state.stateless {
        return response::status(StatusCode::METHOD_NOT_ALLOWED);
    }
    let Some(id) = session_id(headers) else {
        return response::status(StatusCode::BAD_REQUEST);
    };
    if state.server.untrack(id) {
        response::status(StatusCode::OK)
    } else {
        response::status(StatusCode::NOT_FOUND)
    }
}

fn reject(rejection: AuthRejection) -> Response {
    warn!(status = rejection.status, error = %rejection.message, "🔐 Authentication rejected");
    let status = StatusCode::from_u16(rejection.status).unwrap_or(StatusCode::UNAUTHORIZED);
    response::json(status, &json!({ "error": rejection.message }))
}

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(response::SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

fn accepts_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/event-stream"))
}

fn is_initialize(payload: &Value) -> bool {
    match payload {
        Value::Array(messages) => messages.iter().any(is_initialize),
        message => message.get("method").and_then(Value::as_str) == Some("initialize"),
    }
}

/// Whether the payload contains anything that expects a reply.
fn has_requests(payload: &Value) -> bool {
    match payload {
        Value::Array(messages) => messages.iter().any(has_requests),
        message => message.get("method").is_some() && message.get("id").is_some_and(|id| !id.is_null()),
    }
}
