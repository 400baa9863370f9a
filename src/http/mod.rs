//! Streamable HTTP transport.
//!
//! One endpoint (default `/mcp`) takes `POST` for client messages, `GET` for
//! the server-to-client SSE stream and `DELETE` to end a session. Every
//! other path falls through to the auxiliary routes: liveness, readiness and
//! OAuth discovery, else a bare 404.

pub mod response;
pub mod session;

use {
    crate::{health::READY_PATH, server::HttpRequest, server::McpServer},
    std::{collections::HashMap, sync::Arc},
    tracing::trace,
    warp::{
        filters::path::FullPath,
        http::{HeaderMap, Method, StatusCode},
        hyper::body::Bytes,
        reply::Response,
        Filter, Rejection,
    },
};

pub(crate) struct HttpState<A> {
    pub server: McpServer<A>,
    pub endpoint: String,
    pub stateless: bool,
}

pub(crate) fn routes<A: Clone + Send + Sync + 'static>(
    server: McpServer<A>,
    endpoint: String,
    stateless: bool,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone + Send + Sync + 'static {
    let state = Arc::new(HttpState {
        server,
        endpoint,
        stateless,
    });
    warp::method()
        .and(warp::path::full())
        .and(warp::header::headers_cloned())
        .and(warp::body::bytes())
        .and(warp::any().map(move || Arc::clone(&state)))
        .and_then(handle::<A>)
}

async fn handle<A: Clone + Send + Sync + 'static>(
    method: Method,
    path: FullPath,
    headers: HeaderMap,
    body: Bytes,
    state: Arc<HttpState<A>>,
) -> Result<Response, Rejection> {
    trace!(method = %method, path = %path.as_str(), "HTTP request received");

    if path.as_str() == state.endpoint {
        let request = http_request(&method, path.as_str(), &headers);
        let response = match method {
            Method::POST => session::post(&state, request, &headers, body).await,
            Method::GET => session::get(&state, &headers),
            Method::DELETE => session::delete(&state, &headers),
            _ => response::status(StatusCode::METHOD_NOT_ALLOWED),
        };
        return Ok(response);
    }

    Ok(auxiliary(&state, &method, path.as_str()))
}

fn auxiliary<A: Clone + Send + Sync + 'static>(state: &HttpState<A>, method: &Method, path: &str) -> Response {
    if method != Method::GET {
        return response::status(StatusCode::NOT_FOUND);
    }
    let options = state.server.options();

    if options.health.enabled && path == options.health.path {
        let status = StatusCode::from_u16(options.health.status).unwrap_or(StatusCode::OK);
        return response::text(status, options.health.message.clone());
    }

    if path == READY_PATH {
        let report = if state.stateless {
            crate::health::ReadinessReport::stateless()
        } else {
            state.server.readiness()
        };
        let status = StatusCode::from_u16(report.http_status()).unwrap_or(StatusCode::SERVICE_UNAVAILABLE);
        return response::json(status, &report.to_json());
    }

    match options.oauth.document_for(path) {
        Some(document) => response::json(StatusCode::OK, &document),
        None => response::status(StatusCode::NOT_FOUND),
    }
}

fn http_request(method: &Method, path: &str, headers: &HeaderMap) -> HttpRequest {
    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect::<HashMap<_, _>>();
    HttpRequest {
        method: method.to_string(),
        path: path.to_string(),
        headers,
    }
}
