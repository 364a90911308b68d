//! HTTP front end.
//!
//! Every request falls through to one axum handler that buffers the body,
//! hands a [`RestRequest`] to the [`Gateway`] and writes the [`Reply`] back,
//! streaming event-stream bodies chunk by chunk.

mod errors;
mod listener;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::response::Response;
use tracing::warn;

use crate::compliance::media;
use crate::exchange::{Reply, ReplyBody, RestRequest};
use crate::gateway::Gateway;

pub use self::errors::ListenerError;
pub use self::listener::HttpListener;

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// Largest request body accepted.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Router sending every request to `gateway`.
pub fn router(gateway: Arc<Gateway>) -> Router {
    Router::new().fallback(handle).with_state(gateway)
}

async fn handle(State(gateway): State<Arc<Gateway>>, request: Request) -> Response {
    match into_rest_request(request).await {
        Ok(request) => into_response(gateway.handle(request).await),
        Err(reply) => into_response(reply),
    }
}

async fn into_rest_request(request: Request) -> Result<RestRequest, Reply> {
    let (parts, body) = request.into_parts();
    let body = to_bytes(body, MAX_BODY_BYTES).await.map_err(|error| {
        warn!(target: LISTENER_TARGET, %error, "failed to read request body");
        Reply::bytes(
            StatusCode::PAYLOAD_TOO_LARGE,
            media::TEXT_PLAIN,
            format!("failed to read request body: {error}"),
        )
    })?;
    let remote_addr = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    Ok(RestRequest {
        method: parts.method,
        path: parts.uri.path().to_owned(),
        query: parts.uri.query().map(str::to_owned),
        headers: parts.headers,
        body,
        remote_addr,
    })
}

fn into_response(reply: Reply) -> Response {
    let body = match reply.body {
        ReplyBody::Empty => Body::empty(),
        ReplyBody::Bytes(bytes) => Body::from(bytes),
        ReplyBody::Stream(events) => Body::from_stream(events.into_stream()),
    };
    let mut response = Response::new(body);
    *response.status_mut() = reply.status;
    *response.headers_mut() = reply.headers;
    response
}
