//! Transport-neutral request and reply values.
//!
//! The gateway works on these rather than on axum types so it can be driven
//! directly from tests and from any HTTP front end.

use std::net::SocketAddr;

use axum::http::header::{ACCEPT, CONTENT_TYPE, LOCATION};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use bytes::Bytes;
use restconf_tree::RequestScope;

use crate::compliance::ComplianceOptions;
use crate::notify::EventStream;

/// Per-request state shared by routing, dispatch and streaming.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Scope handed to browsers; its token ends streams.
    pub scope: RequestScope,
    /// Negotiated protocol dialect.
    pub compliance: ComplianceOptions,
}

impl RequestContext {
    /// Pairs a scope with a dialect.
    #[must_use]
    pub const fn new(scope: RequestScope, compliance: ComplianceOptions) -> Self {
        Self { scope, compliance }
    }
}

/// One inbound HTTP request with its body fully read.
#[derive(Debug, Clone)]
pub struct RestRequest {
    /// Request method.
    pub method: Method,
    /// Raw (percent-encoded) path.
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Bytes,
    /// Peer address, when the transport knows it.
    pub remote_addr: Option<SocketAddr>,
}

impl RestRequest {
    /// Request with no headers, query or body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_addr: None,
        }
    }

    /// Sets the query string.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Appends a header; values that are not valid header text are ignored.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.append(name, value);
        }
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the peer address.
    #[must_use]
    pub const fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// `Accept` header text.
    #[must_use]
    pub fn accept(&self) -> Option<&str> {
        self.header(&ACCEPT)
    }

    /// `Content-Type` header text.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header(&CONTENT_TYPE)
    }
}

/// Body of a [`Reply`].
#[derive(Debug, Default)]
pub enum ReplyBody {
    /// No body.
    #[default]
    Empty,
    /// Complete body.
    Bytes(Bytes),
    /// Server-Sent Events, one chunk per frame.
    Stream(EventStream),
}

/// Outbound response.
#[derive(Debug)]
pub struct Reply {
    /// Response status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: ReplyBody,
}

impl Reply {
    /// Reply without a body.
    #[must_use]
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: ReplyBody::Empty,
        }
    }

    /// Reply with a complete body of the given media type.
    pub fn bytes(status: StatusCode, content_type: &str, body: impl Into<Bytes>) -> Self {
        Self::empty(status)
            .with_header(CONTENT_TYPE, content_type)
            .with_body(ReplyBody::Bytes(body.into()))
    }

    /// `301` redirect to `location`.
    #[must_use]
    pub fn redirect(location: &str) -> Self {
        Self::empty(StatusCode::MOVED_PERMANENTLY).with_header(LOCATION, location)
    }

    /// Streaming `200` reply.
    #[must_use]
    pub fn event_stream(stream: EventStream) -> Self {
        Self::empty(StatusCode::OK).with_body(ReplyBody::Stream(stream))
    }

    /// Sets a header, replacing earlier values; invalid values are ignored.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
        self.set_header(name, value);
        self
    }

    /// In-place form of [`Reply::with_header`].
    pub fn set_header(&mut self, name: HeaderName, value: &str) {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
    }

    fn with_body(mut self, body: ReplyBody) -> Self {
        self.body = body;
        self
    }

    /// Header text, if present and printable.
    #[must_use]
    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Complete body bytes; empty for streams.
    #[must_use]
    pub fn body_bytes(&self) -> &[u8] {
        match &self.body {
            ReplyBody::Bytes(bytes) => bytes,
            ReplyBody::Empty | ReplyBody::Stream(_) => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_helpers_read_headers() {
        let request = RestRequest::new(Method::GET, "/restconf/data/acme:")
            .with_header(ACCEPT, "application/yang-data+json")
            .with_header(CONTENT_TYPE, "application/json");
        assert_eq!(request.accept(), Some("application/yang-data+json"));
        assert_eq!(request.content_type(), Some("application/json"));
    }

    #[test]
    fn bytes_reply_carries_content_type() {
        let reply = Reply::bytes(StatusCode::OK, "text/plain", "hi");
        assert_eq!(reply.header(&CONTENT_TYPE), Some("text/plain"));
        assert_eq!(reply.body_bytes(), b"hi");
    }

    #[test]
    fn redirect_sets_location() {
        let reply = Reply::redirect("/app/");
        assert_eq!(reply.status, StatusCode::MOVED_PERMANENTLY);
        assert_eq!(reply.header(&LOCATION), Some("/app/"));
    }
}
