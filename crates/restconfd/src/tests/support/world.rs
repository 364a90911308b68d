//! Scenario world driving a [`Gateway`] over the acme device.

use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderName, Method};
use restconf_tree::memory::MemoryModule;
use serde_json::Value;
use tokio::runtime::{Builder, Runtime};

use super::device::{GatewayOptions, acme_gateway, acme_module, sample_body};
use crate::exchange::{Reply, ReplyBody, RestRequest};
use crate::gateway::Gateway;
use crate::notify::{EventStream, SubscriptionCounter};

const WAIT: Duration = Duration::from_secs(2);

/// Scenario world shared across gateway steps.
pub struct GatewayWorld {
    runtime: Runtime,
    pub module: Arc<MemoryModule>,
    pub counter: Arc<SubscriptionCounter>,
    options: GatewayOptions,
    gateway: Option<Arc<Gateway>>,
    headers: Vec<(HeaderName, String)>,
    body: Option<(&'static str, &'static str)>,
    reply: Option<Reply>,
    events: Option<EventStream>,
}

impl GatewayWorld {
    /// World over a fresh acme module; the gateway starts on first use.
    pub fn new() -> Self {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("tokio runtime");
        Self {
            runtime,
            module: acme_module("edge-1"),
            counter: Arc::new(SubscriptionCounter::default()),
            options: GatewayOptions::default(),
            gateway: None,
            headers: Vec::new(),
            body: None,
            reply: None,
            events: None,
        }
    }

    /// Forces strict compliance for every request, rebuilding the gateway.
    pub fn force_strict(&mut self) {
        self.options.strict = true;
        self.gateway = None;
    }

    /// The gateway, built on first use.
    pub fn gateway(&mut self) -> Arc<Gateway> {
        let module = Arc::clone(&self.module);
        let counter = Arc::clone(&self.counter);
        let options = self.options.clone();
        Arc::clone(
            self.gateway
                .get_or_insert_with(|| Arc::new(acme_gateway(&module, &counter, options))),
        )
    }

    /// Adds a header to the next request.
    pub fn add_header(&mut self, name: HeaderName, value: &str) {
        self.headers.push((name, value.to_owned()));
    }

    /// Uses a named sample body for the next request.
    pub fn use_sample_body(&mut self, name: &str) {
        let sample = sample_body(name).unwrap_or_else(|| panic!("unknown sample body '{name}'"));
        self.body = Some(sample);
    }

    /// Sends a request; `target` may carry a query string.
    pub fn send(&mut self, method: &str, target: &str) {
        let method = Method::from_bytes(method.as_bytes()).expect("valid method");
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };
        let mut request = RestRequest::new(method, path);
        if let Some(query) = query {
            request = request.with_query(query);
        }
        for (name, value) in self.headers.drain(..) {
            request = request.with_header(name, &value);
        }
        if let Some((content_type, body)) = self.body.take() {
            request = request
                .with_header(CONTENT_TYPE, content_type)
                .with_body(body);
        }
        let gateway = self.gateway();
        let reply = self.runtime.block_on(gateway.handle(request));
        self.reply = Some(reply);
    }

    /// Sends `GET target` asking for an event stream and keeps the body.
    pub fn subscribe(&mut self, target: &str) {
        self.add_header(ACCEPT, "text/event-stream");
        self.send("GET", target);
        let reply = self.reply.as_mut().expect("reply recorded");
        match std::mem::take(&mut reply.body) {
            ReplyBody::Stream(events) => self.events = Some(events),
            other => panic!(
                "expected an event stream, got {} with {other:?}",
                reply.status
            ),
        }
    }

    /// The last reply.
    pub fn reply(&self) -> &Reply {
        self.reply.as_ref().expect("no request was sent")
    }

    /// The last reply's body as JSON.
    pub fn reply_json(&self) -> Value {
        serde_json::from_slice(self.reply().body_bytes()).unwrap_or_else(|error| {
            panic!(
                "body is not JSON ({error}): {}",
                String::from_utf8_lossy(self.reply().body_bytes())
            )
        })
    }

    /// Next event payload, waiting briefly for delivery.
    pub fn next_event(&mut self) -> Option<Value> {
        let events = self.events.as_mut().expect("no open stream");
        let frame = self
            .runtime
            .block_on(async { tokio::time::timeout(WAIT, events.next_frame()).await })
            .expect("event arrives in time")?;
        let text = std::str::from_utf8(&frame).expect("UTF-8 frame");
        let data = text
            .strip_prefix("data: ")
            .and_then(|rest| rest.strip_suffix("\n\n"))
            .expect("SSE framing");
        Some(serde_json::from_str(data).expect("JSON event"))
    }

    /// Drops the open event stream as a disconnecting client would.
    pub fn disconnect(&mut self) {
        self.events = None;
    }

    /// Cancels the gateway's shutdown token.
    pub fn shut_down(&mut self) {
        self.gateway().shutdown_token().cancel();
    }

    /// Waits until `condition` holds or the wait budget runs out.
    pub fn eventually(&self, condition: impl Fn() -> bool) -> bool {
        self.runtime.block_on(async {
            let deadline = tokio::time::Instant::now() + WAIT;
            while !condition() {
                if tokio::time::Instant::now() >= deadline {
                    return false;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            true
        })
    }
}

impl Default for GatewayWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Default gateway world fixture.
pub fn gateway_world() -> RefCell<GatewayWorld> {
    RefCell::new(GatewayWorld::new())
}

/// Renders a JSON scalar the way feature files spell it.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
