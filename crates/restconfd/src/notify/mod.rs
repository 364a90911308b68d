//! Server-Sent Events delivery of notifications.
//!
//! Event sources call the subscription callback on their own threads. The
//! callback only renders the event and enqueues the frame; a single writer
//! task per subscription owns the client connection. Faults raised inside
//! the callback travel to the writer on a bounded side channel.

mod counter;
mod frame;
mod sink;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use axum::http::HeaderName;
use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use bytes::Bytes;
use restconf_tree::{Notification, NotifyCallback, Selection, TreeError};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::compliance::ComplianceOptions;
use crate::exchange::{Reply, RequestContext};

pub use counter::{SubscriptionCounter, SubscriptionGuard};
pub use frame::render_event;
pub use sink::{ChannelSink, EventSink, EventStream, SinkError};

const NOTIFY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::notify");

/// `Content-Type` of event streams.
pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream; charset=utf-8";

/// Problems raised while delivering events.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamFault {
    /// An event could not be rendered; it is dropped.
    #[error("failed to encode notification: {message}")]
    Encode {
        /// Encoder complaint.
        message: String,
    },
    /// The delivery queue was full; the event is dropped.
    #[error("delivery queue full ({capacity} frames); notification dropped")]
    Overflow {
        /// Queue bound in frames.
        capacity: usize,
    },
    /// The callback panicked.
    #[error("recovered while attempting to send notification: {message}")]
    Panicked {
        /// Panic payload text.
        message: String,
    },
    /// The client connection failed.
    #[error("error writing notification: {message}")]
    Write {
        /// Transport complaint.
        message: String,
    },
}

impl StreamFault {
    /// Creates an encode fault.
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }

    /// True when the subscription must end.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Panicked { .. } | Self::Write { .. })
    }
}

/// Why a subscription's writer stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    /// The request was cancelled (client gone or server shutting down).
    Cancelled,
    /// A fatal fault occurred.
    Fault(StreamFault),
    /// The event source released the callback.
    SourceClosed,
}

/// Opens event-stream subscriptions.
#[derive(Debug, Clone)]
pub struct NotificationStreamer {
    queue_capacity: usize,
    fault_capacity: usize,
    counter: Arc<SubscriptionCounter>,
}

impl NotificationStreamer {
    /// Streamer with the given per-subscription channel sizes, counted on
    /// the process-wide gauge.
    #[must_use]
    pub fn new(queue_capacity: usize, fault_capacity: usize) -> Self {
        Self {
            queue_capacity: queue_capacity.max(1),
            fault_capacity: fault_capacity.max(1),
            counter: SubscriptionCounter::global(),
        }
    }

    /// Uses `counter` instead of the process-wide gauge.
    #[must_use]
    pub fn with_counter(mut self, counter: Arc<SubscriptionCounter>) -> Self {
        self.counter = counter;
        self
    }

    /// Live-subscription gauge.
    #[must_use]
    pub const fn counter(&self) -> &Arc<SubscriptionCounter> {
        &self.counter
    }

    /// Subscribes to `selection` and spawns the writer task feeding `sink`.
    ///
    /// The writer stops when `cancel` fires, on a fatal fault or when the
    /// source releases the callback; it then closes the registration.
    ///
    /// # Errors
    ///
    /// Propagates the source's refusal to subscribe.
    pub fn open<S>(
        &self,
        selection: &dyn Selection,
        compliance: ComplianceOptions,
        cancel: CancellationToken,
        sink: S,
    ) -> Result<JoinHandle<StreamEnd>, TreeError>
    where
        S: EventSink + 'static,
    {
        let (queue_tx, queue_rx) = mpsc::channel(self.queue_capacity);
        let (fault_tx, fault_rx) = mpsc::channel(self.fault_capacity);
        let guard = self.counter.track();
        let callback = delivery_callback(queue_tx, fault_tx, self.queue_capacity, compliance);
        let closer = selection.subscribe(callback)?;

        let meta = selection.meta();
        debug!(
            target: NOTIFY_TARGET,
            module = meta.module(),
            ident = meta.ident(),
            live = self.counter.live(),
            "subscription opened"
        );

        Ok(tokio::spawn(async move {
            let end = pump(queue_rx, fault_rx, cancel, sink).await;
            closer.close();
            drop(guard);
            debug!(target: NOTIFY_TARGET, end = ?end, "subscription closed");
            end
        }))
    }

    /// Answers a subscribe request with an event-stream reply.
    ///
    /// # Errors
    ///
    /// Propagates the source's refusal to subscribe.
    pub fn stream(
        &self,
        selection: &dyn Selection,
        context: &RequestContext,
    ) -> Result<Reply, TreeError> {
        let cancel = context.scope.cancellation().clone();
        let (sink, events) = EventStream::channel(self.queue_capacity, cancel.clone());
        let writer = self.open(selection, context.compliance, cancel, sink)?;
        // Detached: the writer ends with the request scope.
        drop(writer);
        Ok(Reply::event_stream(events)
            .with_header(CONTENT_TYPE, EVENT_STREAM_CONTENT_TYPE)
            .with_header(CACHE_CONTROL, "no-cache")
            .with_header(CONNECTION, "keep-alive")
            .with_header(HeaderName::from_static("x-accel-buffering"), "no")
            .with_header(ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
    }
}

fn delivery_callback(
    queue: mpsc::Sender<Bytes>,
    faults: mpsc::Sender<StreamFault>,
    capacity: usize,
    compliance: ComplianceOptions,
) -> NotifyCallback {
    Arc::new(move |notification: Notification| {
        let rendered =
            panic::catch_unwind(AssertUnwindSafe(|| render_event(&notification, compliance)));
        let fault = match rendered {
            Ok(Ok(frame)) => match queue.try_send(frame) {
                Ok(()) | Err(TrySendError::Closed(_)) => return,
                Err(TrySendError::Full(_)) => StreamFault::Overflow { capacity },
            },
            Ok(Err(fault)) => fault,
            Err(payload) => StreamFault::Panicked {
                message: panic_message(payload.as_ref()),
            },
        };
        if let Err(error) = faults.try_send(fault) {
            debug!(target: NOTIFY_TARGET, %error, "fault channel unavailable");
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}

async fn pump<S: EventSink>(
    mut queue: mpsc::Receiver<Bytes>,
    mut faults: mpsc::Receiver<StreamFault>,
    cancel: CancellationToken,
    mut sink: S,
) -> StreamEnd {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return StreamEnd::Cancelled,
            Some(fault) = faults.recv() => {
                if fault.is_fatal() {
                    warn!(target: NOTIFY_TARGET, %fault, "ending subscription");
                    return StreamEnd::Fault(fault);
                }
                warn!(target: NOTIFY_TARGET, %fault, "notification not delivered");
            }
            frame = queue.recv() => {
                let Some(frame) = frame else {
                    return StreamEnd::SourceClosed;
                };
                let size = frame.len();
                if let Err(error) = sink.write_frame(frame).await {
                    let fault = StreamFault::Write {
                        message: error.to_string(),
                    };
                    warn!(target: NOTIFY_TARGET, %fault, "ending subscription");
                    return StreamEnd::Fault(fault);
                }
                debug!(target: NOTIFY_TARGET, bytes = size, "sent notification");
            }
        }
    }
}
