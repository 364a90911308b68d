use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use time::OffsetDateTime;

use crate::selection::TreeData;

/// One event delivered to a subscriber.
#[derive(Clone)]
pub struct Notification {
    /// Moment the event was raised.
    pub event_time: OffsetDateTime,
    /// Event payload.
    pub event: Arc<dyn TreeData>,
}

impl Notification {
    /// Stamps an event with the current UTC time.
    #[must_use]
    pub fn now(event: Arc<dyn TreeData>) -> Self {
        Self::at(OffsetDateTime::now_utc(), event)
    }

    /// Creates an event with an explicit time.
    #[must_use]
    pub fn at(event_time: OffsetDateTime, event: Arc<dyn TreeData>) -> Self {
        Self { event_time, event }
    }
}

impl fmt::Debug for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notification")
            .field("event_time", &self.event_time)
            .field("event", self.event.meta())
            .finish()
    }
}

/// Callback invoked on the producer's thread for every event.
pub type NotifyCallback = Arc<dyn Fn(Notification) + Send + Sync>;

type CloseFn = Box<dyn FnOnce() + Send>;

/// Handle that ends a subscription.
///
/// Closing is idempotent; dropping an unclosed handle closes it.
pub struct NotifyCloser {
    close: Mutex<Option<CloseFn>>,
}

impl NotifyCloser {
    /// Wraps the function that unregisters the callback.
    pub fn new(close: impl FnOnce() + Send + 'static) -> Self {
        Self {
            close: Mutex::new(Some(Box::new(close))),
        }
    }

    /// Handle for sources with nothing to release.
    #[must_use]
    pub fn noop() -> Self {
        Self {
            close: Mutex::new(None),
        }
    }

    /// Unregisters the callback. Later calls do nothing.
    pub fn close(&self) {
        let close = self
            .close
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(close) = close {
            close();
        }
    }
}

impl Drop for NotifyCloser {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for NotifyCloser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = self
            .close
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false);
        f.debug_struct("NotifyCloser").field("open", &open).finish()
    }
}
