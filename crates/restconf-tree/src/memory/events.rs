use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::notification::{Notification, NotifyCallback, NotifyCloser};

type Listeners = HashMap<String, Vec<(u64, NotifyCallback)>>;

/// Callback registry keyed by notification schema path.
#[derive(Default)]
pub(crate) struct EventHub {
    next_id: AtomicU64,
    listeners: Mutex<Listeners>,
}

impl EventHub {
    fn listeners(&self) -> MutexGuard<'_, Listeners> {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `callback`; the returned closer unregisters it.
    pub fn register(self: &Arc<Self>, path: &str, callback: NotifyCallback) -> NotifyCloser {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners()
            .entry(path.to_owned())
            .or_default()
            .push((id, callback));

        let hub = Arc::downgrade(self);
        let path = path.to_owned();
        NotifyCloser::new(move || {
            if let Some(hub) = hub.upgrade() {
                hub.unregister(&path, id);
            }
        })
    }

    fn unregister(&self, path: &str, id: u64) {
        let mut listeners = self.listeners();
        if let Some(entries) = listeners.get_mut(path) {
            entries.retain(|(entry_id, _)| *entry_id != id);
            if entries.is_empty() {
                listeners.remove(path);
            }
        }
    }

    /// Number of callbacks registered for `path`.
    pub fn listener_count(&self, path: &str) -> usize {
        self.listeners().get(path).map_or(0, Vec::len)
    }

    /// Invokes every callback registered for `path`.
    ///
    /// Callbacks run outside the lock so they may close their own
    /// registration.
    pub fn publish(&self, path: &str, notification: &Notification) -> usize {
        let callbacks: Vec<NotifyCallback> = self
            .listeners()
            .get(path)
            .map(|entries| entries.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default();
        for callback in &callbacks {
            callback(notification.clone());
        }
        callbacks.len()
    }
}
