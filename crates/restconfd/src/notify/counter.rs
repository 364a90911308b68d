use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use once_cell::sync::Lazy;

static GLOBAL: Lazy<Arc<SubscriptionCounter>> = Lazy::new(Arc::default);

/// Gauge of live event-stream subscriptions.
#[derive(Debug, Default)]
pub struct SubscriptionCounter {
    live: AtomicUsize,
}

impl SubscriptionCounter {
    /// Process-wide counter.
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    /// Subscriptions currently open.
    #[must_use]
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Counts a subscription until the returned guard is dropped.
    #[must_use]
    pub fn track(self: &Arc<Self>) -> SubscriptionGuard {
        self.live.fetch_add(1, Ordering::AcqRel);
        SubscriptionGuard {
            counter: Arc::clone(self),
        }
    }
}

/// Decrements its counter on drop.
#[derive(Debug)]
pub struct SubscriptionGuard {
    counter: Arc<SubscriptionCounter>,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.counter.live.fetch_sub(1, Ordering::AcqRel);
    }
}
