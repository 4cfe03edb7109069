use log::debug;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Which listing went stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeSignal {
    /// A meal's ingredient list changed.
    MealsChanged,
    /// Lines were added to the cart.
    CartChanged,
}

impl ChangeSignal {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MealsChanged => "meals_changed",
            Self::CartChanged => "cart_changed",
        }
    }
}

impl Display for ChangeSignal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver of change signals. Implemented for any `Fn(ChangeSignal)`.
pub trait ChangeObserver: Send + Sync {
    fn on_change(&self, signal: ChangeSignal);
}

impl<F> ChangeObserver for F
where
    F: Fn(ChangeSignal) + Send + Sync,
{
    fn on_change(&self, signal: ChangeSignal) {
        self(signal)
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    signal: ChangeSignal,
    observer: Arc<dyn ChangeObserver>,
}

/// Synchronous publish/subscribe hub. Clones share subscribers.
#[derive(Clone, Default)]
pub struct ChangeBus {
    subscriptions: Arc<RwLock<BTreeMap<SubscriptionId, Subscription>>>,
    next_id: Arc<AtomicU64>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `observer` for one signal. Observers run in subscription
    /// order.
    pub fn subscribe(
        &self,
        signal: ChangeSignal,
        observer: impl ChangeObserver + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                Subscription {
                    signal,
                    observer: Arc::new(observer),
                },
            );
        id
    }

    /// Returns `false` when `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    /// Delivers `signal` to every current subscriber of it and returns how
    /// many were notified.
    pub fn publish(&self, signal: ChangeSignal) -> usize {
        // Snapshot first so observers may (un)subscribe while handling.
        let observers = self
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|subscription| subscription.signal == signal)
            .map(|subscription| Arc::clone(&subscription.observer))
            .collect::<Vec<_>>();

        for observer in &observers {
            observer.on_change(signal);
        }

        debug!(
            "event=change_publish module=events status=ok signal={signal} observers={}",
            observers.len()
        );
        observers.len()
    }

    pub fn subscriber_count(&self, signal: ChangeSignal) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|subscription| subscription.signal == signal)
            .count()
    }
}
