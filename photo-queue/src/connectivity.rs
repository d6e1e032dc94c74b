//! Network reachability signal
//!
//! The host feeds reachability through [`ConnectivityMonitor::set_online`].
//! Only transitions are published: callbacks registered with
//! [`ConnectivityMonitor::observe_connectivity`] and `watch` subscribers see
//! a value only when it differs from the previous one.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

type Callback = Arc<dyn Fn(bool) + Send + Sync>;

struct Observers {
    next_id: AtomicU64,
    callbacks: Mutex<BTreeMap<u64, Callback>>,
}

#[derive(Clone)]
pub struct ConnectivityMonitor {
    state: Arc<watch::Sender<bool>>,
    observers: Arc<Observers>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (tx, _rx) = watch::channel(initially_online);
        Self {
            state: Arc::new(tx),
            observers: Arc::new(Observers {
                next_id: AtomicU64::new(0),
                callbacks: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    pub fn is_online(&self) -> bool {
        *self.state.borrow()
    }

    /// Records the current reachability. Returns true if this was a transition.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });

        if changed {
            log::info!(
                "Connectivity changed: {}",
                if online { "online" } else { "offline" }
            );
            // Clone out so callbacks may register or drop handles themselves
            let callbacks: Vec<Callback> = match self.observers.callbacks.lock() {
                Ok(guard) => guard.values().cloned().collect(),
                Err(_) => {
                    log::error!("Connectivity observer list poisoned");
                    Vec::new()
                }
            };
            for callback in callbacks {
                callback(online);
            }
        }

        changed
    }

    /// Registers `callback` for every reachability transition
    pub fn observe_connectivity<F>(&self, callback: F) -> ObserverHandle
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let id = self.observers.next_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.observers.callbacks.lock() {
            guard.insert(id, Arc::new(callback));
        }
        ObserverHandle {
            id,
            observers: Arc::downgrade(&self.observers),
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers
            .callbacks
            .lock()
            .map(|guard| guard.len())
            .unwrap_or(0)
    }

    /// Async view of the signal; `changed()` resolves on each transition
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }
}

/// Deregisters its callback when dropped or explicitly unregistered
#[must_use = "dropping the handle deregisters the callback"]
pub struct ObserverHandle {
    id: u64,
    observers: std::sync::Weak<Observers>,
}

impl ObserverHandle {
    pub fn unregister(self) {
        // Drop does the work
    }
}

impl Drop for ObserverHandle {
    fn drop(&mut self) {
        if let Some(observers) = self.observers.upgrade() {
            if let Ok(mut guard) = observers.callbacks.lock() {
                guard.remove(&self.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_only_transitions_notify() {
        let monitor = ConnectivityMonitor::new(false);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let _handle =
            monitor.observe_connectivity(move |online| seen_clone.lock().unwrap().push(online));

        assert!(!monitor.set_online(false));
        assert!(monitor.set_online(true));
        assert!(!monitor.set_online(true));
        assert!(monitor.set_online(false));

        assert_eq!(*seen.lock().unwrap(), vec![true, false]);
        assert!(!monitor.is_online());
    }

    #[test]
    fn test_dropping_handle_deregisters() {
        let monitor = ConnectivityMonitor::new(true);
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_clone = calls.clone();
        let handle = monitor.observe_connectivity(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(monitor.observer_count(), 1);

        monitor.set_online(false);
        handle.unregister();
        assert_eq!(monitor.observer_count(), 0);

        monitor.set_online(true);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let monitor = ConnectivityMonitor::new(false);
        let mut rx = monitor.subscribe();

        monitor.set_online(true);
        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());
    }
}
