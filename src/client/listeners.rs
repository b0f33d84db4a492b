//! Ordered listener sets with drop-to-unsubscribe handles.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Inner<T> {
    next_id: u64,
    listeners: Vec<(u64, Callback<T>)>,
}

fn lock<T>(inner: &Mutex<Inner<T>>) -> MutexGuard<'_, Inner<T>> {
    // A panicking listener must not wedge the set.
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Listeners invoked synchronously, in registration order.
pub struct ListenerSet<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T: 'static> ListenerSet<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Register `listener`; it stays registered until the handle is released.
    #[must_use = "dropping the subscription unregisters the listener"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut inner = lock(&self.inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push((id, Arc::new(listener)));

        let weak: Weak<Mutex<Inner<T>>> = Arc::downgrade(&self.inner);
        Subscription {
            release: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    lock(&inner).listeners.retain(|(lid, _)| *lid != id);
                }
            })),
        }
    }

    /// Call every listener with `value`, each finishing before the next.
    ///
    /// Listeners may subscribe or unsubscribe from inside the callback;
    /// such changes apply from the next notification on.
    pub fn notify(&self, value: &T) {
        let snapshot: Vec<Callback<T>> = lock(&self.inner)
            .listeners
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for listener in snapshot {
            listener(value);
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Default for ListenerSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by [`ListenerSet::subscribe`]. Dropping it unregisters.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Unregister now.
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    /// Keep the listener registered for the lifetime of its set.
    pub fn detach(mut self) {
        self.release = None;
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listeners_run_in_registration_order() {
        let set: ListenerSet<u32> = ListenerSet::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let l1 = Arc::clone(&log);
        let _a = set.subscribe(move |v| l1.lock().unwrap().push(("a", *v)));
        let l2 = Arc::clone(&log);
        let _b = set.subscribe(move |v| l2.lock().unwrap().push(("b", *v)));

        set.notify(&7);
        assert_eq!(*log.lock().unwrap(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn dropping_handle_unsubscribes() {
        let set: ListenerSet<u32> = ListenerSet::new();
        let hits = Arc::new(Mutex::new(0));

        let h = Arc::clone(&hits);
        let sub = set.subscribe(move |_| *h.lock().unwrap() += 1);
        set.notify(&1);
        drop(sub);
        set.notify(&2);

        assert_eq!(*hits.lock().unwrap(), 1);
        assert!(set.is_empty());
    }

    #[test]
    fn detached_listener_stays_registered() {
        let set: ListenerSet<u32> = ListenerSet::new();
        set.subscribe(|_| {}).detach();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn handle_outliving_set_is_harmless() {
        let set: ListenerSet<u32> = ListenerSet::new();
        let sub = set.subscribe(|_| {});
        drop(set);
        sub.unsubscribe();
    }
}
