use std::{
    fmt,
    future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use indexmap::IndexMap;
use snip_analysis::ValueSource;
use snip_core::Value;
use tracing::trace;

use crate::resolver::{BindingResolver, ResolveFuture, ResolvedBinding};

/// What a successful mutation of a [`ValueStore`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueChange {
    Added { name: String },
    Updated { name: String },
    Removed { name: String },
}

impl ValueChange {
    pub fn name(&self) -> &str {
        match self {
            ValueChange::Added { name }
            | ValueChange::Updated { name }
            | ValueChange::Removed { name } => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Arc<dyn Fn(&ValueChange) + Send + Sync>;

/// Named values set by the host, readable by compiled fragments.
///
/// Observers are notified once after every successful `add` or `remove`, and never while the
/// store is locked, so they are free to read it.
#[derive(Default)]
pub struct ValueStore {
    values: Mutex<IndexMap<String, Value>>,
    observers: Mutex<Vec<(SubscriptionId, Observer)>>,
    next_subscription: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value` and notifies observers. Returns `false` if `name` already had that
    /// value.
    pub fn add(&self, name: impl Into<String>, value: impl Into<Value>) -> bool {
        let name = name.into();
        let value = value.into();
        let (change, changed) = {
            let mut values = lock(&self.values);
            match values.insert(name.clone(), value.clone()) {
                None => (ValueChange::Added { name }, true),
                Some(old) => (ValueChange::Updated { name }, old != value),
            }
        };
        self.notify(&change);
        changed
    }

    /// Removes the value named `name`, whatever it is; `value` is not compared. Returns `false`,
    /// without notifying observers, if there was no value named `name`.
    pub fn remove(&self, name: &str, _value: impl Into<Value>) -> bool {
        if lock(&self.values).shift_remove(name).is_none() {
            return false;
        }
        self.notify(&ValueChange::Removed {
            name: name.to_owned(),
        });
        true
    }

    pub fn try_get(&self, name: &str) -> Option<Value> {
        lock(&self.values).get(name).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.values).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.values).is_empty()
    }

    /// The store's contents as bindings, typed after their values, in the order names were
    /// first added.
    pub fn bindings(&self) -> Vec<ResolvedBinding> {
        lock(&self.values)
            .iter()
            .map(|(name, value)| ResolvedBinding::new(name.as_str(), value.clone()))
            .collect()
    }

    pub fn subscribe(
        &self,
        observer: impl Fn(&ValueChange) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        lock(&self.observers).push((id, Arc::new(observer)));
        id
    }

    /// Returns `false` if there was no such subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = lock(&self.observers);
        let len = observers.len();
        observers.retain(|(subscription, _)| *subscription != id);
        observers.len() != len
    }

    fn notify(&self, change: &ValueChange) {
        trace!(?change, "value store changed");
        let observers: Vec<_> = lock(&self.observers)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer(change);
        }
    }
}

impl fmt::Debug for ValueStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueStore")
            .field("values", &*lock(&self.values))
            .field("observers", &lock(&self.observers).len())
            .finish()
    }
}

impl ValueSource for ValueStore {
    fn value(&self, key: &str) -> Option<Value> {
        self.try_get(key)
    }
}

/// Resolves to the store's current contents.
impl BindingResolver for ValueStore {
    fn resolve(&self) -> ResolveFuture<'_> {
        Box::pin(future::ready(Ok(self.bindings())))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn counting(store: &ValueStore) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let observed = Arc::clone(&count);
        store.subscribe(move |_| {
            observed.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    #[test]
    fn add_then_remove_notifies_twice() {
        let store = ValueStore::new();
        let notifications = counting(&store);

        assert!(store.add("a", 1_i64));
        assert_eq!(store.try_get("a"), Some(Value::Int(1)));
        assert!(store.remove("a", "anything"));
        assert_eq!(store.try_get("a"), None);
        assert_eq!(notifications.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn removal_ignores_the_value() {
        let store = ValueStore::new();
        store.add("a", 1_i64);
        assert!(store.remove("a", 2_i64));
        assert!(store.is_empty());
    }

    #[test]
    fn every_add_notifies_but_only_changes_report_true() {
        let store = ValueStore::new();
        let notifications = counting(&store);

        assert!(store.add("a", 1_i64));
        assert!(!store.add("a", 1_i64));
        assert!(store.add("a", 2_i64));
        assert_eq!(notifications.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn removing_a_missing_name_does_not_notify() {
        let store = ValueStore::new();
        let notifications = counting(&store);
        assert!(!store.remove("b", Value::Null));
        assert_eq!(notifications.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn observers_see_the_change_after_it_happened() {
        let store = Arc::new(ValueStore::new());
        let seen = Arc::new(Mutex::new(vec![]));
        {
            let store_ref = Arc::downgrade(&store);
            let seen = Arc::clone(&seen);
            store.subscribe(move |change| {
                let store = store_ref.upgrade().unwrap();
                seen.lock()
                    .unwrap()
                    .push((change.clone(), store.try_get(change.name())));
            });
        }
        store.add("x", "hello");
        store.remove("x", Value::Null);

        assert_eq!(
            *seen.lock().unwrap(),
            [
                (
                    ValueChange::Added { name: "x".into() },
                    Some(Value::from("hello"))
                ),
                (ValueChange::Removed { name: "x".into() }, None),
            ]
        );
    }

    #[test]
    fn unsubscribed_observers_are_not_called() {
        let store = ValueStore::new();
        let count = Arc::new(AtomicUsize::new(0));
        let observed = Arc::clone(&count);
        let id = store.subscribe(move |_| {
            observed.fetch_add(1, Ordering::SeqCst);
        });
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.add("a", true);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn bindings_are_typed_after_values() {
        let store = ValueStore::new();
        store.add("count", 3_i64);
        store.add("label", "three");
        let bindings = store.bindings();
        assert_eq!(bindings[0], ResolvedBinding::new("count", 3_i64));
        assert_eq!(bindings[1].ty, snip_core::Type::String);
    }
}
