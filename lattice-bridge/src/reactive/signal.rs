//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a reactive context (memo/effect), the
//!    signal registers that context as a subscriber.
//!
//! 2. When a signal's value changes, its subscribers are notified through the
//!    runtime, once per batch.
//!
//! 3. Writing a value equal to the current one is not a change.
//!
//! # Thread Safety
//!
//! The value is protected by a `parking_lot::RwLock`; clones share it.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::context::{untracked, ReactiveContext};
use super::effect::{Effect, Subscription};
use super::runtime::Runtime;
use super::source::{ReadSignal, Trackable};
use super::SourceId;

/// A reactive signal holding a value of type T.
///
/// # Example
///
/// ```rust
/// use lattice_bridge::reactive::Signal;
///
/// let count = Signal::new(0);
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    inner: Arc<SignalInner<T>>,
}

struct SignalInner<T> {
    id: SourceId,
    value: RwLock<T>,
    /// Bumped on every effective write.
    version: AtomicU64,
}

impl<T> Drop for SignalInner<T> {
    fn drop(&mut self) {
        Runtime::forget_source(self.id);
    }
}

impl<T> Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                id: SourceId::next(),
                value: RwLock::new(value),
                version: AtomicU64::new(0),
            }),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> SourceId {
        self.inner.id
    }

    /// Get the current value.
    ///
    /// If called within a reactive context, this also registers the
    /// current computation as a subscriber.
    pub fn get(&self) -> T {
        if let Some(subscriber_id) = ReactiveContext::current_subscriber() {
            ReactiveContext::track_dependency(self.inner.id);
            Runtime::add_dependency(self.inner.id, subscriber_id);
        }
        self.inner.value.read().clone()
    }

    /// Get the current value without tracking dependencies.
    pub fn peek(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Set a new value and notify subscribers.
    ///
    /// Does nothing if `value` equals the current value.
    pub fn set(&self, value: T) {
        {
            let mut guard = self.inner.value.write();
            if *guard == value {
                return;
            }
            *guard = value;
            self.inner.version.fetch_add(1, Ordering::AcqRel);
        }

        Runtime::notify_signal_change(self.inner.id);
    }

    /// Update the value using a function of the current one.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let new_value = {
            let guard = self.inner.value.read();
            f(&guard)
        };
        self.set(new_value);
    }

    /// Number of effective writes so far.
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    /// Call `listener` with the current value now and after every change.
    ///
    /// The listener itself runs untracked. Dropping the returned
    /// [`Subscription`] stops delivery.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let signal = self.clone();
        Subscription::new(Effect::new(move || {
            let value = signal.get();
            untracked(|| listener(value));
        }))
    }

    /// Get the number of subscribers.
    pub fn dependent_count(&self) -> usize {
        Runtime::dependent_count(self.inner.id)
    }
}

impl<T> Trackable for Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn source_id(&self) -> SourceId {
        self.id()
    }

    fn track(&self) -> u64 {
        if let Some(subscriber_id) = ReactiveContext::current_subscriber() {
            ReactiveContext::track_dependency(self.inner.id);
            Runtime::add_dependency(self.inner.id, subscriber_id);
        }
        self.version()
    }

    fn version(&self) -> u64 {
        Signal::version(self)
    }

    fn share(&self) -> Arc<dyn Trackable> {
        Arc::new(self.clone())
    }
}

impl<T> ReadSignal for Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    type Value = T;

    fn get(&self) -> T {
        Signal::get(self)
    }

    fn peek(&self) -> T {
        Signal::peek(self)
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + PartialEq + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.id)
            .field("value", &self.peek())
            .field("version", &self.version())
            .finish()
    }
}
