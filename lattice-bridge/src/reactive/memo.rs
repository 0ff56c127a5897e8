//! Memo Implementation
//!
//! A Memo is a cached derived value that re-evaluates only when its
//! dependencies change.
//!
//! # How Memos Work
//!
//! 1. On first access, the memo runs its computation and caches the result.
//!
//! 2. When accessed again, if no dependencies have changed, returns cached value.
//!
//! 3. When a dependency changes, the memo is marked "maybe dirty" and the
//!    runtime forwards the notification to the memo's own dependents.
//!
//! 4. On next access, the memo recomputes. Its version only moves when the
//!    new value differs from the cached one, so listeners comparing versions
//!    ignore recomputations that produced the same value.
//!
//! Memos are lazy: a memo nobody reads never recomputes.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::context::{untracked, ReactiveContext};
use super::runtime::{Reactive, ReactiveHandle, Runtime};
use super::source::{ReadSignal, Trackable};
use super::{SourceId, SubscriberId};

/// Dirty state for a memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoState {
    /// The cached value is up-to-date.
    Clean,

    /// A dependency might have changed. Need to check.
    MaybeDirty,

    /// The memo definitely needs to recompute.
    Dirty,
}

/// A cached derived value that recomputes only when dependencies change.
///
/// The PartialEq bound is needed to detect when the computed value actually
/// changed (some memos return the same value even if inputs changed).
pub struct Memo<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    inner: Arc<MemoInner<T>>,
    _handle: Arc<ReactiveHandle>,
}

struct MemoInner<T> {
    /// Identity as a readable node.
    source: SourceId,

    /// Identity as a reader of other nodes.
    subscriber_id: SubscriberId,

    compute: Arc<dyn Fn() -> T + Send + Sync>,

    /// The cached value (None if never computed).
    value: RwLock<Option<T>>,

    state: RwLock<MemoState>,

    version: AtomicU64,
}

impl<T> Drop for MemoInner<T> {
    fn drop(&mut self) {
        Runtime::forget_source(self.source);
    }
}

impl<T> Reactive for MemoInner<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }

    fn mark_maybe_dirty(&self) {
        let mut state = self.state.write();
        if *state == MemoState::Clean {
            *state = MemoState::MaybeDirty;
        }
    }

    fn schedule(&self) {}

    fn is_eager(&self) -> bool {
        false
    }

    fn source_id(&self) -> Option<SourceId> {
        Some(self.source)
    }
}

impl<T> MemoInner<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn refresh(&self) -> T {
        let state = *self.state.read();
        if state == MemoState::Clean {
            if let Some(value) = self.value.read().clone() {
                return value;
            }
        }
        self.recompute()
    }

    /// Run the computation inside this memo's own tracking context.
    fn recompute(&self) -> T {
        Runtime::clear_dependencies(self.subscriber_id);

        let new_value = {
            let _ctx = ReactiveContext::enter(self.subscriber_id);
            (self.compute)()
        };

        let changed = {
            let mut cached = self.value.write();
            let changed = cached.as_ref() != Some(&new_value);
            if changed {
                *cached = Some(new_value.clone());
            }
            changed
        };
        if changed {
            self.version.fetch_add(1, Ordering::AcqRel);
        }

        *self.state.write() = MemoState::Clean;
        new_value
    }
}

impl<T> Memo<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a new memo with the given computation function.
    ///
    /// The computation is not run immediately. It runs on first access.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let inner = Arc::new(MemoInner {
            source: SourceId::next(),
            subscriber_id: SubscriberId::new(),
            compute: Arc::new(compute),
            value: RwLock::new(None),
            state: RwLock::new(MemoState::Dirty),
            version: AtomicU64::new(0),
        });
        let handle = Runtime::register(inner.clone());

        Self {
            inner,
            _handle: Arc::new(handle),
        }
    }

    /// Get the memo's unique ID.
    pub fn id(&self) -> SourceId {
        self.inner.source
    }

    /// Get the subscriber ID for this memo.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.subscriber_id
    }

    /// Get the current value, recomputing if necessary.
    ///
    /// Inside a reactive context the caller becomes a dependent of the memo.
    pub fn get(&self) -> T {
        if let Some(current) = ReactiveContext::current_subscriber() {
            ReactiveContext::track_dependency(self.inner.source);
            Runtime::add_dependency(self.inner.source, current);
        }
        self.inner.refresh()
    }

    /// Get the current value without tracking.
    pub fn peek(&self) -> T {
        untracked(|| self.inner.refresh())
    }

    /// Mark the memo as potentially needing recomputation.
    pub fn mark_maybe_dirty(&self) {
        self.inner.mark_maybe_dirty();
    }

    /// Mark the memo as definitely needing recomputation.
    pub fn mark_dirty(&self) {
        *self.inner.state.write() = MemoState::Dirty;
    }

    /// Get the current dirty state.
    pub fn state(&self) -> MemoState {
        *self.inner.state.read()
    }

    /// Number of distinct values produced so far (first computation included).
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    /// Get the number of dependents.
    pub fn dependent_count(&self) -> usize {
        Runtime::dependent_count(self.inner.source)
    }

    /// Check if the memo has a cached value.
    pub fn has_value(&self) -> bool {
        self.inner.value.read().is_some()
    }
}

impl<T> Trackable for Memo<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn source_id(&self) -> SourceId {
        self.id()
    }

    fn track(&self) -> u64 {
        self.get();
        Memo::version(self)
    }

    fn version(&self) -> u64 {
        self.peek();
        Memo::version(self)
    }

    fn share(&self) -> Arc<dyn Trackable> {
        Arc::new(self.clone())
    }
}

impl<T> ReadSignal for Memo<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    type Value = T;

    fn get(&self) -> T {
        Memo::get(self)
    }

    fn peek(&self) -> T {
        Memo::peek(self)
    }
}

impl<T> Clone for Memo<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _handle: Arc::clone(&self._handle),
        }
    }
}

impl<T> Debug for Memo<T>
where
    T: Clone + PartialEq + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo")
            .field("id", &self.inner.source)
            .field("state", &self.state())
            .field("has_value", &self.has_value())
            .field("dependent_count", &self.dependent_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{batch, Signal};
    use std::sync::atomic::AtomicI32;

    #[test]
    fn memo_computes_on_first_access() {
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let memo = Memo::new(move || {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
            42
        });

        assert!(!memo.has_value());
        assert_eq!(call_count.load(Ordering::SeqCst), 0);

        assert_eq!(memo.get(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(memo.has_value());
    }

    #[test]
    fn memo_caches_value_when_clean() {
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let memo = Memo::new(move || {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
            42
        });

        assert_eq!(memo.get(), 42);
        assert_eq!(memo.get(), 42);
        assert_eq!(memo.get(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn memo_recomputes_when_a_dependency_changes() {
        let base = Signal::new(5);
        let base_clone = base.clone();
        let doubled = Memo::new(move || base_clone.get() * 2);

        assert_eq!(doubled.get(), 10);
        assert_eq!(base.dependent_count(), 1);

        base.set(7);
        assert_eq!(doubled.state(), MemoState::MaybeDirty);
        assert_eq!(doubled.get(), 14);
        assert_eq!(doubled.state(), MemoState::Clean);
    }

    #[test]
    fn memo_chain_propagates_without_manual_marking() {
        let base = Signal::new(1);
        let b = base.clone();
        let doubled = Memo::new(move || b.get() * 2);
        let d = doubled.clone();
        let plus_ten = Memo::new(move || d.get() + 10);

        assert_eq!(plus_ten.get(), 12);

        base.set(10);
        assert_eq!(plus_ten.get(), 30);
    }

    #[test]
    fn version_moves_only_when_the_value_changes() {
        let input = Signal::new(4);
        let i = input.clone();
        let parity = Memo::new(move || i.get() % 2);

        assert_eq!(parity.get(), 0);
        assert_eq!(parity.version(), 1);

        input.set(6);
        assert_eq!(parity.get(), 0);
        assert_eq!(parity.version(), 1);

        input.set(7);
        assert_eq!(parity.get(), 1);
        assert_eq!(parity.version(), 2);
    }

    #[test]
    fn effect_downstream_of_memo_runs_once_per_batch() {
        let a = Signal::new(1);
        let b = Signal::new(2);
        let (a2, b2) = (a.clone(), b.clone());
        let sum = Memo::new(move || a2.get() + b2.get());

        let runs = Arc::new(AtomicI32::new(0));
        let runs_clone = runs.clone();
        let sum_clone = sum.clone();
        let _sub = crate::reactive::Subscription::new(crate::reactive::Effect::new(move || {
            sum_clone.get();
            runs_clone.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        batch(|| {
            a.set(10);
            b.set(20);
        });

        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(sum.peek(), 30);
    }

    #[test]
    fn memo_clone_shares_state() {
        let memo1 = Memo::new(|| 42);
        assert_eq!(memo1.get(), 42);

        let memo2 = memo1.clone();
        assert_eq!(memo1.id(), memo2.id());
        assert!(memo2.has_value());

        memo1.mark_dirty();
        assert_eq!(memo2.state(), MemoState::Dirty);
    }

    #[test]
    fn memo_state_transitions() {
        let memo = Memo::new(|| 42);

        assert_eq!(memo.state(), MemoState::Dirty);

        memo.get();
        assert_eq!(memo.state(), MemoState::Clean);

        memo.mark_maybe_dirty();
        assert_eq!(memo.state(), MemoState::MaybeDirty);

        memo.mark_dirty();
        assert_eq!(memo.state(), MemoState::Dirty);

        memo.get();
        assert_eq!(memo.state(), MemoState::Clean);
    }
}
