//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals, memos, and
//! effects. It manages the dependency maps and schedules updates when
//! signals change.
//!
//! # How It Works
//!
//! 1. Memos and effects register with the runtime when created.
//!
//! 2. When a memo or effect reads a source, the runtime records the edge.
//!
//! 3. When a source changes, the runtime queues it. When the outermost batch
//!    ends, the runtime:
//!    a. Walks every queued source's dependents, marking them "maybe dirty"
//!    b. Follows memos downstream (a memo is itself a source)
//!    c. Runs each reached effect once
//!
//! # Thread Safety
//!
//! The dependency maps are global `DashMap`s keyed by unique IDs, so handles
//! may be shared across threads. Batch depth and the pending queue are
//! thread-local.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, OnceLock, Weak};

use dashmap::DashMap;
use indexmap::IndexSet;

use super::batch::{self, BatchGuard};
use super::{SourceId, SubscriberId};

/// A trait for types that can be notified when dependencies change.
pub trait Reactive: Send + Sync {
    /// Get the subscriber ID for this reactive value.
    fn subscriber_id(&self) -> SubscriberId;

    /// Mark this reactive value as potentially needing update.
    fn mark_maybe_dirty(&self);

    /// Schedule this reactive value for execution (effects only).
    fn schedule(&self);

    /// Check if this reactive value is an effect (eager) or memo (lazy).
    fn is_eager(&self) -> bool;

    /// The source this value republishes to its own dependents, if any.
    fn source_id(&self) -> Option<SourceId> {
        None
    }
}

/// Handle to a registered reactive value.
///
/// Dropping this handle unregisters the reactive value from the runtime.
pub struct ReactiveHandle {
    subscriber_id: SubscriberId,
}

impl Drop for ReactiveHandle {
    fn drop(&mut self) {
        Runtime::unregister(self.subscriber_id);
    }
}

/// The global reactive runtime.
pub struct Runtime;

// Weak references so the registry never keeps a memo or effect alive.
static REGISTRY: OnceLock<DashMap<SubscriberId, Weak<dyn Reactive>>> = OnceLock::new();
// source -> subscribers reading it, in subscription order.
static DEPENDENTS: OnceLock<DashMap<SourceId, IndexSet<SubscriberId>>> = OnceLock::new();
// subscriber -> sources it read during its last run.
static SOURCES: OnceLock<DashMap<SubscriberId, IndexSet<SourceId>>> = OnceLock::new();

fn registry() -> &'static DashMap<SubscriberId, Weak<dyn Reactive>> {
    REGISTRY.get_or_init(DashMap::new)
}

fn dependents() -> &'static DashMap<SourceId, IndexSet<SubscriberId>> {
    DEPENDENTS.get_or_init(DashMap::new)
}

fn sources() -> &'static DashMap<SubscriberId, IndexSet<SourceId>> {
    SOURCES.get_or_init(DashMap::new)
}

impl Runtime {
    /// Register a reactive value with the runtime.
    ///
    /// Returns a handle that unregisters the value when dropped.
    pub fn register(reactive: Arc<dyn Reactive>) -> ReactiveHandle {
        let id = reactive.subscriber_id();
        registry().insert(id, Arc::downgrade(&reactive));
        ReactiveHandle { subscriber_id: id }
    }

    fn unregister(id: SubscriberId) {
        registry().remove(&id);
        Self::clear_dependencies(id);
    }

    /// Record that a subscriber depends on a source.
    pub fn add_dependency(source: SourceId, subscriber: SubscriberId) {
        dependents().entry(source).or_default().insert(subscriber);
        sources().entry(subscriber).or_default().insert(source);
    }

    /// Remove all dependencies for a subscriber.
    ///
    /// Called before re-running a computation to clear stale dependencies.
    pub fn clear_dependencies(subscriber: SubscriberId) {
        if let Some((_, read)) = sources().remove(&subscriber) {
            for source in read {
                if let Some(mut subs) = dependents().get_mut(&source) {
                    subs.shift_remove(&subscriber);
                }
            }
        }
    }

    /// Drop every edge pointing at a source that no longer exists.
    pub(crate) fn forget_source(source: SourceId) {
        if let Some((_, subs)) = dependents().remove(&source) {
            for subscriber in subs {
                if let Some(mut read) = sources().get_mut(&subscriber) {
                    read.shift_remove(&source);
                }
            }
        }
    }

    /// Number of subscribers currently reading `source`.
    pub fn dependent_count(source: SourceId) -> usize {
        dependents().get(&source).map(|subs| subs.len()).unwrap_or(0)
    }

    /// Number of sources `subscriber` read during its last run.
    pub fn dependency_count(subscriber: SubscriberId) -> usize {
        sources().get(&subscriber).map(|read| read.len()).unwrap_or(0)
    }

    /// Notify all subscribers that a source changed.
    ///
    /// Inside a batch the source is queued; otherwise the change is
    /// propagated before this returns.
    pub fn notify_signal_change(source: SourceId) {
        let _batch = BatchGuard::enter();
        batch::enqueue(source);
    }

    /// Mark everything downstream of `changed` and collect the effects to run.
    ///
    /// Each subscriber is visited at most once, so an effect reached through
    /// several changed sources still runs a single time.
    pub(crate) fn propagate(changed: IndexSet<SourceId>) -> Vec<Arc<dyn Reactive>> {
        let mut queue: VecDeque<SourceId> = changed.into_iter().collect();
        let mut visited = HashSet::new();
        let mut effects = Vec::new();

        while let Some(source) = queue.pop_front() {
            let subscriber_ids: Vec<SubscriberId> = dependents()
                .get(&source)
                .map(|subs| subs.iter().copied().collect())
                .unwrap_or_default();

            for sub_id in subscriber_ids {
                if !visited.insert(sub_id) {
                    continue;
                }
                let Some(reactive) = registry().get(&sub_id).and_then(|weak| weak.upgrade())
                else {
                    continue;
                };

                reactive.mark_maybe_dirty();
                if reactive.is_eager() {
                    effects.push(reactive);
                } else if let Some(downstream) = reactive.source_id() {
                    queue.push_back(downstream);
                }
            }
        }

        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

    struct MockReactive {
        id: SubscriberId,
        dirty: AtomicBool,
        scheduled: AtomicI32,
        eager: bool,
    }

    impl MockReactive {
        fn new(eager: bool) -> Arc<Self> {
            Arc::new(Self {
                id: SubscriberId::new(),
                dirty: AtomicBool::new(false),
                scheduled: AtomicI32::new(0),
                eager,
            })
        }
    }

    impl Reactive for MockReactive {
        fn subscriber_id(&self) -> SubscriberId {
            self.id
        }

        fn mark_maybe_dirty(&self) {
            self.dirty.store(true, Ordering::SeqCst);
        }

        fn schedule(&self) {
            self.scheduled.fetch_add(1, Ordering::SeqCst);
        }

        fn is_eager(&self) -> bool {
            self.eager
        }
    }

    #[test]
    fn runtime_registers_and_unregisters() {
        let reactive = MockReactive::new(false);
        let id = reactive.id;

        let handle = Runtime::register(reactive);
        assert!(registry().contains_key(&id));

        drop(handle);
        assert!(!registry().contains_key(&id));
    }

    #[test]
    fn runtime_notifies_subscribers() {
        let memo = MockReactive::new(false);
        let effect = MockReactive::new(true);
        let source = SourceId::next();

        let _memo_handle = Runtime::register(memo.clone());
        let _effect_handle = Runtime::register(effect.clone());

        Runtime::add_dependency(source, memo.id);
        Runtime::add_dependency(source, effect.id);

        Runtime::notify_signal_change(source);

        assert!(memo.dirty.load(Ordering::SeqCst));
        assert!(effect.dirty.load(Ordering::SeqCst));

        // Only the eager one is scheduled.
        assert_eq!(memo.scheduled.load(Ordering::SeqCst), 0);
        assert_eq!(effect.scheduled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn runtime_clears_dependencies() {
        let reactive = MockReactive::new(false);
        let id = reactive.id;
        let source = SourceId::next();

        let _handle = Runtime::register(reactive.clone());

        Runtime::add_dependency(source, id);
        assert_eq!(Runtime::dependent_count(source), 1);
        assert_eq!(Runtime::dependency_count(id), 1);

        Runtime::clear_dependencies(id);
        assert_eq!(Runtime::dependent_count(source), 0);
        assert_eq!(Runtime::dependency_count(id), 0);
    }

    #[test]
    fn forgotten_source_drops_its_edges() {
        let reactive = MockReactive::new(true);
        let source = SourceId::next();
        let _handle = Runtime::register(reactive.clone());

        Runtime::add_dependency(source, reactive.id);
        Runtime::forget_source(source);

        assert_eq!(Runtime::dependent_count(source), 0);
        assert_eq!(Runtime::dependency_count(reactive.id), 0);
    }

    #[test]
    fn effect_reached_twice_is_scheduled_once() {
        let effect = MockReactive::new(true);
        let (a, b) = (SourceId::next(), SourceId::next());
        let _handle = Runtime::register(effect.clone());

        Runtime::add_dependency(a, effect.id);
        Runtime::add_dependency(b, effect.id);

        batch::batch(|| {
            Runtime::notify_signal_change(a);
            Runtime::notify_signal_change(b);
            assert_eq!(effect.scheduled.load(Ordering::SeqCst), 0);
        });

        assert_eq!(effect.scheduled.load(Ordering::SeqCst), 1);
    }
}
