//! Mounted component instances and the update queue they report to.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use indexmap::IndexSet;
use parking_lot::Mutex;
use smallvec::SmallVec;

use super::node::ComponentNode;
use crate::reactive::Cleanup;

/// Identity of one mounted component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Identity keys an [`after_commit`](super::Scope::after_commit) effect
/// depends on.
pub type Deps = SmallVec<[u64; 4]>;

pub(crate) type Slot = Box<dyn Any + Send>;

/// Committed state of one `after_commit` hook.
#[derive(Default)]
pub(crate) struct EffectSlot {
    pub(crate) committed: bool,
    pub(crate) deps: Option<Deps>,
    pub(crate) cleanup: Option<Cleanup>,
    pub(crate) unmounted: bool,
}

pub(crate) type SharedEffect = Arc<Mutex<EffectSlot>>;

/// An effect queued during render, run at commit.
pub(crate) struct PendingEffect {
    pub(crate) slot: SharedEffect,
    pub(crate) deps: Option<Deps>,
    pub(crate) run: Box<dyn FnOnce() -> Option<Cleanup> + Send>,
}

impl PendingEffect {
    /// Tear down the previous run, then run this one.
    pub(crate) fn commit(self) {
        let previous = {
            let mut slot = self.slot.lock();
            if slot.unmounted {
                return;
            }
            slot.committed = true;
            slot.deps = self.deps;
            slot.cleanup.take()
        };
        if let Some(cleanup) = previous {
            cleanup();
        }

        let cleanup = (self.run)();

        let mut slot = self.slot.lock();
        if slot.unmounted {
            drop(slot);
            if let Some(cleanup) = cleanup {
                cleanup();
            }
        } else {
            slot.cleanup = cleanup;
        }
    }
}

pub(crate) struct Instance {
    pub(crate) id: InstanceId,
    pub(crate) depth: usize,
    pub(crate) node: ComponentNode,
    pub(crate) slots: Vec<Slot>,
    pub(crate) effects: Vec<SharedEffect>,
    pub(crate) children: Vec<Mounted>,
    pub(crate) renders: u64,
}

impl Instance {
    pub(crate) fn new(id: InstanceId, depth: usize, node: ComponentNode) -> Self {
        Self {
            id,
            depth,
            node,
            slots: Vec::new(),
            effects: Vec::new(),
            children: Vec::new(),
            renders: 0,
        }
    }
}

/// What occupies one reconciler position.
pub(crate) enum Mounted {
    Empty,
    Text(String),
    Component(Arc<Mutex<Instance>>),
}

/// Shared between a root and every setter it hands out.
#[derive(Default)]
pub(crate) struct UpdateQueue {
    pub(crate) dirty: Mutex<IndexSet<InstanceId>>,
    pub(crate) live: DashMap<InstanceId, Arc<Mutex<Instance>>>,
}

/// Schedules a re-render of one instance.
///
/// Holds the queue weakly; once the instance or its root is gone, scheduling
/// is a no-op.
#[derive(Clone)]
pub struct Updater {
    queue: Weak<UpdateQueue>,
    id: InstanceId,
}

impl Updater {
    pub(crate) fn new(queue: &Arc<UpdateQueue>, id: InstanceId) -> Self {
        Self {
            queue: Arc::downgrade(queue),
            id,
        }
    }

    /// The instance this updater re-renders.
    pub fn instance_id(&self) -> InstanceId {
        self.id
    }

    /// Whether the instance is still mounted.
    pub fn is_live(&self) -> bool {
        self.queue
            .upgrade()
            .is_some_and(|queue| queue.live.contains_key(&self.id))
    }

    /// Mark the instance dirty; it re-renders on the root's next flush.
    pub fn schedule(&self) {
        match self.queue.upgrade() {
            Some(queue) if queue.live.contains_key(&self.id) => {
                queue.dirty.lock().insert(self.id);
            }
            _ => tracing::trace!(instance = ?self.id, "update to unmounted instance ignored"),
        }
    }
}

impl std::fmt::Debug for Updater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Updater")
            .field("instance", &self.id)
            .field("live", &self.is_live())
            .finish()
    }
}
