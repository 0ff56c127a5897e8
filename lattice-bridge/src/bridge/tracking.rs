//! Read Tracking
//!
//! A [`ReadTracker`] records which signals a render read, so the instance can
//! be subscribed to exactly that set once the render commits.
//!
//! # How Tracking Works
//!
//! 1. `use_tracked_reads` clears the tracker's read set at the start of every
//!    render. Nothing from a previous render carries over.
//!
//! 2. Each tracked read returns the value via `peek` and appends the signal,
//!    with the version it was read at, to the read set. Reading never touches
//!    the signal graph.
//!
//! 3. After commit the read set is compared with the installed listener's
//!    set. Equal sets keep the listener; otherwise the old listener is torn
//!    down and a new one installed over the new set.
//!
//! 4. When a source moves past the version the render saw, the listener
//!    bumps a counter in local state, which schedules one re-render.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;

use super::hooks::{listen, Versions};
use crate::error::Result;
use crate::host::{Deps, Scope, StateSetter};
use crate::reactive::{Cleanup, ReadSignal, Subscription, Trackable};

/// How a render-time read is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadPolicy {
    /// Subscribe the instance to the signal.
    #[default]
    Tracked,
    /// Return the value only.
    Untracked,
}

/// Render-scoped reader handed out by [`TrackedReads::use_tracked_reads`].
#[derive(Clone)]
pub struct ReadTracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    reads: Mutex<SmallVec<[(Arc<dyn Trackable>, u64); 4]>>,
    installed: Mutex<Option<Installed>>,
    push: StateSetter<u64>,
}

struct Installed {
    ids: Deps,
    _subscription: Subscription,
}

impl ReadTracker {
    fn new(push: StateSetter<u64>) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                reads: Mutex::new(SmallVec::new()),
                installed: Mutex::new(None),
                push,
            }),
        }
    }

    /// Read `signal` under `policy`.
    pub fn read<S: ReadSignal>(&self, signal: &S, policy: ReadPolicy) -> S::Value {
        if policy == ReadPolicy::Tracked {
            self.record(signal);
        }
        signal.peek()
    }

    /// Tracked read.
    pub fn get<S: ReadSignal>(&self, signal: &S) -> S::Value {
        self.read(signal, ReadPolicy::Tracked)
    }

    /// Untracked read.
    pub fn peek<S: ReadSignal>(&self, signal: &S) -> S::Value {
        self.read(signal, ReadPolicy::Untracked)
    }

    /// Number of distinct signals tracked by the current render.
    pub fn tracked_count(&self) -> usize {
        self.inner.reads.lock().len()
    }

    /// Whether a listener is installed right now.
    pub fn is_subscribed(&self) -> bool {
        self.inner.installed.lock().is_some()
    }

    fn record<S: ReadSignal>(&self, signal: &S) {
        let id = signal.source_id();
        let mut reads = self.inner.reads.lock();
        if reads.iter().all(|(read, _)| read.source_id() != id) {
            reads.push((signal.share(), signal.version()));
        }
    }

    fn begin_render(&self) {
        self.inner.reads.lock().clear();
    }

    /// Reconcile the installed listener with the committed read set.
    fn commit(&self) {
        let (sources, seen): (Vec<Arc<dyn Trackable>>, Versions) =
            self.inner.reads.lock().iter().cloned().unzip();
        let ids: Deps = sources.iter().map(|source| source.source_id().raw()).collect();

        let previous = {
            let mut installed = self.inner.installed.lock();
            if installed.as_ref().map(|current| &current.ids) == Some(&ids) {
                return;
            }
            if installed.is_none() && ids.is_empty() {
                return;
            }
            installed.take()
        };
        if previous.is_some() {
            tracing::trace!("tracked read set changed, listener torn down");
        }
        drop(previous);

        if sources.is_empty() {
            return;
        }

        tracing::trace!(sources = ids.len(), "tracked read listener installed");
        let push = self.inner.push.clone();
        let subscription = listen(sources, seen, move || push.update(|tick| tick.wrapping_add(1)));
        *self.inner.installed.lock() = Some(Installed {
            ids,
            _subscription: subscription,
        });
    }

    fn release(&self) {
        let installed = self.inner.installed.lock().take();
        if installed.is_some() {
            tracing::trace!("tracked read listener released");
        }
    }
}

impl fmt::Debug for ReadTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadTracker")
            .field("tracked", &self.tracked_count())
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}

/// Installs a [`ReadTracker`] on a [`Scope`].
pub trait TrackedReads {
    /// A tracker whose tracked reads this render subscribe the instance.
    fn use_tracked_reads(&mut self) -> Result<ReadTracker>;
}

impl TrackedReads for Scope<'_> {
    fn use_tracked_reads(&mut self) -> Result<ReadTracker> {
        let (_, push) = self.use_state(|| 0u64)?;
        let tracker = self.memo_once(|| ReadTracker::new(push.clone()))?;
        tracker.begin_render();

        let on_commit = tracker.clone();
        self.after_commit(None, move || {
            on_commit.commit();
            None
        })?;

        let on_unmount = tracker.clone();
        self.after_commit(Some(Deps::new()), move || {
            Some(Box::new(move || on_unmount.release()) as Cleanup)
        })?;

        Ok(tracker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Component, Node, Root};
    use crate::reactive::{Effect, Signal};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Reader {
        a: Signal<i32>,
        b: Signal<i32>,
        use_b: Signal<bool>,
        policy: ReadPolicy,
        renders: Arc<AtomicUsize>,
        tracker: Arc<Mutex<Option<ReadTracker>>>,
    }

    impl Component for Reader {
        fn render(&self, cx: &mut Scope<'_>) -> Result<Node> {
            self.renders.fetch_add(1, Ordering::SeqCst);
            let reads = cx.use_tracked_reads()?;
            *self.tracker.lock() = Some(reads.clone());
            let value = if reads.peek(&self.use_b) {
                reads.read(&self.b, self.policy)
            } else {
                reads.read(&self.a, self.policy)
            };
            Ok(Node::text(value.to_string()))
        }
    }

    fn reader(policy: ReadPolicy) -> (Reader, Arc<AtomicUsize>, Arc<Mutex<Option<ReadTracker>>>) {
        let renders = Arc::new(AtomicUsize::new(0));
        let tracker = Arc::new(Mutex::new(None));
        let component = Reader {
            a: Signal::new(1),
            b: Signal::new(10),
            use_b: Signal::new(false),
            policy,
            renders: renders.clone(),
            tracker: tracker.clone(),
        };
        (component, renders, tracker)
    }

    // ---------------------------------------------------------------
    // Tracked reads
    // ---------------------------------------------------------------

    #[test]
    fn tracked_read_rerenders_on_change() {
        let (component, renders, _) = reader(ReadPolicy::Tracked);
        let a = component.a.clone();
        let mut root = Root::new();
        root.render(Node::component(component)).unwrap();
        assert_eq!(root.text(), "1");
        assert_eq!(a.dependent_count(), 1);

        root.act(|| a.set(2)).unwrap();
        assert_eq!(root.text(), "2");
        assert_eq!(renders.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn untracked_read_never_rerenders() {
        let (component, renders, tracker) = reader(ReadPolicy::Untracked);
        let a = component.a.clone();
        let mut root = Root::new();
        root.render(Node::component(component)).unwrap();

        root.act(|| a.set(2)).unwrap();
        assert_eq!(root.text(), "1");
        assert_eq!(renders.load(Ordering::SeqCst), 1);
        assert!(!tracker.lock().as_ref().unwrap().is_subscribed());
        assert_eq!(a.dependent_count(), 0);
    }

    #[test]
    fn repeated_reads_are_tracked_once() {
        struct Twice(Signal<i32>);

        impl Component for Twice {
            fn render(&self, cx: &mut Scope<'_>) -> Result<Node> {
                let reads = cx.use_tracked_reads()?;
                let sum = reads.get(&self.0) + reads.get(&self.0);
                assert_eq!(reads.tracked_count(), 1);
                Ok(Node::text(sum.to_string()))
            }
        }

        let signal = Signal::new(2);
        let mut root = Root::new();
        root.render(Node::component(Twice(signal.clone()))).unwrap();
        assert_eq!(root.text(), "4");
        assert_eq!(signal.dependent_count(), 1);
    }

    // ---------------------------------------------------------------
    // Read set changes
    // ---------------------------------------------------------------

    #[test]
    fn switching_the_read_set_moves_the_listener() {
        let (component, renders, _) = reader(ReadPolicy::Tracked);
        let (a, b, use_b) = (component.a.clone(), component.b.clone(), component.use_b.clone());
        let mut root = Root::new();
        root.render(Node::component(component)).unwrap();

        // use_b is read with peek, so flipping it needs a parent-driven render.
        use_b.set(true);
        root.act(|| a.set(5)).unwrap();
        assert_eq!(root.text(), "10");
        assert_eq!(a.dependent_count(), 0);
        assert_eq!(b.dependent_count(), 1);

        let before = renders.load(Ordering::SeqCst);
        root.act(|| a.set(6)).unwrap();
        assert_eq!(renders.load(Ordering::SeqCst), before);

        root.act(|| b.set(11)).unwrap();
        assert_eq!(root.text(), "11");
        assert_eq!(renders.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn unchanged_read_set_keeps_the_listener() {
        let (component, _, tracker) = reader(ReadPolicy::Tracked);
        let a = component.a.clone();
        let mut root = Root::new();
        root.render(Node::component(component)).unwrap();
        let tracker = tracker.lock().clone().unwrap();

        root.act(|| a.set(2)).unwrap();
        root.act(|| a.set(3)).unwrap();
        assert!(tracker.is_subscribed());
        assert_eq!(a.dependent_count(), 1);
    }

    #[test]
    fn unmount_releases_the_listener() {
        let (component, renders, tracker) = reader(ReadPolicy::Tracked);
        let a = component.a.clone();
        let mut root = Root::new();
        root.render(Node::component(component)).unwrap();
        root.unmount();

        assert!(!tracker.lock().as_ref().unwrap().is_subscribed());
        assert_eq!(a.dependent_count(), 0);
        root.act(|| a.set(9)).unwrap();
        assert_eq!(renders.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn render_reads_do_not_leak_into_an_outer_effect() {
        let signal = Signal::new(1);
        let s = signal.clone();
        let effect = Effect::new_lazy(move || {
            let mut root = Root::new();
            let _ = root.render(Node::component(crate::bridge::SignalLeaf::new(s.clone())));
            None
        });
        effect.execute();
        assert_eq!(effect.dependency_count(), 0);
    }
}
