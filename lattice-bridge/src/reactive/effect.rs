//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. When any dependency changes, the effect is scheduled to re-run, once
//!    per batch.
//!
//! 3. Before re-running, the effect clears its old dependencies and tracks
//!    new ones during execution.
//!
//! # Cleanup
//!
//! Effects can optionally return a cleanup function. This function is called
//! before the effect re-runs and when the effect is disposed. Cleanups run
//! untracked.
//!
//! A run is its own batch: signals it writes, including ones it reads,
//! notify only after the run finishes.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::batch::BatchGuard;
use super::context::{untracked, ReactiveContext};
use super::runtime::{Reactive, ReactiveHandle, Runtime};
use super::SubscriberId;

/// Teardown returned by an effect run.
pub type Cleanup = Box<dyn FnOnce() + Send>;

type RunFn = Arc<dyn Fn() -> Option<Cleanup> + Send + Sync>;

/// A side-effecting computation that runs when dependencies change.
///
/// # Example
///
/// ```rust
/// use lattice_bridge::reactive::{Effect, Signal};
///
/// let count = Signal::new(0);
/// let c = count.clone();
/// let effect = Effect::new(move || {
///     let _ = c.get();
/// });
///
/// count.set(5);
/// assert_eq!(effect.run_count(), 2);
/// effect.dispose();
/// ```
pub struct Effect {
    inner: Arc<EffectInner>,
    _handle: Arc<ReactiveHandle>,
}

struct EffectInner {
    subscriber_id: SubscriberId,
    run: RunFn,
    cleanup: Mutex<Option<Cleanup>>,
    disposed: AtomicBool,
    run_count: AtomicUsize,
}

impl Reactive for EffectInner {
    fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }

    fn mark_maybe_dirty(&self) {}

    fn schedule(&self) {
        self.execute();
    }

    fn is_eager(&self) -> bool {
        true
    }
}

impl EffectInner {
    fn execute(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        // Writes made by the run flush only after its cleanup is stored.
        let _batch = BatchGuard::enter();

        self.run_cleanup();
        Runtime::clear_dependencies(self.subscriber_id);

        let cleanup = {
            let _ctx = ReactiveContext::enter(self.subscriber_id);
            let cleanup = (self.run)();
            tracing::trace!(
                subscriber = ?self.subscriber_id,
                reads = ReactiveContext::get_dependencies().len(),
                "effect ran"
            );
            cleanup
        };
        self.run_count.fetch_add(1, Ordering::SeqCst);

        // The run may have disposed its own effect.
        if self.disposed.load(Ordering::SeqCst) {
            if let Some(cleanup) = cleanup {
                untracked(cleanup);
            }
        } else {
            *self.cleanup.lock() = cleanup;
        }
    }

    fn run_cleanup(&self) {
        let cleanup = self.cleanup.lock().take();
        if let Some(cleanup) = cleanup {
            untracked(cleanup);
        }
    }
}

impl Effect {
    /// Create a new effect with the given function.
    ///
    /// The function runs immediately to establish dependencies.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_cleanup(move || {
            run();
            None
        })
    }

    /// Create an effect whose runs may return a cleanup.
    pub fn with_cleanup<F>(run: F) -> Self
    where
        F: Fn() -> Option<Cleanup> + Send + Sync + 'static,
    {
        let effect = Self::new_lazy(run);
        effect.execute();
        effect
    }

    /// Create a new effect without running it immediately.
    pub fn new_lazy<F>(run: F) -> Self
    where
        F: Fn() -> Option<Cleanup> + Send + Sync + 'static,
    {
        let inner = Arc::new(EffectInner {
            subscriber_id: SubscriberId::new(),
            run: Arc::new(run),
            cleanup: Mutex::new(None),
            disposed: AtomicBool::new(false),
            run_count: AtomicUsize::new(0),
        });
        let handle = Runtime::register(inner.clone());

        Self {
            inner,
            _handle: Arc::new(handle),
        }
    }

    /// Get the subscriber ID for this effect.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.subscriber_id
    }

    /// Execute the effect function.
    pub fn execute(&self) {
        self.inner.execute();
    }

    /// Schedule the effect to re-run.
    ///
    /// Called by the runtime when a dependency changes.
    pub fn schedule(&self) {
        self.inner.schedule();
    }

    /// Dispose of the effect.
    ///
    /// Runs the pending cleanup and drops every dependency. After disposal
    /// the effect will not run again.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        Runtime::clear_dependencies(self.inner.subscriber_id);
        self.inner.run_cleanup();
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    /// Get the number of dependencies.
    pub fn dependency_count(&self) -> usize {
        Runtime::dependency_count(self.inner.subscriber_id)
    }
}

impl Clone for Effect {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _handle: Arc::clone(&self._handle),
        }
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("subscriber_id", &self.inner.subscriber_id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Owning handle to a listener; disposes it when dropped.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    effect: Option<Effect>,
}

impl Subscription {
    /// Take ownership of `effect`.
    pub fn new(effect: Effect) -> Self {
        Self {
            effect: Some(effect),
        }
    }

    /// Stop delivery now.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(effect) = self.effect.take() {
            effect.dispose();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("effect", &self.effect)
            .finish()
    }
}
