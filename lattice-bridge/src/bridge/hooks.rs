//! Signal Hooks
//!
//! Hooks that bind signals to a host component instance.
//!
//! # How the Bridge Works
//!
//! A listener is an [`Effect`] that tracks every source in a set and compares
//! their versions with the ones it saw last. The first comparison is against
//! the versions the render saw, so a listener installed at commit only fires
//! for writes that landed after that render read its values. A fired listener
//! writes component state, and the host re-renders the instance on its next
//! flush.
//!
//! Listeners are installed from commit-phase effects, never during render,
//! and the effect cleanup drops the [`Subscription`], so a set change tears
//! the old listener down before the new one goes in and unmount tears it down
//! for good.

use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::{smallvec, SmallVec};

use crate::error::Result;
use crate::host::{Deps, Scope};
use crate::reactive::{untracked, Cleanup, Effect, Memo, ReadSignal, Signal, Subscription, Trackable};

/// Versions of a listener's sources, in set order.
pub(crate) type Versions = SmallVec<[u64; 4]>;

type ComputeFn<T> = Arc<dyn Fn() -> T + Send + Sync>;
type EffectFn = Arc<dyn Fn() -> Option<Cleanup> + Send + Sync>;

/// Watch `sources`, calling `on_change` untracked whenever their version
/// vector differs from the last one seen, starting from `seen`.
pub(crate) fn listen<F>(sources: Vec<Arc<dyn Trackable>>, seen: Versions, on_change: F) -> Subscription
where
    F: Fn() + Send + Sync + 'static,
{
    let seen = Mutex::new(seen);
    Subscription::new(Effect::new(move || {
        let current: Versions = sources.iter().map(|source| source.track()).collect();
        let changed = {
            let mut seen = seen.lock();
            if *seen == current {
                false
            } else {
                *seen = current;
                true
            }
        };
        if changed {
            untracked(|| on_change());
        }
    }))
}

fn release(subscription: Subscription) -> Option<Cleanup> {
    Some(Box::new(move || {
        tracing::trace!("signal listener torn down");
        drop(subscription);
    }))
}

/// Signal hooks for [`Scope`].
pub trait SignalHooks {
    /// A signal created on the first render and kept for the instance's
    /// lifetime. Creating it does not re-render.
    fn use_signal<T>(&mut self, initial: T) -> Result<Signal<T>>
    where
        T: Clone + PartialEq + Send + Sync + 'static;

    /// A derived signal kept for the instance's lifetime.
    ///
    /// `compute` is replaced every render; the memo always runs the latest
    /// one when it recomputes.
    fn use_computed<T, F>(&mut self, compute: F) -> Result<Memo<T>>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static;

    /// Re-render this instance once per batch in which any of `signals`
    /// changes.
    ///
    /// The listener goes in at commit and is replaced only when the set of
    /// signal identities changes. An empty set installs nothing.
    fn use_signals(&mut self, signals: &[&dyn Trackable]) -> Result<()>;

    /// Subscribe to an existing signal and return its value, kept in local
    /// state.
    fn use_signal_value<S: ReadSignal>(&mut self, signal: &S) -> Result<S::Value>;

    /// [`use_signal`](Self::use_signal) and
    /// [`use_signal_value`](Self::use_signal_value) in one call.
    fn use_signal_and_value<T>(&mut self, initial: T) -> Result<(Signal<T>, T)>
    where
        T: Clone + PartialEq + Send + Sync + 'static;

    /// The current value of a [`use_computed`](Self::use_computed) memo.
    fn use_computed_value<T, F>(&mut self, compute: F) -> Result<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static;

    /// Run `callback` after mount and again after every batch that changes a
    /// signal it read. A returned cleanup runs before the next call and on
    /// unmount.
    fn use_signal_effect<F>(&mut self, callback: F) -> Result<()>
    where
        F: Fn() -> Option<Cleanup> + Send + Sync + 'static;
}

impl SignalHooks for Scope<'_> {
    fn use_signal<T>(&mut self, initial: T) -> Result<Signal<T>>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        self.memo_once(move || Signal::new(initial))
    }

    fn use_computed<T, F>(&mut self, compute: F) -> Result<Memo<T>>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let compute: ComputeFn<T> = Arc::new(compute);
        let latest = self.use_ref(|| compute.clone())?;
        latest.replace(compute);

        self.memo_once(move || {
            Memo::new(move || {
                let compute = latest.get();
                compute()
            })
        })
    }

    fn use_signals(&mut self, signals: &[&dyn Trackable]) -> Result<()> {
        let sources: Vec<Arc<dyn Trackable>> = signals.iter().map(|signal| signal.share()).collect();
        let ids: Deps = sources.iter().map(|source| source.source_id().raw()).collect();
        let seen: Versions = sources.iter().map(|source| source.version()).collect();

        let (_, rerender) = self.use_state(|| 0u64)?;
        self.after_commit(Some(ids), move || {
            if sources.is_empty() {
                return None;
            }
            tracing::trace!(sources = sources.len(), "signal listener installed");
            release(listen(sources, seen, move || rerender.update(|tick| tick.wrapping_add(1))))
        })
    }

    fn use_signal_value<S: ReadSignal>(&mut self, signal: &S) -> Result<S::Value> {
        let (value, set_value) = self.use_state(|| signal.peek())?;

        let source = signal.clone();
        self.after_commit(Some(smallvec![signal.source_id().raw()]), move || {
            tracing::trace!(source = ?source.source_id(), "signal value listener installed");
            let shared = vec![source.share()];
            // Empty `seen` so the first run stores the current value, which
            // also covers a signal swapped in since the state was created.
            release(listen(shared, Versions::new(), move || set_value.set(source.peek())))
        })?;

        Ok(value)
    }

    fn use_signal_and_value<T>(&mut self, initial: T) -> Result<(Signal<T>, T)>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let signal = self.use_signal(initial)?;
        let value = self.use_signal_value(&signal)?;
        Ok((signal, value))
    }

    fn use_computed_value<T, F>(&mut self, compute: F) -> Result<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let memo = self.use_computed(compute)?;
        self.use_signal_value(&memo)
    }

    fn use_signal_effect<F>(&mut self, callback: F) -> Result<()>
    where
        F: Fn() -> Option<Cleanup> + Send + Sync + 'static,
    {
        let callback: EffectFn = Arc::new(callback);
        let latest = self.use_ref(|| callback.clone())?;
        latest.replace(callback);

        self.after_commit(Some(Deps::new()), move || {
            let effect = Effect::with_cleanup(move || {
                let callback = latest.get();
                callback()
            });
            Some(Box::new(move || effect.dispose()) as Cleanup)
        })
    }
}
