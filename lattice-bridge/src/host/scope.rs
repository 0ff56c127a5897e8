//! Per-render hook context.
//!
//! Each instance owns a slot table. Hooks claim slots in call order, so the
//! n-th hook call of every render gets the same slot, and whatever it stored
//! on the first render, until the instance unmounts.

use std::any::Any;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::instance::{Deps, EffectSlot, InstanceId, PendingEffect, SharedEffect, Slot, Updater};
use crate::error::{RenderError, Result};
use crate::reactive::Cleanup;

pub struct Scope<'a> {
    component: &'static str,
    slots: &'a mut Vec<Slot>,
    effects: &'a mut Vec<SharedEffect>,
    pending: &'a mut Vec<PendingEffect>,
    updater: Updater,
    cursor: usize,
    /// Slot count of the previous render, `None` on the first one.
    expected: Option<usize>,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(
        component: &'static str,
        slots: &'a mut Vec<Slot>,
        effects: &'a mut Vec<SharedEffect>,
        pending: &'a mut Vec<PendingEffect>,
        updater: Updater,
        first_render: bool,
    ) -> Self {
        let expected = (!first_render).then_some(slots.len());
        Self {
            component,
            slots,
            effects,
            pending,
            updater,
            cursor: 0,
            expected,
        }
    }

    pub fn instance_id(&self) -> InstanceId {
        self.updater.instance_id()
    }

    fn slot<T: Any + Send>(&mut self, init: impl FnOnce() -> T) -> Result<&mut T> {
        let index = self.cursor;
        self.cursor += 1;
        if index == self.slots.len() {
            self.slots.push(Box::new(init()));
        }

        let component = self.component;
        self.slots[index]
            .downcast_mut::<T>()
            .ok_or(RenderError::HookMismatch { component, index })
    }

    /// Value created by `init` on the first render, returned on every render.
    pub fn memo_once<T>(&mut self, init: impl FnOnce() -> T) -> Result<T>
    where
        T: Clone + Send + 'static,
    {
        Ok(self.slot(init)?.clone())
    }

    /// Mutable cell that survives re-renders without triggering them.
    pub fn use_ref<T>(&mut self, init: impl FnOnce() -> T) -> Result<Ref<T>>
    where
        T: Send + 'static,
    {
        self.memo_once(|| Ref(Arc::new(Mutex::new(init()))))
    }

    /// Local state; writing a different value schedules a re-render.
    pub fn use_state<T>(&mut self, init: impl FnOnce() -> T) -> Result<(T, StateSetter<T>)>
    where
        T: Clone + PartialEq + Send + 'static,
    {
        let cell = self.memo_once(|| Arc::new(Mutex::new(init())))?;
        let value = cell.lock().clone();
        Ok((
            value,
            StateSetter {
                cell,
                updater: self.updater.clone(),
            },
        ))
    }

    /// Run `run` after this render commits.
    ///
    /// With `deps`, the effect only re-runs when they differ from the last
    /// committed ones; with `None`, after every commit. A returned cleanup
    /// runs before the next run and on unmount.
    pub fn after_commit<F>(&mut self, deps: Option<Deps>, run: F) -> Result<()>
    where
        F: FnOnce() -> Option<Cleanup> + Send + 'static,
    {
        let fresh = self.cursor == self.slots.len();
        let slot: SharedEffect = self.memo_once(|| Arc::new(Mutex::new(EffectSlot::default())))?;
        if fresh {
            self.effects.push(slot.clone());
        }

        let stale = {
            let state = slot.lock();
            !state.committed || deps.is_none() || state.deps != deps
        };
        if stale {
            self.pending.push(PendingEffect {
                slot,
                deps,
                run: Box::new(run),
            });
        }
        Ok(())
    }

    /// Check the hook count against the previous render.
    pub(crate) fn finish(self, strict: bool) -> Result<()> {
        match self.expected {
            Some(expected) if strict && expected != self.cursor => Err(RenderError::HookCount {
                component: self.component,
                expected,
                found: self.cursor,
            }),
            _ => Ok(()),
        }
    }
}

/// Setter half of [`Scope::use_state`].
pub struct StateSetter<T> {
    cell: Arc<Mutex<T>>,
    updater: Updater,
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
            updater: self.updater.clone(),
        }
    }
}

impl<T: PartialEq> StateSetter<T> {
    /// Store `value` and schedule a re-render, unless it equals the current
    /// value or the instance is gone.
    pub fn set(&self, value: T) {
        if !self.updater.is_live() {
            tracing::trace!(instance = ?self.updater.instance_id(), "state write after unmount ignored");
            return;
        }
        {
            let mut current = self.cell.lock();
            if *current == value {
                return;
            }
            *current = value;
        }
        self.updater.schedule();
    }

    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = {
            let current = self.cell.lock();
            f(&current)
        };
        self.set(next);
    }
}

/// Handle from [`Scope::use_ref`].
pub struct Ref<T>(Arc<Mutex<T>>);

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Ref<T> {
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.0.lock()
    }

    pub fn replace(&self, value: T) -> T {
        std::mem::replace(&mut *self.0.lock(), value)
    }
}

impl<T: Clone> Ref<T> {
    pub fn get(&self) -> T {
        self.0.lock().clone()
    }
}
