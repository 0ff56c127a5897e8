//! Batching
//!
//! Every source change goes through a batch. Inside a batch, changed sources
//! are queued (deduplicated); when the outermost batch on this thread ends,
//! the queue is drained and each reached effect runs once.
//!
//! Effects that write signals while the queue is draining enqueue further
//! changes, which are picked up in the next round of the same flush.

use std::cell::RefCell;

use indexmap::IndexSet;

use super::runtime::Runtime;
use super::SourceId;

/// Rounds a single flush may take before it is treated as a cycle.
pub(crate) const MAX_FLUSH_ROUNDS: usize = 100;

#[derive(Default)]
struct BatchState {
    depth: usize,
    pending: IndexSet<SourceId>,
}

thread_local! {
    static BATCH: RefCell<BatchState> = RefCell::new(BatchState::default());
}

/// Raises the batch depth; the outermost guard flushes on drop.
pub(crate) struct BatchGuard {
    flush_on_exit: bool,
}

impl BatchGuard {
    pub(crate) fn enter() -> Self {
        BATCH.with(|b| b.borrow_mut().depth += 1);
        Self { flush_on_exit: true }
    }

    /// Raise the depth without flushing on exit (used by the flush itself).
    fn hold() -> Self {
        BATCH.with(|b| b.borrow_mut().depth += 1);
        Self { flush_on_exit: false }
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        let outermost = BATCH.with(|b| {
            let mut state = b.borrow_mut();
            state.depth -= 1;
            state.depth == 0
        });

        if !outermost {
            return;
        }
        if std::thread::panicking() {
            BATCH.with(|b| b.borrow_mut().pending.clear());
        } else if self.flush_on_exit {
            flush();
        }
    }
}

pub(crate) fn enqueue(source: SourceId) {
    BATCH.with(|b| {
        b.borrow_mut().pending.insert(source);
    });
}

fn flush() {
    let _hold = BatchGuard::hold();

    for _ in 0..MAX_FLUSH_ROUNDS {
        let pending = BATCH.with(|b| std::mem::take(&mut b.borrow_mut().pending));
        if pending.is_empty() {
            return;
        }
        for effect in Runtime::propagate(pending) {
            effect.schedule();
        }
    }

    let dropped = BATCH.with(|b| std::mem::take(&mut b.borrow_mut().pending));
    tracing::error!(
        rounds = MAX_FLUSH_ROUNDS,
        dropped = dropped.len(),
        "effect cycle detected, discarding pending notifications"
    );
}

/// Run `f` as one batch: subscribers see its writes as a single change.
///
/// Batches nest; only the outermost one flushes.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    let _batch = BatchGuard::enter();
    f()
}

/// Check if the current thread is inside a batch.
pub fn is_batching() -> bool {
    BATCH.with(|b| b.borrow().depth > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_batches_flush_once_at_the_outermost_exit() {
        assert!(!is_batching());
        batch(|| {
            assert!(is_batching());
            batch(|| assert!(is_batching()));
            assert!(is_batching());
        });
        assert!(!is_batching());
    }

    #[test]
    fn batch_returns_the_closure_result() {
        assert_eq!(batch(|| 7), 7);
    }

    #[test]
    fn panicking_batch_restores_depth() {
        let result = std::panic::catch_unwind(|| {
            batch(|| {
                enqueue(SourceId::next());
                panic!("boom");
            })
        });

        assert!(result.is_err());
        assert!(!is_batching());
        BATCH.with(|b| assert!(b.borrow().pending.is_empty()));
    }
}
