//! Reactive Primitives
//!
//! This module implements the signal graph the bridge is built on: signals,
//! memos, effects, batches.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! within a tracking context (such as a memo or effect), the signal automatically
//! registers that context as a dependent. When the signal's value changes, all
//! dependents are notified.
//!
//! ## Memos
//!
//! A Memo is a derived value that caches its result. It re-evaluates only when
//! one of its dependencies changes.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs whenever its dependencies
//! change. [`Signal::subscribe`] is an effect that hands the value to a
//! listener, owned by a [`Subscription`].
//!
//! ## Batches
//!
//! [`batch`] coalesces every write made inside it into one round of
//! notifications. [`untracked`] reads without creating dependencies.
//!
//! # Implementation Notes
//!
//! The reactive system uses a thread-local tracking context to automatically
//! detect dependencies. When a signal is read, we check if there is an active
//! tracking context and, if so, register the dependency with the runtime.

mod batch;
mod context;
mod effect;
mod memo;
mod runtime;
mod signal;
mod source;
mod subscriber;

pub use batch::{batch, is_batching};
pub use context::{untracked, ReactiveContext};
pub use effect::{Cleanup, Effect, Subscription};
pub use memo::{Memo, MemoState};
pub use runtime::{Reactive, ReactiveHandle, Runtime};
pub use signal::Signal;
pub use source::{ReadSignal, Trackable};
pub use subscriber::{SourceId, SubscriberId};
