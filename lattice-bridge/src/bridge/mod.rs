//! Signal Bridge
//!
//! Connects the signal graph to host components.
//!
//! - [`tracking`]: a per-render [`ReadTracker`] that subscribes the instance
//!   to the signals it read, installed at commit.
//! - [`hooks`]: [`SignalHooks`], instance-bound signals, computed signals,
//!   explicit subscriptions and signal effects.
//! - [`leaf`]: [`SignalLeaf`], the component that renders one signal.
//! - [`embed`]: [`Embed`], turning a signal into a node that renders its
//!   live value through its own leaf.

pub mod embed;
pub mod hooks;
pub mod leaf;
pub mod tracking;

pub use embed::Embed;
pub use hooks::SignalHooks;
pub use leaf::SignalLeaf;
pub use tracking::{ReadPolicy, ReadTracker, TrackedReads};
