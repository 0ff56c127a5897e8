//! Host Component Model
//!
//! The whole-subtree rendering framework the signal bridge plugs into.
//!
//! - [`Component`]: a value that renders into a [`Node`]. The value is the
//!   props; its Rust type is its identity.
//! - [`Scope`]: hooks for the render in progress. Local state, memo slots and
//!   commit-phase effects with cleanup.
//! - [`Root`]: owns a mounted tree, reconciles new output against it, and
//!   re-renders instances whose state changed when flushed.
//!
//! Rendering never installs anything outside the tree; side effects are
//! deferred to the commit that follows the render pass.

mod instance;
mod node;
mod root;
mod scope;

pub use instance::{Deps, InstanceId, Updater};
pub use node::{Component, ComponentNode, IntoNode, Node, Rendered, SignalNode};
pub use root::Root;
pub use scope::{Ref, Scope, StateSetter};
