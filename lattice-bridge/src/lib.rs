//! Lattice Bridge
//!
//! This crate connects fine-grained reactive signals to a component framework
//! that re-renders whole subtrees when state changes. It implements:
//!
//! - Reactive primitives (signals, memos, effects, batching)
//! - A minimal host component model with hooks and a positional reconciler
//! - A subscription bridge that re-renders a component exactly when the
//!   signals it read change
//! - Direct embedding of signals in render output, updated through a
//!   dedicated leaf component without re-rendering the parent
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Core reactive primitives and dependency tracking
//! - `host`: Components, hook scopes, and the render root
//! - `bridge`: Read tracking, signal hooks, the leaf renderer, and embedding
//! - `config`: Host configuration
//! - `error`: Error types
//!
//! # Example
//!
//! ```rust
//! use lattice_bridge::bridge::{Embed, SignalHooks};
//! use lattice_bridge::host::{Component, Node, Root, Scope};
//! use lattice_bridge::Result;
//!
//! struct Counter;
//!
//! impl Component for Counter {
//!     fn render(&self, cx: &mut Scope<'_>) -> Result<Node> {
//!         let count = cx.use_signal(0)?;
//!         Ok(Node::fragment(vec![Node::text("count: "), count.to_node()]))
//!     }
//! }
//!
//! let mut root = Root::new();
//! root.render(Node::component(Counter))?;
//! assert_eq!(root.text(), "count: 0");
//! # Ok::<(), lattice_bridge::RenderError>(())
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod host;
pub mod reactive;

pub use bridge::{Embed, ReadPolicy, ReadTracker, SignalHooks, SignalLeaf, TrackedReads};
pub use config::HostConfig;
pub use error::{ConfigError, RenderError, Result};
pub use host::{Component, Node, Root, Scope};
pub use reactive::{batch, untracked, Effect, Memo, Signal, Subscription};
