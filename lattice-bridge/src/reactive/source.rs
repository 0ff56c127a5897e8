//! Read-side traits shared by [`Signal`](super::Signal) and [`Memo`](super::Memo).

use std::sync::Arc;

use super::SourceId;

/// Anything a listener can depend on, independent of its value type.
///
/// This is what lets a single listener watch a heterogeneous list of signals.
pub trait Trackable: Send + Sync {
    /// Identity of the underlying node.
    fn source_id(&self) -> SourceId;

    /// Register a dependency from the current computation and return the
    /// current version.
    fn track(&self) -> u64;

    /// Current version, without tracking.
    fn version(&self) -> u64;

    /// An owned, type-erased handle to the same node.
    fn share(&self) -> Arc<dyn Trackable>;
}

/// A typed readable signal.
pub trait ReadSignal: Trackable + Clone + 'static {
    /// The value type.
    type Value: Clone + PartialEq + Send + Sync + 'static;

    /// Read the value, tracking it in the current computation.
    fn get(&self) -> Self::Value;

    /// Read the value without tracking.
    fn peek(&self) -> Self::Value;
}
