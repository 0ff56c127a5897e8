//! Placing signals directly in render output.
//!
//! A signal becomes a [`Node::Signal`] whose component is a [`SignalLeaf`]
//! over that signal. The reconciler mounts the leaf like any component, so a
//! change to the signal re-renders the leaf alone and the component that
//! returned the node is left untouched.

use super::leaf::SignalLeaf;
use crate::host::{IntoNode, Node, SignalNode};
use crate::reactive::{Memo, ReadSignal, Signal};

/// Conversion of a readable signal into an embeddable node.
pub trait Embed {
    fn to_node(&self) -> Node;
}

impl<S> Embed for S
where
    S: ReadSignal,
    S::Value: IntoNode,
{
    fn to_node(&self) -> Node {
        Node::Signal(SignalNode::new(self.clone(), SignalLeaf::new(self.clone())))
    }
}

impl<T> IntoNode for Signal<T>
where
    T: Clone + PartialEq + Send + Sync + IntoNode + 'static,
{
    fn into_node(self) -> Node {
        self.to_node()
    }
}

impl<T> IntoNode for Memo<T>
where
    T: Clone + PartialEq + Send + Sync + IntoNode + 'static,
{
    fn into_node(self) -> Node {
        self.to_node()
    }
}

impl<T> From<Signal<T>> for Node
where
    T: Clone + PartialEq + Send + Sync + IntoNode + 'static,
{
    fn from(signal: Signal<T>) -> Self {
        signal.to_node()
    }
}

impl<T> From<Memo<T>> for Node
where
    T: Clone + PartialEq + Send + Sync + IntoNode + 'static,
{
    fn from(memo: Memo<T>) -> Self {
        memo.to_node()
    }
}
