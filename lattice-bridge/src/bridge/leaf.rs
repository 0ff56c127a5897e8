//! The component every embedded signal mounts.

use std::fmt;

use super::tracking::TrackedReads;
use crate::error::Result;
use crate::host::{Component, IntoNode, Node, Scope};
use crate::reactive::ReadSignal;

/// Renders the current value of one signal and re-renders when it changes.
///
/// Each mounted leaf holds its own subscription, so two leaves over the same
/// signal come and go independently.
pub struct SignalLeaf<S> {
    data: S,
}

impl<S: ReadSignal> SignalLeaf<S> {
    pub fn new(data: S) -> Self {
        Self { data }
    }

    /// The signal this leaf renders.
    pub fn data(&self) -> &S {
        &self.data
    }
}

impl<S> Component for SignalLeaf<S>
where
    S: ReadSignal,
    S::Value: IntoNode,
{
    fn render(&self, cx: &mut Scope<'_>) -> Result<Node> {
        let reads = cx.use_tracked_reads()?;
        Ok(reads.get(&self.data).into_node())
    }
}

impl<S: ReadSignal> fmt::Debug for SignalLeaf<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalLeaf")
            .field("source", &self.data.source_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Root;
    use crate::reactive::{Memo, Signal};

    #[test]
    fn leaf_renders_and_follows_its_signal() {
        let signal = Signal::new(String::from("hello"));
        let mut root = Root::new();
        root.render(Node::component(SignalLeaf::new(signal.clone()))).unwrap();
        assert_eq!(root.text(), "hello");

        root.act(|| signal.set("world".into())).unwrap();
        assert_eq!(root.text(), "world");
    }

    #[test]
    fn leaf_over_a_memo() {
        let base = Signal::new(3);
        let b = base.clone();
        let squared = Memo::new(move || b.get() * b.get());
        let mut root = Root::new();
        root.render(Node::component(SignalLeaf::new(squared))).unwrap();
        assert_eq!(root.text(), "9");

        root.act(|| base.set(4)).unwrap();
        assert_eq!(root.text(), "16");
    }

    #[test]
    fn optional_values_render_nothing_when_absent() {
        let signal: Signal<Option<u32>> = Signal::new(None);
        let mut root = Root::new();
        root.render(Node::component(SignalLeaf::new(signal.clone()))).unwrap();
        assert_eq!(root.text(), "");

        root.act(|| signal.set(Some(7))).unwrap();
        assert_eq!(root.text(), "7");
    }

    #[test]
    fn unmounted_leaf_drops_its_subscription() {
        let signal = Signal::new(1);
        let mut root = Root::new();
        root.render(Node::component(SignalLeaf::new(signal.clone()))).unwrap();
        assert_eq!(signal.dependent_count(), 1);

        root.render(Node::Empty).unwrap();
        assert_eq!(signal.dependent_count(), 0);
        assert_eq!(root.mounted_count(), 0);
    }
}
