//! Renderable nodes.
//!
//! [`Node`] is a closed tagged union. The reconciler matches on it instead of
//! probing for shape markers, and a signal only becomes renderable through an
//! explicit conversion into [`Node::Signal`].

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::scope::Scope;
use crate::error::Result;
use crate::reactive::{ReadSignal, SourceId};

/// A unit of UI: the value is its props, `render` produces its output.
pub trait Component: Send + Sync + 'static {
    fn render(&self, cx: &mut Scope<'_>) -> Result<Node>;
}

/// A component value together with its type identity.
#[derive(Clone)]
pub struct ComponentNode {
    type_id: TypeId,
    name: &'static str,
    component: Arc<dyn Component>,
}

impl ComponentNode {
    pub fn new<C: Component>(component: C) -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            name: std::any::type_name::<C>(),
            component: Arc::new(component),
        }
    }

    /// Identity the reconciler compares to decide update vs. remount.
    pub fn component_type(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn render(&self, cx: &mut Scope<'_>) -> Result<Node> {
        self.component.render(cx)
    }
}

impl fmt::Debug for ComponentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentNode").field("name", &self.name).finish()
    }
}

/// A signal placed directly in the tree.
///
/// Its component is always the leaf renderer for the signal's type and its
/// props are always `{ data: <the signal> }`.
#[derive(Clone)]
pub struct SignalNode {
    source: SourceId,
    data: Arc<dyn Any + Send + Sync>,
    leaf: ComponentNode,
}

impl SignalNode {
    pub(crate) fn new<S, C>(data: S, leaf: C) -> Self
    where
        S: ReadSignal,
        C: Component,
    {
        Self {
            source: data.source_id(),
            data: Arc::new(data),
            leaf: ComponentNode::new(leaf),
        }
    }

    /// Identity of the embedded signal.
    pub fn source_id(&self) -> SourceId {
        self.source
    }

    /// The embedded signal handle, if it is an `S`.
    pub fn data<S: 'static>(&self) -> Option<&S> {
        self.data.downcast_ref::<S>()
    }

    /// The component the reconciler mounts for this node.
    pub fn leaf(&self) -> &ComponentNode {
        &self.leaf
    }
}

impl fmt::Debug for SignalNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalNode")
            .field("source", &self.source)
            .field("leaf", &self.leaf)
            .finish()
    }
}

/// Render output.
#[derive(Debug, Clone, Default)]
pub enum Node {
    /// Renders nothing but still occupies its position.
    #[default]
    Empty,
    Text(String),
    Component(ComponentNode),
    Signal(SignalNode),
    Fragment(Vec<Node>),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    pub fn component<C: Component>(component: C) -> Self {
        Node::Component(ComponentNode::new(component))
    }

    pub fn fragment<I>(children: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoNode,
    {
        Node::Fragment(children.into_iter().map(IntoNode::into_node).collect())
    }

    /// Flatten fragments into the positional child list the reconciler walks.
    pub(crate) fn flatten_into(self, out: &mut Vec<Child>) {
        match self {
            Node::Empty => out.push(Child::Empty),
            Node::Text(text) => out.push(Child::Text(text)),
            Node::Component(node) => out.push(Child::Component(node)),
            Node::Signal(signal) => out.push(Child::Component(signal.leaf)),
            Node::Fragment(children) => {
                for child in children {
                    child.flatten_into(out);
                }
            }
        }
    }
}

/// One reconciler position.
pub(crate) enum Child {
    Empty,
    Text(String),
    Component(ComponentNode),
}

/// Conversion into render output.
pub trait IntoNode {
    fn into_node(self) -> Node;
}

impl IntoNode for Node {
    fn into_node(self) -> Node {
        self
    }
}

impl IntoNode for ComponentNode {
    fn into_node(self) -> Node {
        Node::Component(self)
    }
}

impl IntoNode for () {
    fn into_node(self) -> Node {
        Node::Empty
    }
}

/// Booleans render nothing, so `flag && child` style output stays silent.
impl IntoNode for bool {
    fn into_node(self) -> Node {
        Node::Empty
    }
}

impl IntoNode for String {
    fn into_node(self) -> Node {
        Node::Text(self)
    }
}

impl IntoNode for &str {
    fn into_node(self) -> Node {
        Node::Text(self.to_owned())
    }
}

impl IntoNode for char {
    fn into_node(self) -> Node {
        Node::Text(self.to_string())
    }
}

impl<T: IntoNode> IntoNode for Option<T> {
    fn into_node(self) -> Node {
        self.map(IntoNode::into_node).unwrap_or_default()
    }
}

impl<T: IntoNode> IntoNode for Vec<T> {
    fn into_node(self) -> Node {
        Node::fragment(self)
    }
}

macro_rules! display_into_node {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoNode for $ty {
                fn into_node(self) -> Node {
                    Node::Text(self.to_string())
                }
            }
        )*
    };
}

display_into_node!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

/// Serializable view of a mounted tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rendered {
    Text { text: String },
    Component { name: String, children: Vec<Rendered> },
}
