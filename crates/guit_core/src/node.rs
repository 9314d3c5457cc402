//! Composite node shared by suites and specs.
//!
//! A [`Node`] is a cheap, cloneable handle. Children are held strongly, the parent and every path
//! entry weakly, so ownership flows root → leaves and dropping the root tears the whole tree down.
//!
//! ## Path invariant
//!
//! - A root has no parent and `path == [self]`.
//! - Any other node `n` with parent `p` has `n.path == p.path ++ [n]`.
//!
//! [`Node::add_child`] and [`Node::remove_child`] re-path the whole affected subtree, so the
//! invariant holds for grandchildren too, not only for the node being moved.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use thiserror::Error;

use crate::collection::{Collection, Identity};

/// Errors raised when editing a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("node `{title}` is already attached to a parent")]
    AlreadyAttached { title: String },

    #[error("attaching `{child}` under `{parent}` would create a cycle")]
    Cycle { parent: String, child: String },

    #[error("node `{title}` is not a child of `{parent}`")]
    NotFound { parent: String, title: String },
}

/// Behavioral role of a node, derived from whether it has children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Suite,
    Spec,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Suite => "suite",
            NodeKind::Spec => "spec",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct NodeInner {
    title: String,
    parent: RwLock<Weak<NodeInner>>,
    children: RwLock<Collection<Node>>,
    path: RwLock<Collection<WeakNode>>,
}

/// Strong handle to a tree node.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

/// Non-owning handle to a tree node.
#[derive(Clone)]
pub struct WeakNode {
    inner: Weak<NodeInner>,
}

impl WeakNode {
    pub fn upgrade(&self) -> Option<Node> {
        self.inner.upgrade().map(|inner| Node { inner })
    }

    fn is_live(&self) -> bool {
        self.inner.strong_count() > 0
    }

    fn points_to(&self, node: &Node) -> bool {
        std::ptr::eq(self.inner.as_ptr(), Arc::as_ptr(&node.inner))
    }
}

impl Identity for Node {
    fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Identity for WeakNode {
    fn same_as(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.inner, &other.inner)
    }
}

impl Node {
    /// Create a detached root node.
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        let inner = Arc::new_cyclic(|weak: &Weak<NodeInner>| {
            let mut path = Collection::new();
            path.add_item(WeakNode { inner: weak.clone() });
            NodeInner {
                title,
                parent: RwLock::new(Weak::new()),
                children: RwLock::new(Collection::new()),
                path: RwLock::new(path),
            }
        });
        Self { inner }
    }

    /// Create a node and attach `children` to it in order.
    ///
    /// ## Errors
    ///
    /// Fails if any child is already attached elsewhere.
    pub fn with_children(title: impl Into<String>, children: impl IntoIterator<Item = Node>) -> Result<Self, TreeError> {
        let node = Self::new(title);
        for child in children {
            node.add_child(child)?;
        }
        Ok(node)
    }

    pub fn title(&self) -> &str {
        &self.inner.title
    }

    pub fn parent(&self) -> Option<Node> {
        self.inner.parent.read().upgrade().map(|inner| Node { inner })
    }

    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }

    /// Snapshot of the children, in insertion order.
    pub fn children(&self) -> Vec<Node> {
        self.inner.children.read().iter().cloned().collect()
    }

    pub fn child_count(&self) -> usize {
        self.inner.children.read().len()
    }

    /// Child at `index`, or `None` when out of range.
    pub fn get_child(&self, index: usize) -> Option<Node> {
        self.inner.children.read().get_item(index).cloned()
    }

    pub fn has_children(&self) -> bool {
        self.inner.children.read().has_items()
    }

    pub fn kind(&self) -> NodeKind {
        if self.has_children() { NodeKind::Suite } else { NodeKind::Spec }
    }

    /// Ancestry chain from the root down to and including this node.
    pub fn path(&self) -> Vec<Node> {
        self.inner.path.read().iter().filter_map(WeakNode::upgrade).collect()
    }

    /// Titles along [`Node::path`].
    pub fn path_titles(&self) -> Vec<String> {
        self.path().iter().map(|node| node.title().to_string()).collect()
    }

    /// Length of [`Node::path`]; a root has depth 1.
    ///
    /// Ancestors that have been dropped are not counted, so a node whose root went away reports
    /// the same depth as the path it still has.
    pub fn depth(&self) -> usize {
        self.inner.path.read().iter().filter(|entry| entry.is_live()).count()
    }

    pub fn downgrade(&self) -> WeakNode {
        WeakNode {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        self.same_as(other)
    }

    /// Attach `child` as the last child of this node.
    ///
    /// Sets the child's parent and rebuilds the path of the child and all of its descendants from
    /// this node's path. This node's own path is not touched.
    ///
    /// ## Errors
    ///
    /// - [`TreeError::AlreadyAttached`] if `child` already has a parent.
    /// - [`TreeError::Cycle`] if `child` is this node or one of its ancestors.
    pub fn add_child(&self, child: Node) -> Result<(), TreeError> {
        // Held until the parent link is written, so concurrent attaches of one child serialize.
        let mut parent = child.inner.parent.write();
        if parent.strong_count() > 0 {
            return Err(TreeError::AlreadyAttached {
                title: child.title().to_string(),
            });
        }
        if self.inner.path.read().iter().any(|entry| entry.points_to(&child)) {
            return Err(TreeError::Cycle {
                parent: self.title().to_string(),
                child: child.title().to_string(),
            });
        }

        self.inner.children.write().add_item(child.clone());
        *parent = Arc::downgrade(&self.inner);
        drop(parent);

        let base = self.inner.path.read().clone();
        repath(&child, base);
        Ok(())
    }

    /// Detach `child` from this node.
    ///
    /// The detached node becomes a root again: its parent is cleared and its subtree is re-pathed
    /// from `[child]`.
    ///
    /// ## Errors
    ///
    /// [`TreeError::NotFound`] if `child` is not a direct child of this node.
    pub fn remove_child(&self, child: &Node) -> Result<(), TreeError> {
        if !self.inner.children.write().remove_item(child) {
            return Err(TreeError::NotFound {
                parent: self.title().to_string(),
                title: child.title().to_string(),
            });
        }
        *child.inner.parent.write() = Weak::new();
        repath(child, Collection::new());
        Ok(())
    }
}

/// Rebuild `path` for `node` and its whole subtree, `base` being the parent's path.
fn repath(node: &Node, base: Collection<WeakNode>) {
    let mut pending = vec![(node.clone(), base)];
    while let Some((current, mut path)) = pending.pop() {
        path.add_item(current.downgrade());
        for child in current.inner.children.read().iter() {
            pending.push((child.clone(), path.clone()));
        }
        *current.inner.path.write() = path;
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("title", &self.title())
            .field("depth", &self.depth())
            .field("children", &self.children())
            .finish()
    }
}

impl fmt::Debug for WeakNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(node) => write!(f, "WeakNode({:?})", node.title()),
            None => f.write_str("WeakNode(<dropped>)"),
        }
    }
}
