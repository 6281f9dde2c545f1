//! Arena tree storage.

use crate::{Bias, Decoration, Node, NodeId, NodeKind, QName};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use thiserror::Error;

static NEXT_TREE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a tree. Locations carry it so that a
/// location made against one tree can never be used against another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreeId(u64);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    #[error("node {0:?} does not belong to this tree")]
    ForeignNode(NodeId),

    #[error("node {0:?} is already attached")]
    AlreadyAttached(NodeId),

    #[error("node {0:?} is detached")]
    Detached(NodeId),

    #[error("index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),

    #[error("node {0:?} is not a text node")]
    NotText(NodeId),

    #[error("attaching {0:?} would create a cycle")]
    CycleDetected(NodeId),
}

/// An owning tree of nodes.
///
/// The tree is only storage plus navigation. Anything that must be
/// observable as a mutation event goes through the primitive layer in
/// `weft-editor`; the methods here do not emit anything.
#[derive(Debug, Clone)]
pub struct Tree {
    id: TreeId,
    nodes: Vec<Node>,
    root: NodeId,
    generation: u64,
}

impl Tree {
    /// Create a tree whose root is an element with the given name.
    pub fn new(root_name: QName) -> Self {
        let mut tree = Self {
            id: TreeId(NEXT_TREE_ID.fetch_add(1, AtomicOrdering::Relaxed)),
            nodes: Vec::new(),
            root: NodeId(0),
            generation: 0,
        };
        let root = tree.new_element(root_name, BTreeMap::new());
        tree.root = root;
        tree
    }

    pub fn id(&self) -> TreeId {
        self.id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Generation counter, incremented by the mutation layer on every
    /// committed primitive change. Used to detect stale locations.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn bump_generation(&mut self) {
        self.generation += 1;
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    /// Borrow a node. Panics on a handle from another tree; handles are
    /// only ever produced by this tree's own constructors.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    // ------------------------------------------------------------------
    // Node creation. New nodes start detached.
    // ------------------------------------------------------------------

    pub fn new_element(&mut self, name: QName, attrs: BTreeMap<QName, String>) -> NodeId {
        self.push(NodeKind::Element {
            name,
            attrs,
            children: Vec::new(),
            classes: BTreeSet::new(),
            decoration: None,
        })
    }

    pub fn new_text(&mut self, data: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text { data: data.into() })
    }

    /// A GUI-only decoration node.
    pub fn new_decoration(&mut self, class: impl Into<String>, bias: Bias) -> NodeId {
        let class = class.into();
        let mut classes = BTreeSet::new();
        classes.insert(class.clone());
        self.push(NodeKind::Element {
            name: QName::local("_decoration"),
            attrs: BTreeMap::new(),
            children: Vec::new(),
            classes,
            decoration: Some(Decoration { class, bias }),
        })
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { parent: None, kind });
        id
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.node(id).kind {
            NodeKind::Element { children, .. } => children,
            NodeKind::Text { .. } => &[],
        }
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).len()
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let index = self.index_in_parent(id)?;
        if index == 0 {
            return None;
        }
        let parent = self.parent(id)?;
        self.children(parent).get(index - 1).copied()
    }

    /// Whether the node is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// The length of a node: character count for text, child count for
    /// elements. This is the upper bound for a Location offset.
    pub fn len(&self, id: NodeId) -> usize {
        match &self.node(id).kind {
            NodeKind::Element { children, .. } => children.len(),
            NodeKind::Text { data } => data.chars().count(),
        }
    }

    pub fn is_empty(&self, id: NodeId) -> bool {
        self.len(id) == 0
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.node(id).text()
    }

    pub fn name(&self, id: NodeId) -> Option<&QName> {
        self.node(id).name()
    }

    pub fn attr(&self, id: NodeId, name: &QName) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { attrs, .. } => attrs.get(name).map(String::as_str),
            NodeKind::Text { .. } => None,
        }
    }

    pub fn attrs(&self, id: NodeId) -> Option<&BTreeMap<QName, String>> {
        match &self.node(id).kind {
            NodeKind::Element { attrs, .. } => Some(attrs),
            NodeKind::Text { .. } => None,
        }
    }

    /// The node and all its descendants in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            for &child in self.children(current).iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    // ------------------------------------------------------------------
    // Structural changes. No events; the mutation layer wraps these.
    // ------------------------------------------------------------------

    pub fn attach(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<(), TreeError> {
        if !self.contains(child) {
            return Err(TreeError::ForeignNode(child));
        }
        if self.node(child).parent.is_some() {
            return Err(TreeError::AlreadyAttached(child));
        }
        // The child must not be an ancestor of its new parent.
        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == child {
                return Err(TreeError::CycleDetected(child));
            }
            cursor = self.parent(current);
        }
        let len = self.child_count(parent);
        if index > len {
            return Err(TreeError::IndexOutOfBounds { index, len });
        }
        match &mut self.node_mut(parent).kind {
            NodeKind::Element { children, .. } => children.insert(index, child),
            NodeKind::Text { .. } => return Err(TreeError::NotAnElement(parent)),
        }
        self.node_mut(child).parent = Some(parent);
        Ok(())
    }

    /// Detach a node from its parent, returning its former index. The node
    /// and its subtree stay resident in the arena.
    pub fn detach(&mut self, child: NodeId) -> Result<usize, TreeError> {
        let parent = self.node(child).parent.ok_or(TreeError::Detached(child))?;
        let index = self
            .index_in_parent(child)
            .ok_or(TreeError::Detached(child))?;
        match &mut self.node_mut(parent).kind {
            NodeKind::Element { children, .. } => {
                children.remove(index);
            }
            NodeKind::Text { .. } => return Err(TreeError::NotAnElement(parent)),
        }
        self.node_mut(child).parent = None;
        Ok(index)
    }

    /// Replace a text node's buffer, returning the old value.
    pub fn set_text_value(
        &mut self,
        id: NodeId,
        value: impl Into<String>,
    ) -> Result<String, TreeError> {
        match &mut self.node_mut(id).kind {
            NodeKind::Text { data } => Ok(std::mem::replace(data, value.into())),
            NodeKind::Element { .. } => Err(TreeError::NotText(id)),
        }
    }

    /// Set or remove (`None`) an attribute, returning the old value.
    pub fn set_attr(
        &mut self,
        id: NodeId,
        name: &QName,
        value: Option<&str>,
    ) -> Result<Option<String>, TreeError> {
        match &mut self.node_mut(id).kind {
            NodeKind::Element { attrs, .. } => Ok(match value {
                Some(value) => attrs.insert(name.clone(), value.to_string()),
                None => attrs.remove(name),
            }),
            NodeKind::Text { .. } => Err(TreeError::NotAnElement(id)),
        }
    }

    /// Add a GUI presentation class. Returns whether it was newly added.
    pub fn add_class(&mut self, id: NodeId, class: impl Into<String>) -> Result<bool, TreeError> {
        match &mut self.node_mut(id).kind {
            NodeKind::Element { classes, .. } => Ok(classes.insert(class.into())),
            NodeKind::Text { .. } => Err(TreeError::NotAnElement(id)),
        }
    }

    /// Remove and return the children from `at` onward. Used by the split
    /// primitive; the returned nodes are detached.
    pub fn take_children_from(
        &mut self,
        id: NodeId,
        at: usize,
    ) -> Result<Vec<NodeId>, TreeError> {
        let taken = match &mut self.node_mut(id).kind {
            NodeKind::Element { children, .. } => {
                if at > children.len() {
                    return Err(TreeError::IndexOutOfBounds {
                        index: at,
                        len: children.len(),
                    });
                }
                children.split_off(at)
            }
            NodeKind::Text { .. } => return Err(TreeError::NotAnElement(id)),
        };
        for &child in &taken {
            self.node_mut(child).parent = None;
        }
        Ok(taken)
    }

    /// Append already-detached children. Used by the merge primitive.
    pub fn append_children(&mut self, id: NodeId, add: Vec<NodeId>) -> Result<(), TreeError> {
        for &child in &add {
            if self.node(child).parent.is_some() {
                return Err(TreeError::AlreadyAttached(child));
            }
        }
        for child in add {
            match &mut self.node_mut(id).kind {
                NodeKind::Element { children, .. } => children.push(child),
                NodeKind::Text { .. } => return Err(TreeError::NotAnElement(id)),
            }
            self.node_mut(child).parent = Some(id);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Paths & comparison
    // ------------------------------------------------------------------

    /// Child-index path of a node relative to the root, e.g. `"1/0"`. The
    /// root is `""`. `None` for detached nodes.
    pub fn node_to_path(&self, id: NodeId) -> Option<String> {
        if !self.is_attached(id) {
            return None;
        }
        let mut parts = Vec::new();
        let mut current = id;
        while current != self.root {
            parts.push(self.index_in_parent(current)?.to_string());
            current = self.parent(current)?;
        }
        parts.reverse();
        Some(parts.join("/"))
    }

    /// Recover the node a path made by [`Tree::node_to_path`] referred to.
    pub fn path_to_node(&self, path: &str) -> Option<NodeId> {
        if path.is_empty() {
            return Some(self.root);
        }
        let mut current = self.root;
        for part in path.split('/') {
            let index: usize = part.parse().ok()?;
            current = *self.children(current).get(index)?;
        }
        Some(current)
    }

    /// Structural equality of two subtrees: node kinds, names, attributes,
    /// text and child order. GUI classes are ignored so the comparison is
    /// usable across tree roles.
    pub fn deep_eq(&self, a: NodeId, other: &Tree, b: NodeId) -> bool {
        match (&self.node(a).kind, &other.node(b).kind) {
            (NodeKind::Text { data: da }, NodeKind::Text { data: db }) => da == db,
            (
                NodeKind::Element {
                    name: na,
                    attrs: aa,
                    children: ca,
                    ..
                },
                NodeKind::Element {
                    name: nb,
                    attrs: ab,
                    children: cb,
                    ..
                },
            ) => {
                na == nb
                    && aa == ab
                    && ca.len() == cb.len()
                    && ca
                        .iter()
                        .zip(cb.iter())
                        .all(|(&x, &y)| self.deep_eq(x, other, y))
            }
            _ => false,
        }
    }
}
