//! Node storage types.

use crate::QName;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Stable handle into a [`Tree`](crate::Tree) arena.
///
/// Ids are never reused for the lifetime of the tree. A detached node keeps
/// its id, which is what lets undo restore the exact nodes it removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Which data boundary a zero-width decoration was logically inserted
/// nearer to. Used as the tie-break when a caret lands inside the
/// decoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bias {
    Start,
    End,
}

/// Marker carried by GUI-tree-only nodes. A decorated node has no data-tree
/// counterpart and never serializes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoration {
    pub class: String,
    pub bias: Bias,
}

/// The two node kinds: elements with ordered children and an unordered
/// attribute map, and text with a mutable character buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element {
        name: QName,
        attrs: BTreeMap<QName, String>,
        children: Vec<NodeId>,
        /// GUI presentation classes, set by the mode. Always empty in a
        /// data tree.
        classes: BTreeSet<String>,
        /// Present only on GUI decoration nodes.
        decoration: Option<Decoration>,
    },
    Text {
        data: String,
    },
}

#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    pub kind: NodeKind,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text { .. })
    }

    pub fn is_decoration(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Element {
                decoration: Some(_),
                ..
            }
        )
    }

    pub fn decoration(&self) -> Option<&Decoration> {
        match &self.kind {
            NodeKind::Element { decoration, .. } => decoration.as_ref(),
            NodeKind::Text { .. } => None,
        }
    }

    pub fn name(&self) -> Option<&QName> {
        match &self.kind {
            NodeKind::Element { name, .. } => Some(name),
            NodeKind::Text { .. } => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text { data } => Some(data),
            NodeKind::Element { .. } => None,
        }
    }

    pub fn classes(&self) -> Option<&BTreeSet<String>> {
        match &self.kind {
            NodeKind::Element { classes, .. } => Some(classes),
            NodeKind::Text { .. } => None,
        }
    }
}
