//! Mutation events.
//!
//! Every observable change to a tree is described by exactly one
//! `MutationEvent`. Events are emitted *after* the change they describe
//! has been applied, in application order, and each event carries enough
//! information to compute its inverse without consulting the tree. That
//! inverse property is what transactions, rollback and undo are built on.

use serde::{Deserialize, Serialize};
use weft_dom::{NodeId, QName};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MutationEvent {
    /// `node` was attached under `parent` at child index `index`. The
    /// node's subtree comes with it.
    InsertNode {
        parent: NodeId,
        index: usize,
        node: NodeId,
    },

    /// `node` was detached from `parent`, where it sat at `index`. A
    /// `cascade` event describes a descendant detached as part of a
    /// bottom-up destruction of an ancestor; non-cascade events describe
    /// the node the caller actually named (or a whole-subtree move).
    DeleteNode {
        parent: NodeId,
        index: usize,
        node: NodeId,
        cascade: bool,
    },

    /// A text node's buffer was replaced wholesale.
    SetText {
        node: NodeId,
        value: String,
        old_value: String,
    },

    /// An attribute was set or removed (`value: None`).
    SetAttribute {
        node: NodeId,
        name: QName,
        value: Option<String>,
        old_value: Option<String>,
    },

    /// `node` was split at `offset` (characters for text, child index
    /// for elements); everything past the offset moved into the
    /// freshly-minted sibling `new_node`, attached immediately after
    /// `node`. The id is carried so that replaying the event after an
    /// undo revives the *same* sibling.
    Split {
        node: NodeId,
        offset: usize,
        new_node: NodeId,
    },

    /// `next`, the sibling immediately after `node`, was emptied into
    /// `node` and detached. `offset` is the length `node` had before the
    /// merge, i.e. the seam position.
    Merge {
        node: NodeId,
        next: NodeId,
        offset: usize,
    },
}

impl MutationEvent {
    /// The event that exactly undoes this one.
    ///
    /// `inverse` is an involution: `e.inverse().inverse() == e`.
    pub fn inverse(&self) -> MutationEvent {
        match self {
            MutationEvent::InsertNode {
                parent,
                index,
                node,
            } => MutationEvent::DeleteNode {
                parent: *parent,
                index: *index,
                node: *node,
                cascade: false,
            },
            MutationEvent::DeleteNode {
                parent,
                index,
                node,
                ..
            } => MutationEvent::InsertNode {
                parent: *parent,
                index: *index,
                node: *node,
            },
            MutationEvent::SetText {
                node,
                value,
                old_value,
            } => MutationEvent::SetText {
                node: *node,
                value: old_value.clone(),
                old_value: value.clone(),
            },
            MutationEvent::SetAttribute {
                node,
                name,
                value,
                old_value,
            } => MutationEvent::SetAttribute {
                node: *node,
                name: name.clone(),
                value: old_value.clone(),
                old_value: value.clone(),
            },
            MutationEvent::Split {
                node,
                offset,
                new_node,
            } => MutationEvent::Merge {
                node: *node,
                next: *new_node,
                offset: *offset,
            },
            MutationEvent::Merge { node, next, offset } => MutationEvent::Split {
                node: *node,
                offset: *offset,
                new_node: *next,
            },
        }
    }

    /// The node the event is principally about.
    pub fn subject(&self) -> NodeId {
        match self {
            MutationEvent::InsertNode { node, .. }
            | MutationEvent::DeleteNode { node, .. }
            | MutationEvent::SetText { node, .. }
            | MutationEvent::SetAttribute { node, .. }
            | MutationEvent::Split { node, .. }
            | MutationEvent::Merge { node, .. } => *node,
        }
    }
}
