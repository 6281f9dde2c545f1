//! Locations: addressable, revalidatable points in a tree.

use crate::{NodeId, NodeKind, Tree, TreeId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocationError {
    #[error("invalid location: offset {offset} out of range 0..={len}")]
    OffsetOutOfRange { offset: usize, len: usize },

    #[error("invalid location: node {0:?} is not reachable from the root")]
    Unreachable(NodeId),

    #[error("location belongs to a different tree")]
    WrongTree,
}

/// A point in a tree: `(root, container, offset)`.
///
/// A `Location` is a value, not a live reference. It records the tree
/// generation at creation time; callers must revalidate (or re-derive) it
/// before reuse across a mutation boundary. Equality ignores the
/// generation stamp: two locations naming the same point are equal even if
/// made at different times.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Location {
    pub root: TreeId,
    pub node: NodeId,
    pub offset: usize,
    generation: u64,
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root && self.node == other.node && self.offset == other.offset
    }
}

impl Eq for Location {}

impl Location {
    /// Make a location, validating that `node` is reachable from the
    /// tree's root and that `offset` is within `0..=len(node)`.
    pub fn make(tree: &Tree, node: NodeId, offset: usize) -> Result<Self, LocationError> {
        if !tree.is_attached(node) {
            return Err(LocationError::Unreachable(node));
        }
        let len = tree.len(node);
        if offset > len {
            return Err(LocationError::OffsetOutOfRange { offset, len });
        }
        Ok(Self {
            root: tree.id(),
            node,
            offset,
            generation: tree.generation(),
        })
    }

    /// Whether the location was made against the tree's current
    /// generation. A stale location may still be structurally valid but
    /// must be re-derived before being trusted.
    pub fn is_fresh(&self, tree: &Tree) -> bool {
        self.root == tree.id() && self.generation == tree.generation()
    }

    /// Whether the location still names a reachable point.
    pub fn is_valid(&self, tree: &Tree) -> bool {
        self.root == tree.id()
            && tree.contains(self.node)
            && tree.is_attached(self.node)
            && self.offset <= tree.len(self.node)
    }

    /// Canonical form. A boundary that can be expressed either as an
    /// element-child index or as a text offset is expressed as the text
    /// offset: the end of a preceding text node wins over the start of a
    /// following one.
    pub fn normalize(&self, tree: &Tree) -> Result<Self, LocationError> {
        if self.root != tree.id() {
            return Err(LocationError::WrongTree);
        }
        if !tree.is_attached(self.node) {
            return Err(LocationError::Unreachable(self.node));
        }
        if let NodeKind::Element { .. } = &tree.node(self.node).kind {
            let children = tree.children(self.node);
            if self.offset > 0 {
                let before = children[self.offset - 1];
                if tree.node(before).is_text() {
                    return Location::make(tree, before, tree.len(before));
                }
            }
            if let Some(&after) = children.get(self.offset) {
                if tree.node(after).is_text() {
                    return Location::make(tree, after, 0);
                }
            }
        }
        Ok(*self)
    }

    /// Total document order. An element boundary sorts immediately before
    /// any position interior to the child it points at.
    pub fn compare(&self, tree: &Tree, other: &Location) -> Result<Ordering, LocationError> {
        if self.root != tree.id() || other.root != tree.id() {
            return Err(LocationError::WrongTree);
        }
        let a = self.address(tree)?;
        let b = other.address(tree)?;
        Ok(a.cmp(&b))
    }

    /// Child-index path from the root plus the offset, e.g. node at path
    /// `[1, 0]` with offset 3 becomes `[1, 0, 3]`. Lexicographic order on
    /// these vectors is document order.
    fn address(&self, tree: &Tree) -> Result<Vec<usize>, LocationError> {
        if !tree.is_attached(self.node) {
            return Err(LocationError::Unreachable(self.node));
        }
        let mut address = Vec::new();
        let mut current = self.node;
        while current != tree.root() {
            let index = tree
                .index_in_parent(current)
                .ok_or(LocationError::Unreachable(current))?;
            address.push(index);
            current = tree.parent(current).ok_or(LocationError::Unreachable(current))?;
        }
        address.reverse();
        address.push(self.offset);
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QName;
    use std::collections::BTreeMap;

    fn sample() -> (Tree, NodeId, NodeId, NodeId) {
        // <doc><p>"abc"<em/></p></doc>
        let mut tree = Tree::new(QName::local("doc"));
        let p = tree.new_element(QName::local("p"), BTreeMap::new());
        let t = tree.new_text("abc");
        let em = tree.new_element(QName::local("em"), BTreeMap::new());
        tree.attach(tree.root(), 0, p).unwrap();
        tree.attach(p, 0, t).unwrap();
        tree.attach(p, 1, em).unwrap();
        (tree, p, t, em)
    }

    #[test]
    fn test_make_validates_offset_and_reachability() {
        let (mut tree, p, t, _) = sample();
        assert!(Location::make(&tree, t, 3).is_ok());
        assert_eq!(
            Location::make(&tree, t, 4),
            Err(LocationError::OffsetOutOfRange { offset: 4, len: 3 })
        );
        tree.detach(p).unwrap();
        assert_eq!(
            Location::make(&tree, t, 0),
            Err(LocationError::Unreachable(t))
        );
    }

    #[test]
    fn test_equality_ignores_generation() {
        let (mut tree, _, t, _) = sample();
        let before = Location::make(&tree, t, 1).unwrap();
        tree.bump_generation();
        let after = Location::make(&tree, t, 1).unwrap();
        assert_eq!(before, after);
        assert!(!before.is_fresh(&tree));
        assert!(after.is_fresh(&tree));
    }

    #[test]
    fn test_normalize_prefers_text_offsets() {
        let (tree, p, t, _) = sample();
        // Between text and <em>: expressed as the end of the text.
        let boundary = Location::make(&tree, p, 1).unwrap();
        assert_eq!(
            boundary.normalize(&tree).unwrap(),
            Location::make(&tree, t, 3).unwrap()
        );
        // Before the text: expressed as its start.
        let start = Location::make(&tree, p, 0).unwrap();
        assert_eq!(
            start.normalize(&tree).unwrap(),
            Location::make(&tree, t, 0).unwrap()
        );
        // After <em> there is no text; stays as an element offset.
        let end = Location::make(&tree, p, 2).unwrap();
        assert_eq!(end.normalize(&tree).unwrap(), end);
    }

    #[test]
    fn test_compare_document_order() {
        let (tree, p, t, em) = sample();
        let a = Location::make(&tree, t, 1).unwrap();
        let b = Location::make(&tree, t, 2).unwrap();
        let c = Location::make(&tree, em, 0).unwrap();
        assert_eq!(a.compare(&tree, &b).unwrap(), Ordering::Less);
        assert_eq!(b.compare(&tree, &c).unwrap(), Ordering::Less);
        assert_eq!(c.compare(&tree, &a).unwrap(), Ordering::Greater);
        assert_eq!(a.compare(&tree, &a).unwrap(), Ordering::Equal);

        // A boundary sorts immediately before positions inside the child
        // it points at.
        let before_text = Location::make(&tree, p, 0).unwrap();
        let inside_text = Location::make(&tree, t, 0).unwrap();
        assert_eq!(
            before_text.compare(&tree, &inside_text).unwrap(),
            Ordering::Less
        );
    }

    #[test]
    fn test_wrong_tree_is_rejected() {
        let (tree, _, t, _) = sample();
        let (other, _, other_t, _) = sample();
        let loc = Location::make(&other, other_t, 0).unwrap();
        assert_eq!(loc.compare(&tree, &loc), Err(LocationError::WrongTree));
        let _ = t;
    }
}
