//! The primitive mutation layer.
//!
//! `Primitives` wraps a tree and an event log. Every change goes through
//! one of the methods here, which applies it and then appends the matching
//! [`MutationEvent`] to the log. Higher layers never touch the tree's
//! structural methods directly; the data editor and the GUI mirror both
//! drive their trees through this same type, which is what keeps the two
//! trees' event streams comparable.
//!
//! ## Design
//!
//! - Events are emitted after the change is in place, in application
//!   order. Each emission bumps the tree generation.
//! - `delete_node` dismantles bottom-up: one cascade-flagged event per
//!   descendant, then a final non-cascade event for the named node.
//! - `extract_node` detaches a whole subtree as a single event. It is the
//!   move half of a move-and-reattach; destruction goes through
//!   `delete_node`.
//! - `replay` applies an already-constructed event, which is how undo,
//!   redo and rollback reuse this layer instead of having code paths of
//!   their own.
//!
//! Text offsets are character counts, never byte offsets.

use crate::{EditorError, MutationEvent};
use std::cmp::Ordering;
use weft_dom::{Location, NodeId, NodeKind, QName, Tree, TreeError};

/// Where inserted text ended up.
#[derive(Debug, Clone, PartialEq)]
pub struct TextInsertion {
    /// The text node holding the inserted text. `None` when the inserted
    /// string was empty.
    pub node: Option<NodeId>,
    /// Whether a new text node had to be created, as opposed to growing
    /// an adjacent one.
    pub created: bool,
    pub start: Location,
    pub end: Location,
}

pub struct Primitives<'a> {
    tree: &'a mut Tree,
    log: &'a mut Vec<MutationEvent>,
}

impl<'a> Primitives<'a> {
    pub fn new(tree: &'a mut Tree, log: &'a mut Vec<MutationEvent>) -> Self {
        Self { tree, log }
    }

    pub fn tree(&self) -> &Tree {
        self.tree
    }

    /// Mint a detached element. Node creation is not a mutation event;
    /// nothing is observable until the node is attached.
    pub fn new_element(
        &mut self,
        name: QName,
        attrs: std::collections::BTreeMap<QName, String>,
    ) -> NodeId {
        self.tree.new_element(name, attrs)
    }

    /// Mint a detached text node.
    pub fn new_text(&mut self, data: impl Into<String>) -> NodeId {
        self.tree.new_text(data)
    }

    fn emit(&mut self, event: MutationEvent) {
        self.tree.bump_generation();
        tracing::trace!(?event, "mutation");
        self.log.push(event);
    }

    /// Revalidate a location against the tree's current shape.
    fn fresh(&self, loc: Location) -> Result<Location, EditorError> {
        Ok(Location::make(self.tree, loc.node, loc.offset)?)
    }

    // ------------------------------------------------------------------
    // Insertion
    // ------------------------------------------------------------------

    /// Attach a detached node at an element location. This is the raw
    /// attachment primitive: it does not coalesce text. Operations that
    /// can create a text/text seam restore the no-adjacent-text invariant
    /// with [`Primitives::merge_text_nodes`] before returning.
    pub fn insert_node_at(&mut self, loc: Location, node: NodeId) -> Result<(), EditorError> {
        let loc = self.fresh(loc)?;
        if !self.tree.node(loc.node).is_element() {
            return Err(EditorError::WrongNodeKind(loc.node));
        }
        self.tree.attach(loc.node, loc.offset, node)?;
        self.emit(MutationEvent::InsertNode {
            parent: loc.node,
            index: loc.offset,
            node,
        });
        Ok(())
    }

    /// Insert text at a location. In a text node the buffer is spliced; at
    /// an element boundary the text joins an adjacent text node when one
    /// exists and only otherwise becomes a new node. Returns where the
    /// text landed.
    pub fn insert_text(&mut self, loc: Location, text: &str) -> Result<TextInsertion, EditorError> {
        let loc = self.fresh(loc)?;
        let added = text.chars().count();
        if added == 0 {
            return Ok(TextInsertion {
                node: None,
                created: false,
                start: loc,
                end: loc,
            });
        }

        if self.tree.node(loc.node).is_text() {
            let data = self.text_of(loc.node)?;
            let at = char_byte(&data, loc.offset);
            let mut value = String::with_capacity(data.len() + text.len());
            value.push_str(&data[..at]);
            value.push_str(text);
            value.push_str(&data[at..]);
            self.apply_set_text(loc.node, value)?;
            return Ok(TextInsertion {
                node: Some(loc.node),
                created: false,
                start: Location::make(self.tree, loc.node, loc.offset)?,
                end: Location::make(self.tree, loc.node, loc.offset + added)?,
            });
        }

        let previous = if loc.offset > 0 {
            Some(self.tree.children(loc.node)[loc.offset - 1])
        } else {
            None
        };
        let following = self.tree.children(loc.node).get(loc.offset).copied();

        if let Some(prev) = previous.filter(|&n| self.tree.node(n).is_text()) {
            let data = self.text_of(prev)?;
            let old_len = data.chars().count();
            self.apply_set_text(prev, data + text)?;
            return Ok(TextInsertion {
                node: Some(prev),
                created: false,
                start: Location::make(self.tree, prev, old_len)?,
                end: Location::make(self.tree, prev, old_len + added)?,
            });
        }
        if let Some(next) = following.filter(|&n| self.tree.node(n).is_text()) {
            let data = self.text_of(next)?;
            self.apply_set_text(next, format!("{text}{data}"))?;
            return Ok(TextInsertion {
                node: Some(next),
                created: false,
                start: Location::make(self.tree, next, 0)?,
                end: Location::make(self.tree, next, added)?,
            });
        }

        let node = self.tree.new_text(text);
        self.tree.attach(loc.node, loc.offset, node)?;
        self.emit(MutationEvent::InsertNode {
            parent: loc.node,
            index: loc.offset,
            node,
        });
        Ok(TextInsertion {
            node: Some(node),
            created: true,
            start: Location::make(self.tree, node, 0)?,
            end: Location::make(self.tree, node, added)?,
        })
    }

    /// Insert a new element at a location. A mid-text location first
    /// splits the text node. Returns the new element's id.
    pub fn insert_element(
        &mut self,
        loc: Location,
        name: QName,
        attrs: std::collections::BTreeMap<QName, String>,
    ) -> Result<NodeId, EditorError> {
        let loc = self.fresh(loc)?;
        let (parent, index) = if self.tree.node(loc.node).is_text() {
            let node = loc.node;
            let parent = self.tree.parent(node).ok_or(TreeError::Detached(node))?;
            let at = self
                .tree
                .index_in_parent(node)
                .ok_or(TreeError::Detached(node))?;
            if loc.offset == 0 {
                (parent, at)
            } else if loc.offset == self.tree.len(node) {
                (parent, at + 1)
            } else {
                self.split_at(loc)?;
                (parent, at + 1)
            }
        } else {
            (loc.node, loc.offset)
        };
        let element = self.tree.new_element(name, attrs);
        self.tree.attach(parent, index, element)?;
        self.emit(MutationEvent::InsertNode {
            parent,
            index,
            node: element,
        });
        Ok(element)
    }

    // ------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------

    /// Delete `count` characters starting at a text location. A text node
    /// emptied by the deletion is removed outright; its buffer is left
    /// untouched so the inverse insertion restores it verbatim. Returns
    /// the caret position at the deletion point.
    pub fn delete_text(&mut self, loc: Location, count: usize) -> Result<Location, EditorError> {
        let loc = self.fresh(loc)?;
        let data = self.text_of(loc.node)?;
        let len = data.chars().count();
        if loc.offset + count > len {
            return Err(EditorError::InvalidRange(format!(
                "deleting {count} chars at offset {} exceeds length {len}",
                loc.offset
            )));
        }
        if count == 0 {
            return Ok(loc);
        }
        let from = char_byte(&data, loc.offset);
        let to = char_byte(&data, loc.offset + count);
        let mut value = String::with_capacity(data.len() - (to - from));
        value.push_str(&data[..from]);
        value.push_str(&data[to..]);

        if value.is_empty() {
            let node = loc.node;
            let parent = self.tree.parent(node).ok_or(TreeError::Detached(node))?;
            let index = self.tree.detach(node)?;
            self.emit(MutationEvent::DeleteNode {
                parent,
                index,
                node,
                cascade: false,
            });
            return Ok(Location::make(self.tree, parent, index)?);
        }
        self.apply_set_text(loc.node, value)?;
        Ok(Location::make(self.tree, loc.node, loc.offset)?)
    }

    /// Replace a text node's content. An empty value deletes the node.
    pub fn set_text(&mut self, node: NodeId, value: &str) -> Result<(), EditorError> {
        if !self.tree.node(node).is_text() {
            return Err(EditorError::WrongNodeKind(node));
        }
        if value.is_empty() {
            return self.delete_node(node);
        }
        self.apply_set_text(node, value.to_string())
    }

    /// Replace a text node's content with a value known to be non-empty.
    pub fn set_text_value(&mut self, node: NodeId, value: &str) -> Result<(), EditorError> {
        if value.is_empty() {
            return Err(EditorError::InvalidRange(
                "set_text_value requires non-empty text".into(),
            ));
        }
        if !self.tree.node(node).is_text() {
            return Err(EditorError::WrongNodeKind(node));
        }
        self.apply_set_text(node, value.to_string())
    }

    fn apply_set_text(&mut self, node: NodeId, value: String) -> Result<(), EditorError> {
        let old_value = self.tree.set_text_value(node, value.clone())?;
        self.emit(MutationEvent::SetText {
            node,
            value,
            old_value,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    /// Set or remove (`None`) an attribute.
    pub fn set_attribute(
        &mut self,
        node: NodeId,
        name: &QName,
        value: Option<&str>,
    ) -> Result<(), EditorError> {
        let old_value = self.tree.set_attr(node, name, value)?;
        self.emit(MutationEvent::SetAttribute {
            node,
            name: name.clone(),
            value: value.map(str::to_string),
            old_value,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Removal
    // ------------------------------------------------------------------

    /// Destroy a node and its subtree. Emits one cascade event per
    /// descendant, deepest last sibling first, then a final non-cascade
    /// event for the node itself, so listeners always see children leave
    /// before their parent.
    pub fn delete_node(&mut self, node: NodeId) -> Result<(), EditorError> {
        if node == self.tree.root() {
            return Err(EditorError::InvalidRange("cannot delete the root".into()));
        }
        if !self.tree.is_attached(node) {
            return Err(TreeError::Detached(node).into());
        }
        let order = self.tree.descendants(node);
        for &current in order.iter().rev() {
            let parent = self
                .tree
                .parent(current)
                .ok_or(TreeError::Detached(current))?;
            let index = self.tree.detach(current)?;
            self.emit(MutationEvent::DeleteNode {
                parent,
                index,
                node: current,
                cascade: current != node,
            });
        }
        Ok(())
    }

    /// Detach a node with its subtree intact as a single event. Used for
    /// moves; the caller is expected to reattach the node elsewhere.
    /// Returns the node's former index.
    pub fn extract_node(&mut self, node: NodeId) -> Result<usize, EditorError> {
        let parent = self.tree.parent(node).ok_or(TreeError::Detached(node))?;
        let index = self.tree.detach(node)?;
        self.emit(MutationEvent::DeleteNode {
            parent,
            index,
            node,
            cascade: false,
        });
        Ok(index)
    }

    /// Destroy a node and stitch the hole closed: if the removal leaves
    /// two text siblings adjacent they are merged. Returns the caret at
    /// the removal point.
    pub fn remove_node(&mut self, node: NodeId) -> Result<Location, EditorError> {
        let parent = self.tree.parent(node).ok_or(TreeError::Detached(node))?;
        let index = self
            .tree
            .index_in_parent(node)
            .ok_or(TreeError::Detached(node))?;
        self.delete_node(node)?;
        self.stitch(parent, index)
    }

    /// Destroy a run of contiguous siblings, then stitch the hole once.
    pub fn remove_nodes(&mut self, nodes: &[NodeId]) -> Result<Location, EditorError> {
        let Some(&first) = nodes.first() else {
            return Err(EditorError::InvalidRange("nothing to remove".into()));
        };
        let parent = self.tree.parent(first).ok_or(TreeError::Detached(first))?;
        let start = self
            .tree
            .index_in_parent(first)
            .ok_or(TreeError::Detached(first))?;
        for (slot, &node) in nodes.iter().enumerate() {
            if self.tree.parent(node) != Some(parent)
                || self.tree.index_in_parent(node) != Some(start + slot)
            {
                return Err(EditorError::InvalidRange(
                    "nodes to remove must be contiguous siblings".into(),
                ));
            }
        }
        for &node in nodes {
            self.delete_node(node)?;
        }
        self.stitch(parent, start)
    }

    fn stitch(&mut self, parent: NodeId, index: usize) -> Result<Location, EditorError> {
        let previous = if index > 0 {
            Some(self.tree.children(parent)[index - 1])
        } else {
            None
        };
        let following = self.tree.children(parent).get(index).copied();
        if let (Some(prev), Some(next)) = (previous, following) {
            if self.tree.node(prev).is_text() && self.tree.node(next).is_text() {
                return self.merge_with_next_sibling(prev);
            }
        }
        Ok(Location::make(self.tree, parent, index)?.normalize(self.tree)?)
    }

    // ------------------------------------------------------------------
    // Split and merge
    // ------------------------------------------------------------------

    /// Split a node at a location, minting a sibling of the same kind
    /// that receives everything past the offset. Returns the halves
    /// `(before, after)`. A split at either edge of a text node would
    /// mint an empty twin beside it, breaking the no-adjacent-text
    /// invariant; the node stays untouched instead, the whole of it
    /// returned on the far side and `None` on the empty one. Element
    /// splits always produce both halves.
    pub fn split_at(
        &mut self,
        loc: Location,
    ) -> Result<(Option<NodeId>, Option<NodeId>), EditorError> {
        let loc = self.fresh(loc)?;
        let node = loc.node;
        if node == self.tree.root() {
            return Err(EditorError::InvalidRange("cannot split the root".into()));
        }
        let twin = match &self.tree.node(node).kind {
            NodeKind::Text { .. } => {
                if loc.offset == 0 {
                    return Ok((None, Some(node)));
                }
                if loc.offset == self.tree.len(node) {
                    return Ok((Some(node), None));
                }
                self.tree.new_text("")
            }
            NodeKind::Element { name, attrs, .. } => {
                let (name, attrs) = (name.clone(), attrs.clone());
                self.tree.new_element(name, attrs)
            }
        };
        self.apply_split(node, loc.offset, twin)?;
        self.emit(MutationEvent::Split {
            node,
            offset: loc.offset,
            new_node: twin,
        });
        Ok((Some(node), Some(twin)))
    }

    /// Merge the sibling after `node` into `node`. Both must be text, or
    /// elements with the same name. Returns the caret at the seam.
    pub fn merge_with_next_sibling(&mut self, node: NodeId) -> Result<Location, EditorError> {
        let next = self
            .tree
            .next_sibling(node)
            .ok_or_else(|| EditorError::InvalidRange("no next sibling to merge".into()))?;
        match (&self.tree.node(node).kind, &self.tree.node(next).kind) {
            (NodeKind::Text { .. }, NodeKind::Text { .. }) => {}
            (NodeKind::Element { name: a, .. }, NodeKind::Element { name: b, .. }) if a == b => {}
            _ => {
                return Err(EditorError::InvalidRange(
                    "merge requires two text nodes or two same-named elements".into(),
                ))
            }
        }
        let offset = self.apply_merge(node, next)?;
        self.emit(MutationEvent::Merge { node, next, offset });
        Ok(Location::make(self.tree, node, offset)?)
    }

    /// Merge `node` with a following text sibling when both are text;
    /// otherwise just report the caret at the boundary after `node`.
    pub fn merge_text_nodes(&mut self, node: NodeId) -> Result<Location, EditorError> {
        if self.tree.node(node).is_text() {
            if let Some(next) = self.tree.next_sibling(node) {
                if self.tree.node(next).is_text() {
                    return self.merge_with_next_sibling(node);
                }
            }
            return Ok(Location::make(self.tree, node, self.tree.len(node))?);
        }
        let parent = self.tree.parent(node).ok_or(TreeError::Detached(node))?;
        let index = self
            .tree
            .index_in_parent(node)
            .ok_or(TreeError::Detached(node))?;
        Ok(Location::make(self.tree, parent, index + 1)?.normalize(self.tree)?)
    }

    fn apply_split(
        &mut self,
        node: NodeId,
        offset: usize,
        twin: NodeId,
    ) -> Result<(), EditorError> {
        let parent = self.tree.parent(node).ok_or(TreeError::Detached(node))?;
        let index = self
            .tree
            .index_in_parent(node)
            .ok_or(TreeError::Detached(node))?;
        match &self.tree.node(node).kind {
            NodeKind::Text { data } => {
                let data = data.clone();
                let len = data.chars().count();
                if offset > len {
                    return Err(TreeError::IndexOutOfBounds { index: offset, len }.into());
                }
                if !self.tree.node(twin).is_text() {
                    return Err(EditorError::WrongNodeKind(twin));
                }
                let at = char_byte(&data, offset);
                self.tree.set_text_value(node, data[..at].to_string())?;
                self.tree.set_text_value(twin, data[at..].to_string())?;
            }
            NodeKind::Element { .. } => {
                if !self.tree.node(twin).is_element() {
                    return Err(EditorError::WrongNodeKind(twin));
                }
                let taken = self.tree.take_children_from(node, offset)?;
                self.tree.append_children(twin, taken)?;
            }
        }
        self.tree.attach(parent, index + 1, twin)?;
        Ok(())
    }

    fn apply_merge(&mut self, node: NodeId, next: NodeId) -> Result<usize, EditorError> {
        let offset = self.tree.len(node);
        match &self.tree.node(node).kind {
            NodeKind::Text { data } => {
                let mut value = data.clone();
                let tail = self.text_of(next)?;
                value.push_str(&tail);
                self.tree.set_text_value(node, value)?;
            }
            NodeKind::Element { .. } => {
                let count = self.tree.child_count(next);
                let taken = self.tree.take_children_from(next, 0)?;
                debug_assert_eq!(taken.len(), count);
                self.tree.append_children(node, taken)?;
            }
        }
        self.tree.detach(next)?;
        Ok(offset)
    }

    // ------------------------------------------------------------------
    // Ranges
    // ------------------------------------------------------------------

    /// Remove everything in `[start, end)` and return the removed
    /// content as detached nodes in document order, plus the caret at
    /// the cut point. Partial text coverage at either end is copied into
    /// a fresh text node rather than detaching the original. Both
    /// endpoints must resolve to the same parent element.
    pub fn cut(
        &mut self,
        start: Location,
        end: Location,
    ) -> Result<(Location, Vec<NodeId>), EditorError> {
        let start = self.fresh(start)?;
        let end = self.fresh(end)?;
        match start.compare(self.tree, &end)? {
            Ordering::Greater => {
                return Err(EditorError::InvalidRange(
                    "range start is after its end".into(),
                ))
            }
            Ordering::Equal => return Ok((start, Vec::new())),
            Ordering::Less => {}
        }

        // Both endpoints inside the same text node: splice the buffer.
        if start.node == end.node && self.tree.node(start.node).is_text() {
            let data = self.text_of(start.node)?;
            let fragment = char_substring(&data, start.offset, end.offset);
            let copy = self.tree.new_text(fragment);
            let caret = self.delete_text(start, end.offset - start.offset)?;
            return Ok((caret, vec![copy]));
        }

        let (start_parent, start_index, start_fragment) = self.trim_start(start)?;
        let (end_parent, end_index, end_fragment) = self.trim_end(end)?;
        if start_parent != end_parent {
            return Err(EditorError::InvalidRange(
                "range does not lie under a single parent".into(),
            ));
        }

        let middles: Vec<NodeId> = if end_index > start_index {
            self.tree.children(start_parent)[start_index..end_index].to_vec()
        } else {
            Vec::new()
        };
        for &node in &middles {
            self.extract_node(node)?;
        }

        let caret = self.stitch(start_parent, start_index)?;

        let mut removed = Vec::new();
        removed.extend(start_fragment);
        removed.extend(middles);
        removed.extend(end_fragment);
        Ok((caret, removed))
    }

    /// Resolve the start endpoint of a cut to a child index under its
    /// parent, trimming a partially-covered text node down to its head.
    fn trim_start(
        &mut self,
        start: Location,
    ) -> Result<(NodeId, usize, Option<NodeId>), EditorError> {
        let node = start.node;
        if !self.tree.node(node).is_text() {
            return Ok((node, start.offset, None));
        }
        let parent = self.tree.parent(node).ok_or(TreeError::Detached(node))?;
        let index = self
            .tree
            .index_in_parent(node)
            .ok_or(TreeError::Detached(node))?;
        let len = self.tree.len(node);
        if start.offset == 0 {
            return Ok((parent, index, None));
        }
        if start.offset == len {
            return Ok((parent, index + 1, None));
        }
        let data = self.text_of(node)?;
        let fragment = self.tree.new_text(char_substring(&data, start.offset, len));
        self.delete_text(
            Location::make(self.tree, node, start.offset)?,
            len - start.offset,
        )?;
        Ok((parent, index + 1, Some(fragment)))
    }

    /// Resolve the end endpoint, trimming a partially-covered text node
    /// down to its tail.
    fn trim_end(&mut self, end: Location) -> Result<(NodeId, usize, Option<NodeId>), EditorError> {
        let node = end.node;
        if !self.tree.node(node).is_text() {
            return Ok((node, end.offset, None));
        }
        let parent = self.tree.parent(node).ok_or(TreeError::Detached(node))?;
        let index = self
            .tree
            .index_in_parent(node)
            .ok_or(TreeError::Detached(node))?;
        let len = self.tree.len(node);
        if end.offset == len {
            return Ok((parent, index + 1, None));
        }
        if end.offset == 0 {
            return Ok((parent, index, None));
        }
        let data = self.text_of(node)?;
        let fragment = self.tree.new_text(char_substring(&data, 0, end.offset));
        self.delete_text(Location::make(self.tree, node, 0)?, end.offset)?;
        Ok((parent, index, Some(fragment)))
    }

    // ------------------------------------------------------------------
    // Replay
    // ------------------------------------------------------------------

    /// Apply an already-constructed event. Undo, redo and rollback feed
    /// recorded inverses through here, so replayed history takes exactly
    /// the same path as live edits and re-emits for downstream observers.
    pub fn replay(&mut self, event: &MutationEvent) -> Result<(), EditorError> {
        match event {
            MutationEvent::InsertNode {
                parent,
                index,
                node,
            } => {
                self.tree.attach(*parent, *index, *node)?;
            }
            MutationEvent::DeleteNode { parent, node, .. } => {
                if self.tree.parent(*node) != Some(*parent) {
                    return Err(EditorError::UndoConsistency(format!(
                        "node {node:?} is not under the parent the event recorded"
                    )));
                }
                self.tree.detach(*node)?;
            }
            MutationEvent::SetText { node, value, .. } => {
                self.tree.set_text_value(*node, value.clone())?;
            }
            MutationEvent::SetAttribute {
                node, name, value, ..
            } => {
                self.tree.set_attr(*node, name, value.as_deref())?;
            }
            MutationEvent::Split {
                node,
                offset,
                new_node,
            } => {
                if self.tree.node(*new_node).parent().is_some() {
                    return Err(EditorError::UndoConsistency(format!(
                        "split target {new_node:?} is already attached"
                    )));
                }
                self.apply_split(*node, *offset, *new_node)?;
            }
            MutationEvent::Merge { node, next, .. } => {
                if self.tree.next_sibling(*node) != Some(*next) {
                    return Err(EditorError::UndoConsistency(format!(
                        "merge source {next:?} is not the sibling after {node:?}"
                    )));
                }
                self.apply_merge(*node, *next)?;
            }
        }
        self.emit(event.clone());
        Ok(())
    }

    fn text_of(&self, node: NodeId) -> Result<String, EditorError> {
        self.tree
            .text(node)
            .map(str::to_string)
            .ok_or(EditorError::WrongNodeKind(node))
    }
}

/// Byte position of the `offset`-th character.
fn char_byte(data: &str, offset: usize) -> usize {
    data.char_indices()
        .nth(offset)
        .map(|(at, _)| at)
        .unwrap_or(data.len())
}

fn char_substring(data: &str, start: usize, end: usize) -> String {
    data.chars().skip(start).take(end - start).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn doc() -> (Tree, NodeId, NodeId) {
        // <doc><p>"The quick fox"</p></doc>
        let mut tree = Tree::new(QName::local("doc"));
        let p = tree.new_element(QName::local("p"), BTreeMap::new());
        let t = tree.new_text("The quick fox");
        tree.attach(tree.root(), 0, p).unwrap();
        tree.attach(p, 0, t).unwrap();
        (tree, p, t)
    }

    #[test]
    fn test_insert_text_splices_existing_node() {
        let (mut tree, _, t) = doc();
        let mut log = Vec::new();
        let mut prim = Primitives::new(&mut tree, &mut log);
        let loc = Location::make(prim.tree(), t, 4).unwrap();
        let result = prim.insert_text(loc, "very ").unwrap();
        assert_eq!(result.node, Some(t));
        assert!(!result.created);
        assert_eq!(tree.text(t), Some("The very quick fox"));
        assert!(matches!(log.as_slice(), [MutationEvent::SetText { .. }]));
    }

    #[test]
    fn test_insert_text_joins_adjacent_node_at_element_boundary() {
        let (mut tree, p, t) = doc();
        let mut log = Vec::new();
        let mut prim = Primitives::new(&mut tree, &mut log);
        // Boundary after the text node: the text grows, no new node.
        let loc = Location::make(prim.tree(), p, 1).unwrap();
        let result = prim.insert_text(loc, "!").unwrap();
        assert_eq!(result.node, Some(t));
        assert!(!result.created);
        assert_eq!(tree.text(t), Some("The quick fox!"));
        assert_eq!(tree.child_count(p), 1);
    }

    #[test]
    fn test_insert_text_creates_node_only_when_needed() {
        let mut tree = Tree::new(QName::local("doc"));
        let p = tree.new_element(QName::local("p"), BTreeMap::new());
        tree.attach(tree.root(), 0, p).unwrap();
        let mut log = Vec::new();
        let mut prim = Primitives::new(&mut tree, &mut log);
        let loc = Location::make(prim.tree(), p, 0).unwrap();
        let result = prim.insert_text(loc, "hi").unwrap();
        assert!(result.created);
        assert!(matches!(log.as_slice(), [MutationEvent::InsertNode { .. }]));
    }

    #[test]
    fn test_delete_text_removes_emptied_node() {
        let (mut tree, p, t) = doc();
        let mut log = Vec::new();
        let mut prim = Primitives::new(&mut tree, &mut log);
        let loc = Location::make(prim.tree(), t, 0).unwrap();
        let caret = prim.delete_text(loc, 13).unwrap();
        assert_eq!(tree.child_count(p), 0);
        assert_eq!(caret, Location::make(&tree, p, 0).unwrap());
        // The detached node keeps its text for undo.
        assert_eq!(tree.text(t), Some("The quick fox"));
        assert!(matches!(
            log.as_slice(),
            [MutationEvent::DeleteNode { cascade: false, .. }]
        ));
    }

    #[test]
    fn test_remove_nodes_takes_contiguous_run_and_stitches() {
        // <doc><p>"ab"<em/><b/>"cd"</p></doc>
        let mut tree = Tree::new(QName::local("doc"));
        let p = tree.new_element(QName::local("p"), BTreeMap::new());
        let ab = tree.new_text("ab");
        let em = tree.new_element(QName::local("em"), BTreeMap::new());
        let b = tree.new_element(QName::local("b"), BTreeMap::new());
        let cd = tree.new_text("cd");
        tree.attach(tree.root(), 0, p).unwrap();
        tree.attach(p, 0, ab).unwrap();
        tree.attach(p, 1, em).unwrap();
        tree.attach(p, 2, b).unwrap();
        tree.attach(p, 3, cd).unwrap();

        let mut log = Vec::new();
        let mut prim = Primitives::new(&mut tree, &mut log);
        let caret = prim.remove_nodes(&[em, b]).unwrap();

        // The texts around the removed run merged into one node.
        assert_eq!(tree.children(p), &[ab]);
        assert_eq!(tree.text(ab), Some("abcd"));
        assert_eq!(caret, Location::make(&tree, ab, 2).unwrap());

        // Non-contiguous input is refused before touching the tree.
        let mut log = Vec::new();
        let mut prim = Primitives::new(&mut tree, &mut log);
        assert!(matches!(
            prim.remove_nodes(&[ab, cd]),
            Err(EditorError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_split_and_merge_round_trip_keeps_identity() {
        let (mut tree, p, t) = doc();
        let mut log = Vec::new();
        let mut prim = Primitives::new(&mut tree, &mut log);
        let loc = Location::make(prim.tree(), t, 4).unwrap();
        let (left, right) = prim.split_at(loc).unwrap();
        let (left, right) = (left.unwrap(), right.unwrap());
        assert_eq!(left, t);
        assert_eq!(tree.text(left), Some("The "));
        assert_eq!(tree.text(right), Some("quick fox"));
        assert_eq!(tree.children(p), &[left, right]);

        let mut prim = Primitives::new(&mut tree, &mut log);
        let seam = prim.merge_with_next_sibling(left).unwrap();
        assert_eq!(tree.text(t), Some("The quick fox"));
        assert_eq!(tree.child_count(p), 1);
        assert_eq!(seam, Location::make(&tree, t, 4).unwrap());
    }

    #[test]
    fn test_split_at_text_edges_leaves_node_whole() {
        let (mut tree, p, t) = doc();
        let mut log = Vec::new();
        let mut prim = Primitives::new(&mut tree, &mut log);

        let end = Location::make(prim.tree(), t, 13).unwrap();
        assert_eq!(prim.split_at(end).unwrap(), (Some(t), None));
        let start = Location::make(prim.tree(), t, 0).unwrap();
        assert_eq!(prim.split_at(start).unwrap(), (None, Some(t)));

        // No empty twin was minted and no event emitted: the paragraph
        // still holds a single text node.
        assert_eq!(tree.children(p), &[t]);
        assert_eq!(tree.text(t), Some("The quick fox"));
        assert!(log.is_empty());
    }

    #[test]
    fn test_element_split_moves_children() {
        let (mut tree, p, t) = doc();
        let em = tree.new_element(QName::local("em"), BTreeMap::new());
        tree.attach(p, 1, em).unwrap();
        let mut log = Vec::new();
        let mut prim = Primitives::new(&mut tree, &mut log);
        let loc = Location::make(prim.tree(), p, 1).unwrap();
        let (_, twin) = prim.split_at(loc).unwrap();
        let twin = twin.unwrap();
        assert_eq!(tree.children(p), &[t]);
        assert_eq!(tree.children(twin), &[em]);
        assert_eq!(tree.name(twin), Some(&QName::local("p")));
        assert_eq!(tree.next_sibling(p), Some(twin));
    }

    #[test]
    fn test_delete_node_cascades_bottom_up() {
        let (mut tree, p, t) = doc();
        let em = tree.new_element(QName::local("em"), BTreeMap::new());
        let inner = tree.new_text("x");
        tree.attach(p, 1, em).unwrap();
        tree.attach(em, 0, inner).unwrap();
        let mut log = Vec::new();
        let mut prim = Primitives::new(&mut tree, &mut log);
        prim.delete_node(p).unwrap();

        let flags: Vec<(NodeId, bool)> = log
            .iter()
            .map(|event| match event {
                MutationEvent::DeleteNode { node, cascade, .. } => (*node, *cascade),
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        // Deepest first, the named node last and non-cascade.
        assert_eq!(flags, vec![(inner, true), (em, true), (t, true), (p, false)]);
        assert!(!tree.is_attached(p));
    }

    #[test]
    fn test_cut_within_one_text_node() {
        let (mut tree, p, t) = doc();
        let mut log = Vec::new();
        let mut prim = Primitives::new(&mut tree, &mut log);
        let start = Location::make(prim.tree(), t, 4).unwrap();
        let end = Location::make(prim.tree(), t, 10).unwrap();
        let (caret, removed) = prim.cut(start, end).unwrap();
        assert_eq!(tree.text(t), Some("The fox"));
        assert_eq!(caret, Location::make(&tree, t, 4).unwrap());
        assert_eq!(removed.len(), 1);
        assert_eq!(tree.text(removed[0]), Some("quick "));
        assert!(!tree.is_attached(removed[0]));
        let _ = p;
    }

    #[test]
    fn test_cut_across_nodes_stitches_boundary() {
        // <p>"ab"<em/>"cd"</p>, cut (ab,1)..(cd,1) -> <p>"ad"</p>
        let mut tree = Tree::new(QName::local("doc"));
        let p = tree.new_element(QName::local("p"), BTreeMap::new());
        let ab = tree.new_text("ab");
        let em = tree.new_element(QName::local("em"), BTreeMap::new());
        let cd = tree.new_text("cd");
        tree.attach(tree.root(), 0, p).unwrap();
        tree.attach(p, 0, ab).unwrap();
        tree.attach(p, 1, em).unwrap();
        tree.attach(p, 2, cd).unwrap();

        let mut log = Vec::new();
        let mut prim = Primitives::new(&mut tree, &mut log);
        let start = Location::make(prim.tree(), ab, 1).unwrap();
        let end = Location::make(prim.tree(), cd, 1).unwrap();
        let (caret, removed) = prim.cut(start, end).unwrap();

        assert_eq!(tree.child_count(p), 1);
        assert_eq!(tree.text(ab), Some("ad"));
        assert_eq!(caret, Location::make(&tree, ab, 1).unwrap());
        // Removed content in document order: "b", <em/>, "c".
        assert_eq!(removed.len(), 3);
        assert_eq!(tree.text(removed[0]), Some("b"));
        assert_eq!(removed[1], em);
        assert_eq!(tree.text(removed[2]), Some("c"));
    }

    #[test]
    fn test_cut_rejects_reversed_range() {
        let (mut tree, _, t) = doc();
        let mut log = Vec::new();
        let mut prim = Primitives::new(&mut tree, &mut log);
        let start = Location::make(prim.tree(), t, 5).unwrap();
        let end = Location::make(prim.tree(), t, 2).unwrap();
        assert!(matches!(
            prim.cut(start, end),
            Err(EditorError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_replay_of_inverses_restores_tree() {
        let (mut tree, p, t) = doc();
        let pristine = tree.clone();
        let mut log = Vec::new();
        let mut prim = Primitives::new(&mut tree, &mut log);
        let loc = Location::make(prim.tree(), t, 4).unwrap();
        prim.insert_element(loc, QName::local("note"), BTreeMap::new())
            .unwrap();

        let recorded = log.clone();
        let mut undo_log = Vec::new();
        let mut prim = Primitives::new(&mut tree, &mut undo_log);
        for event in recorded.iter().rev() {
            prim.replay(&event.inverse()).unwrap();
        }
        assert!(pristine.deep_eq(pristine.root(), &tree, tree.root()));
        assert_eq!(tree.text(t), Some("The quick fox"));
        assert_eq!(tree.children(p), &[t]);
    }
}
