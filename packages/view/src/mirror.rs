//! The GUI tree mirror.
//!
//! The mirror owns the GUI tree and keeps it converged with the data
//! tree by replaying the data tree's mutation events. It never walks the
//! data tree to re-render; each data event maps to a small GUI-side
//! change applied through the same primitive layer the data editor uses,
//! so the GUI tree produces its own event stream for the listener.
//!
//! ## Design
//!
//! - Elements correspond through the [`TreeIndex`]; text nodes are
//!   found positionally (the n-th non-decoration child), which works
//!   because replay happens before anything else touches the GUI tree.
//! - Decorations are skipped by every positional computation. Inserting
//!   at a boundary holding decorations lands after start-biased ones
//!   and before end-biased ones.
//! - Stripping decorations, the GUI tree serializes to exactly the same
//!   text as the data tree at every point between replays.
//! - Replay accepts a whole transaction's event list against the
//!   post-transaction data tree: an insert materializes the node's
//!   subtree as it stands now, and later events in the batch that
//!   originally built that subtree recognize their effect is already
//!   present and no-op.

use crate::{DecorationSpec, Mode, TreeIndex, ViewError};
use weft_dom::{Bias, Location, NodeId, NodeKind, Tree};
use weft_editor::{MutationEvent, Primitives};

pub struct Mirror {
    gui: Tree,
    index: TreeIndex,
    /// GUI-side events pending dispatch.
    log: Vec<MutationEvent>,
}

impl Mirror {
    /// Build a GUI tree mirroring `data`, decorated by `mode`. The
    /// initial content is emitted as insert events so the listener can
    /// treat first render like any other change.
    pub fn new(data: &Tree, mode: &dyn Mode) -> Result<Self, ViewError> {
        let root_name = data
            .name(data.root())
            .cloned()
            .ok_or_else(|| ViewError::Diverged("data root is not an element".into()))?;
        let mut mirror = Self {
            gui: Tree::new(root_name),
            index: TreeIndex::new(),
            log: Vec::new(),
        };
        let gui_root = mirror.gui.root();
        mirror.index.link(data.root(), gui_root)?;
        for class in mode.classes_for(data, data.root()) {
            mirror.gui.add_class(gui_root, class)?;
        }
        for spec in mode.decorations_for(data, data.root()) {
            mirror.place_decoration(gui_root, &spec)?;
        }
        let children: Vec<NodeId> = data.children(data.root()).to_vec();
        for (at, child) in children.into_iter().enumerate() {
            let gui_child = mirror.build_subtree(data, child, mode)?;
            let pos = mirror.gui_insert_position(gui_root, at);
            let mut prim = Primitives::new(&mut mirror.gui, &mut mirror.log);
            let loc = Location::make(prim.tree(), gui_root, pos)?;
            prim.insert_node_at(loc, gui_child)?;
        }
        Ok(mirror)
    }

    pub fn gui(&self) -> &Tree {
        &self.gui
    }

    pub fn index(&self) -> &TreeIndex {
        &self.index
    }

    /// Drain the GUI events produced by replays since the last drain.
    pub fn take_gui_events(&mut self) -> Vec<MutationEvent> {
        std::mem::take(&mut self.log)
    }

    // ------------------------------------------------------------------
    // Positional correspondence
    // ------------------------------------------------------------------

    /// GUI child position for inserting content at a data child index.
    pub fn gui_insert_position(&self, gui_parent: NodeId, data_index: usize) -> usize {
        let children = self.gui.children(gui_parent);
        let mut content_seen = 0;
        let mut pos = 0;
        while pos < children.len() {
            let child = children[pos];
            if let Some(decoration) = self.gui.node(child).decoration() {
                if content_seen < data_index
                    || (content_seen == data_index && decoration.bias == Bias::Start)
                {
                    pos += 1;
                    continue;
                }
                break;
            }
            if content_seen == data_index {
                break;
            }
            content_seen += 1;
            pos += 1;
        }
        pos
    }

    /// The GUI child corresponding to the data child at `data_index`.
    pub fn gui_content_child(
        &self,
        gui_parent: NodeId,
        data_index: usize,
    ) -> Result<NodeId, ViewError> {
        let mut content_seen = 0;
        for &child in self.gui.children(gui_parent) {
            if self.gui.node(child).is_decoration() {
                continue;
            }
            if content_seen == data_index {
                return Ok(child);
            }
            content_seen += 1;
        }
        Err(ViewError::Diverged(format!(
            "no content child at data index {data_index} under {gui_parent:?}"
        )))
    }

    /// The data child index of a GUI content child.
    pub fn data_index_of(&self, gui_child: NodeId) -> Result<usize, ViewError> {
        let parent = self
            .gui
            .parent(gui_child)
            .ok_or(ViewError::MappingMissing(gui_child))?;
        let mut content_seen = 0;
        for &child in self.gui.children(parent) {
            if child == gui_child {
                return Ok(content_seen);
            }
            if !self.gui.node(child).is_decoration() {
                content_seen += 1;
            }
        }
        Err(ViewError::Diverged(format!(
            "{gui_child:?} is not a child of its recorded parent"
        )))
    }

    /// GUI twin of a data text node, located through its parent.
    pub fn gui_text_twin(&self, data: &Tree, node: NodeId) -> Result<NodeId, ViewError> {
        let parent = data.parent(node).ok_or(ViewError::MappingMissing(node))?;
        let at = data
            .index_in_parent(node)
            .ok_or(ViewError::MappingMissing(node))?;
        let gui_parent = self.index.require_gui(parent)?;
        let twin = self.gui_content_child(gui_parent, at)?;
        if !self.gui.node(twin).is_text() {
            return Err(ViewError::Diverged(format!(
                "expected text twin for {node:?}, found an element"
            )));
        }
        Ok(twin)
    }

    // ------------------------------------------------------------------
    // Replay
    // ------------------------------------------------------------------

    /// Apply one data-tree event to the GUI tree. `data` must already
    /// reflect the event.
    pub fn apply(
        &mut self,
        data: &Tree,
        event: &MutationEvent,
        mode: &dyn Mode,
    ) -> Result<(), ViewError> {
        tracing::trace!(?event, "mirroring");
        match event {
            MutationEvent::InsertNode {
                parent,
                index,
                node,
            } => {
                let gui_parent = self.index.require_gui(*parent)?;
                if self.insert_already_applied(data, gui_parent, *index, *node) {
                    return Ok(());
                }
                let gui_node = self.build_subtree(data, *node, mode)?;
                let pos = self.gui_insert_position(gui_parent, *index);
                let mut prim = Primitives::new(&mut self.gui, &mut self.log);
                let loc = Location::make(prim.tree(), gui_parent, pos)?;
                prim.insert_node_at(loc, gui_node)?;
            }
            MutationEvent::DeleteNode {
                parent,
                index,
                node,
                ..
            } => {
                let gui_parent = self.index.require_gui(*parent)?;
                let gui_node = match self.index.gui_of(*node) {
                    Some(gui_node) => gui_node,
                    None => self.gui_content_child(gui_parent, *index)?,
                };
                for descendant in self.gui.descendants(gui_node) {
                    if let Some(data_twin) = self.index.data_of(descendant) {
                        self.index.unlink_data(data_twin);
                    }
                }
                let mut prim = Primitives::new(&mut self.gui, &mut self.log);
                prim.delete_node(gui_node)?;
            }
            MutationEvent::SetText { node, value, .. } => {
                let twin = self.gui_text_twin(data, *node)?;
                let mut prim = Primitives::new(&mut self.gui, &mut self.log);
                prim.set_text_value(twin, value)?;
            }
            MutationEvent::SetAttribute {
                node, name, value, ..
            } => {
                let gui_node = self.index.require_gui(*node)?;
                let mut prim = Primitives::new(&mut self.gui, &mut self.log);
                prim.set_attribute(gui_node, name, value.as_deref())?;
            }
            MutationEvent::Split {
                node,
                offset,
                new_node,
            } => match &data.node(*node).kind {
                NodeKind::Text { .. } => {
                    if self.text_split_already_applied(data, *node, *new_node)? {
                        return Ok(());
                    }
                    let twin = self.gui_text_twin(data, *node)?;
                    let mut prim = Primitives::new(&mut self.gui, &mut self.log);
                    let loc = Location::make(prim.tree(), twin, *offset)?;
                    prim.split_at(loc)?;
                }
                NodeKind::Element { .. } => {
                    if self.index.gui_of(*new_node).is_some() {
                        return Ok(());
                    }
                    let gui_node = self.index.require_gui(*node)?;
                    let pos = self.gui_insert_position(gui_node, *offset);
                    let gui_twin = {
                        let mut prim = Primitives::new(&mut self.gui, &mut self.log);
                        let loc = Location::make(prim.tree(), gui_node, pos)?;
                        let (_, twin) = prim.split_at(loc)?;
                        twin.ok_or_else(|| {
                            ViewError::Diverged(format!(
                                "element split of {gui_node:?} produced no second half"
                            ))
                        })?
                    };
                    self.index.link(*new_node, gui_twin)?;
                    for class in mode.classes_for(data, *new_node) {
                        self.gui.add_class(gui_twin, class)?;
                    }
                    // The split scattered the host's decorations across
                    // the halves; both get a fresh set.
                    self.refresh_decorations(data, *node, gui_node, mode)?;
                    self.refresh_decorations(data, *new_node, gui_twin, mode)?;
                }
            },
            MutationEvent::Merge { node, next, .. } => {
                if let Some(gui_next) = self.index.gui_of(*next) {
                    // Element merge: the GUI twins are adjacent same-named
                    // elements, exactly like their data counterparts were.
                    let gui_node = self.index.require_gui(*node)?;
                    self.index.unlink_data(*next);
                    {
                        let mut prim = Primitives::new(&mut self.gui, &mut self.log);
                        prim.merge_with_next_sibling(gui_node)?;
                    }
                    debug_assert!(!self.gui.is_attached(gui_next));
                    // The absorbed sibling's decorations came along with
                    // its content; re-derive the merged element's set.
                    self.refresh_decorations(data, *node, gui_node, mode)?;
                } else {
                    // Text merge. The GUI sibling may sit past decorations;
                    // fold its text in and drop it, leaving decorations be.
                    let gui_node = self.gui_text_twin(data, *node)?;
                    let mut cursor = self.gui.next_sibling(gui_node);
                    while let Some(candidate) = cursor {
                        if !self.gui.node(candidate).is_decoration() {
                            break;
                        }
                        cursor = self.gui.next_sibling(candidate);
                    }
                    let Some(gui_next) = cursor else {
                        // Already folded by an enclosing insert.
                        return Ok(());
                    };
                    let merged = {
                        let head = self.gui.text(gui_node).unwrap_or_default().to_string();
                        let tail = self.gui.text(gui_next).unwrap_or_default();
                        format!("{head}{tail}")
                    };
                    let mut prim = Primitives::new(&mut self.gui, &mut self.log);
                    prim.set_text_value(gui_node, &merged)?;
                    prim.delete_node(gui_next)?;
                }
            }
        }
        Ok(())
    }

    /// Replay a whole batch in order.
    pub fn apply_all(
        &mut self,
        data: &Tree,
        events: &[MutationEvent],
        mode: &dyn Mode,
    ) -> Result<(), ViewError> {
        for event in events {
            self.apply(data, event, mode)?;
        }
        Ok(())
    }

    /// Whether an insert event's effect is already visible in the GUI
    /// tree because an earlier insert in the batch materialized it.
    fn insert_already_applied(
        &self,
        data: &Tree,
        gui_parent: NodeId,
        index: usize,
        node: NodeId,
    ) -> bool {
        if data.node(node).is_element() {
            return self
                .index
                .gui_of(node)
                .is_some_and(|gui| self.gui.parent(gui) == Some(gui_parent));
        }
        // Text: the parent's shapes must already agree and the occupant
        // of the slot must carry this node's text.
        let data_parent = match self.index.data_of(gui_parent) {
            Some(data_parent) => data_parent,
            None => return false,
        };
        let gui_count = self
            .gui
            .children(gui_parent)
            .iter()
            .filter(|&&child| !self.gui.node(child).is_decoration())
            .count();
        if gui_count != data.child_count(data_parent) {
            return false;
        }
        match self.gui_content_child(gui_parent, index) {
            Ok(occupant) => self.gui.text(occupant) == data.text(node),
            Err(_) => false,
        }
    }

    /// Whether a text split's halves are both already present in the
    /// GUI tree, which happens when an enclosing insert earlier in the
    /// batch materialized the post-transaction subtree. Both halves
    /// must be found at their data positions carrying their data text;
    /// a pending split never passes, since its twin is still missing
    /// from the GUI parent.
    fn text_split_already_applied(
        &self,
        data: &Tree,
        node: NodeId,
        new_node: NodeId,
    ) -> Result<bool, ViewError> {
        let Some(parent) = data.parent(node) else {
            return Ok(false);
        };
        if data.parent(new_node) != Some(parent) {
            return Ok(false);
        }
        let gui_parent = self.index.require_gui(parent)?;
        let gui_count = self
            .gui
            .children(gui_parent)
            .iter()
            .filter(|&&child| !self.gui.node(child).is_decoration())
            .count();
        if gui_count != data.child_count(parent) {
            return Ok(false);
        }
        for half in [node, new_node] {
            let at = data
                .index_in_parent(half)
                .ok_or(ViewError::MappingMissing(half))?;
            let occupant = self.gui_content_child(gui_parent, at)?;
            if self.gui.text(occupant) != data.text(half) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Strip an element's decorations and lay down the mode's current
    /// set, as if the element had just been mirrored.
    fn refresh_decorations(
        &mut self,
        data: &Tree,
        node: NodeId,
        gui_node: NodeId,
        mode: &dyn Mode,
    ) -> Result<(), ViewError> {
        let stale: Vec<NodeId> = self
            .gui
            .children(gui_node)
            .iter()
            .copied()
            .filter(|&child| self.gui.node(child).is_decoration())
            .collect();
        for decoration in stale {
            self.gui.detach(decoration)?;
        }
        for spec in mode.decorations_for(data, node) {
            self.place_decoration(gui_node, &spec)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Materialization
    // ------------------------------------------------------------------

    /// Build a detached GUI copy of a data subtree: elements linked in
    /// the index, classes and decorations applied per the mode.
    fn build_subtree(
        &mut self,
        data: &Tree,
        node: NodeId,
        mode: &dyn Mode,
    ) -> Result<NodeId, ViewError> {
        match &data.node(node).kind {
            NodeKind::Text { data: text } => {
                let text = text.clone();
                Ok(self.gui.new_text(text))
            }
            NodeKind::Element {
                name,
                attrs,
                children,
                ..
            } => {
                let (name, attrs) = (name.clone(), attrs.clone());
                let children = children.clone();
                let gui_node = self.gui.new_element(name, attrs);
                self.index.link(node, gui_node)?;
                for class in mode.classes_for(data, node) {
                    self.gui.add_class(gui_node, class)?;
                }
                for child in children {
                    let gui_child = self.build_subtree(data, child, mode)?;
                    let end = self.gui.child_count(gui_node);
                    self.gui.attach(gui_node, end, gui_child)?;
                }
                for spec in mode.decorations_for(data, node) {
                    self.place_decoration(gui_node, &spec)?;
                }
                Ok(gui_node)
            }
        }
    }

    fn place_decoration(
        &mut self,
        gui_parent: NodeId,
        spec: &DecorationSpec,
    ) -> Result<(), ViewError> {
        let decoration = self.gui.new_decoration(spec.class.clone(), spec.bias);
        // After existing decorations at the same boundary, so insertion
        // order is preserved.
        let children = self.gui.children(gui_parent).to_vec();
        let mut content_seen = 0;
        let mut pos = 0;
        for child in children {
            if self.gui.node(child).is_decoration() {
                pos += 1;
                continue;
            }
            if content_seen == spec.at {
                break;
            }
            content_seen += 1;
            pos += 1;
        }
        self.gui.attach(gui_parent, pos, decoration)?;
        Ok(())
    }
}
