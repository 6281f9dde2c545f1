//! The element index between the data tree and the GUI tree.

use crate::ViewError;
use std::collections::HashMap;
use weft_dom::NodeId;

/// Bidirectional element mapping. Only elements are indexed; text nodes
/// are resolved positionally and decorations have no data counterpart
/// at all.
///
/// Both directions are kept injective: a node may appear in at most one
/// pair, in either role.
#[derive(Debug, Default)]
pub struct TreeIndex {
    data_to_gui: HashMap<NodeId, NodeId>,
    gui_to_data: HashMap<NodeId, NodeId>,
}

impl TreeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link(&mut self, data: NodeId, gui: NodeId) -> Result<(), ViewError> {
        if self.data_to_gui.contains_key(&data) {
            return Err(ViewError::DuplicateMapping(data));
        }
        if self.gui_to_data.contains_key(&gui) {
            return Err(ViewError::DuplicateMapping(gui));
        }
        self.data_to_gui.insert(data, gui);
        self.gui_to_data.insert(gui, data);
        Ok(())
    }

    /// Drop the pair containing this data node, if any.
    pub fn unlink_data(&mut self, data: NodeId) -> Option<NodeId> {
        let gui = self.data_to_gui.remove(&data)?;
        self.gui_to_data.remove(&gui);
        Some(gui)
    }

    pub fn gui_of(&self, data: NodeId) -> Option<NodeId> {
        self.data_to_gui.get(&data).copied()
    }

    pub fn data_of(&self, gui: NodeId) -> Option<NodeId> {
        self.gui_to_data.get(&gui).copied()
    }

    pub fn require_gui(&self, data: NodeId) -> Result<NodeId, ViewError> {
        self.gui_of(data).ok_or(ViewError::MappingMissing(data))
    }

    pub fn require_data(&self, gui: NodeId) -> Result<NodeId, ViewError> {
        self.data_of(gui).ok_or(ViewError::MappingMissing(gui))
    }

    pub fn len(&self) -> usize {
        self.data_to_gui.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data_to_gui.is_empty()
    }

    /// Check the two directions agree pairwise. Cheap enough to run in
    /// tests after every scenario.
    pub fn is_consistent(&self) -> bool {
        self.data_to_gui.len() == self.gui_to_data.len()
            && self
                .data_to_gui
                .iter()
                .all(|(data, gui)| self.gui_to_data.get(gui) == Some(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_dom::{QName, Tree};

    #[test]
    fn test_link_is_bidirectional_and_unique() {
        let mut data = Tree::new(QName::local("doc"));
        let mut gui = Tree::new(QName::local("doc"));
        let d1 = data.new_element(QName::local("p"), Default::default());
        let d2 = data.new_element(QName::local("p"), Default::default());
        let g1 = gui.new_element(QName::local("p"), Default::default());
        let g2 = gui.new_element(QName::local("p"), Default::default());

        let mut index = TreeIndex::new();
        index.link(d1, g1).unwrap();
        assert_eq!(index.gui_of(d1), Some(g1));
        assert_eq!(index.data_of(g1), Some(d1));

        // Neither side of an existing pair may be reused.
        assert!(matches!(
            index.link(d1, g2),
            Err(ViewError::DuplicateMapping(_))
        ));
        assert!(matches!(
            index.link(d2, g1),
            Err(ViewError::DuplicateMapping(_))
        ));
        assert!(index.is_consistent());
    }

    #[test]
    fn test_unlink_removes_both_directions() {
        let mut data = Tree::new(QName::local("doc"));
        let mut gui = Tree::new(QName::local("doc"));
        let d = data.new_element(QName::local("p"), Default::default());
        let g = gui.new_element(QName::local("p"), Default::default());

        let mut index = TreeIndex::new();
        index.link(d, g).unwrap();
        assert_eq!(index.unlink_data(d), Some(g));
        assert_eq!(index.gui_of(d), None);
        assert_eq!(index.data_of(g), None);
        assert!(index.is_empty());
        assert!(index.is_consistent());
    }
}
