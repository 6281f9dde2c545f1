//! The document editor: a data tree plus transactions and history.
//!
//! All editing happens inside a transaction. Primitive calls outside one
//! fail with [`EditorError::NoOpenTransaction`]; commit moves the open
//! transaction into the undo history and rollback reverts it by replaying
//! the recorded inverses in reverse. Undo and redo replay recorded steps
//! through the same primitive layer live edits use, so every observer
//! downstream sees one uniform event stream.

use crate::{
    EditorError, History, MutationEvent, Primitives, TextInsertion, Transaction,
};
use std::collections::BTreeMap;
use weft_dom::{Location, NodeId, QName, Tree};

pub struct DocumentEditor {
    tree: Tree,
    open: Option<Transaction>,
    history: History,
    /// Events not yet drained by the mirror layer.
    outbound: Vec<MutationEvent>,
}

impl DocumentEditor {
    pub fn new(tree: Tree, max_undo_depth: usize) -> Self {
        Self {
            tree,
            open: None,
            history: History::new(max_undo_depth),
            outbound: Vec::new(),
        }
    }

    /// An editor over a fresh tree with the given root element.
    pub fn with_root(root_name: QName, max_undo_depth: usize) -> Self {
        Self::new(Tree::new(root_name), max_undo_depth)
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Drain the events emitted since the last drain, in order.
    pub fn take_events(&mut self) -> Vec<MutationEvent> {
        std::mem::take(&mut self.outbound)
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    pub fn start_transaction(&mut self, label: impl Into<String>) -> Result<(), EditorError> {
        if let Some(open) = &self.open {
            return Err(EditorError::TransactionAlreadyOpen(open.label().to_string()));
        }
        let label = label.into();
        tracing::debug!(label, "transaction opened");
        self.open = Some(Transaction::new(label, self.tree.generation()));
        Ok(())
    }

    pub fn has_open_transaction(&self) -> bool {
        self.open.is_some()
    }

    pub fn open_label(&self) -> Option<&str> {
        self.open.as_ref().map(Transaction::label)
    }

    /// Commit the open transaction into the undo history. An empty
    /// transaction commits to nothing.
    pub fn commit(&mut self) -> Result<(), EditorError> {
        let transaction = self.open.take().ok_or(EditorError::NoOpenTransaction)?;
        if transaction.is_empty() {
            return Ok(());
        }
        tracing::debug!(
            label = transaction.label(),
            steps = transaction.len(),
            "transaction committed"
        );
        self.history.record(transaction);
        Ok(())
    }

    /// Revert the open transaction by replaying its inverses in reverse
    /// order. A failure mid-revert leaves the history unusable and
    /// disables it.
    pub fn rollback(&mut self) -> Result<(), EditorError> {
        let transaction = self.open.take().ok_or(EditorError::NoOpenTransaction)?;
        tracing::debug!(
            label = transaction.label(),
            steps = transaction.len(),
            "transaction rolled back"
        );
        self.replay_all(transaction.steps().iter().rev().map(|step| &step.inverse))
            .map_err(|err| {
                self.history.disable();
                EditorError::UndoConsistency(err.to_string())
            })
    }

    // ------------------------------------------------------------------
    // Undo / redo
    // ------------------------------------------------------------------

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_label(&self) -> Option<&str> {
        self.history.undo_label()
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.history.redo_label()
    }

    pub fn history_disabled(&self) -> bool {
        self.history.is_disabled()
    }

    /// Undo the most recent committed transaction. Returns false when
    /// there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool, EditorError> {
        if self.history.is_disabled() {
            return Err(EditorError::HistoryDisabled);
        }
        if let Some(open) = &self.open {
            return Err(EditorError::TransactionAlreadyOpen(open.label().to_string()));
        }
        let Some(transaction) = self.history.peek_undo().cloned() else {
            return Ok(false);
        };
        tracing::debug!(label = transaction.label(), "undo");
        self.replay_all(transaction.steps().iter().rev().map(|step| &step.inverse))
            .map_err(|err| {
                self.history.disable();
                EditorError::UndoConsistency(err.to_string())
            })?;
        self.history.confirm_undo();
        Ok(true)
    }

    /// Reapply the most recently undone transaction.
    pub fn redo(&mut self) -> Result<bool, EditorError> {
        if self.history.is_disabled() {
            return Err(EditorError::HistoryDisabled);
        }
        if let Some(open) = &self.open {
            return Err(EditorError::TransactionAlreadyOpen(open.label().to_string()));
        }
        let Some(transaction) = self.history.peek_redo().cloned() else {
            return Ok(false);
        };
        tracing::debug!(label = transaction.label(), "redo");
        self.replay_all(transaction.steps().iter().map(|step| &step.event))
            .map_err(|err| {
                self.history.disable();
                EditorError::UndoConsistency(err.to_string())
            })?;
        self.history.confirm_redo();
        Ok(true)
    }

    fn replay_all<'e>(
        &mut self,
        events: impl Iterator<Item = &'e MutationEvent>,
    ) -> Result<(), EditorError> {
        let mut log = Vec::new();
        let mut primitives = Primitives::new(&mut self.tree, &mut log);
        let mut result = Ok(());
        for event in events {
            if let Err(err) = primitives.replay(event) {
                result = Err(err);
                break;
            }
        }
        self.outbound.extend(log);
        result
    }

    // ------------------------------------------------------------------
    // Node factories. Creation is not a mutation; no transaction needed.
    // ------------------------------------------------------------------

    pub fn new_element(&mut self, name: QName, attrs: BTreeMap<QName, String>) -> NodeId {
        self.tree.new_element(name, attrs)
    }

    pub fn new_text(&mut self, data: impl Into<String>) -> NodeId {
        self.tree.new_text(data)
    }

    // ------------------------------------------------------------------
    // Primitives, recorded into the open transaction
    // ------------------------------------------------------------------

    pub fn insert_text(&mut self, loc: Location, text: &str) -> Result<TextInsertion, EditorError> {
        self.recorded(|prim| prim.insert_text(loc, text))
    }

    pub fn delete_text(&mut self, loc: Location, count: usize) -> Result<Location, EditorError> {
        self.recorded(|prim| prim.delete_text(loc, count))
    }

    pub fn insert_element(
        &mut self,
        loc: Location,
        name: QName,
        attrs: BTreeMap<QName, String>,
    ) -> Result<NodeId, EditorError> {
        self.recorded(|prim| prim.insert_element(loc, name, attrs))
    }

    pub fn insert_node_at(&mut self, loc: Location, node: NodeId) -> Result<(), EditorError> {
        self.recorded(|prim| prim.insert_node_at(loc, node))
    }

    pub fn delete_node(&mut self, node: NodeId) -> Result<(), EditorError> {
        self.recorded(|prim| prim.delete_node(node))
    }

    pub fn extract_node(&mut self, node: NodeId) -> Result<usize, EditorError> {
        self.recorded(|prim| prim.extract_node(node))
    }

    pub fn remove_node(&mut self, node: NodeId) -> Result<Location, EditorError> {
        self.recorded(|prim| prim.remove_node(node))
    }

    pub fn remove_nodes(&mut self, nodes: &[NodeId]) -> Result<Location, EditorError> {
        self.recorded(|prim| prim.remove_nodes(nodes))
    }

    pub fn split_at(
        &mut self,
        loc: Location,
    ) -> Result<(Option<NodeId>, Option<NodeId>), EditorError> {
        self.recorded(|prim| prim.split_at(loc))
    }

    pub fn merge_with_next_sibling(&mut self, node: NodeId) -> Result<Location, EditorError> {
        self.recorded(|prim| prim.merge_with_next_sibling(node))
    }

    pub fn merge_text_nodes(&mut self, node: NodeId) -> Result<Location, EditorError> {
        self.recorded(|prim| prim.merge_text_nodes(node))
    }

    pub fn set_text(&mut self, node: NodeId, value: &str) -> Result<(), EditorError> {
        self.recorded(|prim| prim.set_text(node, value))
    }

    pub fn set_text_value(&mut self, node: NodeId, value: &str) -> Result<(), EditorError> {
        self.recorded(|prim| prim.set_text_value(node, value))
    }

    pub fn set_attribute(
        &mut self,
        node: NodeId,
        name: &QName,
        value: Option<&str>,
    ) -> Result<(), EditorError> {
        self.recorded(|prim| prim.set_attribute(node, name, value))
    }

    pub fn cut(
        &mut self,
        start: Location,
        end: Location,
    ) -> Result<(Location, Vec<NodeId>), EditorError> {
        self.recorded(|prim| prim.cut(start, end))
    }

    /// Run a primitive closure, appending whatever events it emitted to
    /// both the open transaction and the outbound queue. Events are
    /// recorded even when the closure fails partway: the partial
    /// application is then revertible through rollback.
    fn recorded<R>(
        &mut self,
        f: impl FnOnce(&mut Primitives<'_>) -> Result<R, EditorError>,
    ) -> Result<R, EditorError> {
        if self.open.is_none() {
            return Err(EditorError::NoOpenTransaction);
        }
        let mut log = Vec::new();
        let result = f(&mut Primitives::new(&mut self.tree, &mut log));
        if let Some(open) = self.open.as_mut() {
            for event in &log {
                open.record(event.clone());
            }
        }
        self.outbound.extend(log);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_dom::serialize;

    fn editor() -> (DocumentEditor, NodeId, NodeId) {
        let mut tree = Tree::new(QName::local("doc"));
        let p = tree.new_element(QName::local("p"), BTreeMap::new());
        let t = tree.new_text("hello");
        tree.attach(tree.root(), 0, p).unwrap();
        tree.attach(p, 0, t).unwrap();
        (DocumentEditor::new(tree, 0), p, t)
    }

    #[test]
    fn test_primitives_require_open_transaction() {
        let (mut ed, _, t) = editor();
        let loc = Location::make(ed.tree(), t, 0).unwrap();
        assert_eq!(
            ed.insert_text(loc, "x"),
            Err(EditorError::NoOpenTransaction)
        );
    }

    #[test]
    fn test_commit_undo_redo_round_trip() {
        let (mut ed, _, t) = editor();
        ed.start_transaction("type").unwrap();
        let loc = Location::make(ed.tree(), t, 5).unwrap();
        ed.insert_text(loc, ", world").unwrap();
        ed.commit().unwrap();
        assert_eq!(serialize(ed.tree()), "<doc><p>hello, world</p></doc>");

        assert!(ed.undo().unwrap());
        assert_eq!(serialize(ed.tree()), "<doc><p>hello</p></doc>");
        assert!(!ed.can_undo());

        assert!(ed.redo().unwrap());
        assert_eq!(serialize(ed.tree()), "<doc><p>hello, world</p></doc>");
        assert_eq!(ed.tree().text(t), Some("hello, world"));
    }

    #[test]
    fn test_rollback_reverts_partial_work() {
        let (mut ed, p, t) = editor();
        ed.start_transaction("wrap").unwrap();
        let loc = Location::make(ed.tree(), t, 2).unwrap();
        ed.insert_element(loc, QName::local("em"), BTreeMap::new())
            .unwrap();
        assert_eq!(ed.tree().child_count(p), 3);

        ed.rollback().unwrap();
        assert_eq!(serialize(ed.tree()), "<doc><p>hello</p></doc>");
        assert_eq!(ed.tree().children(p), &[t]);
        // Nothing reached the history.
        assert!(!ed.can_undo());
        assert!(!ed.has_open_transaction());
    }

    #[test]
    fn test_undo_restores_node_identities() {
        let (mut ed, p, t) = editor();
        ed.start_transaction("delete").unwrap();
        ed.delete_node(p).unwrap();
        ed.commit().unwrap();
        assert!(!ed.tree().is_attached(p));

        ed.undo().unwrap();
        assert!(ed.tree().is_attached(p));
        assert!(ed.tree().is_attached(t));
        assert_eq!(ed.tree().children(p), &[t]);
    }

    #[test]
    fn test_nested_transaction_is_rejected() {
        let (mut ed, ..) = editor();
        ed.start_transaction("outer").unwrap();
        assert_eq!(
            ed.start_transaction("inner"),
            Err(EditorError::TransactionAlreadyOpen("outer".into()))
        );
    }

    #[test]
    fn test_empty_commit_records_nothing() {
        let (mut ed, ..) = editor();
        ed.start_transaction("noop").unwrap();
        ed.commit().unwrap();
        assert!(!ed.can_undo());
    }

    #[test]
    fn test_events_drain_in_order() {
        let (mut ed, p, t) = editor();
        ed.start_transaction("edit").unwrap();
        let loc = Location::make(ed.tree(), t, 5).unwrap();
        ed.insert_text(loc, "!").unwrap();
        ed.set_attribute(p, &QName::local("n"), Some("1")).unwrap();
        ed.commit().unwrap();

        let events = ed.take_events();
        assert!(matches!(events[0], MutationEvent::SetText { .. }));
        assert!(matches!(events[1], MutationEvent::SetAttribute { .. }));
        assert!(ed.take_events().is_empty());
    }
}
