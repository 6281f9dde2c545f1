//! Named, schema-aware editing operations.
//!
//! A transformation is a labelled compound operation built out of the
//! primitive layer. Firing one wraps the handler in a transaction: the
//! whole operation commits as one undo step, and a handler error rolls
//! every already-applied primitive back before the error propagates, so
//! a failed transformation leaves no trace in the document.

use crate::{DocumentEditor, EditorError};
use std::collections::{BTreeMap, HashMap};
use weft_dom::{Location, QName, Tree};

/// Inputs to a transformation. Which fields a given transformation
/// requires is up to its handler; missing ones fail with
/// [`EditorError::MissingInput`].
#[derive(Debug, Clone, Default)]
pub struct TransformationData {
    pub name: Option<QName>,
    pub location: Option<Location>,
    pub end_location: Option<Location>,
    pub text: Option<String>,
    pub attributes: BTreeMap<QName, String>,
}

impl TransformationData {
    pub fn at(location: Location) -> Self {
        Self {
            location: Some(location),
            ..Self::default()
        }
    }

    pub fn range(start: Location, end: Location) -> Self {
        Self {
            location: Some(start),
            end_location: Some(end),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: QName) -> Self {
        self.name = Some(name);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    fn require_location(&self, name: &str) -> Result<Location, EditorError> {
        self.location
            .ok_or_else(|| EditorError::MissingInput(name.to_string(), "a location"))
    }

    fn require_end(&self, name: &str) -> Result<Location, EditorError> {
        self.end_location
            .ok_or_else(|| EditorError::MissingInput(name.to_string(), "an end location"))
    }

    fn require_name(&self, name: &str) -> Result<QName, EditorError> {
        self.name
            .clone()
            .ok_or_else(|| EditorError::MissingInput(name.to_string(), "an element name"))
    }

    fn require_text(&self, name: &str) -> Result<&str, EditorError> {
        self.text
            .as_deref()
            .ok_or_else(|| EditorError::MissingInput(name.to_string(), "text"))
    }
}

pub type TransformationHandler =
    fn(&mut DocumentEditor, &TransformationData) -> Result<Option<Location>, EditorError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformationKind {
    Insert,
    Delete,
    Wrap,
    Unwrap,
    Split,
    Merge,
}

pub struct Transformation {
    name: String,
    kind: TransformationKind,
    /// Undo-menu label, e.g. "wrap in element".
    label: String,
    handler: TransformationHandler,
}

impl Transformation {
    pub fn new(
        name: impl Into<String>,
        kind: TransformationKind,
        label: impl Into<String>,
        handler: TransformationHandler,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            label: label.into(),
            handler,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TransformationKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Run the transformation as one transaction. Returns the caret the
    /// handler suggests, if any.
    pub fn fire(
        &self,
        editor: &mut DocumentEditor,
        data: &TransformationData,
    ) -> Result<Option<Location>, EditorError> {
        editor.start_transaction(&self.label)?;
        tracing::debug!(name = %self.name, "firing transformation");
        match (self.handler)(editor, data) {
            Ok(caret) => {
                editor.commit()?;
                Ok(caret)
            }
            Err(err) => {
                tracing::warn!(name = %self.name, %err, "transformation failed; rolling back");
                editor.rollback()?;
                Err(err)
            }
        }
    }
}

#[derive(Default)]
pub struct TransformationRegistry {
    list: Vec<Transformation>,
    by_name: HashMap<String, usize>,
}

impl TransformationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the generic structural operations.
    /// Modes register their schema-specific ones on top.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Transformation::new(
            "insert-element",
            TransformationKind::Insert,
            "insert element",
            insert_element_at,
        ));
        registry.register(Transformation::new(
            "insert-text",
            TransformationKind::Insert,
            "insert text",
            insert_text_at,
        ));
        registry.register(Transformation::new(
            "delete-range",
            TransformationKind::Delete,
            "delete",
            delete_range,
        ));
        registry.register(Transformation::new(
            "wrap",
            TransformationKind::Wrap,
            "wrap in element",
            wrap_range,
        ));
        registry.register(Transformation::new(
            "unwrap",
            TransformationKind::Unwrap,
            "unwrap element",
            unwrap_element,
        ));
        registry.register(Transformation::new(
            "split",
            TransformationKind::Split,
            "split element",
            split_node,
        ));
        registry.register(Transformation::new(
            "merge-with-next",
            TransformationKind::Merge,
            "merge with next",
            merge_with_next,
        ));
        registry.register(Transformation::new(
            "merge-with-previous",
            TransformationKind::Merge,
            "merge with previous",
            merge_with_previous,
        ));
        registry
    }

    /// Register a transformation, replacing any previous one with the
    /// same name.
    pub fn register(&mut self, transformation: Transformation) {
        if let Some(&at) = self.by_name.get(transformation.name()) {
            self.list[at] = transformation;
            return;
        }
        self.by_name
            .insert(transformation.name().to_string(), self.list.len());
        self.list.push(transformation);
    }

    pub fn get(&self, name: &str) -> Option<&Transformation> {
        self.by_name.get(name).map(|&at| &self.list[at])
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.list.iter().map(Transformation::name)
    }

    /// The transformations meaningful at a location, filtered by kind:
    /// unwrap wants a non-root element, split anything below the root,
    /// the merges a like-named sibling. Insertion, deletion and
    /// wrapping apply anywhere.
    pub fn applicable_at(&self, tree: &Tree, loc: Location) -> Vec<&Transformation> {
        self.list
            .iter()
            .filter(|transformation| match transformation.kind {
                TransformationKind::Insert
                | TransformationKind::Delete
                | TransformationKind::Wrap => true,
                TransformationKind::Unwrap => {
                    loc.node != tree.root() && tree.node(loc.node).is_element()
                }
                TransformationKind::Split => loc.node != tree.root(),
                TransformationKind::Merge => {
                    let subject = if tree.node(loc.node).is_text() {
                        tree.parent(loc.node)
                    } else {
                        Some(loc.node)
                    };
                    subject.is_some_and(|element| has_mergeable_sibling(tree, element))
                }
            })
            .collect()
    }

    pub fn fire(
        &self,
        name: &str,
        editor: &mut DocumentEditor,
        data: &TransformationData,
    ) -> Result<Option<Location>, EditorError> {
        let transformation = self
            .get(name)
            .ok_or_else(|| EditorError::UnknownTransformation(name.to_string()))?;
        transformation.fire(editor, data)
    }
}

fn has_mergeable_sibling(tree: &Tree, element: weft_dom::NodeId) -> bool {
    let Some(name) = tree.name(element) else {
        return false;
    };
    let same_name = |sibling: Option<weft_dom::NodeId>| {
        sibling.is_some_and(|sib| tree.name(sib) == Some(name))
    };
    same_name(tree.next_sibling(element)) || same_name(tree.previous_sibling(element))
}

// ----------------------------------------------------------------------
// Built-in handlers
// ----------------------------------------------------------------------

fn insert_element_at(
    editor: &mut DocumentEditor,
    data: &TransformationData,
) -> Result<Option<Location>, EditorError> {
    let loc = data.require_location("insert-element")?;
    let name = data.require_name("insert-element")?;
    let element = editor.insert_element(loc, name, data.attributes.clone())?;
    Ok(Some(Location::make(editor.tree(), element, 0)?))
}

fn insert_text_at(
    editor: &mut DocumentEditor,
    data: &TransformationData,
) -> Result<Option<Location>, EditorError> {
    let loc = data.require_location("insert-text")?;
    let text = data.require_text("insert-text")?;
    let insertion = editor.insert_text(loc, text)?;
    Ok(Some(insertion.end))
}

fn delete_range(
    editor: &mut DocumentEditor,
    data: &TransformationData,
) -> Result<Option<Location>, EditorError> {
    let start = data.require_location("delete-range")?;
    let end = data.require_end("delete-range")?;
    let (caret, _removed) = editor.cut(start, end)?;
    Ok(Some(caret))
}

/// Cut the range out, drop a new element at the cut point and reattach
/// the removed content inside it.
fn wrap_range(
    editor: &mut DocumentEditor,
    data: &TransformationData,
) -> Result<Option<Location>, EditorError> {
    let start = data.require_location("wrap")?;
    let end = data.require_end("wrap")?;
    let name = data.require_name("wrap")?;

    let (caret, removed) = editor.cut(start, end)?;
    let wrapper = editor.insert_element(caret, name, data.attributes.clone())?;
    for (slot, &node) in removed.iter().enumerate() {
        let inside = Location::make(editor.tree(), wrapper, slot)?;
        editor.insert_node_at(inside, node)?;
    }

    let parent = editor
        .tree()
        .parent(wrapper)
        .ok_or(EditorError::WrongNodeKind(wrapper))?;
    let after = editor
        .tree()
        .index_in_parent(wrapper)
        .ok_or(EditorError::WrongNodeKind(wrapper))?
        + 1;
    Ok(Some(
        Location::make(editor.tree(), parent, after)?.normalize(editor.tree())?,
    ))
}

/// Move an element's children out to where the element sat, then remove
/// it, merging any text seams the move opened up.
fn unwrap_element(
    editor: &mut DocumentEditor,
    data: &TransformationData,
) -> Result<Option<Location>, EditorError> {
    let loc = data.require_location("unwrap")?;
    let element = loc.node;
    if element == editor.tree().root() {
        return Err(EditorError::InvalidRange("cannot unwrap the root".into()));
    }
    if !editor.tree().node(element).is_element() {
        return Err(EditorError::WrongNodeKind(element));
    }
    let parent = editor
        .tree()
        .parent(element)
        .ok_or(EditorError::WrongNodeKind(element))?;
    let at = editor
        .tree()
        .index_in_parent(element)
        .ok_or(EditorError::WrongNodeKind(element))?;

    let count = editor.tree().child_count(element);
    for moved in 0..count {
        let child = editor.tree().children(element)[0];
        editor.extract_node(child)?;
        editor.insert_node_at(Location::make(editor.tree(), parent, at + moved)?, child)?;
    }
    // The emptied element now sits after its former children.
    editor.remove_node(element)?;

    let mut caret = Location::make(editor.tree(), parent, at)?.normalize(editor.tree())?;
    if at > 0 {
        let before = editor.tree().children(parent)[at - 1];
        if editor.tree().node(before).is_text() {
            caret = editor.merge_text_nodes(before)?;
        }
    }
    Ok(Some(caret))
}

/// Split the element containing the location in two at the caret.
fn split_node(
    editor: &mut DocumentEditor,
    data: &TransformationData,
) -> Result<Option<Location>, EditorError> {
    let loc = data.require_location("split")?;
    let (element, boundary) = if editor.tree().node(loc.node).is_text() {
        let text = loc.node;
        let parent = editor
            .tree()
            .parent(text)
            .ok_or(EditorError::WrongNodeKind(text))?;
        let at = editor
            .tree()
            .index_in_parent(text)
            .ok_or(EditorError::WrongNodeKind(text))?;
        if loc.offset == 0 {
            (parent, at)
        } else if loc.offset == editor.tree().len(text) {
            (parent, at + 1)
        } else {
            editor.split_at(loc)?;
            (parent, at + 1)
        }
    } else {
        (loc.node, loc.offset)
    };
    if element == editor.tree().root() {
        return Err(EditorError::InvalidRange("cannot split the root".into()));
    }
    let (_, twin) = editor.split_at(Location::make(editor.tree(), element, boundary)?)?;
    let twin = twin.ok_or_else(|| {
        EditorError::InvalidRange("element split produced no second half".into())
    })?;
    Ok(Some(Location::make(editor.tree(), twin, 0)?.normalize(editor.tree())?))
}

fn merge_with_next(
    editor: &mut DocumentEditor,
    data: &TransformationData,
) -> Result<Option<Location>, EditorError> {
    let loc = data.require_location("merge-with-next")?;
    merge_elements(editor, loc.node)
}

fn merge_with_previous(
    editor: &mut DocumentEditor,
    data: &TransformationData,
) -> Result<Option<Location>, EditorError> {
    let loc = data.require_location("merge-with-previous")?;
    let previous = editor.tree().previous_sibling(loc.node).ok_or_else(|| {
        EditorError::InvalidRange("no previous sibling to merge with".into())
    })?;
    merge_elements(editor, previous)
}

fn merge_elements(
    editor: &mut DocumentEditor,
    element: weft_dom::NodeId,
) -> Result<Option<Location>, EditorError> {
    let seam = editor.merge_with_next_sibling(element)?;
    // The seam may have put two text children side by side.
    let caret = if seam.offset > 0 {
        let before = editor.tree().children(element)[seam.offset - 1];
        if editor.tree().node(before).is_text() {
            editor.merge_text_nodes(before)?
        } else {
            seam.normalize(editor.tree())?
        }
    } else {
        seam.normalize(editor.tree())?
    };
    Ok(Some(caret))
}
