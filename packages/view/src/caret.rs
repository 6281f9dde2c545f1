//! Caret state and GUI ⇄ data position translation.
//!
//! The caret lives in GUI coordinates; commands translate it to data
//! coordinates before editing. Translation skips decorations. A caret
//! that lands inside a zero-width decoration has no data-side width at
//! all, so it resolves to one side of the decoration's boundary: the
//! side named by the [`Bias`](weft_dom::Bias) the decoration was
//! inserted with. Start leans into preceding text, End into following
//! text; with no text on the chosen side the element boundary itself is
//! the answer.

use crate::{Mirror, ViewError};
use weft_dom::{Bias, Location, NodeId, Tree};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Caret {
    #[default]
    None,
    Collapsed(Location),
    Range {
        anchor: Location,
        focus: Location,
    },
}

impl Caret {
    /// The position edits happen at: the focus end of a range, the
    /// point of a collapsed caret.
    pub fn focus(&self) -> Option<Location> {
        match self {
            Caret::None => None,
            Caret::Collapsed(loc) => Some(*loc),
            Caret::Range { focus, .. } => Some(*focus),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Caret::None)
    }
}

/// Owns the GUI caret and queues change notifications. Notifications
/// are not delivered eagerly; the session flushes them once the change
/// dispatcher has drained, so caret observers always see a settled
/// tree.
#[derive(Debug, Default)]
pub struct CaretManager {
    caret: Caret,
    changed: bool,
}

impl CaretManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn caret(&self) -> &Caret {
        &self.caret
    }

    pub fn set(&mut self, loc: Location) {
        self.update(Caret::Collapsed(loc));
    }

    pub fn set_range(&mut self, anchor: Location, focus: Location) {
        if anchor == focus {
            self.update(Caret::Collapsed(focus));
        } else {
            self.update(Caret::Range { anchor, focus });
        }
    }

    pub fn clear(&mut self) {
        self.update(Caret::None);
    }

    fn update(&mut self, caret: Caret) {
        if self.caret != caret {
            self.caret = caret;
            self.changed = true;
        }
    }

    /// Drop the caret if a mutation invalidated it.
    pub fn refresh(&mut self, gui: &Tree) {
        let valid = match &self.caret {
            Caret::None => true,
            Caret::Collapsed(loc) => loc.is_valid(gui),
            Caret::Range { anchor, focus } => anchor.is_valid(gui) && focus.is_valid(gui),
        };
        if !valid {
            self.update(Caret::None);
        }
    }

    /// The pending notification, if the caret changed since the last
    /// flush.
    pub fn take_change(&mut self) -> Option<Caret> {
        if !self.changed {
            return None;
        }
        self.changed = false;
        Some(self.caret.clone())
    }

    /// The caret's focus in data coordinates.
    pub fn data_focus(
        &self,
        mirror: &Mirror,
        data: &Tree,
    ) -> Result<Option<Location>, ViewError> {
        match self.caret.focus() {
            Some(focus) => Ok(Some(gui_to_data(mirror, data, focus)?)),
            None => Ok(None),
        }
    }
}

/// Translate a GUI location to the data location it edits at.
pub fn gui_to_data(mirror: &Mirror, data: &Tree, loc: Location) -> Result<Location, ViewError> {
    let gui = mirror.gui();

    // Inside a decoration subtree, resolve from the outermost
    // decoration ancestor by its bias.
    if let Some(decoration) = outermost_decoration(gui, loc.node) {
        let host = gui
            .parent(decoration)
            .ok_or(ViewError::MappingMissing(decoration))?;
        let data_host = mirror.index().require_data(host)?;
        let boundary = mirror.data_index_of(decoration)?;
        let bias = match gui.node(decoration).decoration() {
            Some(decoration) => decoration.bias,
            None => Bias::Start,
        };
        return resolve_boundary(data, data_host, boundary, bias);
    }

    if gui.node(loc.node).is_text() {
        let gui_parent = gui
            .parent(loc.node)
            .ok_or(ViewError::MappingMissing(loc.node))?;
        let data_parent = mirror.index().require_data(gui_parent)?;
        let at = mirror.data_index_of(loc.node)?;
        let data_text = *data
            .children(data_parent)
            .get(at)
            .ok_or_else(|| ViewError::Diverged(format!("no data child at index {at}")))?;
        return Ok(Location::make(data, data_text, loc.offset)?);
    }

    // Element boundary: count the content children before the GUI
    // offset.
    let data_node = mirror.index().require_data(loc.node)?;
    let children = gui.children(loc.node);
    let content_before = children
        .get(..loc.offset)
        .ok_or_else(|| {
            ViewError::Diverged(format!(
                "offset {} exceeds the {} children of {:?}",
                loc.offset,
                children.len(),
                loc.node
            ))
        })?
        .iter()
        .filter(|&&child| !gui.node(child).is_decoration())
        .count();
    Ok(Location::make(data, data_node, content_before)?)
}

/// Translate a data location to its GUI rendition.
pub fn data_to_gui(mirror: &Mirror, data: &Tree, loc: Location) -> Result<Location, ViewError> {
    let gui = mirror.gui();
    if data.node(loc.node).is_text() {
        let twin = mirror.gui_text_twin(data, loc.node)?;
        return Ok(Location::make(gui, twin, loc.offset)?);
    }
    let gui_node = mirror.index().require_gui(loc.node)?;
    let pos = mirror.gui_insert_position(gui_node, loc.offset);
    Ok(Location::make(gui, gui_node, pos)?)
}

fn outermost_decoration(gui: &Tree, node: NodeId) -> Option<NodeId> {
    let mut found = None;
    let mut cursor = Some(node);
    while let Some(current) = cursor {
        if gui.node(current).is_decoration() {
            found = Some(current);
        }
        cursor = gui.parent(current);
    }
    found
}

/// A data child boundary reached through a decoration: lean into the
/// text on the biased side when there is one.
fn resolve_boundary(
    data: &Tree,
    host: NodeId,
    boundary: usize,
    bias: Bias,
) -> Result<Location, ViewError> {
    let children = data.children(host);
    match bias {
        Bias::Start => {
            if boundary > 0 {
                let before = children[boundary - 1];
                if data.node(before).is_text() {
                    return Ok(Location::make(data, before, data.len(before))?);
                }
            }
        }
        Bias::End => {
            if let Some(&after) = children.get(boundary) {
                if data.node(after).is_text() {
                    return Ok(Location::make(data, after, 0)?);
                }
            }
        }
    }
    Ok(Location::make(data, host, boundary)?)
}
