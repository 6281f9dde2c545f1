//! Modes: pluggable decoration policy for the GUI tree.
//!
//! A mode decides how data elements present: which GUI classes they
//! carry and which zero-width decoration nodes get laid around their
//! content. The mirror consults the mode whenever it materializes a new
//! GUI element.

use weft_dom::{Bias, NodeId, Tree};

/// A decoration to place inside a freshly-mirrored element.
#[derive(Debug, Clone, PartialEq)]
pub struct DecorationSpec {
    /// Data child boundary the decoration sits at (0 = before the first
    /// child). Decorations are zero-width: they occupy no data slot.
    pub at: usize,
    pub class: String,
    /// Which data boundary a caret landing inside the decoration
    /// resolves toward.
    pub bias: Bias,
}

pub trait Mode {
    fn label(&self) -> &str;

    /// GUI classes for a mirrored element.
    fn classes_for(&self, _data: &Tree, _node: NodeId) -> Vec<String> {
        Vec::new()
    }

    /// Decorations for a mirrored element, in ascending boundary order.
    fn decorations_for(&self, _data: &Tree, _node: NodeId) -> Vec<DecorationSpec> {
        Vec::new()
    }

    /// Whether the element presents inline. The core only threads this
    /// through; hosts use it for caret movement and layout.
    fn is_inline(&self, _data: &Tree, _node: NodeId) -> bool {
        false
    }
}

/// A schema-agnostic mode: every element is labelled with a class
/// derived from its name, and optionally bracketed by start and end
/// decorations the way a generic XML editor shows element boundaries.
#[derive(Debug, Default)]
pub struct GenericMode {
    pub decorate_boundaries: bool,
}

impl GenericMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_boundaries() -> Self {
        Self {
            decorate_boundaries: true,
        }
    }
}

impl Mode for GenericMode {
    fn label(&self) -> &str {
        "generic"
    }

    fn classes_for(&self, data: &Tree, node: NodeId) -> Vec<String> {
        match data.name(node) {
            Some(name) => vec![format!("_el_{}", name.local)],
            None => Vec::new(),
        }
    }

    fn decorations_for(&self, data: &Tree, node: NodeId) -> Vec<DecorationSpec> {
        if !self.decorate_boundaries {
            return Vec::new();
        }
        vec![
            DecorationSpec {
                at: 0,
                class: "_start_label".into(),
                bias: Bias::Start,
            },
            DecorationSpec {
                at: data.child_count(node),
                class: "_end_label".into(),
                bias: Bias::End,
            },
        ]
    }
}

/// Composition instead of subclassing: stacks an overlay mode on a
/// base. Classes and decorations accumulate; the overlay's label and
/// inline judgement win where they speak.
pub struct LayeredMode<B, O> {
    pub base: B,
    pub overlay: O,
}

impl<B: Mode, O: Mode> Mode for LayeredMode<B, O> {
    fn label(&self) -> &str {
        self.overlay.label()
    }

    fn classes_for(&self, data: &Tree, node: NodeId) -> Vec<String> {
        let mut classes = self.base.classes_for(data, node);
        classes.extend(self.overlay.classes_for(data, node));
        classes
    }

    fn decorations_for(&self, data: &Tree, node: NodeId) -> Vec<DecorationSpec> {
        let mut decorations = self.base.decorations_for(data, node);
        decorations.extend(self.overlay.decorations_for(data, node));
        decorations
    }

    fn is_inline(&self, data: &Tree, node: NodeId) -> bool {
        self.overlay.is_inline(data, node) || self.base.is_inline(data, node)
    }
}
