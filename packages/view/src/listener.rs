//! Change dispatch over the GUI tree.
//!
//! Handlers register for an event class and a selector. Feeding a batch
//! of GUI mutation events through [`Listener::dispatch`] computes the
//! deliveries each event implies and calls every matching handler, in
//! registration order within a class. Handlers get a shared view of the
//! tree; anything they want mutated goes through the embedding session's
//! deferral queue and lands in a later batch.
//!
//! ## Event classes
//!
//! - `Added` / `Removed`: a node became / stopped being a *direct* child
//!   of its parent.
//! - `Included` / `Excluded`: a node entered / left the tree, whether
//!   directly or inside a moved or destroyed subtree. For a subtree,
//!   exclusions arrive leaf-first.
//! - `TextChanged`, `AttributeChanged`: in-place value changes.

use weft_dom::{NodeId, QName, Tree};
use weft_editor::MutationEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    Added,
    Removed,
    Included,
    Excluded,
    TextChanged,
    AttributeChanged,
}

/// What to match deliveries against. `None` fields match anything;
/// class matching tests GUI presentation classes, so selectors can
/// target mode decorations as well as mirrored elements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selector {
    pub name: Option<QName>,
    pub class: Option<String>,
}

impl Selector {
    /// Matches every node.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn named(name: QName) -> Self {
        Self {
            name: Some(name),
            class: None,
        }
    }

    pub fn with_class(class: impl Into<String>) -> Self {
        Self {
            name: None,
            class: Some(class.into()),
        }
    }

    pub fn matches(&self, tree: &Tree, node: NodeId) -> bool {
        if let Some(name) = &self.name {
            if tree.name(node) != Some(name) {
                return false;
            }
        }
        if let Some(class) = &self.class {
            match tree.node(node).classes() {
                Some(classes) if classes.contains(class) => {}
                _ => return false,
            }
        }
        true
    }
}

/// One unit of dispatch: an event class instantiated with the nodes it
/// concerns.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Added {
        parent: NodeId,
        child: NodeId,
    },
    Removed {
        parent: NodeId,
        child: NodeId,
    },
    Included {
        /// The subtree root whose movement caused the inclusion.
        root: NodeId,
        node: NodeId,
    },
    Excluded {
        root: NodeId,
        node: NodeId,
    },
    TextChanged {
        node: NodeId,
        old_value: Option<String>,
    },
    AttributeChanged {
        node: NodeId,
        name: QName,
        value: Option<String>,
        old_value: Option<String>,
    },
}

impl Delivery {
    pub fn class(&self) -> EventClass {
        match self {
            Delivery::Added { .. } => EventClass::Added,
            Delivery::Removed { .. } => EventClass::Removed,
            Delivery::Included { .. } => EventClass::Included,
            Delivery::Excluded { .. } => EventClass::Excluded,
            Delivery::TextChanged { .. } => EventClass::TextChanged,
            Delivery::AttributeChanged { .. } => EventClass::AttributeChanged,
        }
    }

    /// The node a selector is tested against.
    pub fn target(&self) -> NodeId {
        match self {
            Delivery::Added { child, .. } | Delivery::Removed { child, .. } => *child,
            Delivery::Included { node, .. } | Delivery::Excluded { node, .. } => *node,
            Delivery::TextChanged { node, .. } => *node,
            Delivery::AttributeChanged { node, .. } => *node,
        }
    }
}

pub type ListenerHandler = Box<dyn FnMut(&Tree, &Delivery)>;

struct Registration {
    class: EventClass,
    selector: Selector,
    handler: ListenerHandler,
}

#[derive(Default)]
pub struct Listener {
    registrations: Vec<Registration>,
}

impl Listener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_handler(&mut self, class: EventClass, selector: Selector, handler: ListenerHandler) {
        self.registrations.push(Registration {
            class,
            selector,
            handler,
        });
    }

    /// Deliveries implied by one GUI event, in delivery order.
    ///
    /// `tree` is the GUI tree after the whole batch was applied; subtree
    /// walks happen at delivery time, so an Included walk sees the
    /// subtree as it stands now.
    pub fn deliveries(tree: &Tree, event: &MutationEvent) -> Vec<Delivery> {
        match event {
            MutationEvent::InsertNode { parent, node, .. } => {
                let mut out = vec![Delivery::Added {
                    parent: *parent,
                    child: *node,
                }];
                for included in tree.descendants(*node) {
                    out.push(Delivery::Included {
                        root: *node,
                        node: included,
                    });
                }
                out
            }
            MutationEvent::DeleteNode {
                parent,
                node,
                cascade,
                ..
            } => {
                if *cascade {
                    // Descendant of a dismantled subtree; its own leaving
                    // is the whole story.
                    return vec![Delivery::Excluded {
                        root: *node,
                        node: *node,
                    }];
                }
                let mut out = vec![Delivery::Removed {
                    parent: *parent,
                    child: *node,
                }];
                // Detached subtrees stay walkable, so a whole-subtree
                // move excludes every node it carried, leaf-first.
                let mut nodes = tree.descendants(*node);
                nodes.reverse();
                for excluded in nodes {
                    out.push(Delivery::Excluded {
                        root: *node,
                        node: excluded,
                    });
                }
                out
            }
            MutationEvent::SetText { node, old_value, .. } => vec![Delivery::TextChanged {
                node: *node,
                old_value: Some(old_value.clone()),
            }],
            MutationEvent::SetAttribute {
                node,
                name,
                value,
                old_value,
            } => vec![Delivery::AttributeChanged {
                node: *node,
                name: name.clone(),
                value: value.clone(),
                old_value: old_value.clone(),
            }],
            MutationEvent::Split { node, new_node, .. } => {
                let mut out = Vec::new();
                if tree.node(*node).is_text() {
                    out.push(Delivery::TextChanged {
                        node: *node,
                        old_value: None,
                    });
                }
                if let Some(parent) = tree.parent(*new_node) {
                    out.push(Delivery::Added {
                        parent,
                        child: *new_node,
                    });
                }
                for included in tree.descendants(*new_node) {
                    out.push(Delivery::Included {
                        root: *new_node,
                        node: included,
                    });
                }
                out
            }
            MutationEvent::Merge { node, next, .. } => {
                let mut out = Vec::new();
                if tree.node(*node).is_text() {
                    out.push(Delivery::TextChanged {
                        node: *node,
                        old_value: None,
                    });
                }
                out.push(Delivery::Removed {
                    parent: tree.parent(*node).unwrap_or(*node),
                    child: *next,
                });
                out.push(Delivery::Excluded {
                    root: *next,
                    node: *next,
                });
                out
            }
        }
    }

    /// Dispatch one batch: every event's deliveries, each offered to all
    /// matching handlers in registration order.
    pub fn dispatch(&mut self, tree: &Tree, events: &[MutationEvent]) {
        for event in events {
            for delivery in Self::deliveries(tree, event) {
                let target = delivery.target();
                for registration in &mut self.registrations {
                    if registration.class != delivery.class() {
                        continue;
                    }
                    if !registration.selector.matches(tree, target) {
                        continue;
                    }
                    (registration.handler)(tree, &delivery);
                }
            }
        }
    }
}
