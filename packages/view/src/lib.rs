//! # Weft View
//!
//! The presentation side of a weft session: a GUI tree mirroring the
//! data tree, the index tying the two together, the change dispatcher
//! and the caret.
//!
//! ## Architecture
//!
//! ```text
//! data tree ──MutationEvent──▶ Mirror ──gui events──▶ Listener
//!                                │                       │
//!                            TreeIndex               handlers
//!                                │
//!                           CaretManager (gui ⇄ data translation)
//! ```
//!
//! ## Core Principles
//!
//! 1. **No back-pointers**: the data tree knows nothing of the GUI
//!    tree; all correspondence lives in the explicit [`TreeIndex`]
//! 2. **Replay, don't re-render**: the mirror applies the data tree's
//!    event stream to the GUI tree instead of rebuilding it
//! 3. **Decorations are GUI-only**: they never serialize, never appear
//!    in the index, and carets inside them resolve to data positions by
//!    recorded bias

mod caret;
mod index;
mod listener;
mod mirror;
mod mode;

pub use caret::{data_to_gui, gui_to_data, Caret, CaretManager};
pub use index::TreeIndex;
pub use listener::{Delivery, EventClass, Listener, ListenerHandler, Selector};
pub use mirror::Mirror;
pub use mode::{DecorationSpec, GenericMode, LayeredMode, Mode};

use thiserror::Error;
use weft_dom::{LocationError, NodeId, TreeError};
use weft_editor::EditorError;

#[derive(Error, Debug)]
pub enum ViewError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error("node {0:?} already has a mapping")]
    DuplicateMapping(NodeId),

    #[error("no mapping for node {0:?}")]
    MappingMissing(NodeId),

    #[error("the GUI tree has diverged from the data tree: {0}")]
    Diverged(String),
}
