//! # Weft Editor
//!
//! Mutation engine for weft data trees.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ transform: named compound operations        │
//! │  (insert, delete, wrap, unwrap, split, ...) │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: transactions + undo history         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ primitives: apply + emit MutationEvent      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **One event per change**: every observable mutation is exactly one
//!    `MutationEvent`, emitted after the fact, in order
//! 2. **Inverses are data**: each event computes its own inverse, so a
//!    transaction is also its own undo recipe
//! 3. **One replay path**: live edits, undo, redo and rollback all flow
//!    through the same primitive layer, and downstream observers cannot
//!    tell them apart
//! 4. **Identity survives undo**: deleted nodes stay resident, and undo
//!    reattaches the very same node ids it removed
//!
//! ## Usage
//!
//! ```rust,ignore
//! use weft_editor::{DocumentEditor, TransformationData, TransformationRegistry};
//! use weft_dom::{Location, QName};
//!
//! let mut editor = DocumentEditor::with_root(QName::local("doc"), 100);
//! let registry = TransformationRegistry::with_builtins();
//!
//! let data = TransformationData::at(caret).with_text("hello");
//! registry.fire("insert-text", &mut editor, &data)?;
//!
//! editor.undo()?;
//! ```

mod editor;
mod errors;
mod events;
mod history;
mod primitives;
mod saver;
mod transaction;
mod transform;

pub use editor::DocumentEditor;
pub use errors::EditorError;
pub use events::MutationEvent;
pub use history::History;
pub use primitives::{Primitives, TextInsertion};
pub use saver::{MemorySaver, SaveKind, SaveOutcome, Saver};
pub use transaction::{RecordedStep, Transaction};
pub use transform::{
    Transformation, TransformationData, TransformationHandler, TransformationKind,
    TransformationRegistry,
};
