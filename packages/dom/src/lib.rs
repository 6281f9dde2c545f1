//! # Weft DOM
//!
//! Owning document model for weft: an arena of nodes addressed by stable
//! integer handles, plus the `Location` abstraction used everywhere else in
//! the workspace.
//!
//! ## Core Principles
//!
//! 1. **Exclusive ownership**: a node belongs to exactly one parent in
//!    exactly one tree. There are no back-pointers between trees; the
//!    data↔GUI correspondence lives in an explicit index (weft-view).
//! 2. **Stable handles**: `NodeId`s are never reused while a tree lives.
//!    Detached nodes stay resident so that undo can restore the exact node
//!    identities it removed.
//! 3. **Locations are values**: `(root, container, offset)` plus a
//!    generation stamp. They are cheap to make and discard, and must be
//!    revalidated rather than cached across mutation boundaries.

mod location;
mod name;
mod node;
mod serialize;
mod tree;

pub use location::{Location, LocationError};
pub use name::QName;
pub use node::{Bias, Decoration, Node, NodeId, NodeKind};
pub use serialize::{serialize, serialize_subtree};
pub use tree::{Tree, TreeError, TreeId};
