//! # Weft Session
//!
//! The top of the stack: one [`Session`] owns the data editor, the GUI
//! mirror, the change dispatcher, the caret, the validation runners and
//! the saver, and moves every edit through the same delivery pipeline.
//!
//! ```text
//! invoke(name, data)
//!      │
//!      ▼
//! DocumentEditor ──events──▶ Mirror ──gui events──▶ Listener
//!      ▲                                               │
//!      └────────────── queued handler edits ◀──────────┘
//!                     (next turn)
//!
//! settled ──▶ caret notifications ──▶ observers
//! idle_tick ──▶ validation runners ──▶ MarkerStore
//! ```
//!
//! ## Core Principles
//!
//! 1. **One logical thread**: nothing here is `Send`; the host serializes
//!    calls and drives background work from its own idle tick.
//! 2. **Turn-by-turn delivery**: handlers observe a settled tree and
//!    defer their own edits to the next turn through the invoke queue.
//! 3. **The session owns policy**: the editor, mirror and tasks stay
//!    mechanism; batching, autosave and marker storage live here.

mod errors;
pub mod logging;
mod markers;
mod options;
mod session;

pub use errors::SessionError;
pub use markers::{Marker, MarkerStore};
pub use options::SessionOptions;
pub use session::{InvokeQueue, QueuedInvoke, Session};
