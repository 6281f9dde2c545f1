//! # Weft Tasks
//!
//! Cooperative background work for the editor, driven entirely by the
//! host's idle tick. Nothing here owns a thread or a timer.
//!
//! ```text
//! host idle tick
//!      │
//!      ▼
//! ┌────────────┐   cycle()   ┌──────────────────────┐
//! │ TaskRunner │ ──────────▶ │ ProcessErrorsTask    │──▶ MarkerSink
//! │  (bounded) │             │ RefreshErrorsTask    │
//! └────────────┘             └──────────┬───────────┘
//!                                       │ snapshot of ids
//!                            ┌──────────▼───────────┐
//!                            │ ValidationController │
//!                            └──────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Host-driven**: a task advances only when the host calls
//!    `step()`, and each step is bounded, so editing latency stays flat.
//! 2. **Snapshot isolation**: tasks drain the set of errors that existed
//!    at `reset()`; errors resolved mid-drain are skipped, not faulted.
//! 3. **Stale anchors are data**: an anchor invalidated by an edit skips
//!    one cycle and is reconsidered on the next snapshot.

mod runner;
mod validation;

pub use runner::{RunnerState, Task, TaskRunner};
pub use validation::{
    ErrorEntry, ErrorId, MarkerId, MarkerSink, ProcessErrorsTask, RefreshErrorsTask,
    ValidationContext, ValidationController, ValidationError, DEFAULT_BATCH_SIZE,
};
