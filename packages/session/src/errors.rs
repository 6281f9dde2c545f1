use thiserror::Error;
use weft_editor::EditorError;
use weft_view::ViewError;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error(transparent)]
    View(#[from] ViewError),

    /// Deferred handler edits kept queueing new edits past the turn
    /// limit.
    #[error("handler edits did not settle after {0} turns")]
    HandlerLoop(usize),
}
